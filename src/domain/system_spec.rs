//! System combination specification parsing.
//!
//! The ticket carries a string such as `"2/5, 3/5"`: comma-separated
//! tokens whose first slash-separated field is the number of free
//! selections to pick. Any later fields are decoration and ignored.

use serde::{Deserialize, Serialize};

use super::error::ParseError;

/// Ordered choice sizes of a system ticket. Duplicates are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSpec {
    sizes: Vec<usize>,
}

impl SystemSpec {
    /// Build a spec directly from choice sizes.
    pub fn from_sizes(sizes: Vec<usize>) -> Self {
        Self { sizes }
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Smallest choice size, or `None` for an empty spec.
    pub fn min_size(&self) -> Option<usize> {
        self.sizes.iter().copied().min()
    }

    /// Largest choice size, or `None` for an empty spec.
    pub fn max_size(&self) -> Option<usize> {
        self.sizes.iter().copied().max()
    }
}

impl std::str::FromStr for SystemSpec {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

impl std::fmt::Display for SystemSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.sizes.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Parse a combination specification into its choice sizes.
///
/// # Errors
/// [`ParseError::Empty`] for blank input; [`ParseError::InvalidChoiceSize`]
/// when a token does not start with a non-negative integer.
pub fn parse(input: &str) -> Result<SystemSpec, ParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseError::Empty);
    }

    let sizes = input
        .split(',')
        .map(parse_token)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SystemSpec { sizes })
}

fn parse_token(token: &str) -> Result<usize, ParseError> {
    let token = token.trim();
    // split always yields at least one field
    let first = token.split('/').next().unwrap_or_default();

    parse_trimmed(first).map_err(|source| ParseError::InvalidChoiceSize {
        token: token.to_string(),
        source,
    })
}

fn parse_trimmed(s: &str) -> Result<usize, std::num::ParseIntError> {
    s.trim().parse()
}
