//! Combination pricing.
//!
//! A combination's odds are the product of its members' odds; its
//! potential win is that product times the stake placed on it.

use super::error::LookupError;
use super::ticket::{Combination, OddsBook, SelectionId};

/// Price the fixed selections together with one subset of free selections.
///
/// # Errors
/// [`LookupError`] if any member has no entry in `odds`.
pub fn price_combination(
    fixed: &[SelectionId],
    subset: &[SelectionId],
    odds: &OddsBook,
    stake: f64,
) -> Result<Combination, LookupError> {
    let selection_ids: Vec<SelectionId> = fixed.iter().chain(subset).copied().collect();
    price_single(selection_ids, odds, stake)
}

/// Price an explicit member list as a single combination.
///
/// # Errors
/// [`LookupError`] if any member has no entry in `odds`.
pub fn price_single(
    selection_ids: Vec<SelectionId>,
    odds: &OddsBook,
    stake: f64,
) -> Result<Combination, LookupError> {
    let combined = combined_odds(&selection_ids, odds)?;

    Ok(Combination {
        selection_ids,
        odds: combined,
        stake,
        potential_win: combined * stake,
    })
}

/// Product of the members' odds. An empty member list has odds 1.
pub fn combined_odds(ids: &[SelectionId], odds: &OddsBook) -> Result<f64, LookupError> {
    ids.iter()
        .try_fold(1.0, |acc, &id| odds.get(id).map(|o| acc * o))
}
