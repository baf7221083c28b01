//! Lexicographic k-subset enumeration.
//!
//! Subsets are generated iteratively from an index vector rather than by
//! recursive backtracking, so stack depth stays constant for any pool
//! size. Output order matches include-then-skip backtracking over the
//! input order:
//!
//! ```text
//! [a, b, c, d], k = 2  →  ab ac ad bc bd cd
//! ```

use super::binomial::binom;

/// Iterator over every k-element subset of a pool.
///
/// Each item is an owned `Vec` whose elements keep their relative order
/// in the pool.
#[derive(Debug, Clone)]
pub struct Subsets<'a, T> {
    pool: &'a [T],
    /// Pool positions of the next subset to emit; `None` once exhausted.
    indices: Option<Vec<usize>>,
    remaining: u64,
}

impl<'a, T: Clone> Subsets<'a, T> {
    pub fn new(pool: &'a [T], k: usize) -> Self {
        let indices = (k <= pool.len()).then(|| (0..k).collect());
        Self {
            pool,
            indices,
            remaining: binom(pool.len(), k),
        }
    }

    /// Subsets not yet emitted.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Advance `indices` to the lexicographic successor in place.
    /// Returns false when `indices` was the last subset.
    fn advance(indices: &mut [usize], n: usize) -> bool {
        let k = indices.len();
        // Rightmost position that can still move right.
        let Some(i) = (0..k).rev().find(|&i| indices[i] < n - k + i) else {
            return false;
        };
        indices[i] += 1;
        for j in i + 1..k {
            indices[j] = indices[j - 1] + 1;
        }
        true
    }
}

impl<T: Clone> Iterator for Subsets<'_, T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let indices = self.indices.as_mut()?;
        let subset = indices.iter().map(|&i| self.pool[i].clone()).collect();

        if !Self::advance(indices, self.pool.len()) {
            self.indices = None;
        }
        self.remaining = self.remaining.saturating_sub(1);

        Some(subset)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

/// Lazily enumerate the k-subsets of `ids`.
///
/// `k == 0` yields exactly one empty subset; `k > ids.len()` yields none.
pub fn subsets<T: Clone>(ids: &[T], k: usize) -> Subsets<'_, T> {
    Subsets::new(ids, k)
}

/// Collect every k-subset of `ids`.
pub fn enumerate<T: Clone>(ids: &[T], k: usize) -> Vec<Vec<T>> {
    subsets(ids, k).collect()
}
