//! Exposure aggregation for system tickets.
//!
//! Settlement runs in three steps:
//! 1. [`SettlementPlan::new`] validates choice sizes against the free
//!    pool, counts combinations and splits the stake evenly.
//! 2. [`SettlementPlan::combinations`] enumerates and prices every
//!    combination, choice size by choice size in spec order.
//! 3. [`ExposureTracker`] folds the priced combinations into the total
//!    exposure and the smallest single payout.
//!
//! [`settle`] wires the three together around a persistence callback.
//! Async callers drive the steps themselves so they can await storage
//! between combinations.

use super::binomial::checked_binom;
use super::error::{ConfigurationError, LookupError, SettlementError};
use super::pricing::{price_combination, price_single};
use super::subsets::subsets;
use super::system_spec::SystemSpec;
use super::ticket::{Combination, SelectionSnapshot, SettlementResult};

// ────────────────────────────────────────────
// Plan
// ────────────────────────────────────────────

/// Validated counts and stake split for one system ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementPlan {
    spec: SystemSpec,
    free_count: usize,
    num_combinations: u64,
    stake_per_combination: f64,
}

impl SettlementPlan {
    /// Validate `spec` against `snapshot` and split `total_stake`.
    ///
    /// Every choice size is checked before anything is counted, so an
    /// out-of-range size fails the whole ticket even if other sizes are
    /// valid.
    ///
    /// # Errors
    /// [`ConfigurationError`] for a non-positive stake, a choice size
    /// larger than the free pool, a zero or overflowing combination count.
    pub fn new(
        total_stake: f64,
        spec: SystemSpec,
        snapshot: &SelectionSnapshot,
    ) -> Result<Self, ConfigurationError> {
        validate_stake(total_stake)?;

        let free_count = snapshot.free().len();
        if let Some(&k) = spec.sizes().iter().find(|&&k| k > free_count) {
            return Err(ConfigurationError::ChoiceSizeOutOfRange { k, free: free_count });
        }

        let num_combinations = spec
            .sizes()
            .iter()
            .try_fold(0u64, |acc, &k| {
                checked_binom(free_count, k).and_then(|c| acc.checked_add(c))
            })
            .ok_or(ConfigurationError::CombinationCountOverflow)?;

        if num_combinations == 0 {
            return Err(ConfigurationError::NoCombinations);
        }

        // Any remainder of the division is not redistributed.
        #[allow(clippy::cast_precision_loss)]
        let stake_per_combination = total_stake / num_combinations as f64;

        Ok(Self {
            spec,
            free_count,
            num_combinations,
            stake_per_combination,
        })
    }

    /// Sum of C(free, k) over every choice size.
    pub fn num_combinations(&self) -> u64 {
        self.num_combinations
    }

    pub fn stake_per_combination(&self) -> f64 {
        self.stake_per_combination
    }

    /// Lazily price every combination of the plan.
    ///
    /// `snapshot` must be the one the plan was built from.
    pub fn combinations<'a>(
        &'a self,
        snapshot: &'a SelectionSnapshot,
    ) -> impl Iterator<Item = Result<Combination, LookupError>> + 'a {
        debug_assert_eq!(snapshot.free().len(), self.free_count);

        self.spec
            .sizes()
            .iter()
            .flat_map(move |&k| subsets(snapshot.free(), k))
            .map(move |subset| {
                price_combination(
                    snapshot.fixed(),
                    &subset,
                    snapshot.odds(),
                    self.stake_per_combination,
                )
            })
    }
}

fn validate_stake(total_stake: f64) -> Result<(), ConfigurationError> {
    if total_stake.is_finite() && total_stake > 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidStake(total_stake))
    }
}

// ────────────────────────────────────────────
// Tracker
// ────────────────────────────────────────────

/// Running exposure sum and minimum payout.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureTracker {
    count: u64,
    total_exposure: f64,
    min_payout: f64,
}

impl Default for ExposureTracker {
    fn default() -> Self {
        Self {
            count: 0,
            total_exposure: 0.0,
            min_payout: f64::INFINITY,
        }
    }
}

impl ExposureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, combination: &Combination) {
        self.count += 1;
        self.total_exposure += combination.potential_win;
        self.min_payout = self.min_payout.min(combination.potential_win);
    }

    /// Combinations recorded so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total_exposure(&self) -> f64 {
        self.total_exposure
    }

    /// `f64::INFINITY` until the first combination is recorded.
    pub fn min_payout(&self) -> f64 {
        self.min_payout
    }

    /// Close the run against its plan.
    pub fn finish(self, plan: &SettlementPlan) -> SettlementResult {
        debug_assert_eq!(
            self.count, plan.num_combinations,
            "enumerated combinations diverge from the binomial count"
        );

        SettlementResult {
            num_combinations: plan.num_combinations,
            stake_per_combination: plan.stake_per_combination,
            total_exposure: self.total_exposure,
            min_payout: self.min_payout,
        }
    }
}

// ────────────────────────────────────────────
// Synchronous orchestration
// ────────────────────────────────────────────

/// Settle a system ticket, handing each combination to `emit` as soon as
/// it is priced.
///
/// The first error from `emit` stops enumeration and is returned as
/// [`SettlementError::Persistence`]; no result is produced for a partial
/// run.
///
/// # Errors
/// Any [`SettlementError`]; see the module docs for when each occurs.
pub fn settle<F>(
    total_stake: f64,
    spec: SystemSpec,
    snapshot: &SelectionSnapshot,
    mut emit: F,
) -> Result<SettlementResult, SettlementError>
where
    F: FnMut(&Combination) -> anyhow::Result<()>,
{
    let plan = SettlementPlan::new(total_stake, spec, snapshot)?;
    let mut tracker = ExposureTracker::new();

    for combination in plan.combinations(snapshot) {
        let combination = combination?;
        emit(&combination).map_err(SettlementError::Persistence)?;
        tracker.record(&combination);
    }

    Ok(tracker.finish(&plan))
}

/// Settle a normal ticket: all selections in one combination carrying
/// the whole stake. Members keep their stored order; fixed flags are
/// ignored.
///
/// Every selection must win for the ticket to pay, so the minimum
/// payout is zero.
///
/// # Errors
/// [`ConfigurationError::InvalidStake`] or a [`LookupError`].
pub fn settle_single(
    total_stake: f64,
    snapshot: &SelectionSnapshot,
) -> Result<(Combination, SettlementResult), SettlementError> {
    validate_stake(total_stake)?;

    let combination = price_single(snapshot.all_ids().to_vec(), snapshot.odds(), total_stake)?;
    let result = SettlementResult {
        num_combinations: 1,
        stake_per_combination: total_stake,
        total_exposure: combination.potential_win,
        min_payout: 0.0,
    };

    Ok((combination, result))
}
