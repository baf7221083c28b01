//! Exact binomial coefficients.
//!
//! C(n, k) is built as the running product of (n - i) / (i + 1). After
//! step i the accumulator equals C(n, i + 1), so every division is exact
//! and no big-integer type is needed. The intermediate product is held in
//! `u128` so the multiply cannot overflow before the divide.

/// Number of k-element subsets of an n-element pool.
///
/// Returns 0 when `k > n`. Saturates at `u64::MAX`; use
/// [`checked_binom`] where overflow must be detected.
pub fn binom(n: usize, k: usize) -> u64 {
    checked_binom(n, k).unwrap_or(u64::MAX)
}

/// Like [`binom`], but `None` when the result does not fit in a `u64`.
pub fn checked_binom(n: usize, k: usize) -> Option<u64> {
    if k > n {
        return Some(0);
    }
    if k == 0 || k == n {
        return Some(1);
    }

    let k = k.min(n - k);
    let n = n as u128;
    let mut result: u128 = 1;

    for i in 0..k as u128 {
        result = result.checked_mul(n - i)? / (i + 1);
        if result > u128::from(u64::MAX) {
            return None;
        }
    }

    u64::try_from(result).ok()
}
