//! Ray (1e27) fixed-point math for lending indices.
//!
//! Reserve indices grow by `index × (1 + interest)`. The interest helpers
//! here return only the growth term (ray-scaled), so a zero-length interval
//! yields zero and the caller rolls an index with [`roll_index`].
//!
//! ```text
//! linear:     r·Δt / YEAR
//! compounded: r·Δt/YEAR + Δt(Δt−1)/2·(r/YEAR)² + Δt(Δt−1)(Δt−2)/6·(r/YEAR)³
//! ```

use crate::wide::{mul_div, U256};

/// One ray: 1e27.
pub const RAY: u128 = 1_000_000_000_000_000_000_000_000_000;

/// Seconds per year used for annual rate conversion.
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;

/// `a * b / RAY`, truncating.
///
/// Matches the on-chain floor rounding of scaled-balance reads; clamps at
/// `u128::MAX` instead of overflowing.
pub fn ray_mul(a: u128, b: u128) -> u128 {
    mul_div(U256::from_u128(a), U256::from_u128(b), U256::from_u128(RAY))
        .map(|v| v.saturating_to_u128())
        .unwrap_or(u128::MAX)
}

/// `a * RAY / b`, truncating. A zero divisor yields zero.
pub fn ray_div(a: u128, b: u128) -> u128 {
    if b == 0 {
        return 0;
    }
    mul_div(U256::from_u128(a), U256::from_u128(RAY), U256::from_u128(b))
        .map(|v| v.saturating_to_u128())
        .unwrap_or(u128::MAX)
}

/// Accrued linear interest between `from` and `to` for an annual ray rate.
///
/// Returns 0 when `to <= from`.
pub fn linear_interest(rate: u128, from: u64, to: u64) -> u128 {
    if to <= from {
        return 0;
    }
    let elapsed = U256::from(to - from);
    mul_div(U256::from_u128(rate), elapsed, U256::from(SECONDS_PER_YEAR))
        .map(|v| v.saturating_to_u128())
        .unwrap_or(u128::MAX)
}

/// Accrued compounded interest between `from` and `to` for an annual ray rate.
///
/// Uses the three-term binomial expansion of `(1 + r/YEAR)^Δt − 1`, which
/// slightly underestimates the exact value, matching how lending pools
/// roll their borrow index. Returns 0 when `to <= from`.
pub fn compounded_interest(rate: u128, from: u64, to: u64) -> u128 {
    if to <= from {
        return 0;
    }
    let exp = (to - from) as u128;
    let exp_minus_one = exp - 1;
    let exp_minus_two = exp.saturating_sub(2);

    let rate_per_second = rate / SECONDS_PER_YEAR as u128;
    let base_pow_two = ray_mul(rate_per_second, rate_per_second);
    let base_pow_three = ray_mul(base_pow_two, rate_per_second);

    let first = U256::from_u128(rate_per_second) * U256::from_u128(exp);
    let second = U256::from_u128(exp)
        * U256::from_u128(exp_minus_one)
        * U256::from_u128(base_pow_two)
        / U256::from(2u64);
    let third = U256::from_u128(exp)
        * U256::from_u128(exp_minus_one)
        * U256::from_u128(exp_minus_two)
        * U256::from_u128(base_pow_three)
        / U256::from(6u64);

    first
        .checked_add(second)
        .and_then(|v| v.checked_add(third))
        .map(|v| v.saturating_to_u128())
        .unwrap_or(u128::MAX)
}

/// Roll an index forward by an accrued interest term: `index × (RAY + interest) / RAY`.
pub fn roll_index(index: u128, interest: u128) -> u128 {
    ray_mul(index, RAY.saturating_add(interest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_mul_identity() {
        assert_eq!(ray_mul(123_456_789, RAY), 123_456_789);
    }

    #[test]
    fn test_ray_mul_truncates() {
        // 3 * 0.5 = 1.5 → 1
        assert_eq!(ray_mul(3, RAY / 2), 1);
    }

    #[test]
    fn test_ray_mul_large_operands() {
        // 1e27 tokens scaled by an index of 1.1 does not overflow.
        let index = RAY + RAY / 10;
        assert_eq!(ray_mul(RAY, index), index);
    }

    #[test]
    fn test_ray_div_inverse_of_mul() {
        let index = RAY + RAY / 4;
        let scaled = ray_div(1_000_000, index);
        assert_eq!(scaled, 800_000);
        assert_eq!(ray_mul(scaled, index), 1_000_000);
    }

    #[test]
    fn test_ray_div_zero_divisor() {
        assert_eq!(ray_div(5, 0), 0);
    }

    #[test]
    fn test_linear_interest_one_year() {
        let rate = RAY / 10; // 10% APR
        assert_eq!(linear_interest(rate, 0, SECONDS_PER_YEAR), RAY / 10);
    }

    #[test]
    fn test_interest_zero_when_not_elapsed() {
        assert_eq!(linear_interest(RAY, 100, 100), 0);
        assert_eq!(linear_interest(RAY, 200, 100), 0);
        assert_eq!(compounded_interest(RAY, 100, 100), 0);
        assert_eq!(compounded_interest(RAY, 200, 100), 0);
    }

    #[test]
    fn test_compounded_exceeds_linear() {
        let rate = RAY / 5; // 20% APR
        let linear = linear_interest(rate, 0, SECONDS_PER_YEAR);
        let compounded = compounded_interest(rate, 0, SECONDS_PER_YEAR);
        assert!(compounded > linear);
        // e^0.2 - 1 ≈ 0.2214; the three-term expansion stays just below it.
        assert!(compounded < RAY / 100 * 23);
    }

    #[test]
    fn test_compounded_single_second_is_linear() {
        let rate = RAY / 5;
        assert_eq!(
            compounded_interest(rate, 0, 1),
            rate / SECONDS_PER_YEAR as u128
        );
    }

    #[test]
    fn test_roll_index() {
        let rolled = roll_index(RAY, RAY / 10);
        assert_eq!(rolled, RAY + RAY / 10);
        assert_eq!(roll_index(RAY, 0), RAY);
    }
}
