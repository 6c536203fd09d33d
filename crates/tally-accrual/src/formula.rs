//! Point formulas.
//!
//! ```text
//! reserve: balance × Δidx × rate × 1e18 / (10^decimals × 1e8 × 10000 × 24)
//! lp:      valueUsd × rate × seconds × 1e18 / (1e8 × 10000 × 86400)
//! vp:      avgVp × rate × seconds / (10000 × 86400)
//! ```
//!
//! At 10000 bps each formula pays one point per USD-day (one per
//! token-day for voting power).

use tally_math::{product_div, BPS_DENOMINATOR, POINTS_SCALE};
use tally_types::{SECONDS_PER_DAY, USD_SCALE};

const HOURS_PER_DAY: u128 = 24;

/// Points for holding `balance` base units while the asset's price-hours
/// index advanced by `index_delta`.
pub fn reserve_points(balance: u128, index_delta: u128, rate_bps: u64, decimals: u32) -> u128 {
    let Some(unit) = 10u128.checked_pow(decimals) else {
        return 0;
    };
    product_div(
        &[balance, index_delta, rate_bps as u128, POINTS_SCALE],
        &[unit, USD_SCALE, BPS_DENOMINATOR as u128, HOURS_PER_DAY],
    )
}

/// Points for `seconds` of in-range liquidity worth `value_usd`.
pub fn lp_points(value_usd: u128, rate_bps: u64, seconds: u64) -> u128 {
    product_div(
        &[value_usd, rate_bps as u128, seconds as u128, POINTS_SCALE],
        &[USD_SCALE, BPS_DENOMINATOR as u128, SECONDS_PER_DAY as u128],
    )
}

/// Points for holding `average_vp` voting power over `seconds`.
pub fn vp_points(average_vp: u128, rate_bps: u64, seconds: u64) -> u128 {
    product_div(
        &[average_vp, rate_bps as u128, seconds as u128],
        &[BPS_DENOMINATOR as u128, SECONDS_PER_DAY as u128],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_points_one_usd_day() {
        // 1 token (6 decimals) at $1 for 24 hours.
        let index_delta = 24 * USD_SCALE;
        assert_eq!(reserve_points(1_000_000, index_delta, 10_000, 6), POINTS_SCALE);
    }

    #[test]
    fn test_reserve_points_rate_scales() {
        let index_delta = 24 * USD_SCALE;
        assert_eq!(
            reserve_points(1_000_000, index_delta, 15_000, 6),
            POINTS_SCALE * 3 / 2
        );
    }

    #[test]
    fn test_reserve_points_zero_delta() {
        assert_eq!(reserve_points(1_000_000, 0, 10_000, 6), 0);
    }

    #[test]
    fn test_lp_points_one_usd_day() {
        assert_eq!(lp_points(USD_SCALE, 10_000, SECONDS_PER_DAY), POINTS_SCALE);
        assert_eq!(lp_points(USD_SCALE, 20_000, SECONDS_PER_DAY / 2), POINTS_SCALE);
    }

    #[test]
    fn test_vp_points_one_token_day() {
        assert_eq!(vp_points(POINTS_SCALE, 10_000, SECONDS_PER_DAY), POINTS_SCALE);
    }
}
