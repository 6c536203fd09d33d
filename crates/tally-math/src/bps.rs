//! Basis-point arithmetic and points scaling.

use crate::wide::{mul_div, U256};

/// 10000 bps = 1.0×.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Points are stored as integers scaled by 1e18.
pub const POINTS_SCALE: u128 = 1_000_000_000_000_000_000;

/// `value × bps / 10000`, truncating.
pub fn apply_bps(value: u128, bps: u64) -> u128 {
    mul_div(
        U256::from_u128(value),
        U256::from(bps),
        U256::from(BPS_DENOMINATOR),
    )
    .map(|v| v.saturating_to_u128())
    .unwrap_or(u128::MAX)
}

/// Whole points of a scaled value (fraction truncated).
pub fn whole_points(scaled: u128) -> u128 {
    scaled / POINTS_SCALE
}

/// Render a scaled point value as a decimal string with six fractional digits.
///
/// Used only for logs; ledgers never leave integer form.
pub fn format_points(scaled: u128) -> String {
    let whole = scaled / POINTS_SCALE;
    let frac = (scaled % POINTS_SCALE) / 1_000_000_000_000;
    format!("{whole}.{frac:06}")
}
