//! Concentrated-liquidity tick math.
//!
//! Converts ticks to Q64.96 square-root prices and derives the token
//! amounts represented by a position's liquidity at the pool's current
//! price. Amounts round down.

use crate::wide::{mul_div, U256};
use crate::{MathError, Result};

/// Lowest tick representable by a Q64.96 square-root price.
pub const MIN_TICK: i32 = -887_272;

/// Highest tick representable by a Q64.96 square-root price.
pub const MAX_TICK: i32 = 887_272;

/// `1.0001^(2^i / 2)` factors in Q128.128, indexed by tick bit.
const TICK_FACTORS: [(u32, u128); 19] = [
    (0x2, 0xfff97272373d413259a46990580e213a),
    (0x4, 0xfff2e50f5f656932ef12357cf3c7fdcc),
    (0x8, 0xffe5caca7e10e4e61c3624eaa0941cd0),
    (0x10, 0xffcb9843d60f6159c9db58835c926644),
    (0x20, 0xff973b41fa98c081472e6896dfb254c0),
    (0x40, 0xff2ea16466c96a3843ec78b326b52861),
    (0x80, 0xfe5dee046a99a2a811c461f1969c3053),
    (0x100, 0xfcbe86c7900a88aedcffc83b479aa3a4),
    (0x200, 0xf987a7253ac413176f2b074cf7815e54),
    (0x400, 0xf3392b0822b70005940c7a398e4b70f3),
    (0x800, 0xe7159475a2c29b7443b29c7fa6e889d9),
    (0x1000, 0xd097f3bdfd2022b8845ad8f792aa5825),
    (0x2000, 0xa9f746462d870fdf8a65dc1f90e061e5),
    (0x4000, 0x70d869a156d2a1b890bb3df62baf32f7),
    (0x8000, 0x31be135f97d08fd981231505542fcfa6),
    (0x10000, 0x9aa508b5b7a84e1c677de54f3e99bc9),
    (0x20000, 0x5d6af8dedb81196699c329225ee604),
    (0x40000, 0x2216e584f5fa1ea926041bedfe98),
    (0x80000, 0x48a170391f7dc42444e8fa2),
];

/// Whether a position with bounds `[lower, upper)` earns at `current`.
pub fn is_in_range(tick_lower: i32, tick_upper: i32, current: i32) -> bool {
    tick_lower <= current && current < tick_upper
}

/// Q64.96 square-root price at a tick.
///
/// # Errors
///
/// - [`MathError::TickOutOfRange`] if `|tick| > MAX_TICK`
pub fn sqrt_ratio_at_tick(tick: i32) -> Result<U256> {
    let abs_tick = tick.unsigned_abs();
    if abs_tick > MAX_TICK.unsigned_abs() {
        return Err(MathError::TickOutOfRange(tick));
    }

    let mut ratio = if abs_tick & 0x1 != 0 {
        U256::from_u128(0xfffcb933bd6fad37aa2d162d1a594001)
    } else {
        U256::one() << 128
    };
    for (bit, factor) in TICK_FACTORS {
        if abs_tick & bit != 0 {
            ratio = (ratio * U256::from_u128(factor)) >> 128;
        }
    }
    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    // Q128.128 → Q64.96, rounding up so the result is never below the true price.
    let low_mask = (U256::one() << 32) - U256::one();
    let round_up = if (ratio & low_mask).is_zero() {
        U256::zero()
    } else {
        U256::one()
    };
    Ok((ratio >> 32) + round_up)
}

/// Token0 amount between two square-root prices for `liquidity`.
fn amount0_delta(sqrt_a: U256, sqrt_b: U256, liquidity: u128) -> u128 {
    if sqrt_a.is_zero() {
        return 0;
    }
    let numerator = U256::from_u128(liquidity) << 96;
    mul_div(numerator, sqrt_b - sqrt_a, sqrt_b)
        .map(|v| (v / sqrt_a).saturating_to_u128())
        .unwrap_or(0)
}

/// Token1 amount between two square-root prices for `liquidity`.
fn amount1_delta(sqrt_a: U256, sqrt_b: U256, liquidity: u128) -> u128 {
    mul_div(
        U256::from_u128(liquidity),
        sqrt_b - sqrt_a,
        U256::one() << 96,
    )
    .map(|v| v.saturating_to_u128())
    .unwrap_or(0)
}

/// Token amounts `(amount0, amount1)` represented by `liquidity` in
/// `[tick_lower, tick_upper)` at the pool's current square-root price.
///
/// # Errors
///
/// - [`MathError::TickOutOfRange`] if either bound is outside the tick range
pub fn amounts_for_liquidity(
    sqrt_price_x96: U256,
    tick_lower: i32,
    tick_upper: i32,
    liquidity: u128,
) -> Result<(u128, u128)> {
    let mut sqrt_a = sqrt_ratio_at_tick(tick_lower)?;
    let mut sqrt_b = sqrt_ratio_at_tick(tick_upper)?;
    if sqrt_a > sqrt_b {
        std::mem::swap(&mut sqrt_a, &mut sqrt_b);
    }

    let amounts = if sqrt_price_x96 <= sqrt_a {
        (amount0_delta(sqrt_a, sqrt_b, liquidity), 0)
    } else if sqrt_price_x96 < sqrt_b {
        (
            amount0_delta(sqrt_price_x96, sqrt_b, liquidity),
            amount1_delta(sqrt_a, sqrt_price_x96, liquidity),
        )
    } else {
        (0, amount1_delta(sqrt_a, sqrt_b, liquidity))
    };
    Ok(amounts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqrt_ratio_at_zero_is_one() {
        let ratio = sqrt_ratio_at_tick(0).expect("tick 0");
        assert_eq!(ratio, U256::one() << 96);
    }

    #[test]
    fn test_sqrt_ratio_bounds() {
        let min = sqrt_ratio_at_tick(MIN_TICK).expect("min tick");
        assert_eq!(min, U256::from(4_295_128_739u64));

        let max = sqrt_ratio_at_tick(MAX_TICK).expect("max tick");
        let expected = U256::from_dec_str("1461446703485210103287273052203988822378723970342")
            .expect("parse");
        assert_eq!(max, expected);
    }

    #[test]
    fn test_sqrt_ratio_out_of_range() {
        assert!(matches!(
            sqrt_ratio_at_tick(MAX_TICK + 1),
            Err(MathError::TickOutOfRange(_))
        ));
    }

    #[test]
    fn test_sqrt_ratio_monotonic() {
        let a = sqrt_ratio_at_tick(-60).expect("a");
        let b = sqrt_ratio_at_tick(0).expect("b");
        let c = sqrt_ratio_at_tick(60).expect("c");
        assert!(a < b && b < c);
    }

    #[test]
    fn test_amounts_in_range_holds_both_tokens() {
        let price = sqrt_ratio_at_tick(0).expect("price");
        let (amount0, amount1) =
            amounts_for_liquidity(price, -600, 600, 1_000_000_000_000_000_000).expect("amounts");
        assert!(amount0 > 0);
        assert!(amount1 > 0);
        // Symmetric range around price 1.0 holds nearly equal amounts.
        let diff = amount0.abs_diff(amount1);
        assert!(diff * 100 < amount0);
    }

    #[test]
    fn test_amounts_below_range_only_token0() {
        let price = sqrt_ratio_at_tick(-1200).expect("price");
        let (amount0, amount1) =
            amounts_for_liquidity(price, -600, 600, 1_000_000_000_000_000_000).expect("amounts");
        assert!(amount0 > 0);
        assert_eq!(amount1, 0);
    }

    #[test]
    fn test_amounts_above_range_only_token1() {
        let price = sqrt_ratio_at_tick(1200).expect("price");
        let (amount0, amount1) =
            amounts_for_liquidity(price, -600, 600, 1_000_000_000_000_000_000).expect("amounts");
        assert_eq!(amount0, 0);
        assert!(amount1 > 0);
    }

    #[test]
    fn test_is_in_range_upper_exclusive() {
        assert!(is_in_range(-10, 10, -10));
        assert!(is_in_range(-10, 10, 9));
        assert!(!is_in_range(-10, 10, 10));
        assert!(!is_in_range(-10, 10, -11));
    }
}
