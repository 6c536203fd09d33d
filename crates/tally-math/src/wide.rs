//! Wide unsigned integers.
//!
//! Point formulas multiply four or five quantities that each approach 1e18
//! to 1e27, so intermediates are carried in 256 bits (and 512 bits for the
//! liquidity math) before truncating back to `u128`.

// Allow clippy warnings from the uint crate's construct_uint macro
#![allow(clippy::manual_div_ceil)]
#![allow(clippy::assign_op_pattern)]

use uint::construct_uint;

construct_uint! {
    /// 256-bit unsigned integer.
    pub struct U256(4);
}

construct_uint! {
    /// 512-bit unsigned integer, used only as a `mul_div` intermediate.
    pub struct U512(8);
}

impl U256 {
    /// Create a U256 from a u128 value.
    #[inline]
    pub const fn from_u128(value: u128) -> Self {
        U256([value as u64, (value >> 64) as u64, 0, 0])
    }

    /// Convert to u128, returning None if the value doesn't fit.
    #[inline]
    pub fn to_u128(&self) -> Option<u128> {
        if self.0[2] == 0 && self.0[3] == 0 {
            Some((self.0[1] as u128) << 64 | self.0[0] as u128)
        } else {
            None
        }
    }

    /// Convert to u128, clamping at `u128::MAX`.
    #[inline]
    pub fn saturating_to_u128(&self) -> u128 {
        self.to_u128().unwrap_or(u128::MAX)
    }

    /// Widen to 512 bits.
    #[inline]
    pub fn widen(&self) -> U512 {
        U512([self.0[0], self.0[1], self.0[2], self.0[3], 0, 0, 0, 0])
    }
}

impl U512 {
    /// Narrow to 256 bits, returning None if the high limbs are set.
    #[inline]
    pub fn narrow(&self) -> Option<U256> {
        if self.0[4..].iter().all(|limb| *limb == 0) {
            Some(U256([self.0[0], self.0[1], self.0[2], self.0[3]]))
        } else {
            None
        }
    }
}

/// Compute `a * b / denominator` with a 512-bit intermediate, truncating.
///
/// Returns `None` if the denominator is zero or the quotient exceeds 256 bits.
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Option<U256> {
    if denominator.is_zero() {
        return None;
    }
    let product = a.widen() * b.widen();
    (product / denominator.widen()).narrow()
}

/// `a * b / denominator` over u128 inputs, clamped to `u128::MAX`.
///
/// A zero denominator yields zero.
pub fn mul_div_u128(a: u128, b: u128, denominator: u128) -> u128 {
    mul_div(U256::from_u128(a), U256::from_u128(b), U256::from_u128(denominator))
        .map(|q| q.saturating_to_u128())
        .unwrap_or(0)
}

/// `Π factors / Π denominators` with a 512-bit intermediate, truncating.
///
/// Saturates at `u128::MAX`. A zero denominator yields zero.
pub fn product_div(factors: &[u128], denominators: &[u128]) -> u128 {
    let mut numerator = U512::one();
    for factor in factors {
        match numerator.checked_mul(U256::from_u128(*factor).widen()) {
            Some(product) => numerator = product,
            None => return u128::MAX,
        }
    }
    let mut denominator = U512::one();
    for divisor in denominators {
        if *divisor == 0 {
            return 0;
        }
        match denominator.checked_mul(U256::from_u128(*divisor).widen()) {
            Some(product) => denominator = product,
            None => return 0,
        }
    }
    (numerator / denominator)
        .narrow()
        .map(|q| q.saturating_to_u128())
        .unwrap_or(u128::MAX)
}
