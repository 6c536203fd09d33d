//! # tally-math
//!
//! Deterministic fixed-point arithmetic for the points engine.
//!
//! Every division in this crate truncates toward zero. Settled point totals
//! depend on that rounding policy, so nothing here rounds half-up or goes
//! through floating point.
//!
//! ## Modules
//!
//! - [`wide`] — 256/512-bit integers and overflow-free `mul_div`
//! - [`ray`] — ray (1e27) multiplication and interest-index roll-forward
//! - [`bps`] — basis-point arithmetic and points scaling
//! - [`tick`] — concentrated-liquidity tick and token-amount math

pub mod bps;
pub mod ray;
pub mod tick;
pub mod wide;

pub use bps::{apply_bps, format_points, whole_points, BPS_DENOMINATOR, POINTS_SCALE};
pub use ray::{compounded_interest, linear_interest, ray_div, ray_mul, roll_index, RAY};
pub use wide::{mul_div, mul_div_u128, product_div, U256, U512};

/// Error types for fixed-point operations.
#[derive(Debug, thiserror::Error)]
pub enum MathError {
    /// A tick lies outside the supported range.
    #[error("tick {0} out of range")]
    TickOutOfRange(i32),
}

/// Convenience result type for math operations.
pub type Result<T> = std::result::Result<T, MathError>;
