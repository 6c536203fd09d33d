//! # tally-accrual
//!
//! Time-weighted USD integration of user positions into raw point deltas.
//!
//! Accrual functions never touch per-epoch stats. They advance their own
//! per-position markers and return [`EpochAccrual`] deltas; the caller
//! applies the multiplier and credits the epoch named in each delta. A
//! settlement repeated at the same timestamp yields no deltas.
//!
//! ## Modules
//!
//! - [`formula`] — the point formulas
//! - [`reserve`] — lending reserve indices, scaled balances and settlement
//! - [`lp`] — concentrated-liquidity position valuation and settlement

pub mod formula;
pub mod lp;
pub mod reserve;

pub use lp::{
    apply_position_update, init_pool, transfer_position, LpAccrual, LpSettlement,
    PoolLpSettlement, PoolParams, PositionParams, PositionUpdate,
};
pub use reserve::{
    apply_balance_change, init_reserve, normalized_debt, normalized_income, settle_reserve,
    snapshot_reserves, snapshot_reserves_at_start, update_reserve_data, BalanceChange,
    ReserveSettlement,
};

use tally_oracle::PriceDefaults;
use tally_types::epoch::{Epoch, LeaderboardConfig};
use tally_types::user::PointCategory;

/// Error types for accrual operations.
#[derive(Debug, thiserror::Error)]
pub enum AccrualError {
    /// Storage failure.
    #[error("storage error: {0}")]
    Db(#[from] tally_db::DbError),

    /// Price lookup failure.
    #[error("oracle error: {0}")]
    Oracle(#[from] tally_oracle::OracleError),

    /// Tick math failure.
    #[error("math error: {0}")]
    Math(#[from] tally_math::MathError),

    /// A pool's square-root price is not a decimal integer.
    #[error("malformed sqrt price for pool {pool}: {value}")]
    MalformedSqrtPrice {
        /// Pool address.
        pool: String,
        /// Raw value.
        value: String,
    },
}

/// Convenience result type for accrual operations.
pub type Result<T> = std::result::Result<T, AccrualError>;

/// Read-only inputs shared by every accrual call of one event.
#[derive(Clone, Copy, Debug)]
pub struct AccrualContext<'a> {
    /// Admin rates.
    pub config: &'a LeaderboardConfig,
    /// The active epoch, if any.
    pub epoch: Option<&'a Epoch>,
    /// Latest epoch number, active or not. 0 before genesis.
    pub current_epoch_number: u64,
    /// Seed prices for assets with no oracle update yet.
    pub defaults: &'a PriceDefaults,
}

/// A raw point delta owed to one epoch's stats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EpochAccrual {
    pub epoch_number: u64,
    pub category: PointCategory,
    /// Scaled by 1e18, before multiplier.
    pub raw: u128,
    /// Accrual interval, used to average the multiplier.
    pub from: u64,
    pub to: u64,
}
