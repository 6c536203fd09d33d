//! # tally-oracle
//!
//! Per-asset USD price cache with a time-integrated price index.
//!
//! Every asset record carries `cumulative_usd_price_hours`, the running
//! integral `Σ price × Δt / 3600`. The USD-time value of holding `b` tokens
//! between two settlements is then `b × (idx₂ − idx₁)` without re-walking
//! price history.
//!
//! ## Modules
//!
//! - [`defaults`] — static seed prices used until a real update arrives
//! - [`index`] — seeding, index updates, per-epoch reset baselines

pub mod defaults;
pub mod index;

pub use defaults::{PriceDefault, PriceDefaults};
pub use index::{
    apply_price_update, ensure_asset_price, index_at, token_value_usd, trusted_reset_baseline,
    update_price_oracle_index, PriceIndexUpdate, RESET_TOLERANCE_SECS,
};

/// Error types for oracle operations.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// Storage failure.
    #[error("storage error: {0}")]
    Db(#[from] tally_db::DbError),

    /// Token decimals too large to scale.
    #[error("unsupported decimals for {asset}: {decimals}")]
    UnsupportedDecimals {
        /// Asset address.
        asset: String,
        /// Declared decimals.
        decimals: u32,
    },
}

/// Convenience result type for oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;
