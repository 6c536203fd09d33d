//! # tally-multiplier
//!
//! NFT and voting-power multipliers and their capped product.
//!
//! ```text
//! nft      = min(10000 + Σ bonus_i, 50000)
//! combined = min(nft × vp / 10000, 100000)
//! ```
//!
//! ## Modules
//!
//! - [`nft`] — geometric-decay and static-boost NFT multiplier
//! - [`combined`] — the combined multiplier, scaling primitive and snapshots
//! - [`history`] — bounded change history and interval averages

pub mod combined;
pub mod history;
pub mod nft;

pub use combined::{
    apply_combined_multiplier_scaled, combined_multiplier, refresh_combined_multiplier,
    PriorFactors, SnapshotContext, MAX_COMBINED_MULTIPLIER_BPS,
};
pub use history::{average_combined_multiplier, record_multiplier_change};
pub use nft::{
    calculate_nft_multiplier_from_count, held_partnerships, load_nft_config,
    nft_multiplier_for_user, MAX_NFT_MULTIPLIER_BPS,
};

/// Error types for multiplier operations.
#[derive(Debug, thiserror::Error)]
pub enum MultiplierError {
    /// Storage failure.
    #[error("storage error: {0}")]
    Db(#[from] tally_db::DbError),
}

/// Convenience result type for multiplier operations.
pub type Result<T> = std::result::Result<T, MultiplierError>;
