//! # tally-vp
//!
//! Voting power of time-locked positions and the tier table that maps
//! voting power to a multiplier.
//!
//! ## Modules
//!
//! - [`power`] — instantaneous and time-averaged voting power
//! - [`tiers`] — tier table scan, defaults and persistence

pub mod power;
pub mod tiers;

pub use power::{
    calculate_average_token_voting_power, calculate_voting_power, user_average_voting_power,
    user_voting_power,
};
pub use tiers::{
    calculate_vp_multiplier, default_tiers, find_vp_tier_index, load_tiers, MAX_VP_MULTIPLIER_BPS,
};

/// Error types for voting-power operations.
#[derive(Debug, thiserror::Error)]
pub enum VpError {
    /// Storage failure.
    #[error("storage error: {0}")]
    Db(#[from] tally_db::DbError),
}

/// Convenience result type for voting-power operations.
pub type Result<T> = std::result::Result<T, VpError>;
