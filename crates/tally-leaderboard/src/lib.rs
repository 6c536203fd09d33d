//! # tally-leaderboard
//!
//! Ranking maintenance for the points ledger.
//!
//! Each scope (an epoch number, or `"global"` for all-time totals) keeps:
//!
//! - a `UserIndex` row per member with its points and histogram bucket
//! - `ScoreBucket` counts, consistent with `UserIndex` membership
//! - `LeaderboardTotals` with the member count
//! - a `TopK` list of the best `k` members, sorted by points descending and
//!   then user id ascending
//!
//! Blacklisted users are never inserted; blacklisting removes them from
//! every scope they occupy.
//!
//! ## Modules
//!
//! - [`bucket`] — histogram bucket of a score
//! - [`scope`] — per-scope index, bucket and top-K maintenance
//! - [`updater`] — the [`LeaderboardUpdater`] capability used by the engine

pub mod bucket;
pub mod scope;
pub mod updater;

pub use bucket::bucket_for;
pub use scope::{remove_from_scope, update_scope};
pub use updater::{is_blacklisted, LeaderboardUpdater, RankContext, TopKLeaderboard};

/// Error types for leaderboard operations.
#[derive(Debug, thiserror::Error)]
pub enum LeaderboardError {
    /// Storage failure.
    #[error("storage error: {0}")]
    Db(#[from] tally_db::DbError),
}

/// Convenience result type for leaderboard operations.
pub type Result<T> = std::result::Result<T, LeaderboardError>;
