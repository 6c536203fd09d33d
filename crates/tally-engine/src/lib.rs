//! # tally-engine
//!
//! Settlement orchestration and event handling for the points ledger.
//!
//! [`Engine::process`] takes one decoded chain event through a fixed
//! pipeline inside a single store batch:
//!
//! 1. skip it if its `"{txHash}:{logIndex}"` marker exists
//! 2. seed defaults on first use
//! 3. load [`Globals`] and run every due epoch transition
//! 4. dispatch to the event's handler, which settles each affected user
//!    before changing balances, holdings or config
//! 5. run transitions made due by the event, persist changed globals and
//!    write the marker
//!
//! The leaderboard, LP settlement and chain reads are injected as trait
//! objects ([`tally_leaderboard::LeaderboardUpdater`],
//! [`tally_accrual::LpSettlement`], [`ChainReader`]).
//!
//! ## Modules
//!
//! - [`bootstrap`] — default config, tiers and NFT config
//! - [`chain`] — best-effort contract reads
//! - [`context`] — injected services and event coordinates
//! - [`engine`] — the batch-per-event front door
//! - [`flags`] — environment feature flags
//! - [`globals`] — per-event global state with version counters
//! - [`handlers`] — one module per event family
//! - [`hooks`] — epoch boundary work
//! - [`ledger`] — per-epoch stats writes and leaderboard pushes
//! - [`settle`] — the per-user settlement orchestrator

pub mod bootstrap;
pub mod chain;
pub mod context;
pub mod engine;
pub mod flags;
pub mod globals;
pub mod handlers;
pub mod hooks;
pub mod ledger;
pub mod settle;

pub use chain::{ChainLpPosition, ChainReader, DisabledChainReader, Slot0};
pub use context::{EventContext, Services};
pub use engine::{Engine, ProcessOutcome};
pub use flags::EngineFlags;
pub use globals::Globals;
pub use settle::{settle_points_for_user, DailyBonus, SettleOptions};

/// Error types for event processing.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Storage failure.
    #[error("storage error: {0}")]
    Db(#[from] tally_db::DbError),

    /// Malformed event field.
    #[error("invalid event data: {0}")]
    Types(#[from] tally_types::TypesError),

    /// Price cache failure.
    #[error("oracle error: {0}")]
    Oracle(#[from] tally_oracle::OracleError),

    /// Voting power failure.
    #[error("voting power error: {0}")]
    Vp(#[from] tally_vp::VpError),

    /// Multiplier failure.
    #[error("multiplier error: {0}")]
    Multiplier(#[from] tally_multiplier::MultiplierError),

    /// Epoch transition failure.
    #[error("epoch error: {0}")]
    Epoch(#[from] tally_epoch::EpochError),

    /// Accrual failure.
    #[error("accrual error: {0}")]
    Accrual(#[from] tally_accrual::AccrualError),

    /// Ranking failure.
    #[error("leaderboard error: {0}")]
    Leaderboard(#[from] tally_leaderboard::LeaderboardError),
}

/// Convenience result type for event processing.
pub type Result<T> = std::result::Result<T, EngineError>;
