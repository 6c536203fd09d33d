//! # tally-epoch
//!
//! Epoch lifecycle: admin schedules, and the transition state machine
//! evaluated on every event.
//!
//! ```text
//! NONE (0) → ACTIVE(1) → ENDED(1) → ACTIVE(2) → …
//! ```
//!
//! Observed start/end fields are write-once. Replays of the same schedule,
//! or schedules that arrive out of order, never move an epoch boundary that
//! has already been recorded.
//!
//! ## Modules
//!
//! - [`lifecycle`] — bounded catch-up of due transitions
//! - [`schedule`] — admin-set scheduled start/end times

pub mod lifecycle;
pub mod schedule;

pub use lifecycle::{
    active_epoch, advance, EpochHooks, HookError, NoopHooks, Transition,
    MAX_TRANSITIONS_PER_CALL,
};
pub use schedule::{schedule_epoch_end, schedule_epoch_start};

/// Error types for epoch operations.
#[derive(Debug, thiserror::Error)]
pub enum EpochError {
    /// Storage failure.
    #[error("storage error: {0}")]
    Db(#[from] tally_db::DbError),

    /// Global state points at an epoch record that does not exist.
    #[error("epoch {0} is marked current but has no record")]
    MissingCurrent(u64),

    /// An epoch-close hook failed.
    #[error("epoch {epoch} close hook failed: {source}")]
    Hook {
        /// Epoch being closed.
        epoch: u64,
        /// Hook failure.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Convenience result type for epoch operations.
pub type Result<T> = std::result::Result<T, EpochError>;
