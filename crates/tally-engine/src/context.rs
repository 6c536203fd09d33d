//! Injected capabilities and event coordinates shared by every handler.

use tally_accrual::LpSettlement;
use tally_leaderboard::LeaderboardUpdater;
use tally_multiplier::SnapshotContext;
use tally_oracle::PriceDefaults;
use tally_types::events::ChainEvent;

use crate::chain::ChainReader;
use crate::flags::EngineFlags;

/// Capabilities wired at startup.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    /// `None` when chain reads are disabled.
    pub chain: Option<&'a dyn ChainReader>,
    pub leaderboard: &'a dyn LeaderboardUpdater,
    pub lp: &'a dyn LpSettlement,
    pub flags: &'a EngineFlags,
    pub defaults: &'a PriceDefaults,
}

/// Where in the chain the current event sits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub timestamp: u64,
    pub block_number: u64,
    pub tx_hash: String,
    pub log_index: u32,
}

impl EventContext {
    pub fn from_event(event: &ChainEvent) -> Self {
        Self {
            timestamp: event.timestamp(),
            block_number: event.block_number(),
            tx_hash: event.transaction.hash.clone(),
            log_index: event.log_index,
        }
    }

    /// Coordinates stamped on multiplier snapshots.
    pub fn snapshot(&self) -> SnapshotContext {
        self.snapshot_at(self.timestamp)
    }

    /// Snapshot coordinates at a different time, used by boundary flushes.
    pub fn snapshot_at(&self, timestamp: u64) -> SnapshotContext {
        SnapshotContext {
            timestamp,
            tx_hash: self.tx_hash.clone(),
            log_index: self.log_index,
        }
    }
}
