//! Per-event global state.
//!
//! [`Globals`] is loaded once at the start of an event, threaded through
//! every handler by reference, and written back at the end only if its
//! version counters moved.

use tally_accrual::AccrualContext;
use tally_db::{Store, StoreExt};
use tally_epoch::active_epoch;
use tally_leaderboard::RankContext;
use tally_oracle::PriceDefaults;
use tally_types::epoch::{
    Epoch, LeaderboardConfig, LeaderboardState, LEADERBOARD_CONFIG_ID, LEADERBOARD_STATE_ID,
};
use tracing::debug;

use crate::Result;

/// Leaderboard state, admin config and the active epoch of one event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Globals {
    pub state: LeaderboardState,
    pub config: LeaderboardConfig,
    /// Active epoch record, if any. Refreshed after every transition.
    pub active_epoch: Option<Epoch>,
    loaded_state_version: u64,
    loaded_config_version: u64,
}

impl Globals {
    /// Load from the store. Missing records default.
    pub fn load(store: &dyn Store) -> Result<Self> {
        let state = store
            .get::<LeaderboardState>(LEADERBOARD_STATE_ID)?
            .unwrap_or_default();
        let config = store
            .get::<LeaderboardConfig>(LEADERBOARD_CONFIG_ID)?
            .unwrap_or_default();
        let active_epoch = active_epoch(store, &state)?;
        Ok(Self {
            loaded_state_version: state.version,
            loaded_config_version: config.version,
            state,
            config,
            active_epoch,
        })
    }

    /// Reload the active epoch after a transition.
    pub fn refresh_epoch(&mut self, store: &dyn Store) -> Result<()> {
        self.active_epoch = active_epoch(store, &self.state)?;
        Ok(())
    }

    /// The active epoch, if it has started.
    pub fn started_epoch(&self) -> Option<&Epoch> {
        self.active_epoch.as_ref().filter(|e| e.start_time > 0)
    }

    pub fn current_epoch_number(&self) -> u64 {
        self.state.current_epoch_number
    }

    pub fn accrual_context<'a>(&'a self, defaults: &'a PriceDefaults) -> AccrualContext<'a> {
        AccrualContext {
            config: &self.config,
            epoch: self.started_epoch(),
            current_epoch_number: self.state.current_epoch_number,
            defaults,
        }
    }

    pub fn rank_context(&self, timestamp: u64) -> RankContext {
        RankContext {
            current_epoch: self.state.current_epoch_number,
            top_k: self.config.top_k,
            timestamp,
        }
    }

    /// Write back whichever records changed. Returns whether anything was
    /// written.
    pub fn persist(&mut self, store: &mut dyn Store) -> Result<bool> {
        let mut wrote = false;
        if self.state.version != self.loaded_state_version {
            store.set(&self.state)?;
            self.loaded_state_version = self.state.version;
            wrote = true;
        }
        if self.config.version != self.loaded_config_version {
            store.set(&self.config)?;
            self.loaded_config_version = self.config.version;
            wrote = true;
        }
        if wrote {
            debug!(
                state_version = self.state.version,
                config_version = self.config.version,
                "globals persisted"
            );
        }
        Ok(wrote)
    }
}
