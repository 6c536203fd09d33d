//! Epoch boundary work.

use tally_accrual::{snapshot_reserves, snapshot_reserves_at_start, AccrualContext};
use tally_db::Store;
use tally_epoch::{advance, EpochHooks, HookError, Transition};
use tally_leaderboard::RankContext;
use tally_types::epoch::{Epoch, LeaderboardConfig};
use tracing::info;

use crate::context::{EventContext, Services};
use crate::globals::Globals;
use crate::ledger::credit_lp_accruals;
use crate::Result;

/// [`EpochHooks`] that freeze reserve indices and flush open LP positions
/// at each boundary.
pub struct EngineHooks<'a> {
    pub svc: Services<'a>,
    pub config: &'a LeaderboardConfig,
}

impl EpochHooks for EngineHooks<'_> {
    fn on_epoch_closed(
        &mut self,
        store: &mut dyn Store,
        epoch: &Epoch,
    ) -> std::result::Result<(), HookError> {
        let reserves = snapshot_reserves(store, epoch)?;

        let ctx = AccrualContext {
            config: self.config,
            epoch: None,
            current_epoch_number: epoch.epoch_number,
            defaults: self.svc.defaults,
        };
        let accruals = self.svc.lp.settle_all_open(store, &ctx, epoch.end_time)?;
        let rank = RankContext {
            current_epoch: epoch.epoch_number,
            top_k: self.config.top_k,
            timestamp: epoch.end_time,
        };
        let users = credit_lp_accruals(store, &self.svc, self.config, &rank, accruals)?;
        info!(
            epoch = epoch.epoch_number,
            reserves,
            lp_users = users,
            "epoch boundary flushed"
        );
        Ok(())
    }

    fn on_epoch_started(
        &mut self,
        store: &mut dyn Store,
        epoch: &Epoch,
    ) -> std::result::Result<(), HookError> {
        snapshot_reserves_at_start(store, epoch)?;
        Ok(())
    }
}

/// Run every due epoch transition with the engine hooks, then refresh the
/// active epoch in `globals`.
pub fn advance_epochs(
    store: &mut dyn Store,
    svc: &Services<'_>,
    globals: &mut Globals,
    ev: &EventContext,
) -> Result<Vec<Transition>> {
    let mut hooks = EngineHooks {
        svc: *svc,
        config: &globals.config,
    };
    let transitions = advance(
        store,
        &mut globals.state,
        ev.timestamp,
        ev.block_number,
        &mut hooks,
    )?;
    if !transitions.is_empty() {
        globals.refresh_epoch(store)?;
    }
    Ok(transitions)
}
