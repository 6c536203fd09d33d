//! The event-processing front door.

use tally_accrual::{LpSettlement, PoolLpSettlement};
use tally_db::{Store, StoreExt};
use tally_epoch::Transition;
use tally_leaderboard::{LeaderboardUpdater, TopKLeaderboard};
use tally_oracle::PriceDefaults;
use tally_types::epoch::LeaderboardConfig;
use tally_types::events::{ChainEvent, ProcessedEvent};
use tracing::{debug, error};

use crate::bootstrap::bootstrap_defaults;
use crate::chain::{ChainReader, DisabledChainReader};
use crate::context::{EventContext, Services};
use crate::flags::EngineFlags;
use crate::globals::Globals;
use crate::handlers::dispatch;
use crate::hooks::advance_epochs;
use crate::Result;

/// What [`Engine::process`] did with an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Handled and committed. Lists the epoch transitions it triggered.
    Applied { transitions: Vec<Transition> },
    /// Already processed; nothing written.
    Duplicate,
}

/// Owns the store and the injected capabilities.
pub struct Engine<S: Store> {
    store: S,
    chain: Box<dyn ChainReader>,
    leaderboard: Box<dyn LeaderboardUpdater>,
    lp: Box<dyn LpSettlement>,
    flags: EngineFlags,
    defaults: PriceDefaults,
    seed_config: LeaderboardConfig,
}

impl<S: Store> Engine<S> {
    /// An engine with no chain access, the top-K leaderboard and pool-based
    /// LP settlement.
    pub fn new(store: S, flags: EngineFlags) -> Self {
        Self {
            store,
            chain: Box::new(DisabledChainReader),
            leaderboard: Box::new(TopKLeaderboard),
            lp: Box::new(PoolLpSettlement),
            flags,
            defaults: PriceDefaults::new(),
            seed_config: LeaderboardConfig::default(),
        }
    }

    pub fn with_chain(mut self, chain: Box<dyn ChainReader>) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_leaderboard(mut self, leaderboard: Box<dyn LeaderboardUpdater>) -> Self {
        self.leaderboard = leaderboard;
        self
    }

    pub fn with_lp_settlement(mut self, lp: Box<dyn LpSettlement>) -> Self {
        self.lp = lp;
        self
    }

    /// Static prices for assets without an oracle.
    pub fn with_price_defaults(mut self, defaults: PriceDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// First block that earns points, seeded into the config at bootstrap.
    pub fn with_start_block(mut self, start_block: u64) -> Self {
        self.seed_config.start_block = start_block;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Handle one event atomically.
    ///
    /// Re-delivered events are skipped. On failure every write of the
    /// event is rolled back and the error returned.
    pub fn process(&mut self, event: &ChainEvent) -> Result<ProcessOutcome> {
        let id = event.event_id();
        if self.store.get::<ProcessedEvent>(&id)?.is_some() {
            debug!(event_id = %id, "duplicate event skipped");
            return Ok(ProcessOutcome::Duplicate);
        }

        self.store.begin_batch()?;
        match self.apply(event) {
            Ok(transitions) => {
                self.store.commit_batch()?;
                Ok(ProcessOutcome::Applied { transitions })
            }
            Err(err) => {
                error!(
                    block = event.block_number(),
                    tx = %event.transaction.hash,
                    log_index = event.log_index,
                    event = event.event.name(),
                    error = %err,
                    "event handler failed"
                );
                if let Err(rollback) = self.store.rollback_batch() {
                    error!(error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }

    fn apply(&mut self, event: &ChainEvent) -> Result<Vec<Transition>> {
        let Self {
            store,
            chain,
            leaderboard,
            lp,
            flags,
            defaults,
            seed_config,
        } = self;
        let store: &mut dyn Store = store;
        if !flags.disable_bootstrap {
            bootstrap_defaults(store, seed_config)?;
        }

        let svc = Services {
            chain: flags
                .external_calls_enabled()
                .then_some(&**chain as &dyn ChainReader),
            leaderboard: &**leaderboard,
            lp: &**lp,
            flags,
            defaults,
        };
        let ev = EventContext::from_event(event);

        let mut globals = Globals::load(store)?;
        let mut transitions = advance_epochs(store, &svc, &mut globals, &ev)?;
        dispatch(store, &svc, &mut globals, &ev, &event.event)?;
        // A schedule written by this event may already be due.
        transitions.extend(advance_epochs(store, &svc, &mut globals, &ev)?);
        globals.persist(store)?;

        store.set(&ProcessedEvent {
            id: event.event_id(),
            block_number: ev.block_number,
            processed_at: ev.timestamp,
        })?;
        Ok(transitions)
    }
}
