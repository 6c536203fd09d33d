//! Scenario tests for the Tally points engine.
//!
//! The tests under `tests/` drive [`Engine::process`] with decoded events
//! the way the daemon does, then inspect the persisted records. This
//! library only holds the fixtures they share.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p tally-integration-tests
//! ```

use std::collections::HashMap;

use tally_db::{MemoryStore, Store};
use tally_engine::{ChainLpPosition, ChainReader, Engine, EngineFlags, ProcessOutcome, Slot0};
use tally_types::events::{BlockRef, ChainEvent, EventKind, TransactionRef};

pub const DAY: u64 = 86_400;

/// Start of epoch 1 in every scenario.
pub const T0: u64 = 1_700_000_000;

pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Q64.96 square-root price at tick 0.
pub const SQRT_PRICE_ONE: &str = "79228162514264337593543950336";

/// Address whose low bits are `n`.
pub fn address(n: u64) -> String {
    format!("0x{n:040x}")
}

/// `n` whole 18-decimal tokens.
pub fn tokens(n: u128) -> u128 {
    n * tally_math::POINTS_SCALE
}

/// Wraps event payloads in envelopes with increasing block numbers.
#[derive(Debug)]
pub struct EventFeed {
    next_block: u64,
}

impl EventFeed {
    pub fn new() -> Self {
        Self { next_block: 1 }
    }

    /// One event in its own block and transaction.
    pub fn at(&mut self, timestamp: u64, event: EventKind) -> ChainEvent {
        let number = self.next_block;
        self.next_block += 1;
        ChainEvent {
            block: BlockRef { number, timestamp },
            transaction: TransactionRef {
                hash: format!("0x{number:064x}"),
            },
            log_index: 0,
            src_address: String::new(),
            event,
        }
    }

    /// Schedule epoch 1 to start at [`T0`], delivered at [`T0`].
    pub fn genesis(&mut self) -> ChainEvent {
        self.at(
            T0,
            EventKind::EpochStartScheduled {
                epoch_number: 1,
                start_time: T0,
            },
        )
    }
}

impl Default for EventFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// An engine over an empty in-memory store.
pub fn memory_engine(flags: EngineFlags) -> Engine<MemoryStore> {
    Engine::new(MemoryStore::new(), flags)
}

/// Process `events` in order, stopping at the first failure.
pub fn process_all<S: Store>(
    engine: &mut Engine<S>,
    events: &[ChainEvent],
) -> tally_engine::Result<Vec<ProcessOutcome>> {
    events.iter().map(|event| engine.process(event)).collect()
}

/// A [`ChainReader`] answering from fixed tables. Anything not scripted
/// reads as unavailable.
#[derive(Clone, Debug, Default)]
pub struct ScriptedChain {
    decimals: HashMap<String, u32>,
    nft_balances: HashMap<(String, String), u128>,
    positions: HashMap<String, Vec<ChainLpPosition>>,
    fees: HashMap<String, u32>,
    slot0: HashMap<String, Slot0>,
}

impl ScriptedChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decimals(mut self, token: &str, decimals: u32) -> Self {
        self.decimals.insert(token.to_string(), decimals);
        self
    }

    pub fn with_nft_balance(mut self, collection: &str, owner: &str, balance: u128) -> Self {
        self.nft_balances
            .insert((collection.to_string(), owner.to_string()), balance);
        self
    }

    pub fn with_positions(mut self, owner: &str, positions: Vec<ChainLpPosition>) -> Self {
        self.positions.insert(owner.to_string(), positions);
        self
    }

    /// Fee and current price of `pool`.
    pub fn with_pool(mut self, pool: &str, fee: u32, tick: i32, sqrt_price_x96: &str) -> Self {
        self.fees.insert(pool.to_string(), fee);
        self.slot0.insert(
            pool.to_string(),
            Slot0 {
                tick,
                sqrt_price_x96: sqrt_price_x96.to_string(),
            },
        );
        self
    }
}

impl ChainReader for ScriptedChain {
    fn erc20_decimals(&self, token: &str) -> Option<u32> {
        self.decimals.get(token).copied()
    }

    fn nft_balance_of(&self, collection: &str, owner: &str) -> Option<u128> {
        self.nft_balances
            .get(&(collection.to_string(), owner.to_string()))
            .copied()
    }

    fn lp_positions_of(&self, owner: &str) -> Option<Vec<ChainLpPosition>> {
        self.positions.get(owner).cloned()
    }

    fn pool_fee(&self, pool: &str) -> Option<u32> {
        self.fees.get(pool).copied()
    }

    fn pool_slot0(&self, pool: &str) -> Option<Slot0> {
        self.slot0.get(pool).cloned()
    }
}
