//! Integration test: lending reserve accrual through the engine.
//!
//! Exercises the full settle-then-apply path of balance events:
//! 1. Start epoch 1 and register a $1 reserve
//! 2. Supply for one user and borrow for another
//! 3. One day later, settle both through withdraw and repay events
//! 4. Verify deposit, borrow and daily bonus points per USD-day
//! 5. Verify settling twice at the same timestamp changes nothing
//! 6. Verify re-delivered events are skipped
//! 7. Run the same stream against SQLite and compare the ledgers
//! 8. Enter between epochs and verify only the next epoch accrues

use tally_db::{MemoryStore, SqliteStore, Store, StoreExt};
use tally_engine::{Engine, EngineFlags, ProcessOutcome};
use tally_integration_tests::{address, process_all, tokens, EventFeed, DAY, T0};
use tally_oracle::{PriceDefault, PriceDefaults};
use tally_types::events::{ChainEvent, EventKind};
use tally_types::user::{UserEpochStats, UserPoints};
use tally_types::{user_epoch_id, USD_SCALE};

const ALICE: u64 = 0xa1;
const BOB: u64 = 0xb2;
const RESERVE: u64 = 0x5e;
const ASSET: u64 = 0xa55e7;

fn engine_over<S: Store>(store: S) -> Engine<S> {
    let defaults = PriceDefaults::from_entries([PriceDefault {
        asset: address(ASSET),
        price_usd: USD_SCALE,
        decimals: 18,
    }]);
    Engine::new(store, EngineFlags::default()).with_price_defaults(defaults)
}

fn balance_event(kind: &str, user: u64, amount: u128) -> EventKind {
    let (reserve, user) = (address(RESERVE), address(user));
    match kind {
        "supply" => EventKind::Supply {
            reserve,
            user,
            amount,
        },
        "withdraw" => EventKind::Withdraw {
            reserve,
            user,
            amount,
        },
        "borrow" => EventKind::Borrow {
            reserve,
            user,
            amount,
        },
        _ => EventKind::Repay {
            reserve,
            user,
            amount,
        },
    }
}

/// The whole scenario. Index 5 repeats index 4's settlement time.
fn stream() -> Vec<ChainEvent> {
    let mut feed = EventFeed::new();
    let later = T0 + 10 + DAY;
    vec![
        feed.genesis(),
        feed.at(
            T0 + 1,
            EventKind::ReserveInitialized {
                reserve: address(RESERVE),
                asset: address(ASSET),
                decimals: 18,
            },
        ),
        feed.at(T0 + 10, balance_event("supply", ALICE, tokens(1_000))),
        feed.at(T0 + 10, balance_event("borrow", BOB, tokens(100))),
        feed.at(later, balance_event("withdraw", ALICE, tokens(1))),
        feed.at(later, balance_event("withdraw", ALICE, tokens(1))),
        feed.at(later, balance_event("repay", BOB, tokens(100))),
    ]
}

fn stats<S: Store>(engine: &Engine<S>, user: u64) -> UserEpochStats {
    engine
        .store()
        .get::<UserEpochStats>(&user_epoch_id(&address(user), 1))
        .expect("get")
        .expect("stats")
}

fn deposit_points_in<S: Store>(engine: &Engine<S>, user: u64, epoch: u64) -> u128 {
    engine
        .store()
        .get::<UserEpochStats>(&user_epoch_id(&address(user), epoch))
        .expect("get")
        .map(|stats| stats.deposit_points)
        .unwrap_or(0)
}

#[test]
fn test_deposit_and_borrow_accrue_per_usd_day() {
    let mut engine = engine_over(MemoryStore::new());
    process_all(&mut engine, &stream()).expect("process");

    let alice = stats(&engine, ALICE);
    assert_eq!(alice.deposit_points, tokens(1_000));
    assert_eq!(alice.deposit_points_with_multiplier, tokens(1_000));
    assert_eq!(alice.daily_supply_points, tokens(10));
    assert_eq!(alice.borrow_points, 0);
    assert_eq!(alice.total_points, tokens(1_010));

    let bob = stats(&engine, BOB);
    assert_eq!(bob.borrow_points, tokens(150));
    assert_eq!(bob.daily_borrow_points, tokens(10));
    assert_eq!(bob.daily_repay_points, tokens(5));
    assert_eq!(bob.deposit_points, 0);
    assert_eq!(bob.total_points_with_multiplier, tokens(165));

    let lifetime = engine
        .store()
        .get::<UserPoints>(&address(ALICE))
        .expect("get")
        .expect("lifetime");
    assert_eq!(lifetime.lifetime_points_with_multiplier, tokens(1_010));
}

#[test]
fn test_settling_twice_at_same_time_is_stable() {
    let events = stream();
    let mut engine = engine_over(MemoryStore::new());
    process_all(&mut engine, &events[..5]).expect("process");
    let first = stats(&engine, ALICE);

    engine.process(&events[5]).expect("process");
    assert_eq!(stats(&engine, ALICE), first);
}

#[test]
fn test_redelivered_stream_is_skipped() {
    let events = stream();
    let mut engine = engine_over(MemoryStore::new());
    process_all(&mut engine, &events).expect("process");
    let alice = stats(&engine, ALICE);
    let bob = stats(&engine, BOB);
    let markers = engine.store().count("processed_event");
    assert_eq!(markers, events.len());

    let replay = process_all(&mut engine, &events).expect("replay");
    assert!(replay.iter().all(|o| *o == ProcessOutcome::Duplicate));
    assert_eq!(stats(&engine, ALICE), alice);
    assert_eq!(stats(&engine, BOB), bob);
    assert_eq!(engine.store().count("processed_event"), markers);
}

#[test]
fn test_sqlite_ledger_matches_memory() {
    let events = stream();
    let mut memory = engine_over(MemoryStore::new());
    process_all(&mut memory, &events).expect("memory");

    let mut sqlite = engine_over(SqliteStore::open_memory().expect("open"));
    process_all(&mut sqlite, &events).expect("sqlite");

    for user in [ALICE, BOB] {
        assert_eq!(stats(&sqlite, user), stats(&memory, user));
    }
    assert_eq!(
        sqlite
            .store()
            .list_ids("processed_event")
            .expect("list")
            .len(),
        events.len()
    );
}

#[test]
fn test_supply_between_epochs_accrues_from_next_start() {
    let mut feed = EventFeed::new();
    let close = T0 + 10 * DAY;
    let reopen = T0 + 13 * DAY;
    let events = [
        feed.genesis(),
        feed.at(
            T0 + 1,
            EventKind::ReserveInitialized {
                reserve: address(RESERVE),
                asset: address(ASSET),
                decimals: 18,
            },
        ),
        feed.at(
            T0 + 2,
            EventKind::EpochEndScheduled {
                epoch_number: 1,
                end_time: close,
            },
        ),
        feed.at(
            T0 + 3,
            EventKind::EpochStartScheduled {
                epoch_number: 2,
                start_time: reopen,
            },
        ),
        // Epoch 1 closes on this event; the supply lands in the gap.
        feed.at(close + DAY, balance_event("supply", ALICE, tokens(1_000))),
        feed.at(close + 2 * DAY, balance_event("withdraw", ALICE, tokens(1))),
        feed.at(reopen + DAY, balance_event("withdraw", ALICE, tokens(1))),
    ];
    let mut engine = engine_over(MemoryStore::new());
    process_all(&mut engine, &events[..6]).expect("close and gap");
    assert_eq!(deposit_points_in(&engine, ALICE, 1), 0);

    process_all(&mut engine, &events[6..]).expect("reopen");
    assert_eq!(deposit_points_in(&engine, ALICE, 1), 0);
    assert_eq!(deposit_points_in(&engine, ALICE, 2), tokens(999));
}
