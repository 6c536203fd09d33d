//! Integration test: ranking maintenance driven by manual point events.
//!
//! Exercises the leaderboard through `PointsAwarded`, `PointsRemoved` and
//! the blacklist events:
//! 1. Award points to users in shuffled orders, with deliberate ties
//! 2. Verify both top-K scopes are sorted by points, then address
//! 3. Shrink K and verify the tail is evicted
//! 4. Blacklist a user and verify every ranking record forgets them
//! 5. Un-blacklist and verify re-entry waits for the next settlement
//! 6. Remove more points than awarded and verify the ledger floors at zero

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tally_db::{MemoryStore, StoreExt};
use tally_engine::{Engine, EngineFlags};
use tally_integration_tests::{address, memory_engine, process_all, EventFeed, T0};
use tally_math::POINTS_SCALE;
use tally_types::epoch::ConfigField;
use tally_types::events::{ChainEvent, EventKind};
use tally_types::ranking::{
    epoch_scope, LeaderboardTotals, ScoreBucket, TopK, TopKEntry, UserIndex, EMPTY_BUCKET,
    GLOBAL_SCOPE,
};
use tally_types::user::UserEpochStats;
use tally_types::user_epoch_id;

fn award(feed: &mut EventFeed, timestamp: u64, user: &str, points: u128) -> ChainEvent {
    feed.at(
        timestamp,
        EventKind::PointsAwarded {
            user: user.to_string(),
            amount: points * POINTS_SCALE,
        },
    )
}

fn ranked(engine: &Engine<MemoryStore>, scope: &str) -> Vec<TopKEntry> {
    let Some(top) = engine.store().get::<TopK>(scope).expect("get") else {
        return Vec::new();
    };
    top.entry_ids
        .iter()
        .map(|id| {
            engine
                .store()
                .get::<TopKEntry>(id)
                .expect("get")
                .expect("listed entry exists")
        })
        .collect()
}

fn assert_well_ordered(entries: &[TopKEntry]) {
    for pair in entries.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(
            a.points > b.points || (a.points == b.points && a.user < b.user),
            "{} ({}) ranked above {} ({})",
            a.user,
            a.points,
            b.user,
            b.points
        );
    }
    for (position, entry) in entries.iter().enumerate() {
        assert_eq!(entry.rank as usize, position + 1);
    }
}

fn bucket_members(engine: &Engine<MemoryStore>, scope: &str) -> u64 {
    engine
        .store()
        .list::<ScoreBucket>()
        .expect("list")
        .iter()
        .filter(|bucket| bucket.scope == scope)
        .map(|bucket| bucket.count)
        .sum()
}

fn total_users(engine: &Engine<MemoryStore>, scope: &str) -> u64 {
    engine
        .store()
        .get::<LeaderboardTotals>(scope)
        .expect("get")
        .map(|totals| totals.total_users)
        .unwrap_or(0)
}

/// Twelve users with four distinct totals, awarded in the order given.
fn run_awards(order: &[u64]) -> Engine<MemoryStore> {
    let mut feed = EventFeed::new();
    let mut events = vec![feed.genesis()];
    for (i, n) in order.iter().enumerate() {
        let points = (*n as u128 % 4 + 1) * 10;
        events.push(award(&mut feed, T0 + 1 + i as u64, &address(*n), points));
    }
    let mut engine = memory_engine(EngineFlags::default());
    process_all(&mut engine, &events).expect("process");
    engine
}

#[test]
fn test_top_k_independent_of_arrival_order() {
    let mut order: Vec<u64> = (1..=12).collect();
    let reference = run_awards(&order);
    let expected = ranked(&reference, &epoch_scope(1));
    assert_eq!(expected.len(), 12);
    assert_well_ordered(&expected);
    assert_well_ordered(&ranked(&reference, GLOBAL_SCOPE));

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..5 {
        order.shuffle(&mut rng);
        let engine = run_awards(&order);
        assert_eq!(ranked(&engine, &epoch_scope(1)), expected);
        assert_eq!(
            ranked(&engine, GLOBAL_SCOPE)
                .iter()
                .map(|e| (e.user.clone(), e.points))
                .collect::<Vec<_>>(),
            expected
                .iter()
                .map(|e| (e.user.clone(), e.points))
                .collect::<Vec<_>>()
        );
    }
}

#[test]
fn test_equal_totals_rank_smaller_address_first() {
    let mut feed = EventFeed::new();
    let high = address(0xbb);
    let low = address(0xaa);
    let events = [
        feed.genesis(),
        award(&mut feed, T0 + 1, &high, 50),
        award(&mut feed, T0 + 2, &low, 50),
    ];
    let mut engine = memory_engine(EngineFlags::default());
    process_all(&mut engine, &events).expect("process");

    let entries = ranked(&engine, &epoch_scope(1));
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].user, low);
    assert_eq!(entries[1].user, high);
    assert_eq!(entries[0].points, entries[1].points);
}

#[test]
fn test_shrinking_k_evicts_tail() {
    let mut feed = EventFeed::new();
    let mut events = vec![feed.genesis()];
    for n in 1..=6u64 {
        events.push(award(&mut feed, T0 + n, &address(n), n as u128 * 10));
    }
    events.push(feed.at(
        T0 + 10,
        EventKind::ConfigFieldUpdated {
            field: ConfigField::TopK,
            value: 3,
        },
    ));
    events.push(award(&mut feed, T0 + 11, &address(6), 5));

    let mut engine = memory_engine(EngineFlags::default());
    process_all(&mut engine, &events).expect("process");

    for scope in [epoch_scope(1), GLOBAL_SCOPE.to_string()] {
        let entries = ranked(&engine, &scope);
        let users: Vec<String> = entries.iter().map(|e| e.user.clone()).collect();
        assert_eq!(users, vec![address(6), address(5), address(4)]);
        assert_eq!(entries[0].points, 65 * POINTS_SCALE);
        assert_eq!(total_users(&engine, &scope), 6);
    }
    assert_eq!(engine.store().count("top_k_entry"), 6);
}

#[test]
fn test_blacklist_removal_is_total() {
    let mut feed = EventFeed::new();
    let (alice, bob, carol) = (address(0xa1), address(0xb2), address(0xc3));
    let events = [
        feed.genesis(),
        award(&mut feed, T0 + 1, &alice, 30),
        award(&mut feed, T0 + 2, &bob, 20),
        award(&mut feed, T0 + 3, &carol, 10),
        feed.at(T0 + 4, EventKind::UserBlacklisted { user: bob.clone() }),
    ];
    let mut engine = memory_engine(EngineFlags::default());
    process_all(&mut engine, &events).expect("process");

    let epoch = epoch_scope(1);
    for scope in [epoch.as_str(), GLOBAL_SCOPE] {
        assert!(engine
            .store()
            .get::<UserIndex>(&UserIndex::key(scope, &bob))
            .expect("get")
            .is_none());
        assert!(engine
            .store()
            .get::<TopKEntry>(&TopKEntry::key(scope, &bob))
            .expect("get")
            .is_none());
        let entries = ranked(&engine, scope);
        assert!(entries.iter().all(|e| e.user != bob));
        assert_well_ordered(&entries);
        assert_eq!(total_users(&engine, scope), 2);
        assert_eq!(bucket_members(&engine, scope), 2);
    }

    // Awards while blacklisted still land in the stats but not the rankings.
    let more = award(&mut feed, T0 + 5, &bob, 100);
    engine.process(&more).expect("process");
    assert!(ranked(&engine, &epoch).iter().all(|e| e.user != bob));
    let stats = engine
        .store()
        .get::<UserEpochStats>(&user_epoch_id(&bob, 1))
        .expect("get")
        .expect("stats");
    assert_eq!(stats.total_points_with_multiplier, 120 * POINTS_SCALE);

    // Lifting the flag alone does not re-rank; the next settlement does.
    let lift = feed.at(T0 + 6, EventKind::UserUnblacklisted { user: bob.clone() });
    engine.process(&lift).expect("process");
    assert_eq!(total_users(&engine, &epoch), 2);

    let again = award(&mut feed, T0 + 7, &bob, 1);
    engine.process(&again).expect("process");
    let entries = ranked(&engine, &epoch);
    assert_eq!(entries[0].user, bob);
    assert_eq!(entries[0].points, 121 * POINTS_SCALE);
    assert_eq!(total_users(&engine, &epoch), 3);
    assert_eq!(total_users(&engine, GLOBAL_SCOPE), 3);
}

#[test]
fn test_over_removal_floors_at_zero() {
    let mut feed = EventFeed::new();
    let (alice, bob) = (address(0xa1), address(0xb2));
    let events = [
        feed.genesis(),
        award(&mut feed, T0 + 1, &alice, 40),
        award(&mut feed, T0 + 2, &bob, 10),
        feed.at(
            T0 + 3,
            EventKind::PointsRemoved {
                user: alice.clone(),
                amount: 100 * POINTS_SCALE,
            },
        ),
    ];
    let mut engine = memory_engine(EngineFlags::default());
    process_all(&mut engine, &events).expect("process");

    let stats = engine
        .store()
        .get::<UserEpochStats>(&user_epoch_id(&alice, 1))
        .expect("get")
        .expect("stats");
    assert_eq!(stats.manual_award_points, 0);
    assert_eq!(stats.total_points, 0);
    assert_eq!(stats.total_points_with_multiplier, 0);

    let index = engine
        .store()
        .get::<UserIndex>(&UserIndex::key(&epoch_scope(1), &alice))
        .expect("get")
        .expect("still a member");
    assert_eq!(index.points, 0);
    assert_eq!(index.bucket_index, EMPTY_BUCKET);

    let entries = ranked(&engine, &epoch_scope(1));
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].user, bob);
    assert_eq!(entries[0].rank, 1);

    // No hidden debt: a later award counts in full.
    let again = award(&mut feed, T0 + 4, &alice, 80);
    engine.process(&again).expect("process");
    let stats = engine
        .store()
        .get::<UserEpochStats>(&user_epoch_id(&alice, 1))
        .expect("get")
        .expect("stats");
    assert_eq!(stats.manual_award_points, 80 * POINTS_SCALE);
    assert_eq!(stats.total_points_with_multiplier, 80 * POINTS_SCALE);
    assert_eq!(ranked(&engine, &epoch_scope(1))[0].user, alice);
}
