//! Admin events: schedules, configuration, tiers, partnerships, manual
//! points and the blacklist.

use tally_db::{Store, StoreExt};
use tally_epoch::{schedule_epoch_end, schedule_epoch_start};
use tally_types::epoch::ConfigField;
use tally_types::nft::{
    NftMultiplierConfig, NftPartnership, NftPartnershipRegistry, NFT_PARTNERSHIP_REGISTRY_ID,
};
use tally_types::normalize_address;
use tally_types::user::{LeaderboardBlacklist, UserLeaderboardState};
use tally_types::ve::VotingPowerTier;
use tracing::{debug, info, warn};

use crate::context::{EventContext, Services};
use crate::globals::Globals;
use crate::ledger::{load_user_state, Ledger};
use crate::Result;

/// Record a start target. A due start is taken by the engine's next
/// epoch advance within the same event.
pub fn epoch_start_scheduled(
    store: &mut dyn Store,
    epoch_number: u64,
    start_time: u64,
) -> Result<()> {
    schedule_epoch_start(store, epoch_number, start_time)?;
    Ok(())
}

pub fn epoch_end_scheduled(
    store: &mut dyn Store,
    epoch_number: u64,
    end_time: u64,
) -> Result<()> {
    schedule_epoch_end(store, epoch_number, end_time)?;
    Ok(())
}

/// Takes effect for the rest of this event; persisted with the globals.
pub fn config_field_updated(globals: &mut Globals, field: ConfigField, value: u128) {
    globals.config.apply(field, value);
    info!(
        field = ?field,
        value = %value,
        version = globals.config.version,
        "leaderboard config updated"
    );
}

/// Multipliers pick up tier edits on each holder's next settlement.
pub fn tier_set(
    store: &mut dyn Store,
    tier_id: u32,
    min_voting_power: u128,
    multiplier_bps: u64,
) -> Result<()> {
    store.set(&VotingPowerTier {
        tier_id,
        min_voting_power,
        multiplier_bps,
        is_active: true,
    })?;
    info!(tier_id, min_voting_power = %min_voting_power, multiplier_bps, "voting power tier set");
    Ok(())
}

pub fn tier_removed(store: &mut dyn Store, tier_id: u32) -> Result<()> {
    let Some(mut tier) = store.get::<VotingPowerTier>(&tier_id.to_string())? else {
        debug!(tier_id, "removal of unknown tier");
        return Ok(());
    };
    tier.is_active = false;
    store.set(&tier)?;
    info!(tier_id, "voting power tier deactivated");
    Ok(())
}

pub fn nft_multiplier_configured(
    store: &mut dyn Store,
    first_bonus: u64,
    decay_ratio: u64,
) -> Result<()> {
    store.set(&NftMultiplierConfig {
        first_bonus,
        decay_ratio,
    })?;
    info!(first_bonus, decay_ratio, "nft multiplier configured");
    Ok(())
}

pub fn nft_partnership_set(
    store: &mut dyn Store,
    collection: &str,
    is_active: bool,
    static_boost_bps: u64,
) -> Result<()> {
    let collection = normalize_address(collection)?;
    store.set(&NftPartnership {
        collection: collection.clone(),
        is_active,
        static_boost_bps,
    })?;
    let mut registry = store
        .get::<NftPartnershipRegistry>(NFT_PARTNERSHIP_REGISTRY_ID)?
        .unwrap_or_default();
    if !registry.collections.contains(&collection) {
        registry.collections.push(collection.clone());
        store.set(&registry)?;
    }
    info!(collection = %collection, is_active, static_boost_bps, "nft partnership set");
    Ok(())
}

/// Add to (`award`) or subtract from the user's manual points in the
/// active epoch. A removal larger than the balance floors it at zero, so
/// later awards start from nothing.
pub fn adjust_manual_points(
    store: &mut dyn Store,
    svc: &Services<'_>,
    globals: &Globals,
    ev: &EventContext,
    user: &str,
    amount: u128,
    award: bool,
) -> Result<()> {
    let user = normalize_address(user)?;
    let Some(epoch) = globals.started_epoch().filter(|e| e.is_active) else {
        debug!(user = %user, "manual points outside an active epoch; skipped");
        return Ok(());
    };
    let mut state = load_user_state(store, &user)?;
    let mut ledger = Ledger::new(&user);
    let stats = ledger.stats_mut(store, epoch.epoch_number)?;
    stats.manual_award_points = if award {
        stats.manual_award_points.saturating_add(amount)
    } else {
        if amount > stats.manual_award_points {
            warn!(user = %user, amount = %amount, "manual removal exceeds balance; flooring at zero");
        }
        stats.manual_award_points.saturating_sub(amount)
    };
    let balance = stats.manual_award_points;
    ledger.flush(store, svc, &globals.rank_context(ev.timestamp), &mut state)?;
    store.set(&state)?;
    info!(
        user = %user,
        epoch = epoch.epoch_number,
        award,
        amount = %amount,
        balance = %balance,
        "manual points adjusted"
    );
    Ok(())
}

/// Flag the user and purge every ranking entry. Point ledgers are kept.
pub fn blacklist(
    store: &mut dyn Store,
    svc: &Services<'_>,
    globals: &Globals,
    ev: &EventContext,
    user: &str,
) -> Result<()> {
    let user = normalize_address(user)?;
    store.set(&LeaderboardBlacklist {
        user: user.clone(),
        is_blacklisted: true,
        updated_at: ev.timestamp,
    })?;
    let removed = svc.leaderboard.remove_user_from_leaderboards(
        store,
        &globals.rank_context(ev.timestamp),
        &user,
    )?;
    if let Some(mut state) = store.get::<UserLeaderboardState>(&user)? {
        state.current_rank = 0;
        store.set(&state)?;
    }
    info!(user = %user, scopes = removed, "user blacklisted");
    Ok(())
}

/// Clear the flag. The user re-enters the rankings on their next
/// settlement.
pub fn unblacklist(store: &mut dyn Store, ev: &EventContext, user: &str) -> Result<()> {
    let user = normalize_address(user)?;
    store.set(&LeaderboardBlacklist {
        user: user.clone(),
        is_blacklisted: false,
        updated_at: ev.timestamp,
    })?;
    info!(user = %user, "user unblacklisted");
    Ok(())
}

/// Store the user's testnet bonus and refresh their epoch 1 total.
pub fn testnet_bonus_set(
    store: &mut dyn Store,
    svc: &Services<'_>,
    globals: &Globals,
    ev: &EventContext,
    user: &str,
    amount: u128,
) -> Result<()> {
    let user = normalize_address(user)?;
    let mut state = load_user_state(store, &user)?;
    state.testnet_bonus = amount;
    if globals.current_epoch_number() >= 1 {
        let mut ledger = Ledger::new(&user);
        ledger.stats_mut(store, 1)?;
        ledger.flush(store, svc, &globals.rank_context(ev.timestamp), &mut state)?;
    }
    store.set(&state)?;
    info!(user = %user, amount = %amount, "testnet bonus set");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_accrual::PoolLpSettlement;
    use tally_db::MemoryStore;
    use tally_leaderboard::TopKLeaderboard;
    use tally_math::POINTS_SCALE;
    use tally_oracle::PriceDefaults;
    use tally_types::ranking::{epoch_scope, UserIndex, GLOBAL_SCOPE};
    use tally_types::user::UserEpochStats;
    use tally_types::user_epoch_id;

    use crate::flags::EngineFlags;
    use crate::hooks::advance_epochs;

    const ALICE: &str = "0x00000000000000000000000000000000000000aa";
    const BOB: &str = "0x00000000000000000000000000000000000000bb";
    const T0: u64 = 1_000_000;

    fn ev(timestamp: u64) -> EventContext {
        EventContext {
            timestamp,
            block_number: 1,
            tx_hash: "0xtx".into(),
            log_index: 0,
        }
    }

    struct Harness {
        store: MemoryStore,
        globals: Globals,
        flags: EngineFlags,
        defaults: PriceDefaults,
    }

    impl Harness {
        /// Epoch 1 running since `T0`.
        fn started() -> Self {
            let store = MemoryStore::new();
            let globals = Globals::load(&store).expect("globals");
            let mut h = Self {
                store,
                globals,
                flags: EngineFlags::default(),
                defaults: PriceDefaults::new(),
            };
            h.run(|store, svc, globals| {
                epoch_start_scheduled(store, 1, T0)?;
                advance_epochs(store, svc, globals, &ev(T0)).map(|_| ())
            });
            h
        }

        fn run(
            &mut self,
            f: impl FnOnce(&mut dyn Store, &Services<'_>, &mut Globals) -> Result<()>,
        ) {
            let svc = Services {
                chain: None,
                leaderboard: &TopKLeaderboard,
                lp: &PoolLpSettlement,
                flags: &self.flags,
                defaults: &self.defaults,
            };
            f(&mut self.store, &svc, &mut self.globals).expect("handler");
        }

        fn stats(&self, user: &str) -> UserEpochStats {
            self.store
                .get::<UserEpochStats>(&user_epoch_id(user, 1))
                .expect("get")
                .expect("stats")
        }
    }

    #[test]
    fn test_schedule_starts_due_epoch() {
        let h = Harness::started();
        assert_eq!(h.globals.current_epoch_number(), 1);
        assert!(h.globals.started_epoch().is_some());
    }

    #[test]
    fn test_removal_floors_ledger_at_zero() {
        let mut h = Harness::started();
        h.run(|store, svc, globals| {
            adjust_manual_points(store, svc, globals, &ev(T0 + 1), ALICE, 100 * POINTS_SCALE, true)
        });
        h.run(|store, svc, globals| {
            adjust_manual_points(store, svc, globals, &ev(T0 + 2), ALICE, 150 * POINTS_SCALE, false)
        });
        let stats = h.stats(ALICE);
        assert_eq!(stats.manual_award_points, 0);
        assert_eq!(stats.total_points_with_multiplier, 0);
        let state = load_user_state(&h.store, ALICE).expect("state");
        assert_eq!(state.lifetime_points_with_multiplier, 0);

        h.run(|store, svc, globals| {
            adjust_manual_points(store, svc, globals, &ev(T0 + 3), ALICE, 80 * POINTS_SCALE, true)
        });
        let stats = h.stats(ALICE);
        assert_eq!(stats.manual_award_points, 80 * POINTS_SCALE);
        assert_eq!(stats.total_points_with_multiplier, 80 * POINTS_SCALE);
    }

    #[test]
    fn test_award_before_genesis_ignored() {
        let store = MemoryStore::new();
        let mut h = Harness {
            globals: Globals::load(&store).expect("globals"),
            store,
            flags: EngineFlags::default(),
            defaults: PriceDefaults::new(),
        };
        h.run(|store, svc, globals| {
            adjust_manual_points(store, svc, globals, &ev(5), ALICE, POINTS_SCALE, true)
        });
        assert_eq!(h.store.count("user_epoch_stats"), 0);
    }

    #[test]
    fn test_blacklist_purges_and_unblacklist_does_not_reinsert() {
        let mut h = Harness::started();
        h.run(|store, svc, globals| {
            adjust_manual_points(store, svc, globals, &ev(T0 + 1), ALICE, POINTS_SCALE, true)
        });
        h.run(|store, svc, globals| {
            adjust_manual_points(store, svc, globals, &ev(T0 + 1), BOB, POINTS_SCALE, true)
        });
        assert_eq!(h.store.count("user_index"), 4);

        h.run(|store, svc, globals| blacklist(store, svc, globals, &ev(T0 + 2), ALICE));
        let epoch_entry = UserIndex::key(&epoch_scope(1), ALICE);
        let global_entry = UserIndex::key(GLOBAL_SCOPE, ALICE);
        assert!(h.store.get::<UserIndex>(&epoch_entry).expect("get").is_none());
        assert!(h.store.get::<UserIndex>(&global_entry).expect("get").is_none());
        assert_eq!(h.stats(ALICE).manual_award_points, POINTS_SCALE);

        h.run(|store, _, _| unblacklist(store, &ev(T0 + 3), ALICE));
        assert!(h.store.get::<UserIndex>(&epoch_entry).expect("get").is_none());

        h.run(|store, svc, globals| {
            adjust_manual_points(store, svc, globals, &ev(T0 + 4), ALICE, POINTS_SCALE, true)
        });
        assert!(h.store.get::<UserIndex>(&epoch_entry).expect("get").is_some());
    }

    #[test]
    fn test_tier_removal_is_soft() {
        let mut store = MemoryStore::new();
        tier_set(&mut store, 5, 10, 13_000).expect("set");
        tier_removed(&mut store, 5).expect("remove");
        tier_removed(&mut store, 6).expect("unknown tier");
        let tier = store
            .get::<VotingPowerTier>("5")
            .expect("get")
            .expect("kept");
        assert!(!tier.is_active);
    }

    #[test]
    fn test_partnership_registered_once() {
        let mut store = MemoryStore::new();
        let collection = "0x00000000000000000000000000000000000000C0";
        nft_partnership_set(&mut store, collection, true, 0).expect("set");
        nft_partnership_set(&mut store, collection, false, 500).expect("update");
        let registry = store
            .get::<NftPartnershipRegistry>(NFT_PARTNERSHIP_REGISTRY_ID)
            .expect("get")
            .expect("registry");
        assert_eq!(
            registry.collections,
            vec!["0x00000000000000000000000000000000000000c0".to_string()]
        );
    }

    #[test]
    fn test_testnet_bonus_counts_in_epoch_one() {
        let mut h = Harness::started();
        h.run(|store, svc, globals| {
            testnet_bonus_set(store, svc, globals, &ev(T0 + 1), ALICE, 7 * POINTS_SCALE)
        });
        let stats = h.stats(ALICE);
        assert_eq!(stats.total_points, 0);
        assert_eq!(stats.total_points_with_multiplier, 7 * POINTS_SCALE);
    }

    #[test]
    fn test_config_update_bumps_version() {
        let store = MemoryStore::new();
        let mut globals = Globals::load(&store).expect("globals");
        config_field_updated(&mut globals, ConfigField::TopK, 10);
        assert_eq!(globals.config.top_k, 10);
        assert_eq!(globals.config.version, 1);
    }
}
