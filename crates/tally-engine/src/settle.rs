//! The settlement orchestrator.
//!
//! [`settle_points_for_user`] brings one user's ledgers up to the event's
//! block time. Every accrual is "amount since the last marker", so a
//! second settlement at the same timestamp credits nothing.

use tally_accrual::formula::vp_points;
use tally_accrual::{settle_reserve, EpochAccrual, LpAccrual};
use tally_db::{Store, StoreExt};
use tally_multiplier::{nft_multiplier_for_user, refresh_combined_multiplier, PriorFactors};
use tally_types::day_of;
use tally_types::epoch::LeaderboardConfig;
use tally_types::nft::{
    NftPartnership, NftPartnershipRegistry, UserNftHolding, NFT_PARTNERSHIP_REGISTRY_ID,
};
use tally_types::user::{PointCategory, UserLeaderboardState};
use tally_vp::{
    calculate_vp_multiplier, find_vp_tier_index, load_tiers, user_average_voting_power,
    user_voting_power,
};
use tracing::{debug, trace};

use crate::context::{EventContext, Services};
use crate::globals::Globals;
use crate::handlers::lp::sync_chain_positions;
use crate::ledger::{credit_lp_accruals, load_user_state, Ledger};
use crate::Result;

/// A flat bonus claimed by the triggering event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DailyBonus {
    /// One of the four `Daily*` categories.
    pub category: PointCategory,
    /// USD value of the triggering action (8 decimals).
    pub value_usd: u128,
}

/// Per-call settlement switches.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SettleOptions {
    /// Settle every reserve even inside the cooldown window.
    pub ignore_cooldown: bool,
    /// Skip NFT and LP chain reconciliation.
    pub skip_external_sync: bool,
    /// Accruals computed by the caller, credited in the same flush.
    pub pending: Vec<LpAccrual>,
    pub bonus: Option<DailyBonus>,
}

/// Flat bonus amount of a daily category.
pub fn bonus_amount(config: &LeaderboardConfig, category: PointCategory) -> u128 {
    match category {
        PointCategory::DailySupply => config.daily_supply_bonus,
        PointCategory::DailyBorrow => config.daily_borrow_bonus,
        PointCategory::DailyRepay => config.daily_repay_bonus,
        PointCategory::DailyLp => config.daily_lp_bonus,
        _ => 0,
    }
}

/// Recompute voting power and tier from the user's locks.
pub fn refresh_voting_power(
    store: &dyn Store,
    state: &mut UserLeaderboardState,
    timestamp: u64,
) -> Result<()> {
    let power = user_voting_power(store, &state.ve_locks, timestamp)?;
    let tiers = load_tiers(store)?;
    state.voting_power = power;
    state.vp_tier_index = find_vp_tier_index(power, &tiers);
    state.vp_multiplier_bps = calculate_vp_multiplier(power, &tiers);
    Ok(())
}

/// Recompute both multiplier factors and the combined value. Returns
/// whether the combined multiplier changed.
pub fn refresh_multipliers(
    store: &mut dyn Store,
    state: &mut UserLeaderboardState,
    ev: &EventContext,
) -> Result<bool> {
    let prior = PriorFactors::of(state);
    refresh_voting_power(store, state, ev.timestamp)?;
    let (count, bps) = nft_multiplier_for_user(store, &state.user)?;
    state.nft_count = count;
    state.nft_multiplier_bps = bps;
    Ok(refresh_combined_multiplier(store, state, prior, &ev.snapshot())?)
}

/// Read the on-chain balance of every active partner collection the user
/// has no baseline for yet.
fn sync_nft_balances(store: &mut dyn Store, svc: &Services<'_>, user: &str) -> Result<usize> {
    let Some(chain) = svc.chain.filter(|_| svc.flags.nft_chain_sync) else {
        return Ok(0);
    };
    let registry = store
        .get::<NftPartnershipRegistry>(NFT_PARTNERSHIP_REGISTRY_ID)?
        .unwrap_or_default();
    let mut synced = 0;
    for collection in &registry.collections {
        if !store
            .get::<NftPartnership>(collection)?
            .is_some_and(|p| p.is_active)
        {
            continue;
        }
        let key = UserNftHolding::key(user, collection);
        let mut holding = store.get::<UserNftHolding>(&key)?.unwrap_or(UserNftHolding {
            user: user.to_string(),
            collection: collection.clone(),
            balance: 0,
            synced: false,
        });
        if holding.synced {
            continue;
        }
        match chain.nft_balance_of(collection, user) {
            Some(balance) => {
                holding.balance = balance;
                holding.synced = true;
                store.set(&holding)?;
                synced += 1;
            }
            None => debug!(user, collection = %collection, "nft balance unavailable"),
        }
    }
    Ok(synced)
}

/// Split LP accruals into this user's and everyone else's.
fn split_accruals(user: &str, accruals: Vec<LpAccrual>) -> (Vec<EpochAccrual>, Vec<LpAccrual>) {
    let mut mine = Vec::new();
    let mut others = Vec::new();
    for lp in accruals {
        if lp.user == user {
            mine.push(lp.accrual);
        } else {
            others.push(lp);
        }
    }
    (mine, others)
}

/// Settle `user` at the event's block time.
///
/// `trigger_reserve` is the reserve the event changed; it is added to the
/// user's reserve list and always settled, cooldown or not. Returns the
/// persisted user state.
pub fn settle_points_for_user(
    store: &mut dyn Store,
    svc: &Services<'_>,
    globals: &Globals,
    ev: &EventContext,
    user: &str,
    trigger_reserve: Option<&str>,
    opts: SettleOptions,
) -> Result<UserLeaderboardState> {
    let ts = ev.timestamp;
    let config = &globals.config;
    let mut state = load_user_state(store, user)?;
    if let Some(reserve) = trigger_reserve {
        state.track_reserve(reserve);
    }

    if ev.block_number < config.start_block || globals.current_epoch_number() == 0 {
        trace!(user, block = ev.block_number, "before leaderboard genesis; multipliers only");
        refresh_multipliers(store, &mut state, ev)?;
        store.set(&state)?;
        return Ok(state);
    }

    let actx = globals.accrual_context(svc.defaults);
    let mut lp_accruals = opts.pending;
    if !opts.skip_external_sync {
        sync_nft_balances(store, svc, user)?;
        if svc.flags.lp_chain_sync && !state.lp_synced {
            lp_accruals.extend(sync_chain_positions(store, svc, globals, &mut state, ts)?);
        }
    }
    for token_id in state.lp_positions.clone() {
        lp_accruals.extend(svc.lp.settle_position(store, &actx, &token_id, ts)?);
    }
    let (own_lp, foreign_lp) = split_accruals(user, lp_accruals);

    refresh_multipliers(store, &mut state, ev)?;

    let active = globals.started_epoch().filter(|e| e.is_active && ts >= e.start_time);
    let mut ledger = Ledger::new(user);

    let in_cooldown = match active {
        Some(epoch) if !opts.ignore_cooldown && config.cooldown_seconds > 0 => {
            let last = ledger.stats_mut(store, epoch.epoch_number)?.last_settlement_at;
            last > 0 && ts.saturating_sub(last) < config.cooldown_seconds
        }
        _ => false,
    };

    let mut supply_usd: u128 = 0;
    for reserve in state.reserves.clone() {
        let is_trigger = trigger_reserve == Some(reserve.as_str());
        if in_cooldown && !is_trigger {
            trace!(user, reserve = %reserve, "cooldown; reserve skipped");
            continue;
        }
        let Some(settlement) = settle_reserve(store, &actx, user, &reserve, ts)? else {
            continue;
        };
        supply_usd = supply_usd.saturating_add(settlement.supply_usd);
        for accrual in &settlement.accruals {
            ledger.credit(store, &state, config, accrual)?;
        }
    }
    for accrual in &own_lp {
        ledger.credit(store, &state, config, accrual)?;
    }

    if let Some(epoch) = active {
        let number = epoch.epoch_number;
        let today = day_of(ts);
        let stats = ledger.stats_mut(store, number)?;
        if stats.highwater_day != today {
            stats.highwater_day = today;
            stats.highwater_usd = supply_usd;
        } else {
            stats.highwater_usd = stats.highwater_usd.max(supply_usd);
        }
        if !in_cooldown {
            stats.last_settlement_at = ts;
        }

        let vp_from = epoch.start_time.max(stats.last_vp_accrual_at);
        stats.last_vp_accrual_at = ts;
        if ts > vp_from && !state.ve_locks.is_empty() {
            let average = user_average_voting_power(store, &state.ve_locks, vp_from, ts)?;
            let raw = vp_points(average, config.vp_rate_bps, ts - vp_from);
            if raw > 0 {
                ledger.credit(
                    store,
                    &state,
                    config,
                    &EpochAccrual {
                        epoch_number: number,
                        category: PointCategory::VotingPower,
                        raw,
                        from: vp_from,
                        to: ts,
                    },
                )?;
            }
        }

        if let Some(bonus) = opts.bonus {
            credit_daily_bonus(store, &mut ledger, &state, config, number, today, bonus)?;
        }
    }

    let rank = globals.rank_context(ts);
    ledger.flush(store, svc, &rank, &mut state)?;
    store.set(&state)?;
    if !foreign_lp.is_empty() {
        credit_lp_accruals(store, svc, config, &rank, foreign_lp)?;
    }
    Ok(state)
}

fn credit_daily_bonus(
    store: &dyn Store,
    ledger: &mut Ledger,
    state: &UserLeaderboardState,
    config: &LeaderboardConfig,
    epoch: u64,
    today: u64,
    bonus: DailyBonus,
) -> Result<bool> {
    let amount = bonus_amount(config, bonus.category);
    if amount == 0 {
        return Ok(false);
    }
    let stats = ledger.stats_mut(store, epoch)?;
    let eligible = bonus.value_usd >= config.min_daily_bonus_usd
        || (stats.highwater_day == today && stats.highwater_usd >= config.min_daily_bonus_usd);
    if !eligible {
        trace!(user = %state.user, category = ?bonus.category, "below daily bonus threshold");
        return Ok(false);
    }
    let Some(marker) = stats.bonus_day_mut(bonus.category) else {
        return Ok(false);
    };
    if *marker == Some(today) {
        return Ok(false);
    }
    *marker = Some(today);
    ledger.credit_instant(store, state, config, epoch, bonus.category, amount)?;
    debug!(user = %state.user, category = ?bonus.category, day = today, "daily bonus credited");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_accrual::{apply_balance_change, init_reserve, BalanceChange, PoolLpSettlement};
    use tally_db::MemoryStore;
    use tally_epoch::{advance, schedule_epoch_start, NoopHooks};
    use tally_leaderboard::TopKLeaderboard;
    use tally_math::POINTS_SCALE;
    use tally_oracle::{PriceDefault, PriceDefaults};
    use tally_types::user::UserEpochStats;
    use tally_types::ve::VeLock;
    use tally_types::{user_epoch_id, USD_SCALE};

    use crate::flags::EngineFlags;

    const USER: &str = "0x00000000000000000000000000000000000000aa";
    const RESERVE: &str = "0x00000000000000000000000000000000000000b1";
    const ASSET: &str = "0x0000000000000000000000000000000000000a55";
    const DAY: u64 = 86_400;
    const T0: u64 = 10 * DAY;

    struct Fixture {
        store: MemoryStore,
        flags: EngineFlags,
        defaults: PriceDefaults,
    }

    impl Fixture {
        fn new() -> Self {
            let mut store = MemoryStore::new();
            schedule_epoch_start(&mut store, 1, T0).expect("schedule");
            let defaults = PriceDefaults::from_entries([PriceDefault {
                asset: ASSET.into(),
                price_usd: USD_SCALE,
                decimals: 18,
            }]);
            Self {
                store,
                flags: EngineFlags::default(),
                defaults,
            }
        }

        fn globals(&mut self, now: u64) -> Globals {
            let mut globals = Globals::load(&self.store).expect("load");
            advance(&mut self.store, &mut globals.state, now, 1, &mut NoopHooks).expect("advance");
            globals.refresh_epoch(&self.store).expect("refresh");
            globals.persist(&mut self.store).expect("persist");
            globals
        }

        fn settle(&mut self, at: u64, opts: SettleOptions) -> UserLeaderboardState {
            let globals = self.globals(at);
            let svc = Services {
                chain: None,
                leaderboard: &TopKLeaderboard,
                lp: &PoolLpSettlement,
                flags: &self.flags,
                defaults: &self.defaults,
            };
            settle_points_for_user(
                &mut self.store,
                &svc,
                &globals,
                &ev(at),
                USER,
                Some(RESERVE),
                opts,
            )
            .expect("settle")
        }

        fn stats(&self) -> UserEpochStats {
            self.store
                .get::<UserEpochStats>(&user_epoch_id(USER, 1))
                .expect("get")
                .expect("stats")
        }
    }

    fn ev(timestamp: u64) -> EventContext {
        EventContext {
            timestamp,
            block_number: 1,
            tx_hash: "0xtx".into(),
            log_index: 0,
        }
    }

    fn deposit(fx: &mut Fixture, amount: u128, at: u64) {
        init_reserve(&mut fx.store, RESERVE, ASSET, 18, 0).expect("init");
        apply_balance_change(&mut fx.store, USER, RESERVE, BalanceChange::Supply(amount), at)
            .expect("supply");
    }

    #[test]
    fn test_settle_twice_same_time_is_idempotent() {
        let mut fx = Fixture::new();
        deposit(&mut fx, POINTS_SCALE, T0);
        fx.settle(T0, SettleOptions::default());
        fx.settle(T0 + DAY, SettleOptions::default());
        let first = fx.stats();
        fx.settle(T0 + DAY, SettleOptions::default());
        assert_eq!(fx.stats(), first);
        assert_eq!(first.deposit_points, POINTS_SCALE);
    }

    #[test]
    fn test_pre_genesis_refreshes_multipliers_only() {
        let mut fx = Fixture::new();
        fx.store
            .set(&VeLock {
                token_id: "1".into(),
                owner: USER.into(),
                amount: 2_000 * POINTS_SCALE,
                lock_end: 0,
                is_permanent: true,
                updated_at: 0,
            })
            .expect("set");
        let mut state = UserLeaderboardState::new(USER);
        state.track_ve_lock("1");
        fx.store.set(&state).expect("set");
        tally_vp::default_tiers()
            .into_iter()
            .for_each(|tier| fx.store.set(&tier).expect("tier"));

        let state = fx.settle(T0 - 10, SettleOptions::default());
        assert_eq!(state.vp_multiplier_bps, 11_000);
        assert_eq!(state.combined_multiplier_bps, 11_000);
        assert_eq!(fx.store.count("user_epoch_stats"), 0);
    }

    #[test]
    fn test_daily_bonus_once_per_day() {
        let mut fx = Fixture::new();
        deposit(&mut fx, 100 * POINTS_SCALE, T0);
        let bonus = Some(DailyBonus {
            category: PointCategory::DailySupply,
            value_usd: 100 * USD_SCALE,
        });
        fx.settle(
            T0 + 10,
            SettleOptions {
                bonus,
                ..SettleOptions::default()
            },
        );
        fx.settle(
            T0 + 20,
            SettleOptions {
                bonus,
                ..SettleOptions::default()
            },
        );
        let stats = fx.stats();
        assert_eq!(stats.daily_supply_points, 10 * POINTS_SCALE);
        assert_eq!(stats.last_supply_bonus_day, Some(day_of(T0 + 10)));
    }

    #[test]
    fn test_dust_does_not_earn_bonus() {
        let mut fx = Fixture::new();
        deposit(&mut fx, POINTS_SCALE, T0);
        fx.settle(
            T0 + 10,
            SettleOptions {
                bonus: Some(DailyBonus {
                    category: PointCategory::DailySupply,
                    value_usd: USD_SCALE,
                }),
                ..SettleOptions::default()
            },
        );
        assert_eq!(fx.stats().daily_supply_points, 0);
    }

    #[test]
    fn test_cooldown_defers_other_reserves() {
        let mut fx = Fixture::new();
        deposit(&mut fx, POINTS_SCALE, T0);
        let globals = fx.globals(T0 + DAY);
        let svc = Services {
            chain: None,
            leaderboard: &TopKLeaderboard,
            lp: &PoolLpSettlement,
            flags: &fx.flags,
            defaults: &fx.defaults,
        };
        // A settlement with no trigger records the cooldown anchor.
        settle_points_for_user(
            &mut fx.store,
            &svc,
            &globals,
            &ev(T0 + DAY),
            USER,
            Some(RESERVE),
            SettleOptions::default(),
        )
        .expect("settle");
        let anchored = fx
            .store
            .get::<UserEpochStats>(&user_epoch_id(USER, 1))
            .expect("get")
            .expect("stats");

        let later = T0 + DAY + 60;
        settle_points_for_user(
            &mut fx.store,
            &svc,
            &globals,
            &ev(later),
            USER,
            None,
            SettleOptions::default(),
        )
        .expect("settle");
        let stats = fx
            .store
            .get::<UserEpochStats>(&user_epoch_id(USER, 1))
            .expect("get")
            .expect("stats");
        assert_eq!(stats.deposit_points, anchored.deposit_points);
        assert_eq!(stats.last_settlement_at, T0 + DAY);

        settle_points_for_user(
            &mut fx.store,
            &svc,
            &globals,
            &ev(later),
            USER,
            None,
            SettleOptions {
                ignore_cooldown: true,
                ..SettleOptions::default()
            },
        )
        .expect("settle");
        let stats = fx
            .store
            .get::<UserEpochStats>(&user_epoch_id(USER, 1))
            .expect("get")
            .expect("stats");
        assert!(stats.deposit_points > anchored.deposit_points);
    }
}
