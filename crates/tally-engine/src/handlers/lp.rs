//! Concentrated-liquidity pool and position events.

use tally_accrual::{
    apply_position_update, init_pool, transfer_position, LpAccrual, PoolParams, PositionParams,
};
use tally_db::{Store, StoreExt};
use tally_oracle::ensure_asset_price;
use tally_types::lp::{LpPool, UserLpPosition};
use tally_types::normalize_address;
use tally_types::user::{PointCategory, UserLeaderboardState};
use tracing::{debug, info};

use crate::context::{EventContext, Services};
use crate::globals::Globals;
use crate::handlers::counterparty;
use crate::ledger::{credit_lp_accruals, load_user_state};
use crate::settle::{settle_points_for_user, DailyBonus, SettleOptions};
use crate::Result;

/// `PoolInitialized` fields as decoded.
#[derive(Clone, Copy, Debug)]
pub struct RawPool<'a> {
    pub pool: &'a str,
    pub token0: &'a str,
    pub token1: &'a str,
    pub fee: u32,
    pub tick: i32,
    pub sqrt_price_x96: &'a str,
}

/// `LpPositionUpdated` fields as decoded.
#[derive(Clone, Copy, Debug)]
pub struct RawPosition<'a> {
    pub token_id: &'a str,
    pub owner: &'a str,
    pub pool: &'a str,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
}

/// Register a pool and seed prices for both tokens, preferring on-chain
/// decimals when available.
fn register_pool(
    store: &mut dyn Store,
    svc: &Services<'_>,
    globals: &Globals,
    params: &PoolParams<'_>,
    timestamp: u64,
) -> Result<LpPool> {
    let pool = init_pool(store, params, timestamp)?;
    for token in [params.token0, params.token1] {
        let decimals = svc.chain.and_then(|chain| chain.erc20_decimals(token));
        ensure_asset_price(
            store,
            svc.defaults,
            token,
            timestamp,
            globals.started_epoch(),
            decimals,
        )?;
    }
    Ok(pool)
}

/// Drop `token_id` from a previous owner's tracked positions.
fn untrack_from(store: &mut dyn Store, owner: &str, token_id: &str) -> Result<()> {
    let mut state = load_user_state(store, owner)?;
    if state.lp_positions.iter().any(|id| id == token_id) {
        state.untrack_lp_position(token_id);
        store.set(&state)?;
    }
    Ok(())
}

pub fn pool_initialized(
    store: &mut dyn Store,
    svc: &Services<'_>,
    globals: &Globals,
    ev: &EventContext,
    raw: RawPool<'_>,
) -> Result<()> {
    let pool = normalize_address(raw.pool)?;
    let token0 = normalize_address(raw.token0)?;
    let token1 = normalize_address(raw.token1)?;
    let fee = match svc.chain.and_then(|chain| chain.pool_fee(&pool)) {
        Some(fee) => fee,
        None => raw.fee,
    };
    register_pool(
        store,
        svc,
        globals,
        &PoolParams {
            pool: &pool,
            token0: &token0,
            token1: &token1,
            fee,
            tick: raw.tick,
            sqrt_price_x96: raw.sqrt_price_x96,
        },
        ev.timestamp,
    )?;
    info!(pool = %pool, token0 = %token0, token1 = %token1, fee, "pool registered");
    Ok(())
}

pub fn pool_swap(
    store: &mut dyn Store,
    svc: &Services<'_>,
    globals: &Globals,
    ev: &EventContext,
    pool: &str,
    tick: i32,
    sqrt_price_x96: &str,
) -> Result<()> {
    let pool = normalize_address(pool)?;
    let ctx = globals.accrual_context(svc.defaults);
    let accruals = svc
        .lp
        .apply_swap(store, &ctx, &pool, tick, sqrt_price_x96, ev.timestamp)?;
    if !accruals.is_empty() {
        let rank = globals.rank_context(ev.timestamp);
        credit_lp_accruals(store, svc, &globals.config, &rank, accruals)?;
    }
    Ok(())
}

/// Settle a position under its old liquidity, record the new one, then
/// settle the owner. A liquidity increase may earn the daily LP bonus.
pub fn position_updated(
    store: &mut dyn Store,
    svc: &Services<'_>,
    globals: &Globals,
    ev: &EventContext,
    raw: RawPosition<'_>,
) -> Result<()> {
    let owner = normalize_address(raw.owner)?;
    let pool = normalize_address(raw.pool)?;
    let previous_owner = store
        .get::<UserLpPosition>(raw.token_id)?
        .map(|p| p.owner)
        .filter(|prev| *prev != owner);

    let ctx = globals.accrual_context(svc.defaults);
    let Some(update) = apply_position_update(
        store,
        &ctx,
        svc.lp,
        &PositionParams {
            token_id: raw.token_id,
            owner: &owner,
            pool: &pool,
            tick_lower: raw.tick_lower,
            tick_upper: raw.tick_upper,
            liquidity: raw.liquidity,
        },
        ev.timestamp,
    )?
    else {
        return Ok(());
    };

    if let Some(previous) = &previous_owner {
        untrack_from(store, previous, raw.token_id)?;
    }
    let mut state = load_user_state(store, &owner)?;
    if update.position.is_open {
        state.track_lp_position(raw.token_id);
    } else {
        state.untrack_lp_position(raw.token_id);
    }
    store.set(&state)?;

    let bonus = (update.value_increase_usd > 0).then_some(DailyBonus {
        category: PointCategory::DailyLp,
        value_usd: update.value_increase_usd,
    });
    settle_points_for_user(
        store,
        svc,
        globals,
        ev,
        &owner,
        None,
        SettleOptions {
            pending: update.accruals,
            bonus,
            ..SettleOptions::default()
        },
    )?;
    Ok(())
}

/// Settle a position for its seller, then hand it to the buyer.
pub fn position_transferred(
    store: &mut dyn Store,
    svc: &Services<'_>,
    globals: &Globals,
    ev: &EventContext,
    token_id: &str,
    from: &str,
    to: &str,
) -> Result<()> {
    let from = counterparty(from)?;
    let to = counterparty(to)?;
    let Some(to_owner) = to else {
        // Burns follow a zero-liquidity update that already closed it.
        if let Some(from) = &from {
            untrack_from(store, from, token_id)?;
        }
        return Ok(());
    };

    let ctx = globals.accrual_context(svc.defaults);
    let Some((previous, accruals)) =
        transfer_position(store, &ctx, svc.lp, token_id, &to_owner, ev.timestamp)?
    else {
        debug!(token_id, "transfer of unknown position");
        return Ok(());
    };

    untrack_from(store, &previous, token_id)?;
    let mut state = load_user_state(store, &to_owner)?;
    let open = store
        .get::<UserLpPosition>(token_id)?
        .is_some_and(|p| p.is_open);
    if open {
        state.track_lp_position(token_id);
        store.set(&state)?;
    }

    settle_points_for_user(
        store,
        svc,
        globals,
        ev,
        &previous,
        None,
        SettleOptions {
            pending: accruals,
            ..SettleOptions::default()
        },
    )?;
    settle_points_for_user(
        store,
        svc,
        globals,
        ev,
        &to_owner,
        None,
        SettleOptions::default(),
    )?;
    Ok(())
}

/// One-time scan of the positions a user owns on chain.
///
/// Unknown pools are registered from `slot0` when readable; positions in
/// pools that cannot be registered are skipped. Returns the accruals of
/// positions that were already tracked under another owner.
pub fn sync_chain_positions(
    store: &mut dyn Store,
    svc: &Services<'_>,
    globals: &Globals,
    state: &mut UserLeaderboardState,
    timestamp: u64,
) -> Result<Vec<LpAccrual>> {
    let Some(chain) = svc.chain else {
        return Ok(Vec::new());
    };
    let Some(positions) = chain.lp_positions_of(&state.user) else {
        debug!(user = %state.user, "lp positions unavailable");
        return Ok(Vec::new());
    };

    let ctx = globals.accrual_context(svc.defaults);
    let mut accruals = Vec::new();
    for position in &positions {
        let pool = normalize_address(&position.pool)?;
        if store.get::<LpPool>(&pool)?.is_none() {
            let Some(slot0) = chain.pool_slot0(&pool) else {
                debug!(pool = %pool, token_id = %position.token_id, "pool slot0 unavailable");
                continue;
            };
            let token0 = normalize_address(&position.token0)?;
            let token1 = normalize_address(&position.token1)?;
            let fee = chain.pool_fee(&pool).unwrap_or(position.fee);
            register_pool(
                store,
                svc,
                globals,
                &PoolParams {
                    pool: &pool,
                    token0: &token0,
                    token1: &token1,
                    fee,
                    tick: slot0.tick,
                    sqrt_price_x96: &slot0.sqrt_price_x96,
                },
                timestamp,
            )?;
        }

        let previous_owner = store
            .get::<UserLpPosition>(&position.token_id)?
            .map(|p| p.owner)
            .filter(|prev| *prev != state.user);
        let update = apply_position_update(
            store,
            &ctx,
            svc.lp,
            &PositionParams {
                token_id: &position.token_id,
                owner: &state.user,
                pool: &pool,
                tick_lower: position.tick_lower,
                tick_upper: position.tick_upper,
                liquidity: position.liquidity,
            },
            timestamp,
        )?;
        let Some(update) = update else {
            continue;
        };
        if let Some(previous) = &previous_owner {
            untrack_from(store, previous, &position.token_id)?;
        }
        if update.position.is_open {
            state.track_lp_position(&position.token_id);
        }
        accruals.extend(update.accruals);
    }
    state.lp_synced = true;
    info!(user = %state.user, positions = positions.len(), "lp positions synced from chain");
    Ok(accruals)
}
