//! Concentrated-liquidity position accrual.
//!
//! A position earns only while `tick_lower <= current_tick < tick_upper`.
//! Its in-range flag and USD value are refreshed after each settlement, so
//! the interval between two settlements always carries a single flag and
//! value. Swaps that flip a position's flag settle that position first.

use tally_db::{Store, StoreExt};
use tally_math::tick::{amounts_for_liquidity, is_in_range};
use tally_math::U256;
use tally_oracle::{ensure_asset_price, token_value_usd};
use tally_types::epoch::Epoch;
use tally_types::lp::{LpPool, LpPoolRegistry, UserLpPosition, LP_POOL_REGISTRY_ID};
use tally_types::user::PointCategory;
use tracing::{debug, trace};

use crate::formula::lp_points;
use crate::{AccrualContext, AccrualError, EpochAccrual, Result};

/// An LP accrual owed to a position's owner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LpAccrual {
    pub user: String,
    pub token_id: String,
    pub accrual: EpochAccrual,
}

/// Outcome of [`apply_position_update`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionUpdate {
    /// Accruals settled under the previous liquidity.
    pub accruals: Vec<LpAccrual>,
    pub position: UserLpPosition,
    /// Increase in USD value (8 decimals), 0 for decreases.
    pub value_increase_usd: u128,
}

/// LP settlement capability used by the orchestrator.
pub trait LpSettlement {
    /// Settle one position up to `at` and refresh its valuation.
    fn settle_position(
        &self,
        store: &mut dyn Store,
        ctx: &AccrualContext<'_>,
        token_id: &str,
        at: u64,
    ) -> Result<Vec<LpAccrual>>;

    /// Record a swap's new price, settling positions whose in-range flag
    /// flips.
    fn apply_swap(
        &self,
        store: &mut dyn Store,
        ctx: &AccrualContext<'_>,
        pool: &str,
        tick: i32,
        sqrt_price_x96: &str,
        at: u64,
    ) -> Result<Vec<LpAccrual>>;

    /// Settle every open position of every pool up to `at`.
    fn settle_all_open(
        &self,
        store: &mut dyn Store,
        ctx: &AccrualContext<'_>,
        at: u64,
    ) -> Result<Vec<LpAccrual>>;
}

/// [`LpSettlement`] over the stored pool registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct PoolLpSettlement;

impl LpSettlement for PoolLpSettlement {
    fn settle_position(
        &self,
        store: &mut dyn Store,
        ctx: &AccrualContext<'_>,
        token_id: &str,
        at: u64,
    ) -> Result<Vec<LpAccrual>> {
        let Some(mut position) = store.get::<UserLpPosition>(token_id)? else {
            return Ok(Vec::new());
        };
        let accruals = accrue(store, ctx, &mut position, at)?;
        if let Some(pool) = store.get::<LpPool>(&position.pool)? {
            revalue(store, ctx, &pool, &mut position, at)?;
        }
        store.set(&position)?;
        Ok(accruals)
    }

    fn apply_swap(
        &self,
        store: &mut dyn Store,
        ctx: &AccrualContext<'_>,
        pool_id: &str,
        tick: i32,
        sqrt_price_x96: &str,
        at: u64,
    ) -> Result<Vec<LpAccrual>> {
        let Some(mut pool) = store.get::<LpPool>(pool_id)? else {
            debug!(pool = pool_id, "swap on unknown pool");
            return Ok(Vec::new());
        };
        parse_sqrt_price(pool_id, sqrt_price_x96)?;

        let mut accruals = Vec::new();
        let mut flipped = Vec::new();
        for token_id in &pool.position_ids {
            let Some(mut position) = store.get::<UserLpPosition>(token_id)? else {
                continue;
            };
            if !position.is_open {
                continue;
            }
            let now_in_range = is_in_range(position.tick_lower, position.tick_upper, tick);
            if now_in_range != position.is_in_range {
                accruals.extend(accrue(store, ctx, &mut position, at)?);
                flipped.push(position);
            }
        }

        pool.current_tick = tick;
        pool.sqrt_price_x96 = sqrt_price_x96.to_string();
        pool.last_tick_update = at;
        store.set(&pool)?;

        for mut position in flipped {
            revalue(store, ctx, &pool, &mut position, at)?;
            store.set(&position)?;
        }
        Ok(accruals)
    }

    fn settle_all_open(
        &self,
        store: &mut dyn Store,
        ctx: &AccrualContext<'_>,
        at: u64,
    ) -> Result<Vec<LpAccrual>> {
        let registry = store
            .get::<LpPoolRegistry>(LP_POOL_REGISTRY_ID)?
            .unwrap_or_default();
        let mut accruals = Vec::new();
        for pool_id in &registry.pools {
            let Some(pool) = store.get::<LpPool>(pool_id)? else {
                continue;
            };
            for token_id in &pool.position_ids {
                accruals.extend(self.settle_position(store, ctx, token_id, at)?);
            }
        }
        debug!(at, settled = accruals.len(), "flushed open LP positions");
        Ok(accruals)
    }
}

fn parse_sqrt_price(pool: &str, value: &str) -> Result<U256> {
    U256::from_dec_str(value).map_err(|_| AccrualError::MalformedSqrtPrice {
        pool: pool.to_string(),
        value: value.to_string(),
    })
}

/// Accrue `position` from its last settlement to `at`, across every epoch
/// in between. Gaps between epochs earn nothing.
fn accrue(
    store: &dyn Store,
    ctx: &AccrualContext<'_>,
    position: &mut UserLpPosition,
    at: u64,
) -> Result<Vec<LpAccrual>> {
    let mut out = Vec::new();
    if at <= position.last_settled_at {
        return Ok(out);
    }
    if position.is_open && position.is_in_range && position.value_usd > 0 {
        for number in position.last_epoch.max(1)..=ctx.current_epoch_number {
            let Some(epoch) = store.get::<Epoch>(&number.to_string())? else {
                continue;
            };
            if epoch.start_time == 0 {
                continue;
            }
            let from = position.last_settled_at.max(epoch.start_time);
            let to = epoch.clamp_to_end(at);
            if to <= from {
                continue;
            }
            let seconds = to - from;
            let raw = lp_points(position.value_usd, ctx.config.lp_rate_bps, seconds);
            position.in_range_seconds = position.in_range_seconds.saturating_add(seconds);
            trace!(
                token_id = %position.token_id,
                owner = %position.owner,
                epoch = number,
                from,
                to,
                raw,
                "lp accrual"
            );
            if raw == 0 {
                continue;
            }
            position.lp_points = position.lp_points.saturating_add(raw);
            out.push(LpAccrual {
                user: position.owner.clone(),
                token_id: position.token_id.clone(),
                accrual: EpochAccrual {
                    epoch_number: number,
                    category: PointCategory::Lp,
                    raw,
                    from,
                    to,
                },
            });
        }
    }
    position.last_settled_at = at;
    position.last_epoch = ctx.current_epoch_number;
    Ok(out)
}

/// Recompute token amounts, USD value and in-range flag at the pool's
/// current price.
fn revalue(
    store: &mut dyn Store,
    ctx: &AccrualContext<'_>,
    pool: &LpPool,
    position: &mut UserLpPosition,
    at: u64,
) -> Result<()> {
    position.is_in_range = is_in_range(position.tick_lower, position.tick_upper, pool.current_tick);
    if position.liquidity == 0 || pool.sqrt_price_x96.is_empty() {
        position.amount0 = 0;
        position.amount1 = 0;
        position.value_usd = 0;
        return Ok(());
    }
    let sqrt_price = parse_sqrt_price(&pool.pool, &pool.sqrt_price_x96)?;
    let (amount0, amount1) = amounts_for_liquidity(
        sqrt_price,
        position.tick_lower,
        position.tick_upper,
        position.liquidity,
    )?;
    let price0 = ensure_asset_price(store, ctx.defaults, &pool.token0, at, ctx.epoch, None)?;
    let price1 = ensure_asset_price(store, ctx.defaults, &pool.token1, at, ctx.epoch, None)?;
    position.amount0 = amount0;
    position.amount1 = amount1;
    position.value_usd =
        token_value_usd(&price0, amount0)?.saturating_add(token_value_usd(&price1, amount1)?);
    Ok(())
}

/// Pool fields reported at initialization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolParams<'a> {
    pub pool: &'a str,
    pub token0: &'a str,
    pub token1: &'a str,
    pub fee: u32,
    pub tick: i32,
    pub sqrt_price_x96: &'a str,
}

/// Register a pool. A known pool only has its price refreshed.
pub fn init_pool(store: &mut dyn Store, params: &PoolParams<'_>, timestamp: u64) -> Result<LpPool> {
    let PoolParams {
        pool: pool_id,
        token0,
        token1,
        fee,
        tick,
        sqrt_price_x96,
    } = *params;
    parse_sqrt_price(pool_id, sqrt_price_x96)?;
    let pool = match store.get::<LpPool>(pool_id)? {
        Some(mut existing) => {
            existing.current_tick = tick;
            existing.sqrt_price_x96 = sqrt_price_x96.to_string();
            existing.last_tick_update = timestamp;
            existing
        }
        None => LpPool {
            pool: pool_id.to_string(),
            token0: token0.to_string(),
            token1: token1.to_string(),
            fee,
            current_tick: tick,
            sqrt_price_x96: sqrt_price_x96.to_string(),
            last_tick_update: timestamp,
            position_ids: Vec::new(),
        },
    };
    store.set(&pool)?;

    let mut registry = store
        .get::<LpPoolRegistry>(LP_POOL_REGISTRY_ID)?
        .unwrap_or_default();
    if !registry.pools.iter().any(|p| p == pool_id) {
        registry.pools.push(pool_id.to_string());
        store.set(&registry)?;
    }
    Ok(pool)
}

/// New range and liquidity of a position, as reported by the position
/// manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionParams<'a> {
    pub token_id: &'a str,
    pub owner: &'a str,
    pub pool: &'a str,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
}

/// Settle a position under its previous liquidity, then record the new
/// range and liquidity. Zero liquidity closes the position.
///
/// Returns `None` if the pool is unknown.
pub fn apply_position_update(
    store: &mut dyn Store,
    ctx: &AccrualContext<'_>,
    settlement: &dyn LpSettlement,
    params: &PositionParams<'_>,
    at: u64,
) -> Result<Option<PositionUpdate>> {
    let Some(mut pool) = store.get::<LpPool>(params.pool)? else {
        debug!(pool = params.pool, token_id = params.token_id, "position on unknown pool");
        return Ok(None);
    };
    let accruals = settlement.settle_position(store, ctx, params.token_id, at)?;

    let mut position = store
        .get::<UserLpPosition>(params.token_id)?
        .unwrap_or_else(|| UserLpPosition::new(params.token_id, params.owner, params.pool, at));
    let previous_value = position.value_usd;
    position.owner = params.owner.to_string();
    position.pool = params.pool.to_string();
    position.tick_lower = params.tick_lower;
    position.tick_upper = params.tick_upper;
    position.liquidity = params.liquidity;
    position.is_open = params.liquidity > 0;
    position.last_settled_at = position.last_settled_at.max(at);
    position.last_epoch = position.last_epoch.max(ctx.current_epoch_number);
    revalue(store, ctx, &pool, &mut position, at)?;
    store.set(&position)?;

    let changed = if position.is_open {
        pool.track_position(params.token_id)
    } else {
        let before = pool.position_ids.len();
        pool.untrack_position(params.token_id);
        before != pool.position_ids.len()
    };
    if changed {
        store.set(&pool)?;
    }

    Ok(Some(PositionUpdate {
        accruals,
        value_increase_usd: position.value_usd.saturating_sub(previous_value),
        position,
    }))
}

/// Settle a position for its current owner, then hand it to `to`.
///
/// Returns the previous owner, or `None` for an unknown position.
pub fn transfer_position(
    store: &mut dyn Store,
    ctx: &AccrualContext<'_>,
    settlement: &dyn LpSettlement,
    token_id: &str,
    to: &str,
    at: u64,
) -> Result<Option<(String, Vec<LpAccrual>)>> {
    if store.get::<UserLpPosition>(token_id)?.is_none() {
        return Ok(None);
    }
    let accruals = settlement.settle_position(store, ctx, token_id, at)?;
    let Some(mut position) = store.get::<UserLpPosition>(token_id)? else {
        return Ok(None);
    };
    let previous = std::mem::replace(&mut position.owner, to.to_string());
    store.set(&position)?;
    Ok(Some((previous, accruals)))
}
