//! Lending pool and price events.

use tally_accrual::{apply_balance_change, init_reserve, update_reserve_data, BalanceChange};
use tally_db::{Store, StoreExt};
use tally_oracle::{apply_price_update, ensure_asset_price, token_value_usd};
use tally_types::normalize_address;
use tally_types::reserve::{Reserve, ReserveRegistry, RESERVE_REGISTRY_ID};
use tally_types::user::PointCategory;
use tracing::{debug, info};

use crate::context::{EventContext, Services};
use crate::globals::Globals;
use crate::settle::{settle_points_for_user, DailyBonus, SettleOptions};
use crate::Result;

/// Rates and indices reported by `ReserveDataUpdated`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReserveRates {
    pub liquidity_rate: u128,
    pub variable_borrow_rate: u128,
    pub liquidity_index: u128,
    pub variable_borrow_index: u128,
}

pub fn reserve_initialized(
    store: &mut dyn Store,
    svc: &Services<'_>,
    globals: &Globals,
    ev: &EventContext,
    reserve: &str,
    asset: &str,
    decimals: u32,
) -> Result<()> {
    let reserve = normalize_address(reserve)?;
    let asset = normalize_address(asset)?;
    init_reserve(store, &reserve, &asset, decimals, ev.timestamp)?;
    ensure_asset_price(
        store,
        svc.defaults,
        &asset,
        ev.timestamp,
        globals.started_epoch(),
        Some(decimals),
    )?;
    Ok(())
}

pub fn reserve_data_updated(
    store: &mut dyn Store,
    ev: &EventContext,
    reserve: &str,
    rates: ReserveRates,
) -> Result<()> {
    let reserve = normalize_address(reserve)?;
    update_reserve_data(
        store,
        &reserve,
        rates.liquidity_rate,
        rates.variable_borrow_rate,
        rates.liquidity_index,
        rates.variable_borrow_index,
        ev.timestamp,
    )?;
    Ok(())
}

fn bonus_category(change: BalanceChange) -> Option<(PointCategory, u128)> {
    match change {
        BalanceChange::Supply(amount) => Some((PointCategory::DailySupply, amount)),
        BalanceChange::Borrow(amount) => Some((PointCategory::DailyBorrow, amount)),
        BalanceChange::Repay(amount) => Some((PointCategory::DailyRepay, amount)),
        BalanceChange::Withdraw(_) => None,
    }
}

/// Settle the user with the reserve as trigger, then apply the change.
pub fn balance_changed(
    store: &mut dyn Store,
    svc: &Services<'_>,
    globals: &Globals,
    ev: &EventContext,
    reserve: &str,
    user: &str,
    change: BalanceChange,
) -> Result<()> {
    let reserve_id = normalize_address(reserve)?;
    let user = normalize_address(user)?;
    let Some(reserve) = store.get::<Reserve>(&reserve_id)? else {
        debug!(reserve = %reserve_id, user = %user, "balance change on unknown reserve");
        return Ok(());
    };

    let bonus = match bonus_category(change) {
        Some((category, amount)) => {
            let price = ensure_asset_price(
                store,
                svc.defaults,
                &reserve.asset,
                ev.timestamp,
                globals.started_epoch(),
                Some(reserve.decimals),
            )?;
            Some(DailyBonus {
                category,
                value_usd: token_value_usd(&price, amount)?,
            })
        }
        None => None,
    };

    settle_points_for_user(
        store,
        svc,
        globals,
        ev,
        &user,
        Some(&reserve_id),
        SettleOptions {
            bonus,
            ..SettleOptions::default()
        },
    )?;
    apply_balance_change(store, &user, &reserve_id, change, ev.timestamp)?;
    Ok(())
}

/// Reserve whose underlying asset is `asset`.
fn reserve_for_asset(store: &dyn Store, asset: &str) -> Result<Option<String>> {
    let registry = store
        .get::<ReserveRegistry>(RESERVE_REGISTRY_ID)?
        .unwrap_or_default();
    for id in registry.reserves {
        if store.get::<Reserve>(&id)?.is_some_and(|r| r.asset == asset) {
            return Ok(Some(id));
        }
    }
    Ok(None)
}

/// Repay the borrower's debt and seize their collateral.
///
/// Both `(asset, amount)` pairs name the underlying asset, not the reserve.
pub fn liquidation(
    store: &mut dyn Store,
    svc: &Services<'_>,
    globals: &Globals,
    ev: &EventContext,
    user: &str,
    collateral: (&str, u128),
    debt: (&str, u128),
) -> Result<()> {
    let user = normalize_address(user)?;
    let collateral_reserve = reserve_for_asset(store, &normalize_address(collateral.0)?)?;
    let debt_reserve = reserve_for_asset(store, &normalize_address(debt.0)?)?;
    if collateral_reserve.is_none() && debt_reserve.is_none() {
        debug!(user = %user, "liquidation on unknown reserves");
        return Ok(());
    }

    settle_points_for_user(
        store,
        svc,
        globals,
        ev,
        &user,
        debt_reserve.as_deref().or(collateral_reserve.as_deref()),
        SettleOptions {
            ignore_cooldown: true,
            ..SettleOptions::default()
        },
    )?;
    if let Some(reserve) = &debt_reserve {
        apply_balance_change(store, &user, reserve, BalanceChange::Repay(debt.1), ev.timestamp)?;
    }
    if let Some(reserve) = &collateral_reserve {
        apply_balance_change(
            store,
            &user,
            reserve,
            BalanceChange::Withdraw(collateral.1),
            ev.timestamp,
        )?;
    }
    info!(
        user = %user,
        debt_reserve = ?debt_reserve,
        collateral_reserve = ?collateral_reserve,
        "liquidation applied"
    );
    Ok(())
}

pub fn price_updated(
    store: &mut dyn Store,
    svc: &Services<'_>,
    globals: &Globals,
    ev: &EventContext,
    asset: &str,
    price: u128,
) -> Result<()> {
    let asset = normalize_address(asset)?;
    apply_price_update(
        store,
        svc.defaults,
        &asset,
        price,
        ev.timestamp,
        globals.started_epoch(),
    )?;
    Ok(())
}
