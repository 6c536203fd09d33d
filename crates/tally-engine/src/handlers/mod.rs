//! Event handlers, one module per event family.

pub mod admin;
pub mod holdings;
pub mod lending;
pub mod lp;

use tally_db::Store;
use tally_types::events::EventKind;
use tally_types::normalize_address;

use crate::context::{EventContext, Services};
use crate::globals::Globals;
use crate::Result;

/// Mint and burn counterparty.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Normalize `raw`, mapping the zero address to `None`.
pub(crate) fn counterparty(raw: &str) -> Result<Option<String>> {
    let address = normalize_address(raw)?;
    Ok((address != ZERO_ADDRESS).then_some(address))
}

/// Route one event to its handler.
pub fn dispatch(
    store: &mut dyn Store,
    svc: &Services<'_>,
    globals: &mut Globals,
    ev: &EventContext,
    event: &EventKind,
) -> Result<()> {
    use tally_accrual::BalanceChange as Change;

    match event {
        EventKind::ReserveInitialized {
            reserve,
            asset,
            decimals,
        } => lending::reserve_initialized(store, svc, globals, ev, reserve, asset, *decimals),
        EventKind::ReserveDataUpdated {
            reserve,
            liquidity_rate,
            variable_borrow_rate,
            liquidity_index,
            variable_borrow_index,
        } => lending::reserve_data_updated(
            store,
            ev,
            reserve,
            lending::ReserveRates {
                liquidity_rate: *liquidity_rate,
                variable_borrow_rate: *variable_borrow_rate,
                liquidity_index: *liquidity_index,
                variable_borrow_index: *variable_borrow_index,
            },
        ),
        EventKind::Supply {
            reserve,
            user,
            amount,
        } => lending::balance_changed(store, svc, globals, ev, reserve, user, Change::Supply(*amount)),
        EventKind::Withdraw {
            reserve,
            user,
            amount,
        } => lending::balance_changed(store, svc, globals, ev, reserve, user, Change::Withdraw(*amount)),
        EventKind::Borrow {
            reserve,
            user,
            amount,
        } => lending::balance_changed(store, svc, globals, ev, reserve, user, Change::Borrow(*amount)),
        EventKind::Repay {
            reserve,
            user,
            amount,
        } => lending::balance_changed(store, svc, globals, ev, reserve, user, Change::Repay(*amount)),
        EventKind::LiquidationCall {
            collateral_asset,
            debt_asset,
            user,
            debt_to_cover,
            liquidated_collateral_amount,
        } => lending::liquidation(
            store,
            svc,
            globals,
            ev,
            user,
            (collateral_asset.as_str(), *liquidated_collateral_amount),
            (debt_asset.as_str(), *debt_to_cover),
        ),
        EventKind::PriceUpdated { asset, price } => {
            lending::price_updated(store, svc, globals, ev, asset, *price)
        }

        EventKind::PoolInitialized {
            pool,
            token0,
            token1,
            fee,
            tick,
            sqrt_price_x96,
        } => lp::pool_initialized(
            store,
            svc,
            globals,
            ev,
            lp::RawPool {
                pool,
                token0,
                token1,
                fee: *fee,
                tick: *tick,
                sqrt_price_x96,
            },
        ),
        EventKind::PoolSwap {
            pool,
            tick,
            sqrt_price_x96,
        } => lp::pool_swap(store, svc, globals, ev, pool, *tick, sqrt_price_x96),
        EventKind::LpPositionUpdated {
            token_id,
            owner,
            pool,
            tick_lower,
            tick_upper,
            liquidity,
        } => lp::position_updated(
            store,
            svc,
            globals,
            ev,
            lp::RawPosition {
                token_id,
                owner,
                pool,
                tick_lower: *tick_lower,
                tick_upper: *tick_upper,
                liquidity: *liquidity,
            },
        ),
        EventKind::LpPositionTransferred { token_id, from, to } => {
            lp::position_transferred(store, svc, globals, ev, token_id, from, to)
        }

        EventKind::NftTransfer {
            collection,
            from,
            to,
            token_id: _,
        } => holdings::nft_transfer(store, svc, globals, ev, collection, from, to),
        EventKind::VeLockUpdated {
            token_id,
            owner,
            amount,
            lock_end,
            is_permanent,
        } => holdings::ve_lock_updated(
            store,
            svc,
            globals,
            ev,
            holdings::LockTerms {
                token_id,
                owner,
                amount: *amount,
                lock_end: *lock_end,
                is_permanent: *is_permanent,
            },
        ),
        EventKind::VeLockTransferred { token_id, from, to } => {
            holdings::ve_lock_transferred(store, svc, globals, ev, token_id, from, to)
        }
        EventKind::VeLockBurned { token_id } => {
            holdings::ve_lock_burned(store, svc, globals, ev, token_id)
        }

        EventKind::EpochStartScheduled {
            epoch_number,
            start_time,
        } => admin::epoch_start_scheduled(store, *epoch_number, *start_time),
        EventKind::EpochEndScheduled {
            epoch_number,
            end_time,
        } => admin::epoch_end_scheduled(store, *epoch_number, *end_time),
        EventKind::ConfigFieldUpdated { field, value } => {
            admin::config_field_updated(globals, *field, *value);
            Ok(())
        }
        EventKind::VotingPowerTierSet {
            tier_id,
            min_voting_power,
            multiplier_bps,
        } => admin::tier_set(store, *tier_id, *min_voting_power, *multiplier_bps),
        EventKind::VotingPowerTierRemoved { tier_id } => admin::tier_removed(store, *tier_id),
        EventKind::NftMultiplierConfigured {
            first_bonus,
            decay_ratio,
        } => admin::nft_multiplier_configured(store, *first_bonus, *decay_ratio),
        EventKind::NftPartnershipSet {
            collection,
            is_active,
            static_boost_bps,
        } => admin::nft_partnership_set(store, collection, *is_active, *static_boost_bps),
        EventKind::PointsAwarded { user, amount } => {
            admin::adjust_manual_points(store, svc, globals, ev, user, *amount, true)
        }
        EventKind::PointsRemoved { user, amount } => {
            admin::adjust_manual_points(store, svc, globals, ev, user, *amount, false)
        }
        EventKind::UserBlacklisted { user } => admin::blacklist(store, svc, globals, ev, user),
        EventKind::UserUnblacklisted { user } => admin::unblacklist(store, ev, user),
        EventKind::TestnetBonusSet { user, amount } => {
            admin::testnet_bonus_set(store, svc, globals, ev, user, *amount)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_address_is_no_counterparty() {
        assert_eq!(counterparty(ZERO_ADDRESS).expect("valid"), None);
        assert_eq!(
            counterparty("0x00000000000000000000000000000000000000AA").expect("valid"),
            Some("0x00000000000000000000000000000000000000aa".to_string())
        );
        assert!(counterparty("0x12").is_err());
    }
}
