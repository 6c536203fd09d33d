//! Lending reserves, user reserve ledgers and asset prices.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::{composite_id, Entity};

/// Ray value of 1.0, the initial value of every reserve index.
pub const RAY_ONE: u128 = 1_000_000_000_000_000_000_000_000_000;

/// A lending reserve and its last observed index state.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserve {
    /// Reserve id (the pool-side reserve address).
    pub id: String,
    /// Underlying asset address; keys the price record.
    pub asset: String,
    pub decimals: u32,
    /// Ray.
    #[serde_as(as = "DisplayFromStr")]
    pub liquidity_index: u128,
    /// Ray.
    #[serde_as(as = "DisplayFromStr")]
    pub variable_borrow_index: u128,
    /// Annual ray rate.
    #[serde_as(as = "DisplayFromStr")]
    pub liquidity_rate: u128,
    /// Annual ray rate.
    #[serde_as(as = "DisplayFromStr")]
    pub variable_borrow_rate: u128,
    pub last_update_timestamp: u64,
}

impl Reserve {
    pub fn new(id: &str, asset: &str, decimals: u32, timestamp: u64) -> Self {
        Self {
            id: id.to_string(),
            asset: asset.to_string(),
            decimals,
            liquidity_index: RAY_ONE,
            variable_borrow_index: RAY_ONE,
            liquidity_rate: 0,
            variable_borrow_rate: 0,
            last_update_timestamp: timestamp,
        }
    }
}

impl Entity for Reserve {
    const KIND: &'static str = "reserve";

    fn id(&self) -> String {
        self.id.clone()
    }
}

/// Ids of every known reserve, for epoch-close snapshots.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveRegistry {
    pub reserves: Vec<String>,
}

/// Id of the singleton [`ReserveRegistry`].
pub const RESERVE_REGISTRY_ID: &str = "all";

impl Entity for ReserveRegistry {
    const KIND: &'static str = "reserve_registry";

    fn id(&self) -> String {
        RESERVE_REGISTRY_ID.to_string()
    }
}

/// Per user, per reserve accrual ledger.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserReservePoints {
    pub user: String,
    pub reserve: String,

    #[serde_as(as = "DisplayFromStr")]
    pub scaled_supply: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub scaled_borrow: u128,

    /// Actual supply balance at the last settlement.
    #[serde_as(as = "DisplayFromStr")]
    pub last_supply_amount: u128,
    /// Actual debt at the last settlement.
    #[serde_as(as = "DisplayFromStr")]
    pub last_borrow_amount: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub last_liquidity_index: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub last_borrow_index: u128,
    /// Cumulative price-hours of the asset at the last settlement.
    #[serde_as(as = "DisplayFromStr")]
    pub last_price_index: u128,
    pub last_update_timestamp: u64,
    /// Epoch of the last settlement.
    pub last_epoch: u64,

    /// Epoch of `reset_price_index`.
    pub reset_epoch: u64,
    /// Price index at the start of `reset_epoch`.
    #[serde_as(as = "DisplayFromStr")]
    pub reset_price_index: u128,

    #[serde_as(as = "DisplayFromStr")]
    pub deposit_points: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub borrow_points: u128,
}

impl UserReservePoints {
    pub fn new(user: &str, reserve: &str) -> Self {
        Self {
            user: user.to_string(),
            reserve: reserve.to_string(),
            last_liquidity_index: RAY_ONE,
            last_borrow_index: RAY_ONE,
            ..Self::default()
        }
    }

    /// `"{user}:{reserve}"`.
    pub fn key(user: &str, reserve: &str) -> String {
        composite_id(&[user, reserve])
    }

    /// Whether both scaled balances are zero.
    pub fn is_empty(&self) -> bool {
        self.scaled_supply == 0 && self.scaled_borrow == 0
    }
}

impl Entity for UserReservePoints {
    const KIND: &'static str = "user_reserve_points";

    fn id(&self) -> String {
        Self::key(&self.user, &self.reserve)
    }
}

/// Reserve state frozen at an epoch's boundaries.
///
/// The start fields are written when the epoch opens, the end fields when
/// it closes. A user settling after the close accrues against these values
/// instead of the live indices.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveEpochSnapshot {
    pub reserve: String,
    pub epoch_number: u64,
    pub start_timestamp: u64,
    /// Asset price index at the epoch start.
    #[serde_as(as = "DisplayFromStr")]
    pub start_price_index: u128,
    /// 0 until the epoch closes.
    pub end_timestamp: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub liquidity_index: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub variable_borrow_index: u128,
    /// Asset price index at the epoch end.
    #[serde_as(as = "DisplayFromStr")]
    pub price_index: u128,
}

impl ReserveEpochSnapshot {
    pub fn new(reserve: &str, epoch_number: u64) -> Self {
        Self {
            reserve: reserve.to_string(),
            epoch_number,
            start_timestamp: 0,
            start_price_index: 0,
            end_timestamp: 0,
            liquidity_index: RAY_ONE,
            variable_borrow_index: RAY_ONE,
            price_index: 0,
        }
    }

    /// `"{reserve}:{epoch}"`.
    pub fn key(reserve: &str, epoch: u64) -> String {
        format!("{reserve}:{epoch}")
    }

    pub fn is_closed(&self) -> bool {
        self.end_timestamp > 0
    }
}

impl Entity for ReserveEpochSnapshot {
    const KIND: &'static str = "reserve_epoch_snapshot";

    fn id(&self) -> String {
        Self::key(&self.reserve, self.epoch_number)
    }
}

/// Cached USD price and time-integrated price index of an asset.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPrice {
    pub asset: String,
    /// 8 decimals.
    #[serde_as(as = "DisplayFromStr")]
    pub price_usd: u128,
    /// Token decimals.
    pub decimals: u32,
    /// Σ price × Δt / 3600 (8-decimal USD × hours).
    #[serde_as(as = "DisplayFromStr")]
    pub cumulative_usd_price_hours: u128,
    pub last_update_timestamp: u64,
    /// Epoch whose start `reset_cumulative_usd_price_hours` describes.
    pub reset_epoch: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub reset_cumulative_usd_price_hours: u128,
    /// Epoch start the baseline was computed for.
    pub reset_timestamp: u64,
    /// Seeded from the static table rather than an oracle update.
    pub is_default: bool,
}

impl Entity for AssetPrice {
    const KIND: &'static str = "asset_price";

    fn id(&self) -> String {
        self.asset.clone()
    }
}
