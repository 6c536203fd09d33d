//! Cumulative price-hours index.
//!
//! ```text
//! cumulative += price × Δt / 3600
//! ```
//!
//! The index is advanced lazily: whenever a settlement or price update
//! touches an asset, the price in force since `last_update_timestamp` is
//! integrated up to the current block time.
//!
//! Each record also carries a per-epoch reset baseline, the index value at
//! the start of the current epoch, so the first settlement of a user in a
//! new epoch can subtract pre-epoch contribution in O(1).

use tally_db::{Store, StoreExt};
use tally_math::mul_div_u128;
use tally_types::epoch::Epoch;
use tally_types::reserve::AssetPrice;
use tally_types::SECONDS_PER_HOUR;
use tracing::{debug, trace, warn};

use crate::{OracleError, PriceDefaults, Result};

/// Allowed distance between a stored reset baseline's timestamp and the
/// epoch start for the baseline to be used.
pub const RESET_TOLERANCE_SECS: u64 = 60;

/// Result of [`update_price_oracle_index`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceIndexUpdate {
    /// Persisted record after the update.
    pub price: AssetPrice,
    /// `cumulative_usd_price_hours` before this update.
    pub idx_before: u128,
}

/// Price-hours accumulated by `price` over `seconds`.
fn price_hours(price: u128, seconds: u64) -> u128 {
    mul_div_u128(price, seconds as u128, SECONDS_PER_HOUR as u128)
}

/// Start time of `epoch` if it is active and has started.
fn active_start(epoch: Option<&Epoch>) -> Option<(u64, u64)> {
    epoch
        .filter(|e| e.is_active && e.start_time > 0)
        .map(|e| (e.epoch_number, e.start_time))
}

/// Load the price record of `asset`, seeding it from defaults if absent.
///
/// An existing record is returned unchanged. A new record's timestamp is
/// the active epoch's start when that start is earlier than `timestamp`, so
/// the first settlement in the epoch integrates from the epoch start.
///
/// # Arguments
///
/// * `store` - Entity store
/// * `defaults` - Seed price table
/// * `asset` - Asset address
/// * `timestamp` - Current block time
/// * `epoch` - Current epoch, if any
/// * `decimals_hint` - Token decimals read from chain, preferred over the table
pub fn ensure_asset_price(
    store: &mut dyn Store,
    defaults: &PriceDefaults,
    asset: &str,
    timestamp: u64,
    epoch: Option<&Epoch>,
    decimals_hint: Option<u32>,
) -> Result<AssetPrice> {
    if let Some(existing) = store.get::<AssetPrice>(asset)? {
        return Ok(existing);
    }

    let (price_usd, table_decimals) = defaults.lookup(asset);
    let mut record = AssetPrice {
        asset: asset.to_string(),
        price_usd,
        decimals: decimals_hint.unwrap_or(table_decimals),
        cumulative_usd_price_hours: 0,
        last_update_timestamp: timestamp,
        reset_epoch: 0,
        reset_cumulative_usd_price_hours: 0,
        reset_timestamp: 0,
        is_default: true,
    };
    if let Some((number, start)) = active_start(epoch) {
        if start < timestamp {
            record.last_update_timestamp = start;
        }
        record.reset_epoch = number;
        record.reset_timestamp = start;
    }

    debug!(
        asset,
        price_usd,
        decimals = record.decimals,
        seeded_at = record.last_update_timestamp,
        "seeded default asset price"
    );
    store.set(&record)?;
    Ok(record)
}

/// Value of the index at `timestamp`, assuming the current price has been
/// in force since the last update.
///
/// Times before the last update extrapolate backwards at the current price.
pub fn index_at(price: &AssetPrice, timestamp: u64) -> u128 {
    let last = price.last_update_timestamp;
    if timestamp >= last {
        price
            .cumulative_usd_price_hours
            .saturating_add(price_hours(price.price_usd, timestamp - last))
    } else {
        price
            .cumulative_usd_price_hours
            .saturating_sub(price_hours(price.price_usd, last - timestamp))
    }
}

/// Advance the index of `asset` to `timestamp` and persist it.
///
/// On the first update inside a newly started epoch, a reset baseline is
/// recorded: the index value at the epoch start, back-filled from the last
/// real update. Returns `None` if the asset has no price record.
///
/// # Arguments
///
/// * `store` - Entity store
/// * `asset` - Asset address
/// * `timestamp` - Current block time
/// * `epoch` - Current epoch, if any
pub fn update_price_oracle_index(
    store: &mut dyn Store,
    asset: &str,
    timestamp: u64,
    epoch: Option<&Epoch>,
) -> Result<Option<PriceIndexUpdate>> {
    let Some(mut price) = store.get::<AssetPrice>(asset)? else {
        debug!(asset, "no price record; index not advanced");
        return Ok(None);
    };
    let idx_before = price.cumulative_usd_price_hours;

    if let Some((number, start)) = active_start(epoch) {
        if price.reset_epoch != number {
            price.reset_cumulative_usd_price_hours = index_at(&price, start);
            price.reset_epoch = number;
            price.reset_timestamp = start;
            trace!(
                asset,
                epoch = number,
                baseline = price.reset_cumulative_usd_price_hours,
                "recorded epoch reset baseline"
            );
        }
    }

    if timestamp > price.last_update_timestamp {
        price.cumulative_usd_price_hours = index_at(&price, timestamp);
        price.last_update_timestamp = timestamp;
    }

    store.set(&price)?;
    Ok(Some(PriceIndexUpdate { price, idx_before }))
}

/// The stored reset baseline of `price`, if it belongs to `epoch` and its
/// timestamp lies within [`RESET_TOLERANCE_SECS`] of the epoch start.
pub fn trusted_reset_baseline(price: &AssetPrice, epoch: &Epoch) -> Option<u128> {
    if price.reset_epoch != epoch.epoch_number || epoch.start_time == 0 {
        return None;
    }
    if price.reset_timestamp.abs_diff(epoch.start_time) > RESET_TOLERANCE_SECS {
        return None;
    }
    Some(price.reset_cumulative_usd_price_hours)
}

/// Record a new oracle price.
///
/// The index is first advanced with the old price so the new price only
/// applies from `timestamp` on.
pub fn apply_price_update(
    store: &mut dyn Store,
    defaults: &PriceDefaults,
    asset: &str,
    new_price: u128,
    timestamp: u64,
    epoch: Option<&Epoch>,
) -> Result<AssetPrice> {
    ensure_asset_price(store, defaults, asset, timestamp, epoch, None)?;
    let mut price = match update_price_oracle_index(store, asset, timestamp, epoch)? {
        Some(update) => update.price,
        None => return ensure_asset_price(store, defaults, asset, timestamp, epoch, None),
    };
    if new_price == 0 {
        warn!(asset, "zero oracle price recorded");
    }
    price.price_usd = new_price;
    price.is_default = false;
    store.set(&price)?;
    Ok(price)
}

/// USD value (8 decimals) of `amount` base units at the cached price.
///
/// # Errors
///
/// - [`OracleError::UnsupportedDecimals`] if `10^decimals` exceeds `u128`
pub fn token_value_usd(price: &AssetPrice, amount: u128) -> Result<u128> {
    let unit = 10u128
        .checked_pow(price.decimals)
        .ok_or_else(|| OracleError::UnsupportedDecimals {
            asset: price.asset.clone(),
            decimals: price.decimals,
        })?;
    Ok(mul_div_u128(amount, price.price_usd, unit))
}
