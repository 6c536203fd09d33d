//! NFT holding multiplier.
//!
//! Each held partner collection adds a bonus. Collections without a static
//! boost share a geometrically decaying bonus sequence:
//!
//! ```text
//! bonus_0     = first_bonus
//! bonus_{i+1} = bonus_i × decay_ratio / 10000
//! ```
//!
//! Collections with a static boost add that boost instead.

use tally_db::{Store, StoreExt};
use tally_math::BPS_DENOMINATOR;
use tally_types::nft::{
    NftMultiplierConfig, NftPartnership, NftPartnershipRegistry, UserNftHolding,
    NFT_MULTIPLIER_CONFIG_ID, NFT_PARTNERSHIP_REGISTRY_ID,
};
use tally_types::NEUTRAL_MULTIPLIER_BPS;

use crate::Result;

/// Hard cap on the NFT multiplier (5×).
pub const MAX_NFT_MULTIPLIER_BPS: u64 = 50_000;

/// `10000 + Σ_{i<count} bonus_i`, capped at [`MAX_NFT_MULTIPLIER_BPS`].
///
/// # Arguments
///
/// * `count` - Number of geometric-bonus collections held
/// * `config` - Decay parameters
pub fn calculate_nft_multiplier_from_count(count: u32, config: &NftMultiplierConfig) -> u64 {
    let mut total = NEUTRAL_MULTIPLIER_BPS;
    let mut bonus = config.first_bonus;
    for _ in 0..count {
        if bonus == 0 || total >= MAX_NFT_MULTIPLIER_BPS {
            break;
        }
        total = total.saturating_add(bonus);
        bonus = bonus.saturating_mul(config.decay_ratio) / BPS_DENOMINATOR;
    }
    total.min(MAX_NFT_MULTIPLIER_BPS)
}

/// Stored config, or the defaults.
pub fn load_nft_config(store: &dyn Store) -> Result<NftMultiplierConfig> {
    Ok(store
        .get::<NftMultiplierConfig>(NFT_MULTIPLIER_CONFIG_ID)?
        .unwrap_or_default())
}

/// Active partnerships in which `user` holds a positive balance.
pub fn held_partnerships(store: &dyn Store, user: &str) -> Result<Vec<NftPartnership>> {
    let registry = store
        .get::<NftPartnershipRegistry>(NFT_PARTNERSHIP_REGISTRY_ID)?
        .unwrap_or_default();
    let mut held = Vec::new();
    for collection in &registry.collections {
        let Some(partnership) = store.get::<NftPartnership>(collection)? else {
            continue;
        };
        if !partnership.is_active {
            continue;
        }
        let key = UserNftHolding::key(user, collection);
        if let Some(holding) = store.get::<UserNftHolding>(&key)? {
            if holding.balance > 0 {
                held.push(partnership);
            }
        }
    }
    Ok(held)
}

/// `(collections held, multiplier bps)` for `user`.
pub fn nft_multiplier_for_user(store: &dyn Store, user: &str) -> Result<(u32, u64)> {
    let config = load_nft_config(store)?;
    let held = held_partnerships(store, user)?;

    let geometric = held.iter().filter(|p| p.static_boost_bps == 0).count() as u32;
    let static_boost: u64 = held
        .iter()
        .map(|p| p.static_boost_bps)
        .fold(0u64, |acc, b| acc.saturating_add(b));

    let multiplier = calculate_nft_multiplier_from_count(geometric, &config)
        .saturating_add(static_boost)
        .min(MAX_NFT_MULTIPLIER_BPS);
    Ok((held.len() as u32, multiplier))
}
