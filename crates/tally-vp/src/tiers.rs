//! Voting-power tier table.
//!
//! Tiers are scanned in ascending `min_voting_power` order, at most
//! [`MAX_VP_TIERS`] of them. The highest tier whose threshold is met wins.

use tally_db::{Store, StoreExt};
use tally_math::POINTS_SCALE;
use tally_types::ve::{VotingPowerTier, MAX_VP_TIERS};
use tally_types::NEUTRAL_MULTIPLIER_BPS;

use crate::Result;

/// Hard cap on the voting-power multiplier (5×).
pub const MAX_VP_MULTIPLIER_BPS: u64 = 50_000;

/// Default tier table: 1k/10k/50k/100k tokens.
pub fn default_tiers() -> Vec<VotingPowerTier> {
    [
        (1, 1_000u128, 11_000u64),
        (2, 10_000, 12_500),
        (3, 50_000, 15_000),
        (4, 100_000, 20_000),
    ]
    .into_iter()
    .map(|(tier_id, tokens, multiplier_bps)| VotingPowerTier {
        tier_id,
        min_voting_power: tokens * POINTS_SCALE,
        multiplier_bps,
        is_active: true,
    })
    .collect()
}

/// Active tiers, ascending by threshold (ties by id), at most [`MAX_VP_TIERS`].
pub fn load_tiers(store: &dyn Store) -> Result<Vec<VotingPowerTier>> {
    let mut tiers: Vec<VotingPowerTier> = store
        .list::<VotingPowerTier>()?
        .into_iter()
        .filter(|t| t.is_active)
        .collect();
    tiers.sort_by(|a, b| {
        a.min_voting_power
            .cmp(&b.min_voting_power)
            .then(a.tier_id.cmp(&b.tier_id))
    });
    tiers.truncate(MAX_VP_TIERS);
    Ok(tiers)
}

/// Index of the highest qualifying tier in `tiers`, if any.
///
/// `tiers` must be ascending by threshold, as returned by [`load_tiers`].
pub fn find_vp_tier_index(voting_power: u128, tiers: &[VotingPowerTier]) -> Option<usize> {
    let mut found = None;
    for (index, tier) in tiers.iter().take(MAX_VP_TIERS).enumerate() {
        if !tier.is_active {
            continue;
        }
        if voting_power >= tier.min_voting_power {
            found = Some(index);
        }
    }
    found
}

/// Multiplier bps of the highest qualifying tier, 10000 if none, capped at 5×.
pub fn calculate_vp_multiplier(voting_power: u128, tiers: &[VotingPowerTier]) -> u64 {
    match find_vp_tier_index(voting_power, tiers) {
        Some(index) => tiers[index].multiplier_bps.min(MAX_VP_MULTIPLIER_BPS),
        None => NEUTRAL_MULTIPLIER_BPS,
    }
}
