//! Default seeding on first use.

use tally_db::{Store, StoreExt};
use tally_types::epoch::{LeaderboardConfig, LEADERBOARD_CONFIG_ID};
use tally_types::nft::{NftMultiplierConfig, NFT_MULTIPLIER_CONFIG_ID};
use tally_types::ve::VotingPowerTier;
use tally_types::Entity;
use tally_vp::default_tiers;
use tracing::info;

use crate::Result;

/// Seed `config`, the default voting-power tiers and the default NFT
/// config where absent. Returns the number of records written.
pub fn bootstrap_defaults(store: &mut dyn Store, config: &LeaderboardConfig) -> Result<usize> {
    let mut written = 0;
    if store
        .get::<LeaderboardConfig>(LEADERBOARD_CONFIG_ID)?
        .is_none()
    {
        store.set(config)?;
        written += 1;
    }
    if store.list_ids(VotingPowerTier::KIND)?.is_empty() {
        for tier in default_tiers() {
            store.set(&tier)?;
            written += 1;
        }
    }
    if store
        .get::<NftMultiplierConfig>(NFT_MULTIPLIER_CONFIG_ID)?
        .is_none()
    {
        store.set(&NftMultiplierConfig::default())?;
        written += 1;
    }
    if written > 0 {
        info!(records = written, "seeded default leaderboard configuration");
    }
    Ok(written)
}
