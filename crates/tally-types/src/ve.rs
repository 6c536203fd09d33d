//! Voting-escrow locks and voting-power tiers.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::Entity;

/// Maximum lock duration: four years.
pub const MAX_LOCK_TIME: u64 = 4 * 365 * 86_400;

/// Maximum number of tiers scanned.
pub const MAX_VP_TIERS: usize = 20;

/// A time-locked token position.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VeLock {
    pub token_id: String,
    pub owner: String,
    #[serde_as(as = "DisplayFromStr")]
    pub amount: u128,
    pub lock_end: u64,
    pub is_permanent: bool,
    pub updated_at: u64,
}

impl Entity for VeLock {
    const KIND: &'static str = "ve_lock";

    fn id(&self) -> String {
        self.token_id.clone()
    }
}

/// A voting-power threshold and the multiplier it grants.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingPowerTier {
    pub tier_id: u32,
    #[serde_as(as = "DisplayFromStr")]
    pub min_voting_power: u128,
    pub multiplier_bps: u64,
    /// Soft-delete flag.
    pub is_active: bool,
}

impl Entity for VotingPowerTier {
    const KIND: &'static str = "voting_power_tier";

    fn id(&self) -> String {
        self.tier_id.to_string()
    }
}
