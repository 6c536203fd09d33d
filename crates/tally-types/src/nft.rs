//! NFT partnership multipliers.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::{composite_id, Entity};

/// Id of the singleton [`NftMultiplierConfig`].
pub const NFT_MULTIPLIER_CONFIG_ID: &str = "global";

/// Default bonus of the first collection held (bps).
pub const DEFAULT_NFT_FIRST_BONUS: u64 = 1_000;

/// Default per-collection decay of the bonus (bps).
pub const DEFAULT_NFT_DECAY_RATIO: u64 = 9_000;

/// Geometric-decay parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftMultiplierConfig {
    pub first_bonus: u64,
    pub decay_ratio: u64,
}

impl Default for NftMultiplierConfig {
    fn default() -> Self {
        Self {
            first_bonus: DEFAULT_NFT_FIRST_BONUS,
            decay_ratio: DEFAULT_NFT_DECAY_RATIO,
        }
    }
}

impl Entity for NftMultiplierConfig {
    const KIND: &'static str = "nft_multiplier_config";

    fn id(&self) -> String {
        NFT_MULTIPLIER_CONFIG_ID.to_string()
    }
}

/// A partner collection. A non-zero `static_boost_bps` replaces the
/// geometric bonus for this collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftPartnership {
    pub collection: String,
    pub is_active: bool,
    pub static_boost_bps: u64,
}

impl Entity for NftPartnership {
    const KIND: &'static str = "nft_partnership";

    fn id(&self) -> String {
        self.collection.clone()
    }
}

/// Ids of every configured partnership.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftPartnershipRegistry {
    pub collections: Vec<String>,
}

/// Id of the singleton [`NftPartnershipRegistry`].
pub const NFT_PARTNERSHIP_REGISTRY_ID: &str = "all";

impl Entity for NftPartnershipRegistry {
    const KIND: &'static str = "nft_partnership_registry";

    fn id(&self) -> String {
        NFT_PARTNERSHIP_REGISTRY_ID.to_string()
    }
}

/// Balance of one user in one partner collection.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserNftHolding {
    pub user: String,
    pub collection: String,
    #[serde_as(as = "DisplayFromStr")]
    pub balance: u128,
    /// On-chain baseline read done.
    pub synced: bool,
}

impl UserNftHolding {
    /// `"{user}:{collection}"`.
    pub fn key(user: &str, collection: &str) -> String {
        composite_id(&[user, collection])
    }
}

impl Entity for UserNftHolding {
    const KIND: &'static str = "user_nft_holding";

    fn id(&self) -> String {
        Self::key(&self.user, &self.collection)
    }
}
