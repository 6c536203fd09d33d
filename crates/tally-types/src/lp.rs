//! Concentrated-liquidity pools and user LP positions.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::Entity;

/// Pool state mirrored from swaps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LpPool {
    pub pool: String,
    pub token0: String,
    pub token1: String,
    pub fee: u32,
    pub current_tick: i32,
    /// Q64.96 as a decimal string.
    pub sqrt_price_x96: String,
    pub last_tick_update: u64,
    /// Open positions in this pool.
    pub position_ids: Vec<String>,
}

impl LpPool {
    /// Record a position. Returns `true` if newly added.
    pub fn track_position(&mut self, token_id: &str) -> bool {
        if self.position_ids.iter().any(|id| id == token_id) {
            return false;
        }
        self.position_ids.push(token_id.to_string());
        true
    }

    pub fn untrack_position(&mut self, token_id: &str) {
        self.position_ids.retain(|id| id != token_id);
    }
}

impl Entity for LpPool {
    const KIND: &'static str = "lp_pool";

    fn id(&self) -> String {
        self.pool.clone()
    }
}

/// Ids of every known pool.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LpPoolRegistry {
    pub pools: Vec<String>,
}

/// Id of the singleton [`LpPoolRegistry`].
pub const LP_POOL_REGISTRY_ID: &str = "all";

impl Entity for LpPoolRegistry {
    const KIND: &'static str = "lp_pool_registry";

    fn id(&self) -> String {
        LP_POOL_REGISTRY_ID.to_string()
    }
}

/// A user's concentrated-liquidity position.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLpPosition {
    pub token_id: String,
    pub owner: String,
    pub pool: String,
    pub tick_lower: i32,
    pub tick_upper: i32,
    #[serde_as(as = "DisplayFromStr")]
    pub liquidity: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub amount0: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub amount1: u128,
    /// 8 decimals.
    #[serde_as(as = "DisplayFromStr")]
    pub value_usd: u128,
    pub is_in_range: bool,
    /// Total seconds settled while in range.
    pub in_range_seconds: u64,
    pub last_settled_at: u64,
    /// Epoch of the last settlement.
    pub last_epoch: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub lp_points: u128,
    pub is_open: bool,
}

impl UserLpPosition {
    pub fn new(token_id: &str, owner: &str, pool: &str, timestamp: u64) -> Self {
        Self {
            token_id: token_id.to_string(),
            owner: owner.to_string(),
            pool: pool.to_string(),
            tick_lower: 0,
            tick_upper: 0,
            liquidity: 0,
            amount0: 0,
            amount1: 0,
            value_usd: 0,
            is_in_range: false,
            in_range_seconds: 0,
            last_settled_at: timestamp,
            last_epoch: 0,
            lp_points: 0,
            is_open: true,
        }
    }
}

impl Entity for UserLpPosition {
    const KIND: &'static str = "user_lp_position";

    fn id(&self) -> String {
        self.token_id.clone()
    }
}
