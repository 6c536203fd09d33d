//! Per-user ledgers: multiplier state, per-epoch stats, lifetime totals.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::{user_epoch_id, Entity, NEUTRAL_MULTIPLIER_BPS};

/// Multiplier inputs and membership lists for one user.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLeaderboardState {
    pub user: String,
    /// Partner collections with a positive balance.
    pub nft_count: u32,
    pub nft_multiplier_bps: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub voting_power: u128,
    pub vp_tier_index: Option<usize>,
    pub vp_multiplier_bps: u64,
    /// `min(nft × vp / 10000, 100000)`.
    pub combined_multiplier_bps: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub lifetime_points: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub lifetime_points_with_multiplier: u128,
    pub current_epoch: u64,
    pub current_rank: u32,
    /// Added to epoch 1 totals only.
    #[serde_as(as = "DisplayFromStr")]
    pub testnet_bonus: u128,
    /// Reserves the user has ever touched.
    pub reserves: Vec<String>,
    /// LP position ids currently owned.
    pub lp_positions: Vec<String>,
    /// Voting-escrow lock ids currently owned.
    pub ve_locks: Vec<String>,
    /// One-time LP ownership scan done.
    pub lp_synced: bool,
}

impl UserLeaderboardState {
    /// Neutral state for a user seen for the first time.
    pub fn new(user: &str) -> Self {
        Self {
            user: user.to_string(),
            nft_count: 0,
            nft_multiplier_bps: NEUTRAL_MULTIPLIER_BPS,
            voting_power: 0,
            vp_tier_index: None,
            vp_multiplier_bps: NEUTRAL_MULTIPLIER_BPS,
            combined_multiplier_bps: NEUTRAL_MULTIPLIER_BPS,
            lifetime_points: 0,
            lifetime_points_with_multiplier: 0,
            current_epoch: 0,
            current_rank: 0,
            testnet_bonus: 0,
            reserves: Vec::new(),
            lp_positions: Vec::new(),
            ve_locks: Vec::new(),
            lp_synced: false,
        }
    }

    /// Record membership of `reserve`. Returns `true` if newly added.
    pub fn track_reserve(&mut self, reserve: &str) -> bool {
        track(&mut self.reserves, reserve)
    }

    /// Record ownership of an LP position. Returns `true` if newly added.
    pub fn track_lp_position(&mut self, token_id: &str) -> bool {
        track(&mut self.lp_positions, token_id)
    }

    /// Forget an LP position.
    pub fn untrack_lp_position(&mut self, token_id: &str) {
        self.lp_positions.retain(|id| id != token_id);
    }

    /// Record ownership of a voting-escrow lock. Returns `true` if newly added.
    pub fn track_ve_lock(&mut self, token_id: &str) -> bool {
        track(&mut self.ve_locks, token_id)
    }

    /// Forget a voting-escrow lock.
    pub fn untrack_ve_lock(&mut self, token_id: &str) {
        self.ve_locks.retain(|id| id != token_id);
    }
}

fn track(list: &mut Vec<String>, id: &str) -> bool {
    if list.iter().any(|existing| existing == id) {
        return false;
    }
    list.push(id.to_string());
    true
}

impl Entity for UserLeaderboardState {
    const KIND: &'static str = "user_leaderboard_state";

    fn id(&self) -> String {
        self.user.clone()
    }
}

/// Point categories of [`UserEpochStats`] that carry a multiplier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointCategory {
    Deposit,
    Borrow,
    Lp,
    DailySupply,
    DailyBorrow,
    DailyRepay,
    DailyLp,
    VotingPower,
}

/// A raw point delta with its multiplier-scaled counterpart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PointDelta {
    pub raw: u128,
    pub scaled: u128,
}

impl PointDelta {
    pub fn is_zero(&self) -> bool {
        self.raw == 0 && self.scaled == 0
    }
}

/// The canonical scoring ledger of one user in one epoch.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEpochStats {
    pub user: String,
    pub epoch_number: u64,

    #[serde_as(as = "DisplayFromStr")]
    pub deposit_points: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub deposit_points_with_multiplier: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub borrow_points: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub borrow_points_with_multiplier: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub lp_points: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub lp_points_with_multiplier: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub daily_supply_points: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub daily_supply_points_with_multiplier: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub daily_borrow_points: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub daily_borrow_points_with_multiplier: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub daily_repay_points: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub daily_repay_points_with_multiplier: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub daily_lp_points: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub daily_lp_points_with_multiplier: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub vp_daily_points: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub vp_daily_points_with_multiplier: u128,
    /// Net manual awards; removals floor at zero.
    #[serde_as(as = "DisplayFromStr")]
    pub manual_award_points: u128,

    /// Combined multiplier last applied.
    pub multiplier_bps: u64,

    pub last_supply_bonus_day: Option<u64>,
    pub last_borrow_bonus_day: Option<u64>,
    pub last_repay_bonus_day: Option<u64>,
    pub last_lp_bonus_day: Option<u64>,

    /// UTC day of `highwater_usd`.
    pub highwater_day: u64,
    /// Highest deposit USD value seen during `highwater_day` (8 decimals).
    #[serde_as(as = "DisplayFromStr")]
    pub highwater_usd: u128,

    pub last_settlement_at: u64,
    pub last_vp_accrual_at: u64,

    #[serde_as(as = "DisplayFromStr")]
    pub total_points: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub total_points_with_multiplier: u128,
    pub rank: u32,
}

impl UserEpochStats {
    /// Empty ledger.
    pub fn new(user: &str, epoch_number: u64) -> Self {
        Self {
            user: user.to_string(),
            epoch_number,
            multiplier_bps: NEUTRAL_MULTIPLIER_BPS,
            ..Self::default()
        }
    }

    /// Add a delta to a category.
    pub fn credit(&mut self, category: PointCategory, delta: PointDelta) {
        let (raw, scaled) = match category {
            PointCategory::Deposit => (
                &mut self.deposit_points,
                &mut self.deposit_points_with_multiplier,
            ),
            PointCategory::Borrow => (
                &mut self.borrow_points,
                &mut self.borrow_points_with_multiplier,
            ),
            PointCategory::Lp => (&mut self.lp_points, &mut self.lp_points_with_multiplier),
            PointCategory::DailySupply => (
                &mut self.daily_supply_points,
                &mut self.daily_supply_points_with_multiplier,
            ),
            PointCategory::DailyBorrow => (
                &mut self.daily_borrow_points,
                &mut self.daily_borrow_points_with_multiplier,
            ),
            PointCategory::DailyRepay => (
                &mut self.daily_repay_points,
                &mut self.daily_repay_points_with_multiplier,
            ),
            PointCategory::DailyLp => (
                &mut self.daily_lp_points,
                &mut self.daily_lp_points_with_multiplier,
            ),
            PointCategory::VotingPower => (
                &mut self.vp_daily_points,
                &mut self.vp_daily_points_with_multiplier,
            ),
        };
        *raw = raw.saturating_add(delta.raw);
        *scaled = scaled.saturating_add(delta.scaled);
    }

    /// Last bonus day marker for a daily category.
    pub fn bonus_day_mut(&mut self, category: PointCategory) -> Option<&mut Option<u64>> {
        match category {
            PointCategory::DailySupply => Some(&mut self.last_supply_bonus_day),
            PointCategory::DailyBorrow => Some(&mut self.last_borrow_bonus_day),
            PointCategory::DailyRepay => Some(&mut self.last_repay_bonus_day),
            PointCategory::DailyLp => Some(&mut self.last_lp_bonus_day),
            _ => None,
        }
    }

    /// Recompute `total_points` and `total_points_with_multiplier`.
    ///
    /// `testnet_bonus` is added to the multiplied total in epoch 1 only.
    pub fn recompute_totals(&mut self, testnet_bonus: u128) {
        let manual = self.manual_award_points;
        let raw = [
            self.deposit_points,
            self.borrow_points,
            self.lp_points,
            self.daily_supply_points,
            self.daily_borrow_points,
            self.daily_repay_points,
            self.daily_lp_points,
            self.vp_daily_points,
            manual,
        ];
        let scaled = [
            self.deposit_points_with_multiplier,
            self.borrow_points_with_multiplier,
            self.lp_points_with_multiplier,
            self.daily_supply_points_with_multiplier,
            self.daily_borrow_points_with_multiplier,
            self.daily_repay_points_with_multiplier,
            self.daily_lp_points_with_multiplier,
            self.vp_daily_points_with_multiplier,
            manual,
        ];
        self.total_points = raw.iter().fold(0u128, |acc, v| acc.saturating_add(*v));
        let mut with_multiplier = scaled.iter().fold(0u128, |acc, v| acc.saturating_add(*v));
        if self.epoch_number == 1 {
            with_multiplier = with_multiplier.saturating_add(testnet_bonus);
        }
        self.total_points_with_multiplier = with_multiplier;
    }
}

impl Entity for UserEpochStats {
    const KIND: &'static str = "user_epoch_stats";

    fn id(&self) -> String {
        user_epoch_id(&self.user, self.epoch_number)
    }
}

/// Lifetime aggregates across all epochs.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPoints {
    pub user: String,
    #[serde_as(as = "DisplayFromStr")]
    pub lifetime_points: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub lifetime_points_with_multiplier: u128,
    pub last_updated_at: u64,
}

impl Entity for UserPoints {
    const KIND: &'static str = "user_points";

    fn id(&self) -> String {
        self.user.clone()
    }
}

/// Maximum retained entries of [`MultiplierHistory`].
pub const MULTIPLIER_HISTORY_LEN: usize = 64;

/// A combined-multiplier value in force from `timestamp` on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiplierPoint {
    pub timestamp: u64,
    pub combined_bps: u64,
}

/// Bounded history of combined-multiplier changes, oldest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiplierHistory {
    pub user: String,
    /// Value in force before `points[0]`.
    pub base_bps: u64,
    pub points: Vec<MultiplierPoint>,
}

impl MultiplierHistory {
    pub fn new(user: &str) -> Self {
        Self {
            user: user.to_string(),
            base_bps: NEUTRAL_MULTIPLIER_BPS,
            points: Vec::new(),
        }
    }
}

impl Entity for MultiplierHistory {
    const KIND: &'static str = "multiplier_history";

    fn id(&self) -> String {
        self.user.clone()
    }
}

/// Append-only audit record of a combined-multiplier change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiplierSnapshot {
    pub user: String,
    pub timestamp: u64,
    pub tx_hash: String,
    pub log_index: u32,
    pub nft_multiplier_bps: u64,
    pub vp_multiplier_bps: u64,
    pub combined_multiplier_bps: u64,
    pub previous_combined_bps: u64,
}

impl Entity for MultiplierSnapshot {
    const KIND: &'static str = "multiplier_snapshot";

    fn id(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.user, self.timestamp, self.tx_hash, self.log_index
        )
    }
}

/// Leaderboard exclusion flag. Ledgers are kept while set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardBlacklist {
    pub user: String,
    pub is_blacklisted: bool,
    pub updated_at: u64,
}

impl Entity for LeaderboardBlacklist {
    const KIND: &'static str = "leaderboard_blacklist";

    fn id(&self) -> String {
        self.user.clone()
    }
}
