//! Epochs, the global leaderboard state, and the admin-set rate config.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::{Entity, USD_SCALE};

/// A bounded scoring period.
///
/// Observed boundary fields (`start_*`, `end_*`) use 0 for "not yet
/// recorded" and are written once: a positive value is never overwritten.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Epoch {
    /// Sequential epoch number, starting at 1.
    pub epoch_number: u64,
    /// Block at which the epoch was observed to start.
    pub start_block: u64,
    /// Actual start time.
    pub start_time: u64,
    /// Block at which the epoch was observed to end.
    pub end_block: u64,
    /// Actual end time.
    pub end_time: u64,
    /// Whether this is the epoch accrual currently writes to.
    pub is_active: bool,
    /// `end_time - start_time` once both are known.
    pub duration: Option<u64>,
    /// Admin target start.
    pub scheduled_start_time: u64,
    /// Admin target end.
    pub scheduled_end_time: u64,
}

impl Epoch {
    /// A scheduled-nothing epoch record.
    pub fn new(epoch_number: u64) -> Self {
        Self {
            epoch_number,
            start_block: 0,
            start_time: 0,
            end_block: 0,
            end_time: 0,
            is_active: false,
            duration: None,
            scheduled_start_time: 0,
            scheduled_end_time: 0,
        }
    }

    /// Whether an actual end time has been recorded.
    pub fn has_ended(&self) -> bool {
        self.end_time > 0
    }

    /// Clamp `timestamp` to the epoch's recorded end, if any.
    pub fn clamp_to_end(&self, timestamp: u64) -> u64 {
        if self.has_ended() {
            timestamp.min(self.end_time)
        } else {
            timestamp
        }
    }
}

impl Entity for Epoch {
    const KIND: &'static str = "epoch";

    fn id(&self) -> String {
        self.epoch_number.to_string()
    }
}

/// Id of the singleton [`LeaderboardState`].
pub const LEADERBOARD_STATE_ID: &str = "current";

/// Which epoch accrual writes to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardState {
    /// 0 before genesis.
    pub current_epoch_number: u64,
    /// Whether `current_epoch_number` is active.
    pub is_active: bool,
    /// Bumped on every persisted change.
    pub version: u64,
}

impl Entity for LeaderboardState {
    const KIND: &'static str = "leaderboard_state";

    fn id(&self) -> String {
        LEADERBOARD_STATE_ID.to_string()
    }
}

/// Id of the singleton [`LeaderboardConfig`].
pub const LEADERBOARD_CONFIG_ID: &str = "global";

/// Default deposit accrual rate (1 point per USD-day).
pub const DEFAULT_DEPOSIT_RATE_BPS: u64 = 10_000;
/// Default borrow accrual rate.
pub const DEFAULT_BORROW_RATE_BPS: u64 = 15_000;
/// Default voting-power accrual rate.
pub const DEFAULT_VP_RATE_BPS: u64 = 10_000;
/// Default LP in-range accrual rate.
pub const DEFAULT_LP_RATE_BPS: u64 = 20_000;
/// Default daily supply bonus (10 points, scaled).
pub const DEFAULT_DAILY_SUPPLY_BONUS: u128 = 10_000_000_000_000_000_000;
/// Default daily borrow bonus.
pub const DEFAULT_DAILY_BORROW_BONUS: u128 = 10_000_000_000_000_000_000;
/// Default daily repay bonus.
pub const DEFAULT_DAILY_REPAY_BONUS: u128 = 5_000_000_000_000_000_000;
/// Default daily LP bonus.
pub const DEFAULT_DAILY_LP_BONUS: u128 = 5_000_000_000_000_000_000;
/// Default settlement cooldown.
pub const DEFAULT_COOLDOWN_SECONDS: u64 = 300;
/// Default minimum USD activity for a daily bonus ($10).
pub const DEFAULT_MIN_DAILY_BONUS_USD: u128 = 10 * USD_SCALE;
/// Default leaderboard depth.
pub const DEFAULT_TOP_K: u32 = 100;
/// Hard cap on the combined multiplier (10×).
pub const DEFAULT_MAX_MULTIPLIER_BPS: u64 = 100_000;

/// Admin-set accrual parameters.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    pub deposit_rate_bps: u64,
    pub borrow_rate_bps: u64,
    pub vp_rate_bps: u64,
    pub lp_rate_bps: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub daily_supply_bonus: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub daily_borrow_bonus: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub daily_repay_bonus: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub daily_lp_bonus: u128,
    pub cooldown_seconds: u64,
    /// USD with 8 decimals.
    #[serde_as(as = "DisplayFromStr")]
    pub min_daily_bonus_usd: u128,
    pub top_k: u32,
    pub max_multiplier_bps: u64,
    /// Settlement before this block never accrues.
    pub start_block: u64,
    /// Bumped on every persisted change.
    pub version: u64,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            deposit_rate_bps: DEFAULT_DEPOSIT_RATE_BPS,
            borrow_rate_bps: DEFAULT_BORROW_RATE_BPS,
            vp_rate_bps: DEFAULT_VP_RATE_BPS,
            lp_rate_bps: DEFAULT_LP_RATE_BPS,
            daily_supply_bonus: DEFAULT_DAILY_SUPPLY_BONUS,
            daily_borrow_bonus: DEFAULT_DAILY_BORROW_BONUS,
            daily_repay_bonus: DEFAULT_DAILY_REPAY_BONUS,
            daily_lp_bonus: DEFAULT_DAILY_LP_BONUS,
            cooldown_seconds: DEFAULT_COOLDOWN_SECONDS,
            min_daily_bonus_usd: DEFAULT_MIN_DAILY_BONUS_USD,
            top_k: DEFAULT_TOP_K,
            max_multiplier_bps: DEFAULT_MAX_MULTIPLIER_BPS,
            start_block: 0,
            version: 0,
        }
    }
}

impl Entity for LeaderboardConfig {
    const KIND: &'static str = "leaderboard_config";

    fn id(&self) -> String {
        LEADERBOARD_CONFIG_ID.to_string()
    }
}

/// A single updatable [`LeaderboardConfig`] field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigField {
    DepositRateBps,
    BorrowRateBps,
    VpRateBps,
    LpRateBps,
    DailySupplyBonus,
    DailyBorrowBonus,
    DailyRepayBonus,
    DailyLpBonus,
    CooldownSeconds,
    MinDailyBonusUsd,
    TopK,
    MaxMultiplierBps,
    StartBlock,
}

impl LeaderboardConfig {
    /// Set one field. Values wider than the field saturate.
    pub fn apply(&mut self, field: ConfigField, value: u128) {
        let as_u64 = u64::try_from(value).unwrap_or(u64::MAX);
        match field {
            ConfigField::DepositRateBps => self.deposit_rate_bps = as_u64,
            ConfigField::BorrowRateBps => self.borrow_rate_bps = as_u64,
            ConfigField::VpRateBps => self.vp_rate_bps = as_u64,
            ConfigField::LpRateBps => self.lp_rate_bps = as_u64,
            ConfigField::DailySupplyBonus => self.daily_supply_bonus = value,
            ConfigField::DailyBorrowBonus => self.daily_borrow_bonus = value,
            ConfigField::DailyRepayBonus => self.daily_repay_bonus = value,
            ConfigField::DailyLpBonus => self.daily_lp_bonus = value,
            ConfigField::CooldownSeconds => self.cooldown_seconds = as_u64,
            ConfigField::MinDailyBonusUsd => self.min_daily_bonus_usd = value,
            ConfigField::TopK => self.top_k = u32::try_from(value).unwrap_or(u32::MAX),
            ConfigField::MaxMultiplierBps => self.max_multiplier_bps = as_u64,
            ConfigField::StartBlock => self.start_block = as_u64,
        }
        self.version += 1;
    }
}
