//! Decoded chain event envelope.
//!
//! One JSON object per event:
//!
//! ```text
//! {"block": {"number": 10, "timestamp": 1700000000},
//!  "transaction": {"hash": "0x..."}, "log_index": 3, "src_address": "0x...",
//!  "event": "Supply", "params": {"reserve": "0x...", "user": "0x...", "amount": "1000"}}
//! ```
//!
//! Token amounts, indices and rates are decimal strings.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::epoch::ConfigField;
use crate::Entity;

/// Block the event was emitted in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    pub number: u64,
    pub timestamp: u64,
}

/// Transaction the event was emitted by.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRef {
    pub hash: String,
}

/// A decoded log with its position in the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEvent {
    pub block: BlockRef,
    pub transaction: TransactionRef,
    pub log_index: u32,
    #[serde(default)]
    pub src_address: String,
    #[serde(flatten)]
    pub event: EventKind,
}

impl ChainEvent {
    /// Replay key: `"{txHash}:{logIndex}"`.
    pub fn event_id(&self) -> String {
        format!("{}:{}", self.transaction.hash, self.log_index)
    }

    pub fn timestamp(&self) -> u64 {
        self.block.timestamp
    }

    pub fn block_number(&self) -> u64 {
        self.block.number
    }
}

/// Every event the engine consumes.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "params")]
pub enum EventKind {
    // Lending
    ReserveInitialized {
        reserve: String,
        asset: String,
        decimals: u32,
    },
    ReserveDataUpdated {
        reserve: String,
        #[serde_as(as = "DisplayFromStr")]
        liquidity_rate: u128,
        #[serde_as(as = "DisplayFromStr")]
        variable_borrow_rate: u128,
        #[serde_as(as = "DisplayFromStr")]
        liquidity_index: u128,
        #[serde_as(as = "DisplayFromStr")]
        variable_borrow_index: u128,
    },
    Supply {
        reserve: String,
        user: String,
        #[serde_as(as = "DisplayFromStr")]
        amount: u128,
    },
    Withdraw {
        reserve: String,
        user: String,
        #[serde_as(as = "DisplayFromStr")]
        amount: u128,
    },
    Borrow {
        reserve: String,
        user: String,
        #[serde_as(as = "DisplayFromStr")]
        amount: u128,
    },
    Repay {
        reserve: String,
        user: String,
        #[serde_as(as = "DisplayFromStr")]
        amount: u128,
    },
    LiquidationCall {
        collateral_asset: String,
        debt_asset: String,
        user: String,
        #[serde_as(as = "DisplayFromStr")]
        debt_to_cover: u128,
        #[serde_as(as = "DisplayFromStr")]
        liquidated_collateral_amount: u128,
    },

    // Prices
    PriceUpdated {
        asset: String,
        /// 8 decimals.
        #[serde_as(as = "DisplayFromStr")]
        price: u128,
    },

    // Liquidity provision
    PoolInitialized {
        pool: String,
        token0: String,
        token1: String,
        fee: u32,
        tick: i32,
        sqrt_price_x96: String,
    },
    PoolSwap {
        pool: String,
        tick: i32,
        sqrt_price_x96: String,
    },
    LpPositionUpdated {
        token_id: String,
        owner: String,
        pool: String,
        tick_lower: i32,
        tick_upper: i32,
        #[serde_as(as = "DisplayFromStr")]
        liquidity: u128,
    },
    LpPositionTransferred {
        token_id: String,
        from: String,
        to: String,
    },

    // NFT
    NftTransfer {
        collection: String,
        from: String,
        to: String,
        token_id: String,
    },

    // Voting escrow
    VeLockUpdated {
        token_id: String,
        owner: String,
        #[serde_as(as = "DisplayFromStr")]
        amount: u128,
        lock_end: u64,
        is_permanent: bool,
    },
    VeLockTransferred {
        token_id: String,
        from: String,
        to: String,
    },
    VeLockBurned {
        token_id: String,
    },

    // Epochs
    EpochStartScheduled {
        epoch_number: u64,
        start_time: u64,
    },
    EpochEndScheduled {
        epoch_number: u64,
        end_time: u64,
    },

    // Admin
    ConfigFieldUpdated {
        field: ConfigField,
        #[serde_as(as = "DisplayFromStr")]
        value: u128,
    },
    VotingPowerTierSet {
        tier_id: u32,
        #[serde_as(as = "DisplayFromStr")]
        min_voting_power: u128,
        multiplier_bps: u64,
    },
    VotingPowerTierRemoved {
        tier_id: u32,
    },
    NftMultiplierConfigured {
        first_bonus: u64,
        decay_ratio: u64,
    },
    NftPartnershipSet {
        collection: String,
        is_active: bool,
        static_boost_bps: u64,
    },
    PointsAwarded {
        user: String,
        #[serde_as(as = "DisplayFromStr")]
        amount: u128,
    },
    PointsRemoved {
        user: String,
        #[serde_as(as = "DisplayFromStr")]
        amount: u128,
    },
    UserBlacklisted {
        user: String,
    },
    UserUnblacklisted {
        user: String,
    },
    TestnetBonusSet {
        user: String,
        #[serde_as(as = "DisplayFromStr")]
        amount: u128,
    },
}

impl EventKind {
    /// Variant name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::ReserveInitialized { .. } => "ReserveInitialized",
            EventKind::ReserveDataUpdated { .. } => "ReserveDataUpdated",
            EventKind::Supply { .. } => "Supply",
            EventKind::Withdraw { .. } => "Withdraw",
            EventKind::Borrow { .. } => "Borrow",
            EventKind::Repay { .. } => "Repay",
            EventKind::LiquidationCall { .. } => "LiquidationCall",
            EventKind::PriceUpdated { .. } => "PriceUpdated",
            EventKind::PoolInitialized { .. } => "PoolInitialized",
            EventKind::PoolSwap { .. } => "PoolSwap",
            EventKind::LpPositionUpdated { .. } => "LpPositionUpdated",
            EventKind::LpPositionTransferred { .. } => "LpPositionTransferred",
            EventKind::NftTransfer { .. } => "NftTransfer",
            EventKind::VeLockUpdated { .. } => "VeLockUpdated",
            EventKind::VeLockTransferred { .. } => "VeLockTransferred",
            EventKind::VeLockBurned { .. } => "VeLockBurned",
            EventKind::EpochStartScheduled { .. } => "EpochStartScheduled",
            EventKind::EpochEndScheduled { .. } => "EpochEndScheduled",
            EventKind::ConfigFieldUpdated { .. } => "ConfigFieldUpdated",
            EventKind::VotingPowerTierSet { .. } => "VotingPowerTierSet",
            EventKind::VotingPowerTierRemoved { .. } => "VotingPowerTierRemoved",
            EventKind::NftMultiplierConfigured { .. } => "NftMultiplierConfigured",
            EventKind::NftPartnershipSet { .. } => "NftPartnershipSet",
            EventKind::PointsAwarded { .. } => "PointsAwarded",
            EventKind::PointsRemoved { .. } => "PointsRemoved",
            EventKind::UserBlacklisted { .. } => "UserBlacklisted",
            EventKind::UserUnblacklisted { .. } => "UserUnblacklisted",
            EventKind::TestnetBonusSet { .. } => "TestnetBonusSet",
        }
    }
}

/// Replay marker written after an event's handler completes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedEvent {
    /// `"{txHash}:{logIndex}"`.
    pub id: String,
    pub block_number: u64,
    pub processed_at: u64,
}

impl Entity for ProcessedEvent {
    const KIND: &'static str = "processed_event";

    fn id(&self) -> String {
        self.id.clone()
    }
}
