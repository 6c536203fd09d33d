//! Leaderboard ranking records: user index, buckets, totals and top-K.
//!
//! A scope is either an epoch number rendered as a string or
//! [`GLOBAL_SCOPE`] for the all-time board.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::{composite_id, Entity};

/// Scope of the all-time leaderboard.
pub const GLOBAL_SCOPE: &str = "global";

/// Bucket index of a user with zero points.
pub const EMPTY_BUCKET: i32 = -1;

/// Scope id of an epoch.
pub fn epoch_scope(epoch: u64) -> String {
    epoch.to_string()
}

/// A user's membership in one scope.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIndex {
    pub scope: String,
    pub user: String,
    #[serde_as(as = "DisplayFromStr")]
    pub points: u128,
    pub bucket_index: i32,
    pub updated_at: u64,
}

impl UserIndex {
    pub fn key(scope: &str, user: &str) -> String {
        composite_id(&[scope, user])
    }
}

impl Entity for UserIndex {
    const KIND: &'static str = "user_index";

    fn id(&self) -> String {
        Self::key(&self.scope, &self.user)
    }
}

/// Histogram bucket of one scope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBucket {
    pub scope: String,
    pub bucket_index: i32,
    pub count: u64,
}

impl ScoreBucket {
    pub fn key(scope: &str, bucket_index: i32) -> String {
        format!("{scope}:{bucket_index}")
    }
}

impl Entity for ScoreBucket {
    const KIND: &'static str = "score_bucket";

    fn id(&self) -> String {
        Self::key(&self.scope, self.bucket_index)
    }
}

/// User count of one scope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardTotals {
    pub scope: String,
    pub total_users: u64,
    pub updated_at: u64,
}

impl Entity for LeaderboardTotals {
    const KIND: &'static str = "leaderboard_totals";

    fn id(&self) -> String {
        self.scope.clone()
    }
}

/// Ranked entry ids of one scope, best first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopK {
    pub scope: String,
    pub k: u32,
    pub entry_ids: Vec<String>,
    pub updated_at: u64,
}

impl Entity for TopK {
    const KIND: &'static str = "top_k";

    fn id(&self) -> String {
        self.scope.clone()
    }
}

/// One ranked row.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopKEntry {
    pub scope: String,
    pub user: String,
    #[serde_as(as = "DisplayFromStr")]
    pub points: u128,
    /// 1-based.
    pub rank: u32,
}

impl TopKEntry {
    pub fn key(scope: &str, user: &str) -> String {
        composite_id(&[scope, user])
    }
}

impl Entity for TopKEntry {
    const KIND: &'static str = "top_k_entry";

    fn id(&self) -> String {
        Self::key(&self.scope, &self.user)
    }
}
