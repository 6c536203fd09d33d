//! The leaderboard capability consumed by the settlement engine.

use tally_db::{Store, StoreExt};
use tally_types::ranking::{epoch_scope, GLOBAL_SCOPE};
use tally_types::user::LeaderboardBlacklist;
use tracing::{debug, info};

use crate::scope::{remove_from_scope, update_scope};
use crate::Result;

/// Ranking parameters of one update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RankContext {
    /// Latest epoch number; 0 before genesis.
    pub current_epoch: u64,
    /// Top-K list size.
    pub top_k: u32,
    pub timestamp: u64,
}

/// Whether `user` is currently excluded from the leaderboard.
pub fn is_blacklisted(store: &dyn Store, user: &str) -> Result<bool> {
    Ok(store
        .get::<LeaderboardBlacklist>(user)?
        .is_some_and(|entry| entry.is_blacklisted))
}

/// Pushes settled totals into ranking structures.
pub trait LeaderboardUpdater {
    /// Record a user's epoch total (scaled points). Returns the user's rank
    /// in the epoch's top-K, if listed.
    fn update_leaderboard(
        &self,
        store: &mut dyn Store,
        ctx: &RankContext,
        user: &str,
        epoch: u64,
        points: u128,
    ) -> Result<Option<u32>>;

    /// Record a user's lifetime total in the global scope. Ignored before
    /// genesis.
    fn update_all_time_leaderboard(
        &self,
        store: &mut dyn Store,
        ctx: &RankContext,
        user: &str,
        lifetime_points: u128,
    ) -> Result<Option<u32>>;

    /// Purge a user from every epoch scope up to the current one and from
    /// the global scope.
    fn remove_user_from_leaderboards(
        &self,
        store: &mut dyn Store,
        ctx: &RankContext,
        user: &str,
    ) -> Result<usize>;
}

/// [`LeaderboardUpdater`] over the persisted top-K, bucket and index
/// records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TopKLeaderboard;

impl LeaderboardUpdater for TopKLeaderboard {
    fn update_leaderboard(
        &self,
        store: &mut dyn Store,
        ctx: &RankContext,
        user: &str,
        epoch: u64,
        points: u128,
    ) -> Result<Option<u32>> {
        if epoch == 0 {
            return Ok(None);
        }
        if is_blacklisted(store, user)? {
            debug!(user, epoch, "blacklisted; leaderboard update skipped");
            return Ok(None);
        }
        update_scope(
            store,
            &epoch_scope(epoch),
            user,
            points,
            ctx.top_k,
            ctx.timestamp,
        )
    }

    fn update_all_time_leaderboard(
        &self,
        store: &mut dyn Store,
        ctx: &RankContext,
        user: &str,
        lifetime_points: u128,
    ) -> Result<Option<u32>> {
        if ctx.current_epoch == 0 || is_blacklisted(store, user)? {
            return Ok(None);
        }
        update_scope(
            store,
            GLOBAL_SCOPE,
            user,
            lifetime_points,
            ctx.top_k,
            ctx.timestamp,
        )
    }

    fn remove_user_from_leaderboards(
        &self,
        store: &mut dyn Store,
        ctx: &RankContext,
        user: &str,
    ) -> Result<usize> {
        let mut removed = 0;
        for epoch in 1..=ctx.current_epoch {
            if remove_from_scope(store, &epoch_scope(epoch), user, ctx.timestamp)? {
                removed += 1;
            }
        }
        if remove_from_scope(store, GLOBAL_SCOPE, user, ctx.timestamp)? {
            removed += 1;
        }
        info!(user, scopes = removed, "removed user from leaderboards");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use tally_db::MemoryStore;
    use tally_types::ranking::{TopK, TopKEntry, UserIndex};

    fn ctx(current_epoch: u64) -> RankContext {
        RankContext {
            current_epoch,
            top_k: 100,
            timestamp: 1,
        }
    }

    fn blacklist(store: &mut MemoryStore, user: &str, flag: bool) {
        store
            .set(&LeaderboardBlacklist {
                user: user.to_string(),
                is_blacklisted: flag,
                updated_at: 1,
            })
            .expect("set");
    }

    #[test]
    fn test_global_ignored_before_genesis() {
        let mut store = MemoryStore::new();
        let rank = TopKLeaderboard
            .update_all_time_leaderboard(&mut store, &ctx(0), "0xaa", 10)
            .expect("update");
        assert_eq!(rank, None);
        assert!(store.get::<TopK>(GLOBAL_SCOPE).expect("get").is_none());
    }

    #[test]
    fn test_blacklisted_user_not_inserted() {
        let mut store = MemoryStore::new();
        blacklist(&mut store, "0xaa", true);
        let rank = TopKLeaderboard
            .update_leaderboard(&mut store, &ctx(1), "0xaa", 1, 10)
            .expect("update");
        assert_eq!(rank, None);
        assert!(store
            .get::<UserIndex>(&UserIndex::key("1", "0xaa"))
            .expect("get")
            .is_none());

        // Clearing the flag does not reinsert; the next update does.
        blacklist(&mut store, "0xaa", false);
        let rank = TopKLeaderboard
            .update_leaderboard(&mut store, &ctx(1), "0xaa", 1, 10)
            .expect("update");
        assert_eq!(rank, Some(1));
    }

    #[test]
    fn test_remove_covers_every_scope() {
        let mut store = MemoryStore::new();
        for epoch in 1..=3 {
            TopKLeaderboard
                .update_leaderboard(&mut store, &ctx(3), "0xaa", epoch, 10)
                .expect("update");
        }
        TopKLeaderboard
            .update_all_time_leaderboard(&mut store, &ctx(3), "0xaa", 30)
            .expect("update");
        let removed = TopKLeaderboard
            .remove_user_from_leaderboards(&mut store, &ctx(3), "0xaa")
            .expect("remove");
        assert_eq!(removed, 4);
        assert!(store
            .get::<TopKEntry>(&TopKEntry::key(GLOBAL_SCOPE, "0xaa"))
            .expect("get")
            .is_none());
    }

    #[test]
    fn test_order_independent_of_insertion() {
        let mut users: Vec<(String, u128)> = (0..40u128)
            .map(|i| (format!("0x{i:02}"), (i % 7) * 1_000))
            .collect();
        let mut expected: Vec<(String, u128)> =
            users.iter().filter(|(_, p)| *p > 0).cloned().collect();
        expected.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        expected.truncate(10);

        users.shuffle(&mut rand::thread_rng());
        let mut store = MemoryStore::new();
        let small = RankContext {
            current_epoch: 1,
            top_k: 10,
            timestamp: 1,
        };
        for (user, points) in &users {
            TopKLeaderboard
                .update_leaderboard(&mut store, &small, user, 1, *points)
                .expect("update");
        }
        let top = store.get::<TopK>("1").expect("get").expect("top-k");
        let actual: Vec<(String, u128)> = top
            .entry_ids
            .iter()
            .map(|id| {
                let entry = store.get::<TopKEntry>(id).expect("get").expect("entry");
                (entry.user, entry.points)
            })
            .collect();
        assert_eq!(actual, expected);
    }
}
