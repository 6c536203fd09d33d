//! Per-scope ranking maintenance.

use tally_db::{Store, StoreExt};
use tally_types::ranking::{LeaderboardTotals, ScoreBucket, TopK, TopKEntry, UserIndex};
use tracing::{trace, warn};

use crate::bucket::bucket_for;
use crate::Result;

fn adjust_bucket(store: &mut dyn Store, scope: &str, bucket_index: i32, add: bool) -> Result<()> {
    let key = ScoreBucket::key(scope, bucket_index);
    let mut bucket = store.get::<ScoreBucket>(&key)?.unwrap_or(ScoreBucket {
        scope: scope.to_string(),
        bucket_index,
        count: 0,
    });
    if add {
        bucket.count += 1;
    } else if bucket.count == 0 {
        warn!(scope, bucket_index, "bucket count underflow; clamping");
    } else {
        bucket.count -= 1;
    }
    store.set(&bucket)?;
    Ok(())
}

fn adjust_totals(store: &mut dyn Store, scope: &str, add: bool, timestamp: u64) -> Result<()> {
    let mut totals = store
        .get::<LeaderboardTotals>(scope)?
        .unwrap_or(LeaderboardTotals {
            scope: scope.to_string(),
            total_users: 0,
            updated_at: timestamp,
        });
    if add {
        totals.total_users += 1;
    } else if totals.total_users == 0 {
        warn!(scope, "total users underflow; clamping");
    } else {
        totals.total_users -= 1;
    }
    totals.updated_at = timestamp;
    store.set(&totals)?;
    Ok(())
}

/// Load the entries of a top-K list, skipping dangling ids.
fn load_entries(store: &dyn Store, top: &TopK) -> Result<Vec<TopKEntry>> {
    let mut entries = Vec::with_capacity(top.entry_ids.len());
    for id in &top.entry_ids {
        if let Some(entry) = store.get::<TopKEntry>(id)? {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Sort, truncate to `k`, renumber and persist `entries` as the scope's
/// top-K. Entries pushed past `k` are deleted.
fn write_top_k(
    store: &mut dyn Store,
    scope: &str,
    k: u32,
    mut entries: Vec<TopKEntry>,
    timestamp: u64,
) -> Result<()> {
    entries.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.user.cmp(&b.user)));
    let keep = k as usize;
    if entries.len() > keep {
        for evicted in entries.drain(keep..) {
            trace!(scope, user = %evicted.user, "evicted from top-k");
            store.delete_unsafe::<TopKEntry>(&TopKEntry::key(scope, &evicted.user))?;
        }
    }

    let mut entry_ids = Vec::with_capacity(entries.len());
    for (position, mut entry) in entries.into_iter().enumerate() {
        entry.rank = position as u32 + 1;
        entry_ids.push(TopKEntry::key(scope, &entry.user));
        store.set(&entry)?;
    }
    store.set(&TopK {
        scope: scope.to_string(),
        k,
        entry_ids,
        updated_at: timestamp,
    })?;
    Ok(())
}

/// Record `points` (scaled) for `user` in `scope`.
///
/// Maintains the user's index row, bucket counts, the scope's member count
/// and its top-K list. Zero points keep the membership with bucket `-1` but
/// drop the user from the top-K.
///
/// Returns the user's 1-based rank if they are in the top-K.
pub fn update_scope(
    store: &mut dyn Store,
    scope: &str,
    user: &str,
    points: u128,
    k: u32,
    timestamp: u64,
) -> Result<Option<u32>> {
    let bucket_index = bucket_for(points);
    let previous = store.get::<UserIndex>(&UserIndex::key(scope, user))?;
    match &previous {
        None => {
            adjust_totals(store, scope, true, timestamp)?;
            adjust_bucket(store, scope, bucket_index, true)?;
        }
        Some(index) if index.bucket_index != bucket_index => {
            adjust_bucket(store, scope, index.bucket_index, false)?;
            adjust_bucket(store, scope, bucket_index, true)?;
        }
        Some(_) => {}
    }
    store.set(&UserIndex {
        scope: scope.to_string(),
        user: user.to_string(),
        points,
        bucket_index,
        updated_at: timestamp,
    })?;

    let top = store.get::<TopK>(scope)?.unwrap_or(TopK {
        scope: scope.to_string(),
        k,
        entry_ids: Vec::new(),
        updated_at: timestamp,
    });
    let mut entries = load_entries(store, &top)?;
    let was_listed = entries.iter().any(|e| e.user == user);
    entries.retain(|e| e.user != user);

    let k = k.max(1);
    let qualifies = points > 0
        && (entries.len() < k as usize
            || entries.iter().any(|e| {
                e.points < points || (e.points == points && user < e.user.as_str())
            }));
    if !qualifies && !was_listed && top.k == k {
        return Ok(None);
    }
    if was_listed && !qualifies {
        store.delete_unsafe::<TopKEntry>(&TopKEntry::key(scope, user))?;
    }
    if qualifies {
        entries.push(TopKEntry {
            scope: scope.to_string(),
            user: user.to_string(),
            points,
            rank: 0,
        });
    }
    write_top_k(store, scope, k, entries, timestamp)?;

    Ok(store
        .get::<TopKEntry>(&TopKEntry::key(scope, user))?
        .map(|entry| entry.rank))
}

/// Remove `user` from `scope`: index row, bucket count, member count and
/// top-K entry. Returns `false` if the user was not a member.
pub fn remove_from_scope(
    store: &mut dyn Store,
    scope: &str,
    user: &str,
    timestamp: u64,
) -> Result<bool> {
    let key = UserIndex::key(scope, user);
    let Some(index) = store.get::<UserIndex>(&key)? else {
        return Ok(false);
    };
    store.delete_unsafe::<UserIndex>(&key)?;
    adjust_bucket(store, scope, index.bucket_index, false)?;
    adjust_totals(store, scope, false, timestamp)?;

    if let Some(top) = store.get::<TopK>(scope)? {
        let entry_key = TopKEntry::key(scope, user);
        if top.entry_ids.contains(&entry_key) {
            store.delete_unsafe::<TopKEntry>(&entry_key)?;
            let mut entries = load_entries(store, &top)?;
            entries.retain(|e| e.user != user);
            write_top_k(store, scope, top.k, entries, timestamp)?;
        }
    }
    Ok(true)
}
