//! Combined-multiplier history.
//!
//! The history keeps the last [`MULTIPLIER_HISTORY_LEN`] changes of a
//! user's combined multiplier. Accrual scales a delta over `[from, to]` by
//! the time-weighted mean of the multiplier in force over that interval.

use tally_db::{Store, StoreExt};
use tally_types::user::{MultiplierHistory, MultiplierPoint, MULTIPLIER_HISTORY_LEN};

use crate::Result;

/// Append a change to the user's history.
///
/// `previous_bps` seeds the base of a new history. A change at the same
/// timestamp as the last point replaces it.
pub fn record_multiplier_change(
    store: &mut dyn Store,
    user: &str,
    timestamp: u64,
    previous_bps: u64,
    combined_bps: u64,
) -> Result<()> {
    let mut history = match store.get::<MultiplierHistory>(user)? {
        Some(history) => history,
        None => {
            let mut fresh = MultiplierHistory::new(user);
            fresh.base_bps = previous_bps;
            fresh
        }
    };

    match history.points.last_mut() {
        Some(last) if last.timestamp == timestamp => last.combined_bps = combined_bps,
        _ => history.points.push(MultiplierPoint {
            timestamp,
            combined_bps,
        }),
    }
    while history.points.len() > MULTIPLIER_HISTORY_LEN {
        let dropped = history.points.remove(0);
        history.base_bps = dropped.combined_bps;
    }

    store.set(&history)?;
    Ok(())
}

/// Multiplier in force at `timestamp`.
fn value_at(history: &MultiplierHistory, timestamp: u64) -> u64 {
    history
        .points
        .iter()
        .take_while(|p| p.timestamp <= timestamp)
        .last()
        .map(|p| p.combined_bps)
        .unwrap_or(history.base_bps)
}

/// Time-weighted mean of a history over `[from, to]`, truncating.
pub fn time_weighted_average(history: &MultiplierHistory, from: u64, to: u64) -> u64 {
    if to <= from {
        return value_at(history, to);
    }

    let mut weighted: u128 = 0;
    let mut cursor = from;
    let mut current = value_at(history, from);
    for point in history
        .points
        .iter()
        .filter(|p| p.timestamp > from && p.timestamp < to)
    {
        weighted += current as u128 * (point.timestamp - cursor) as u128;
        cursor = point.timestamp;
        current = point.combined_bps;
    }
    weighted += current as u128 * (to - cursor) as u128;

    (weighted / (to - from) as u128) as u64
}

/// Average combined multiplier of `user` over `[from, to]`.
///
/// Users without history get `current_bps`.
pub fn average_combined_multiplier(
    store: &dyn Store,
    user: &str,
    from: u64,
    to: u64,
    current_bps: u64,
) -> Result<u64> {
    match store.get::<MultiplierHistory>(user)? {
        Some(history) => Ok(time_weighted_average(&history, from, to)),
        None => Ok(current_bps),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_db::MemoryStore;

    #[test]
    fn test_average_across_change() {
        let mut store = MemoryStore::new();
        record_multiplier_change(&mut store, "0xu", 100, 10_000, 20_000).expect("record");

        // Half the window at 1×, half at 2×.
        let avg = average_combined_multiplier(&store, "0xu", 0, 200, 20_000).expect("avg");
        assert_eq!(avg, 15_000);

        let after = average_combined_multiplier(&store, "0xu", 100, 200, 20_000).expect("avg");
        assert_eq!(after, 20_000);

        let before = average_combined_multiplier(&store, "0xu", 0, 100, 20_000).expect("avg");
        assert_eq!(before, 10_000);
    }

    #[test]
    fn test_no_history_uses_current() {
        let store = MemoryStore::new();
        assert_eq!(
            average_combined_multiplier(&store, "0xu", 0, 100, 12_345).expect("avg"),
            12_345
        );
    }

    #[test]
    fn test_history_bounded() {
        let mut store = MemoryStore::new();
        for i in 0..(MULTIPLIER_HISTORY_LEN as u64 + 10) {
            record_multiplier_change(&mut store, "0xu", i * 10, 10_000 + i, 10_001 + i)
                .expect("record");
        }
        let history: MultiplierHistory = store.get("0xu").expect("get").expect("present");
        assert_eq!(history.points.len(), MULTIPLIER_HISTORY_LEN);
        // Oldest retained point is the 11th change; base is the 10th.
        assert_eq!(history.base_bps, 10_001 + 9);
    }

    #[test]
    fn test_same_timestamp_replaces() {
        let mut store = MemoryStore::new();
        record_multiplier_change(&mut store, "0xu", 5, 10_000, 11_000).expect("record");
        record_multiplier_change(&mut store, "0xu", 5, 11_000, 12_000).expect("record");
        let history: MultiplierHistory = store.get("0xu").expect("get").expect("present");
        assert_eq!(history.points.len(), 1);
        assert_eq!(history.points[0].combined_bps, 12_000);
        assert_eq!(history.base_bps, 10_000);
    }
}
