//! Voting power of locked positions.
//!
//! A decaying lock is worth `amount × remaining / MAX_LOCK_TIME`, falling
//! linearly to zero at `lock_end`. A permanent lock is worth its full amount.

use tally_db::{Store, StoreExt};
use tally_math::mul_div_u128;
use tally_types::ve::{VeLock, MAX_LOCK_TIME};

use crate::Result;

/// Instantaneous voting power of one lock.
///
/// # Arguments
///
/// * `amount` - Locked token amount
/// * `lock_end` - Unlock time
/// * `is_permanent` - Permanent locks never decay
/// * `now` - Evaluation time
pub fn calculate_voting_power(amount: u128, lock_end: u64, is_permanent: bool, now: u64) -> u128 {
    if is_permanent {
        return amount;
    }
    if lock_end <= now {
        return 0;
    }
    let remaining = (lock_end - now).min(MAX_LOCK_TIME);
    mul_div_u128(amount, remaining as u128, MAX_LOCK_TIME as u128)
}

fn lock_power_at(lock: &VeLock, at: u64) -> u128 {
    calculate_voting_power(lock.amount, lock.lock_end, lock.is_permanent, at)
}

/// Time-weighted average voting power of one lock over `[start, end]`.
///
/// For `end <= start` this is the instantaneous power at `end`. A lock that
/// expires inside the window contributes only over its active sub-interval,
/// weighted by `active / total`.
pub fn calculate_average_token_voting_power(lock: &VeLock, start: u64, end: u64) -> u128 {
    if end <= start {
        return lock_power_at(lock, end);
    }
    if lock.is_permanent {
        return lock.amount;
    }
    let active_end = end.min(lock.lock_end);
    if active_end <= start {
        return 0;
    }

    let at_start = lock_power_at(lock, start);
    let at_active_end = lock_power_at(lock, active_end);
    let trapezoid = at_start / 2 + at_active_end / 2 + (at_start % 2 + at_active_end % 2) / 2;

    let active = (active_end - start) as u128;
    let total = (end - start) as u128;
    mul_div_u128(trapezoid, active, total)
}

/// Current voting power summed over the given locks.
pub fn user_voting_power(store: &dyn Store, lock_ids: &[String], now: u64) -> Result<u128> {
    let mut total: u128 = 0;
    for id in lock_ids {
        if let Some(lock) = store.get::<VeLock>(id)? {
            total = total.saturating_add(lock_power_at(&lock, now));
        }
    }
    Ok(total)
}

/// Average voting power over `[start, end]` summed over the given locks.
pub fn user_average_voting_power(
    store: &dyn Store,
    lock_ids: &[String],
    start: u64,
    end: u64,
) -> Result<u128> {
    let mut total: u128 = 0;
    for id in lock_ids {
        if let Some(lock) = store.get::<VeLock>(id)? {
            total = total.saturating_add(calculate_average_token_voting_power(&lock, start, end));
        }
    }
    Ok(total)
}
