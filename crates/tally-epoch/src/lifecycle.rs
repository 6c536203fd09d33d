//! Epoch transition state machine.
//!
//! [`advance`] is called with the block time of every event. Each call
//! performs at most [`MAX_TRANSITIONS_PER_CALL`] transitions:
//!
//! - an active epoch whose scheduled end is due is closed, and the
//!   [`EpochHooks::on_epoch_closed`] hook flushes state at its end time
//! - with no active epoch, the next epoch starts once its scheduled start
//!   is due
//!
//! A missing or zero schedule never triggers a transition.

use tally_db::{Store, StoreExt};
use tally_types::epoch::{Epoch, LeaderboardState};
use tracing::{info, warn};

use crate::{EpochError, Result};

/// Upper bound on transitions performed by one [`advance`] call.
pub const MAX_TRANSITIONS_PER_CALL: usize = 5;

/// Boxed hook failure.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Work performed at epoch boundaries.
pub trait EpochHooks {
    /// Called once an epoch's end fields are recorded, before the next
    /// epoch can start. `epoch.end_time` is the flush point.
    fn on_epoch_closed(
        &mut self,
        store: &mut dyn Store,
        epoch: &Epoch,
    ) -> std::result::Result<(), HookError>;

    /// Called after an epoch becomes active.
    fn on_epoch_started(
        &mut self,
        _store: &mut dyn Store,
        _epoch: &Epoch,
    ) -> std::result::Result<(), HookError> {
        Ok(())
    }
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl EpochHooks for NoopHooks {
    fn on_epoch_closed(
        &mut self,
        _store: &mut dyn Store,
        _epoch: &Epoch,
    ) -> std::result::Result<(), HookError> {
        Ok(())
    }
}

/// A transition performed by [`advance`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Started(u64),
    Ended(u64),
}

/// The active epoch, if any.
pub fn active_epoch(store: &dyn Store, state: &LeaderboardState) -> Result<Option<Epoch>> {
    if !state.is_active || state.current_epoch_number == 0 {
        return Ok(None);
    }
    let number = state.current_epoch_number;
    match store.get::<Epoch>(&number.to_string())? {
        Some(epoch) => Ok(Some(epoch)),
        None => Err(EpochError::MissingCurrent(number)),
    }
}

/// Record the end of `epoch`. Fields already set are kept, except that
/// a recorded end time is pulled back to an earlier schedule.
fn close(epoch: &mut Epoch, block_number: u64) {
    let scheduled = epoch.scheduled_end_time;
    let mut end = if epoch.end_time > 0 {
        epoch.end_time.min(scheduled)
    } else {
        scheduled
    };
    if end < epoch.start_time {
        warn!(
            epoch = epoch.epoch_number,
            end,
            start = epoch.start_time,
            "scheduled end precedes start; clamping"
        );
        end = epoch.start_time;
    }
    epoch.end_time = end;
    if epoch.end_block == 0 {
        epoch.end_block = block_number;
    }
    if epoch.start_time > 0 && epoch.end_time > 0 {
        epoch.duration = Some(epoch.end_time - epoch.start_time);
    }
    epoch.is_active = false;
}

/// Record the start of `epoch`. Fields already set are kept.
fn open(epoch: &mut Epoch, previous_end: u64, block_number: u64) {
    if epoch.start_time == 0 {
        epoch.start_time = epoch.scheduled_start_time.max(previous_end);
    }
    if epoch.start_block == 0 {
        epoch.start_block = block_number;
    }
    epoch.is_active = true;
}

/// Perform every due transition, at most [`MAX_TRANSITIONS_PER_CALL`].
///
/// `state` is updated in place and its `version` bumped per transition;
/// epoch records are persisted here. The caller persists `state`.
///
/// # Errors
///
/// - [`EpochError::MissingCurrent`] if `state` names an epoch with no record
/// - [`EpochError::Hook`] if a boundary hook fails
pub fn advance(
    store: &mut dyn Store,
    state: &mut LeaderboardState,
    now: u64,
    block_number: u64,
    hooks: &mut dyn EpochHooks,
) -> Result<Vec<Transition>> {
    let mut transitions = Vec::new();

    for _ in 0..MAX_TRANSITIONS_PER_CALL {
        if let Some(mut epoch) = active_epoch(store, state)? {
            if epoch.scheduled_end_time == 0 || epoch.scheduled_end_time > now {
                break;
            }
            close(&mut epoch, block_number);
            store.set(&epoch)?;
            state.is_active = false;
            state.version += 1;
            info!(
                epoch = epoch.epoch_number,
                end_time = epoch.end_time,
                duration = ?epoch.duration,
                "epoch ended"
            );
            hooks
                .on_epoch_closed(store, &epoch)
                .map_err(|source| EpochError::Hook {
                    epoch: epoch.epoch_number,
                    source,
                })?;
            transitions.push(Transition::Ended(epoch.epoch_number));
            continue;
        }

        let previous_end = if state.current_epoch_number > 0 {
            store
                .get::<Epoch>(&state.current_epoch_number.to_string())?
                .map(|e| e.end_time)
                .unwrap_or(0)
        } else {
            0
        };
        let next = state.current_epoch_number + 1;
        let Some(mut epoch) = store.get::<Epoch>(&next.to_string())? else {
            break;
        };
        if epoch.scheduled_start_time == 0 || epoch.scheduled_start_time > now {
            break;
        }
        open(&mut epoch, previous_end, block_number);
        store.set(&epoch)?;
        state.current_epoch_number = next;
        state.is_active = true;
        state.version += 1;
        info!(
            epoch = next,
            start_time = epoch.start_time,
            start_block = epoch.start_block,
            "epoch started"
        );
        hooks
            .on_epoch_started(store, &epoch)
            .map_err(|source| EpochError::Hook {
                epoch: next,
                source,
            })?;
        transitions.push(Transition::Started(next));
    }

    Ok(transitions)
}
