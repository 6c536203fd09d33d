//! Admin-set epoch schedules.
//!
//! Scheduled times are targets and may be replaced. They only take effect
//! through [`crate::advance`], which never rewrites an observed boundary.

use tally_db::{Store, StoreExt};
use tally_types::epoch::Epoch;
use tracing::info;

use crate::Result;

fn load_or_new(store: &dyn Store, epoch_number: u64) -> Result<Epoch> {
    Ok(store
        .get::<Epoch>(&epoch_number.to_string())?
        .unwrap_or_else(|| Epoch::new(epoch_number)))
}

/// Set the scheduled start of `epoch_number`, creating the record if needed.
pub fn schedule_epoch_start(
    store: &mut dyn Store,
    epoch_number: u64,
    start_time: u64,
) -> Result<Epoch> {
    let mut epoch = load_or_new(store, epoch_number)?;
    epoch.scheduled_start_time = start_time;
    store.set(&epoch)?;
    info!(epoch = epoch_number, start_time, "epoch start scheduled");
    Ok(epoch)
}

/// Set the scheduled end of `epoch_number`, creating the record if needed.
pub fn schedule_epoch_end(store: &mut dyn Store, epoch_number: u64, end_time: u64) -> Result<Epoch> {
    let mut epoch = load_or_new(store, epoch_number)?;
    epoch.scheduled_end_time = end_time;
    store.set(&epoch)?;
    info!(epoch = epoch_number, end_time, "epoch end scheduled");
    Ok(epoch)
}
