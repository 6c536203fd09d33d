//! Combined multiplier and the single scaling primitive.

use tally_db::{Store, StoreExt};
use tally_math::{mul_div_u128, BPS_DENOMINATOR};
use tally_types::user::{MultiplierSnapshot, UserLeaderboardState};
use tracing::debug;

use crate::history::record_multiplier_change;
use crate::Result;

/// Hard cap on the combined multiplier (10×).
pub const MAX_COMBINED_MULTIPLIER_BPS: u64 = 100_000;

/// Event coordinates stamped on a multiplier snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotContext {
    pub timestamp: u64,
    pub tx_hash: String,
    pub log_index: u32,
}

/// `min(nft × vp / 10000, 100000)`.
pub fn combined_multiplier(nft_bps: u64, vp_bps: u64) -> u64 {
    let product = (nft_bps as u128 * vp_bps as u128) / BPS_DENOMINATOR as u128;
    product.min(MAX_COMBINED_MULTIPLIER_BPS as u128) as u64
}

/// `raw_scaled × min(bps, max_bps) / 10000`, truncating.
pub fn apply_combined_multiplier_scaled(raw_scaled: u128, bps: u64, max_bps: u64) -> u128 {
    let effective = bps.min(max_bps);
    mul_div_u128(raw_scaled, effective as u128, BPS_DENOMINATOR as u128)
}

/// The two multiplier factors as they stood before a refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriorFactors {
    pub nft_bps: u64,
    pub vp_bps: u64,
}

impl PriorFactors {
    pub fn of(state: &UserLeaderboardState) -> Self {
        Self {
            nft_bps: state.nft_multiplier_bps,
            vp_bps: state.vp_multiplier_bps,
        }
    }
}

/// Recompute `state.combined_multiplier_bps` from its two factors.
///
/// An audit snapshot is written whenever either factor differs from
/// `prior`, even if the changes cancel out in the combined value. Only a
/// change of the combined value is appended to the user's history. The
/// caller persists `state`. Returns whether the combined value changed.
pub fn refresh_combined_multiplier(
    store: &mut dyn Store,
    state: &mut UserLeaderboardState,
    prior: PriorFactors,
    ctx: &SnapshotContext,
) -> Result<bool> {
    let previous = state.combined_multiplier_bps;
    let combined = combined_multiplier(state.nft_multiplier_bps, state.vp_multiplier_bps);
    let changed = combined != previous;
    if !changed && PriorFactors::of(state) == prior {
        return Ok(false);
    }

    state.combined_multiplier_bps = combined;
    store.set(&MultiplierSnapshot {
        user: state.user.clone(),
        timestamp: ctx.timestamp,
        tx_hash: ctx.tx_hash.clone(),
        log_index: ctx.log_index,
        nft_multiplier_bps: state.nft_multiplier_bps,
        vp_multiplier_bps: state.vp_multiplier_bps,
        combined_multiplier_bps: combined,
        previous_combined_bps: previous,
    })?;
    if changed {
        record_multiplier_change(store, &state.user, ctx.timestamp, previous, combined)?;
    }

    debug!(
        user = %state.user,
        previous,
        combined,
        nft = state.nft_multiplier_bps,
        vp = state.vp_multiplier_bps,
        "multiplier factors changed"
    );
    Ok(changed)
}
