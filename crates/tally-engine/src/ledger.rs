//! Writes to a user's per-epoch stats.
//!
//! A [`Ledger`] collects every change made to one user's
//! [`UserEpochStats`] during an event. [`Ledger::flush`] then recomputes
//! totals, folds the change into lifetime aggregates and pushes the new
//! figures to the leaderboard, once per touched epoch.

use std::collections::btree_map::Entry as MapEntry;
use std::collections::BTreeMap;

use tally_accrual::{EpochAccrual, LpAccrual};
use tally_db::{Store, StoreExt};
use tally_leaderboard::RankContext;
use tally_math::format_points;
use tally_multiplier::{apply_combined_multiplier_scaled, average_combined_multiplier};
use tally_types::epoch::LeaderboardConfig;
use tally_types::user::{
    PointCategory, PointDelta, UserEpochStats, UserLeaderboardState, UserPoints,
};
use tally_types::user_epoch_id;
use tracing::trace;

use crate::context::Services;
use crate::Result;

/// Load a user's state, or a neutral one for a first-time user.
pub fn load_user_state(store: &dyn Store, user: &str) -> Result<UserLeaderboardState> {
    Ok(store
        .get::<UserLeaderboardState>(user)?
        .unwrap_or_else(|| UserLeaderboardState::new(user)))
}

struct OpenStats {
    stats: UserEpochStats,
    total_before: u128,
    total_with_multiplier_before: u128,
}

/// Pending stats changes of one user.
pub struct Ledger {
    user: String,
    open: BTreeMap<u64, OpenStats>,
}

fn apply_signed(value: u128, before: u128, after: u128) -> u128 {
    if after >= before {
        value.saturating_add(after - before)
    } else {
        value.saturating_sub(before - after)
    }
}

impl Ledger {
    pub fn new(user: &str) -> Self {
        Self {
            user: user.to_string(),
            open: BTreeMap::new(),
        }
    }

    /// Stats of `epoch`, loaded on first access.
    pub fn stats_mut(&mut self, store: &dyn Store, epoch: u64) -> Result<&mut UserEpochStats> {
        let open = match self.open.entry(epoch) {
            MapEntry::Occupied(entry) => entry.into_mut(),
            MapEntry::Vacant(slot) => {
                let stats = store
                    .get::<UserEpochStats>(&user_epoch_id(&self.user, epoch))?
                    .unwrap_or_else(|| UserEpochStats::new(&self.user, epoch));
                slot.insert(OpenStats {
                    total_before: stats.total_points,
                    total_with_multiplier_before: stats.total_points_with_multiplier,
                    stats,
                })
            }
        };
        Ok(&mut open.stats)
    }

    /// Credit an interval accrual, scaled by the average combined
    /// multiplier over the interval.
    pub fn credit(
        &mut self,
        store: &dyn Store,
        state: &UserLeaderboardState,
        config: &LeaderboardConfig,
        accrual: &EpochAccrual,
    ) -> Result<PointDelta> {
        let multiplier = average_combined_multiplier(
            store,
            &self.user,
            accrual.from,
            accrual.to,
            state.combined_multiplier_bps,
        )?;
        let delta = PointDelta {
            raw: accrual.raw,
            scaled: apply_combined_multiplier_scaled(
                accrual.raw,
                multiplier,
                config.max_multiplier_bps,
            ),
        };
        trace!(
            user = %self.user,
            epoch = accrual.epoch_number,
            category = ?accrual.category,
            raw = %format_points(delta.raw),
            scaled = %format_points(delta.scaled),
            multiplier,
            "credit"
        );
        self.stats_mut(store, accrual.epoch_number)?
            .credit(accrual.category, delta);
        Ok(delta)
    }

    /// Credit a one-off amount at the current combined multiplier.
    pub fn credit_instant(
        &mut self,
        store: &dyn Store,
        state: &UserLeaderboardState,
        config: &LeaderboardConfig,
        epoch: u64,
        category: PointCategory,
        raw: u128,
    ) -> Result<PointDelta> {
        let delta = PointDelta {
            raw,
            scaled: apply_combined_multiplier_scaled(
                raw,
                state.combined_multiplier_bps,
                config.max_multiplier_bps,
            ),
        };
        self.stats_mut(store, epoch)?.credit(category, delta);
        Ok(delta)
    }

    /// Recompute and persist every touched epoch, update lifetime totals
    /// and push the results to the leaderboard. The caller persists
    /// `state`.
    pub fn flush(
        self,
        store: &mut dyn Store,
        svc: &Services<'_>,
        rank: &RankContext,
        state: &mut UserLeaderboardState,
    ) -> Result<()> {
        if self.open.is_empty() {
            return Ok(());
        }
        for (epoch, open) in self.open {
            let OpenStats {
                mut stats,
                total_before,
                total_with_multiplier_before,
            } = open;
            stats.multiplier_bps = state.combined_multiplier_bps;
            stats.recompute_totals(state.testnet_bonus);
            state.lifetime_points =
                apply_signed(state.lifetime_points, total_before, stats.total_points);
            state.lifetime_points_with_multiplier = apply_signed(
                state.lifetime_points_with_multiplier,
                total_with_multiplier_before,
                stats.total_points_with_multiplier,
            );

            let listed = svc.leaderboard.update_leaderboard(
                store,
                rank,
                &self.user,
                epoch,
                stats.total_points_with_multiplier,
            )?;
            stats.rank = listed.unwrap_or(0);
            if epoch == rank.current_epoch {
                state.current_epoch = epoch;
                state.current_rank = stats.rank;
            }
            store.set(&stats)?;
        }

        store.set(&UserPoints {
            user: self.user.clone(),
            lifetime_points: state.lifetime_points,
            lifetime_points_with_multiplier: state.lifetime_points_with_multiplier,
            last_updated_at: rank.timestamp,
        })?;
        svc.leaderboard.update_all_time_leaderboard(
            store,
            rank,
            &self.user,
            state.lifetime_points_with_multiplier,
        )?;
        Ok(())
    }
}

/// Credit LP accruals that may belong to several users.
pub fn credit_lp_accruals(
    store: &mut dyn Store,
    svc: &Services<'_>,
    config: &LeaderboardConfig,
    rank: &RankContext,
    accruals: Vec<LpAccrual>,
) -> Result<usize> {
    let mut by_user: BTreeMap<String, Vec<EpochAccrual>> = BTreeMap::new();
    for lp in accruals {
        by_user.entry(lp.user).or_default().push(lp.accrual);
    }
    let users = by_user.len();
    for (user, accruals) in by_user {
        let mut state = load_user_state(store, &user)?;
        let mut ledger = Ledger::new(&user);
        for accrual in &accruals {
            ledger.credit(store, &state, config, accrual)?;
        }
        ledger.flush(store, svc, rank, &mut state)?;
        store.set(&state)?;
    }
    Ok(users)
}
