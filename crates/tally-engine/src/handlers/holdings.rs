//! Partner NFT and vote-escrow lock events.
//!
//! Both feed the combined multiplier. Each affected holder is settled
//! first, so the interval that just ended accrues under the old
//! multiplier, and only then is the holding changed and the multiplier
//! recomputed.

use tally_db::{Store, StoreExt};
use tally_types::nft::{NftPartnership, UserNftHolding};
use tally_types::normalize_address;
use tally_types::user::UserLeaderboardState;
use tally_types::ve::VeLock;
use tracing::{debug, info, warn};

use crate::context::{EventContext, Services};
use crate::globals::Globals;
use crate::handlers::counterparty;
use crate::settle::{refresh_multipliers, settle_points_for_user, SettleOptions};
use crate::Result;

/// `VeLockUpdated` fields as decoded.
#[derive(Clone, Copy, Debug)]
pub struct LockTerms<'a> {
    pub token_id: &'a str,
    pub owner: &'a str,
    pub amount: u128,
    pub lock_end: u64,
    pub is_permanent: bool,
}

/// Settle `user` without chain reconciliation.
fn settle_holder(
    store: &mut dyn Store,
    svc: &Services<'_>,
    globals: &Globals,
    ev: &EventContext,
    user: &str,
) -> Result<UserLeaderboardState> {
    settle_points_for_user(
        store,
        svc,
        globals,
        ev,
        user,
        None,
        SettleOptions {
            skip_external_sync: true,
            ..SettleOptions::default()
        },
    )
}

/// Apply `change` to a settled state, recompute multipliers and persist.
fn reprice(
    store: &mut dyn Store,
    ev: &EventContext,
    mut state: UserLeaderboardState,
    change: impl FnOnce(&mut UserLeaderboardState),
) -> Result<UserLeaderboardState> {
    change(&mut state);
    if refresh_multipliers(store, &mut state, ev)? {
        info!(
            user = %state.user,
            combined_bps = state.combined_multiplier_bps,
            nft_bps = state.nft_multiplier_bps,
            vp_bps = state.vp_multiplier_bps,
            "combined multiplier changed"
        );
    }
    store.set(&state)?;
    Ok(state)
}

/// Move one token of a partner collection between holders.
pub fn nft_transfer(
    store: &mut dyn Store,
    svc: &Services<'_>,
    globals: &Globals,
    ev: &EventContext,
    collection: &str,
    from: &str,
    to: &str,
) -> Result<()> {
    let collection = normalize_address(collection)?;
    if !store
        .get::<NftPartnership>(&collection)?
        .is_some_and(|p| p.is_active)
    {
        debug!(collection = %collection, "transfer in non-partner collection");
        return Ok(());
    }

    let sides = [(counterparty(from)?, false), (counterparty(to)?, true)];
    for (holder, receiving) in sides {
        let Some(user) = holder else {
            continue;
        };
        let state = settle_holder(store, svc, globals, ev, &user)?;

        let key = UserNftHolding::key(&user, &collection);
        let mut holding = store.get::<UserNftHolding>(&key)?.unwrap_or(UserNftHolding {
            user: user.clone(),
            collection: collection.clone(),
            balance: 0,
            synced: false,
        });
        let chain_balance = svc
            .chain
            .filter(|_| svc.flags.nft_chain_sync && !holding.synced)
            .and_then(|chain| chain.nft_balance_of(&collection, &user));
        match chain_balance {
            // Chain reads observe the post-transfer balance.
            Some(balance) => {
                holding.balance = balance;
                holding.synced = true;
            }
            None if receiving => holding.balance = holding.balance.saturating_add(1),
            None => {
                if holding.balance == 0 {
                    warn!(user = %user, collection = %collection, "nft balance underflow; clamped at zero");
                }
                holding.balance = holding.balance.saturating_sub(1);
            }
        }
        store.set(&holding)?;
        reprice(store, ev, state, |_| {})?;
    }
    Ok(())
}

/// Record new lock terms. A lock that changed hands here is moved between
/// the two holders.
pub fn ve_lock_updated(
    store: &mut dyn Store,
    svc: &Services<'_>,
    globals: &Globals,
    ev: &EventContext,
    terms: LockTerms<'_>,
) -> Result<()> {
    let owner = normalize_address(terms.owner)?;
    let previous_owner = store
        .get::<VeLock>(terms.token_id)?
        .map(|lock| lock.owner)
        .filter(|prev| *prev != owner);

    if let Some(previous) = &previous_owner {
        let state = settle_holder(store, svc, globals, ev, previous)?;
        // Written before repricing so the old holder no longer sees it.
        store.set(&VeLock {
            token_id: terms.token_id.to_string(),
            owner: owner.clone(),
            amount: terms.amount,
            lock_end: terms.lock_end,
            is_permanent: terms.is_permanent,
            updated_at: ev.timestamp,
        })?;
        reprice(store, ev, state, |s| s.untrack_ve_lock(terms.token_id))?;
    }

    let state = settle_holder(store, svc, globals, ev, &owner)?;
    store.set(&VeLock {
        token_id: terms.token_id.to_string(),
        owner,
        amount: terms.amount,
        lock_end: terms.lock_end,
        is_permanent: terms.is_permanent,
        updated_at: ev.timestamp,
    })?;
    let state = reprice(store, ev, state, |s| {
        s.track_ve_lock(terms.token_id);
    })?;
    debug!(
        user = %state.user,
        token_id = terms.token_id,
        voting_power = %state.voting_power,
        "ve lock updated"
    );
    Ok(())
}

/// Hand a lock to a new owner. A transfer to the zero address burns it.
pub fn ve_lock_transferred(
    store: &mut dyn Store,
    svc: &Services<'_>,
    globals: &Globals,
    ev: &EventContext,
    token_id: &str,
    from: &str,
    to: &str,
) -> Result<()> {
    let Some(mut lock) = store.get::<VeLock>(token_id)? else {
        debug!(token_id, "transfer of unknown ve lock");
        return Ok(());
    };
    let Some(to) = counterparty(to)? else {
        return ve_lock_burned(store, svc, globals, ev, token_id);
    };
    if let Some(from) = counterparty(from)? {
        if from != lock.owner {
            warn!(token_id, from = %from, owner = %lock.owner, "ve transfer sender differs from stored owner");
        }
    }
    if lock.owner == to {
        return Ok(());
    }

    let previous = std::mem::replace(&mut lock.owner, to.clone());
    let state = settle_holder(store, svc, globals, ev, &previous)?;
    lock.updated_at = ev.timestamp;
    store.set(&lock)?;
    reprice(store, ev, state, |s| s.untrack_ve_lock(token_id))?;

    let state = settle_holder(store, svc, globals, ev, &to)?;
    reprice(store, ev, state, |s| {
        s.track_ve_lock(token_id);
    })?;
    Ok(())
}

/// Drop a withdrawn or merged lock.
pub fn ve_lock_burned(
    store: &mut dyn Store,
    svc: &Services<'_>,
    globals: &Globals,
    ev: &EventContext,
    token_id: &str,
) -> Result<()> {
    let Some(lock) = store.get::<VeLock>(token_id)? else {
        debug!(token_id, "burn of unknown ve lock");
        return Ok(());
    };
    let state = settle_holder(store, svc, globals, ev, &lock.owner)?;
    store.delete_unsafe::<VeLock>(token_id)?;
    reprice(store, ev, state, |s| s.untrack_ve_lock(token_id))?;
    Ok(())
}
