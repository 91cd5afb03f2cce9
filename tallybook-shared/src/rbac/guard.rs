/// Membership invariant guard
///
/// A team must always retain at least one membership total and at least
/// one membership with the `admin` role. No mutation may reduce either
/// count to zero.
///
/// The guard comes in two forms:
///
/// - **Pure checks** ([`check_remove`], [`check_role_change`]) over a
///   membership snapshot. Store implementations re-run these inside the
///   mutating transaction, immediately before the write, so concurrent
///   "remove the second-to-last admin" requests cannot both commit.
/// - **Advisory procedures** ([`can_remove_member`], [`can_change_role`])
///   that read the current snapshot through the store and answer with a
///   [`Decision`]. These shrink the race window; the transactional
///   re-check closes it.

use serde::{Deserialize, Serialize};

use crate::models::membership::{Membership, TeamRole};
use crate::rbac::decision::{reason, Decision, DenialKind};
use crate::store::{LedgerStore, StoreError};

/// Refusal produced by the invariant checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardRefusal {
    /// Removing this user would leave the team with zero members
    LastMember,

    /// The mutation would leave the team with zero admins
    LastAdmin,
}

impl GuardRefusal {
    /// The fixed reason string for this refusal
    pub fn reason(&self) -> &'static str {
        match self {
            GuardRefusal::LastMember => reason::LAST_MEMBER,
            GuardRefusal::LastAdmin => reason::LAST_ADMIN,
        }
    }
}

/// Checks whether `user_id` may be removed from the team
///
/// `snapshot` must be the team's complete current membership set and must
/// contain the target row; callers resolve existence first.
pub fn check_remove(snapshot: &[Membership], user_id: i64) -> Result<(), GuardRefusal> {
    if snapshot.len() <= 1 {
        return Err(GuardRefusal::LastMember);
    }

    let target_is_admin = snapshot
        .iter()
        .any(|m| m.user_id == user_id && m.role == TeamRole::Admin);
    if target_is_admin && admin_count(snapshot) <= 1 {
        return Err(GuardRefusal::LastAdmin);
    }

    Ok(())
}

/// Checks whether `user_id`'s role may change to `new_role`
///
/// Only a demotion of the last admin is refused; promotions and sideways
/// moves of non-admins are always structurally safe.
pub fn check_role_change(
    snapshot: &[Membership],
    user_id: i64,
    new_role: TeamRole,
) -> Result<(), GuardRefusal> {
    if new_role == TeamRole::Admin {
        return Ok(());
    }

    let target_is_admin = snapshot
        .iter()
        .any(|m| m.user_id == user_id && m.role == TeamRole::Admin);
    if target_is_admin && admin_count(snapshot) <= 1 {
        return Err(GuardRefusal::LastAdmin);
    }

    Ok(())
}

fn admin_count(snapshot: &[Membership]) -> usize {
    snapshot.iter().filter(|m| m.role == TeamRole::Admin).count()
}

/// Advisory check: may this user be removed from the team right now?
///
/// Reads the current membership snapshot. A missing target membership
/// denies with NotFound.
pub async fn can_remove_member(
    store: &dyn LedgerStore,
    team_id: i64,
    user_id: i64,
) -> Result<Decision, StoreError> {
    let snapshot = store.memberships_of_team(team_id).await?;
    if !snapshot.iter().any(|m| m.user_id == user_id) {
        return Ok(Decision::deny(DenialKind::NotFound, reason::NOT_FOUND));
    }

    Ok(match check_remove(&snapshot, user_id) {
        Ok(()) => Decision::allow(),
        Err(refusal) => Decision::deny(DenialKind::InvariantViolation, refusal.reason()),
    })
}

/// Advisory check: may this user's role change to `new_role` right now?
pub async fn can_change_role(
    store: &dyn LedgerStore,
    team_id: i64,
    user_id: i64,
    new_role: TeamRole,
) -> Result<Decision, StoreError> {
    let snapshot = store.memberships_of_team(team_id).await?;
    if !snapshot.iter().any(|m| m.user_id == user_id) {
        return Ok(Decision::deny(DenialKind::NotFound, reason::NOT_FOUND));
    }

    Ok(match check_role_change(&snapshot, user_id, new_role) {
        Ok(()) => Decision::allow(),
        Err(refusal) => Decision::deny(DenialKind::InvariantViolation, refusal.reason()),
    })
}
