/// Role resolution: the single source of truth for effective roles
///
/// `role_of` is the only path in the system that reads membership
/// storage. Every other component (the permission gate, the lifecycle
/// transitions, the route layer) goes through it, so the rule that
/// soft-deletion silently revokes access is enforced exactly once.
///
/// Resolution is pure and idempotent: resolve the reference to its
/// governing team via lookup/cascade; if that fails (deleted or missing
/// anywhere along the chain), the answer is `None` immediately, never a
/// cached or prior role. Otherwise the (team, user) membership row
/// decides.

use serde::{Deserialize, Serialize};

use crate::models::{membership::TeamRole, team::Team};
use crate::rbac::{cascade, lookup};
use crate::store::{LedgerStore, StoreError};

/// Discriminated reference to a permission subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    /// A team by id
    Team(i64),

    /// A book by id
    Book(i64),

    /// An account by id
    Account(i64),
}

/// Resolves a user's effective role for the referenced entity
///
/// Returns `None` when the user has no membership in the governing team
/// or when the ownership chain does not resolve (missing or soft-deleted
/// at any level).
pub async fn role_of(
    store: &dyn LedgerStore,
    entity: EntityRef,
    user_id: i64,
) -> Result<Option<TeamRole>, StoreError> {
    let team = match entity {
        EntityRef::Team(id) => lookup::find_team(store, id, false).await?,
        EntityRef::Book(id) => cascade::team_of_book(store, id).await?,
        EntityRef::Account(id) => cascade::team_of_account(store, id).await?,
    };

    match team {
        Some(team) => role_in_team(store, &team, user_id).await,
        None => Ok(None),
    }
}

/// Reads the membership role for an already-resolved team row
///
/// The lifecycle transitions use this with a row obtained via
/// `lookup::find_team(.., include_deleted = true)`: restoring a
/// soft-deleted team still requires the caller to hold the admin grant
/// that `role_of` would no longer report.
pub async fn role_in_team(
    store: &dyn LedgerStore,
    team: &Team,
    user_id: i64,
) -> Result<Option<TeamRole>, StoreError> {
    if user_id <= 0 {
        return Ok(None);
    }

    let membership = store.membership(team.id, user_id).await?;
    Ok(membership.map(|m| m.role))
}
