/// Entity lifecycle transitions
///
/// State machine per team and book: `active <-> deleted`, plus the
/// irreversible `deleted -> purged` transition. Soft delete sets
/// `deleted_at` and touches nothing else; dependent visibility is derived
/// by `rbac::lookup`, not stored. Permanent deletion severs dependent rows
/// first, inside one atomic store operation.
///
/// Every transition authorizes through the role resolver before touching
/// state. Restore and purge resolve the target with deleted rows included,
/// then read the membership of the already-resolved team row; the grant
/// survives soft deletion even though `role_of` no longer reports it.
///
/// All procedures return denials as [`EngineError`] values. The only
/// variant that represents a genuine failure is `Storage`.

use chrono::Utc;
use tracing::info;

use crate::error::EngineError;
use crate::models::{
    book::Book,
    membership::{Membership, TeamRole},
    team::Team,
};
use crate::rbac::decision::reason;
use crate::rbac::resolver::{self, EntityRef};
use crate::rbac::{gate, lookup};
use crate::store::{LedgerStore, MemberWrite};

/// Requires the admin grant on an already-resolved team row
async fn require_admin(
    store: &dyn LedgerStore,
    team: &Team,
    user_id: i64,
) -> Result<(), EngineError> {
    match resolver::role_in_team(store, team, user_id).await? {
        Some(role) if role.can_admin() => Ok(()),
        Some(_) => Err(EngineError::InsufficientRole(reason::INSUFFICIENT_PRIVILEGE)),
        None => Err(EngineError::AccessDenied),
    }
}

// ---- teams ----

/// Creates a team and enrolls the creator as admin
///
/// Entity insert and admin enrollment are one atomic unit in the store;
/// a failure between the two rolls back the team row.
pub async fn create_team(
    store: &dyn LedgerStore,
    name: &str,
    creator_id: i64,
) -> Result<Team, EngineError> {
    if creator_id <= 0 {
        return Err(EngineError::AccessDenied);
    }

    let team = store.create_team_with_admin(name, creator_id).await?;
    info!(team_id = team.id, creator_id, "team created");
    Ok(team)
}

/// Soft-deletes a team, revoking derived access to everything under it
pub async fn soft_delete_team(
    store: &dyn LedgerStore,
    team_id: i64,
    actor_id: i64,
) -> Result<Team, EngineError> {
    let team = lookup::find_team(store, team_id, false)
        .await?
        .ok_or(EngineError::NotFound)?;
    require_admin(store, &team, actor_id).await?;

    let updated = store
        .set_team_deleted(team_id, Some(Utc::now()))
        .await?
        .ok_or(EngineError::NotFound)?;
    info!(team_id, actor_id, "team soft-deleted");
    Ok(updated)
}

/// Restores a soft-deleted team, reinstating prior roles exactly
///
/// Restoring a team that is already active is a no-op.
pub async fn restore_team(
    store: &dyn LedgerStore,
    team_id: i64,
    actor_id: i64,
) -> Result<Team, EngineError> {
    let team = lookup::find_team(store, team_id, true)
        .await?
        .ok_or(EngineError::NotFound)?;
    require_admin(store, &team, actor_id).await?;

    if !team.is_deleted() {
        return Ok(team);
    }

    let updated = store
        .set_team_deleted(team_id, None)
        .await?
        .ok_or(EngineError::NotFound)?;
    info!(team_id, actor_id, "team restored");
    Ok(updated)
}

/// Permanently deletes a soft-deleted team and all of its dependents
///
/// Requires the team to be in the deleted state first; memberships,
/// books, accounts, categories, and transactions go with it atomically.
pub async fn purge_team(
    store: &dyn LedgerStore,
    team_id: i64,
    actor_id: i64,
) -> Result<(), EngineError> {
    let team = lookup::find_team(store, team_id, true)
        .await?
        .ok_or(EngineError::NotFound)?;
    require_admin(store, &team, actor_id).await?;

    if !team.is_deleted() {
        return Err(EngineError::InvariantViolation(reason::NOT_DELETED));
    }

    if !store.purge_team(team_id).await? {
        return Err(EngineError::NotFound);
    }
    info!(team_id, actor_id, "team purged");
    Ok(())
}

// ---- books ----

/// Creates a book under a team
///
/// Requires write access on the team; a viewer is refused, an outsider
/// (or a deleted team) resolves to access denied.
pub async fn create_book(
    store: &dyn LedgerStore,
    team_id: i64,
    name: &str,
    actor_id: i64,
) -> Result<Book, EngineError> {
    gate::can_write(store, EntityRef::Team(team_id), actor_id)
        .await?
        .require()?;

    let book = store.create_book(team_id, name).await?;
    info!(book_id = book.id, team_id, actor_id, "book created");
    Ok(book)
}

/// Soft-deletes a book
pub async fn soft_delete_book(
    store: &dyn LedgerStore,
    book_id: i64,
    actor_id: i64,
) -> Result<Book, EngineError> {
    let book = lookup::find_book(store, book_id, false)
        .await?
        .ok_or(EngineError::NotFound)?;
    let team = lookup::find_team(store, book.team_id, false)
        .await?
        .ok_or(EngineError::NotFound)?;
    require_admin(store, &team, actor_id).await?;

    let updated = store
        .set_book_deleted(book_id, Some(Utc::now()))
        .await?
        .ok_or(EngineError::NotFound)?;
    info!(book_id, actor_id, "book soft-deleted");
    Ok(updated)
}

/// Restores a soft-deleted book
///
/// The governing team must be active: a book under a soft-deleted team
/// stays invisible, and a book whose team was purged no longer resolves
/// at all. Both cases fail as not-found rather than silently no-op.
pub async fn restore_book(
    store: &dyn LedgerStore,
    book_id: i64,
    actor_id: i64,
) -> Result<Book, EngineError> {
    let book = lookup::find_book(store, book_id, true)
        .await?
        .ok_or(EngineError::NotFound)?;
    let team = lookup::find_team(store, book.team_id, false)
        .await?
        .ok_or(EngineError::NotFound)?;
    require_admin(store, &team, actor_id).await?;

    if !book.is_deleted() {
        return Ok(book);
    }

    let updated = store
        .set_book_deleted(book_id, None)
        .await?
        .ok_or(EngineError::NotFound)?;
    info!(book_id, actor_id, "book restored");
    Ok(updated)
}

/// Permanently deletes a soft-deleted book and its contents
pub async fn purge_book(
    store: &dyn LedgerStore,
    book_id: i64,
    actor_id: i64,
) -> Result<(), EngineError> {
    let book = lookup::find_book(store, book_id, true)
        .await?
        .ok_or(EngineError::NotFound)?;
    let team = lookup::find_team(store, book.team_id, true)
        .await?
        .ok_or(EngineError::NotFound)?;
    require_admin(store, &team, actor_id).await?;

    if !book.is_deleted() {
        return Err(EngineError::InvariantViolation(reason::NOT_DELETED));
    }

    if !store.purge_book(book_id).await? {
        return Err(EngineError::NotFound);
    }
    info!(book_id, actor_id, "book purged");
    Ok(())
}

// ---- membership ----

/// Enrolls a user in a team with the given role
pub async fn add_member(
    store: &dyn LedgerStore,
    team_id: i64,
    target_user_id: i64,
    role: TeamRole,
    actor_id: i64,
) -> Result<Membership, EngineError> {
    gate::can_admin(store, EntityRef::Team(team_id), actor_id)
        .await?
        .require()?;

    if store.user_by_id(target_user_id).await?.is_none() {
        return Err(EngineError::NotFound);
    }

    let membership = store.add_member(team_id, target_user_id, role).await?;
    info!(team_id, target_user_id, role = role.as_str(), actor_id, "member added");
    Ok(membership)
}

/// Removes a user from a team
///
/// The invariant re-check runs inside the store's transaction; a refusal
/// here means nothing was written.
pub async fn remove_member(
    store: &dyn LedgerStore,
    team_id: i64,
    target_user_id: i64,
    actor_id: i64,
) -> Result<(), EngineError> {
    gate::can_admin(store, EntityRef::Team(team_id), actor_id)
        .await?
        .require()?;

    match store.remove_member_checked(team_id, target_user_id).await? {
        MemberWrite::Applied => {
            info!(team_id, target_user_id, actor_id, "member removed");
            Ok(())
        }
        MemberWrite::Refused(refusal) => Err(EngineError::InvariantViolation(refusal.reason())),
        MemberWrite::Missing => Err(EngineError::NotFound),
    }
}

/// Changes a member's role within a team
pub async fn change_role(
    store: &dyn LedgerStore,
    team_id: i64,
    target_user_id: i64,
    new_role: TeamRole,
    actor_id: i64,
) -> Result<Membership, EngineError> {
    gate::can_admin(store, EntityRef::Team(team_id), actor_id)
        .await?
        .require()?;

    match store
        .set_member_role_checked(team_id, target_user_id, new_role)
        .await?
    {
        MemberWrite::Applied => {
            info!(
                team_id,
                target_user_id,
                role = new_role.as_str(),
                actor_id,
                "member role changed"
            );
            store
                .membership(team_id, target_user_id)
                .await?
                .ok_or(EngineError::NotFound)
        }
        MemberWrite::Refused(refusal) => Err(EngineError::InvariantViolation(refusal.reason())),
        MemberWrite::Missing => Err(EngineError::NotFound),
    }
}
