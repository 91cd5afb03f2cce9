/// Team lifecycle and membership endpoints
///
/// # Endpoints
///
/// - `POST   /v1/teams` - create a team (creator auto-enrolled as admin)
/// - `GET    /v1/teams` - list the caller's visible teams
/// - `GET    /v1/teams/:id` - fetch a single team (read gate)
/// - `DELETE /v1/teams/:id` - soft-delete
/// - `POST   /v1/teams/:id/restore` - restore
/// - `DELETE /v1/teams/:id/purge` - permanent delete (soft-deleted only)
/// - `GET    /v1/teams/:id/members` - list memberships
/// - `POST   /v1/teams/:id/members` - add a member
/// - `DELETE /v1/teams/:id/members/:user_id` - remove a member
/// - `PUT    /v1/teams/:id/members/:user_id` - change a member's role
///
/// Handlers delegate authorization and invariants to the engine; this
/// module only shapes requests and responses.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use validator::Validate;

use tallybook_shared::auth::middleware::AuthContext;
use tallybook_shared::lifecycle;
use tallybook_shared::models::{
    membership::{Membership, TeamRole},
    team::Team,
};
use tallybook_shared::rbac::{gate, lookup, resolver::EntityRef};

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// Create team request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTeamRequest {
    /// Team name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
}

/// Membership mutation request
#[derive(Debug, Deserialize)]
pub struct MemberRequest {
    /// Target user id
    pub user_id: i64,

    /// Role to grant
    pub role: TeamRole,
}

/// Role change request
#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    /// New role
    pub role: TeamRole,
}

/// Creates a team with the caller as admin
pub async fn create_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTeamRequest>,
) -> ApiResult<Json<Team>> {
    req.validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let team = lifecycle::create_team(state.store.as_ref(), &req.name, auth.user_id).await?;
    Ok(Json(team))
}

/// Lists the caller's teams, soft-deleted ones excluded
pub async fn list_teams(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Team>>> {
    let memberships = state.store.memberships_of_user(auth.user_id).await?;

    let mut teams = Vec::with_capacity(memberships.len());
    for membership in memberships {
        if let Some(team) = lookup::find_team(state.store.as_ref(), membership.team_id, false).await? {
            teams.push(team);
        }
    }
    Ok(Json(teams))
}

/// Fetches one team the caller can read
pub async fn get_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Team>> {
    gate::can_read(state.store.as_ref(), EntityRef::Team(id), auth.user_id)
        .await
        .map_err(ApiError::from)?
        .require()?;

    let team = lookup::find_team(state.store.as_ref(), id, false)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::NotFound("not found".to_string()))?;
    Ok(Json(team))
}

/// Soft-deletes a team
pub async fn soft_delete_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Team>> {
    let team = lifecycle::soft_delete_team(state.store.as_ref(), id, auth.user_id).await?;
    Ok(Json(team))
}

/// Restores a soft-deleted team
pub async fn restore_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Team>> {
    let team = lifecycle::restore_team(state.store.as_ref(), id, auth.user_id).await?;
    Ok(Json(team))
}

/// Permanently deletes a soft-deleted team
pub async fn purge_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    lifecycle::purge_team(state.store.as_ref(), id, auth.user_id).await?;
    Ok(Json(serde_json::json!({ "purged": true })))
}

/// Lists a team's memberships; any member may read them
pub async fn list_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Membership>>> {
    gate::can_read(state.store.as_ref(), EntityRef::Team(id), auth.user_id)
        .await
        .map_err(ApiError::from)?
        .require()?;

    let members = state.store.memberships_of_team(id).await?;
    Ok(Json(members))
}

/// Adds a member to a team
pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<MemberRequest>,
) -> ApiResult<Json<Membership>> {
    let membership =
        lifecycle::add_member(state.store.as_ref(), id, req.user_id, req.role, auth.user_id)
            .await?;
    Ok(Json(membership))
}

/// Removes a member from a team
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((id, user_id)): Path<(i64, i64)>,
) -> ApiResult<Json<serde_json::Value>> {
    lifecycle::remove_member(state.store.as_ref(), id, user_id, auth.user_id).await?;
    Ok(Json(serde_json::json!({ "removed": true })))
}

/// Changes a member's role
pub async fn change_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((id, user_id)): Path<(i64, i64)>,
    Json(req): Json<RoleRequest>,
) -> ApiResult<Json<Membership>> {
    let membership =
        lifecycle::change_role(state.store.as_ref(), id, user_id, req.role, auth.user_id).await?;
    Ok(Json(membership))
}
