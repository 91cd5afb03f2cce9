/// Book lifecycle endpoints
///
/// # Endpoints
///
/// - `POST   /v1/teams/:id/books` - create a book under a team
/// - `GET    /v1/teams/:id/books` - list a team's visible books
/// - `GET    /v1/books/:id` - fetch one book
/// - `DELETE /v1/books/:id` - soft-delete
/// - `POST   /v1/books/:id/restore` - restore
/// - `DELETE /v1/books/:id/purge` - permanent delete (soft-deleted only)

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use validator::Validate;

use tallybook_shared::auth::middleware::AuthContext;
use tallybook_shared::lifecycle;
use tallybook_shared::models::book::Book;
use tallybook_shared::rbac::{gate, lookup, resolver::EntityRef};

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// Create book request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookRequest {
    /// Book name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
}

/// Creates a book under a team; requires write access on the team
pub async fn create_book(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(team_id): Path<i64>,
    Json(req): Json<CreateBookRequest>,
) -> ApiResult<Json<Book>> {
    req.validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let book = lifecycle::create_book(state.store.as_ref(), team_id, &req.name, auth.user_id)
        .await?;
    Ok(Json(book))
}

/// Lists a team's books, soft-deleted ones excluded
pub async fn list_books(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(team_id): Path<i64>,
) -> ApiResult<Json<Vec<Book>>> {
    gate::can_read(state.store.as_ref(), EntityRef::Team(team_id), auth.user_id)
        .await
        .map_err(ApiError::from)?
        .require()?;

    let books = state
        .store
        .books_of_team(team_id)
        .await?
        .into_iter()
        .filter(|b| !b.is_deleted())
        .collect();
    Ok(Json(books))
}

/// Fetches one book, honoring soft-delete visibility
pub async fn get_book(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Book>> {
    gate::can_read(state.store.as_ref(), EntityRef::Book(id), auth.user_id)
        .await
        .map_err(ApiError::from)?
        .require()?;

    let book = lookup::find_book(state.store.as_ref(), id, false)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::NotFound("not found".to_string()))?;
    Ok(Json(book))
}

/// Soft-deletes a book
pub async fn soft_delete_book(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Book>> {
    let book = lifecycle::soft_delete_book(state.store.as_ref(), id, auth.user_id).await?;
    Ok(Json(book))
}

/// Restores a soft-deleted book; the owning team must be active
pub async fn restore_book(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Book>> {
    let book = lifecycle::restore_book(state.store.as_ref(), id, auth.user_id).await?;
    Ok(Json(book))
}

/// Permanently deletes a soft-deleted book and its contents
pub async fn purge_book(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    lifecycle::purge_book(state.store.as_ref(), id, auth.user_id).await?;
    Ok(Json(serde_json::json!({ "purged": true })))
}
