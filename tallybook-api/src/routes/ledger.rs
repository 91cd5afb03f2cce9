/// Ledger content endpoints: accounts, categories, transactions
///
/// # Endpoints
///
/// - `POST /v1/books/:id/accounts` - create an account
/// - `GET  /v1/books/:id/accounts` - list a book's accounts
/// - `POST /v1/books/:id/categories` - create a category
/// - `GET  /v1/books/:id/categories` - list a book's categories
/// - `PUT  /v1/categories/:id/parent` - re-parent a category
/// - `POST /v1/accounts/:id/transactions` - record a transaction
/// - `GET  /v1/accounts/:id/transactions` - list transactions, newest first
///
/// Reads require any role on the governing team, writes require
/// collaborator or above. Category parents are validated against a fresh
/// snapshot of the book's tree before every insert or re-parent.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

use tallybook_shared::auth::middleware::AuthContext;
use tallybook_shared::models::{
    account::Account,
    category::{self, Category, CreateCategory},
    transaction::{CreateTransaction, Transaction},
};
use tallybook_shared::rbac::{gate, resolver::EntityRef};

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// Create account request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountRequest {
    /// Account name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
}

/// Create category request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    /// Category name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    /// Optional parent within the same book
    pub parent_category_id: Option<i64>,
}

/// Re-parent request
#[derive(Debug, Deserialize)]
pub struct SetParentRequest {
    /// New parent, or null to move to the root
    pub parent_category_id: Option<i64>,
}

/// Create transaction request
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    /// Optional category within the account's book
    pub category_id: Option<i64>,

    /// Amount in integer cents
    pub amount_cents: i64,

    /// Free-form note
    pub memo: Option<String>,

    /// When the transaction occurred
    pub occurred_at: DateTime<Utc>,
}

/// Snapshot of a book's categories, extended with the proposed parent row
/// when it lives outside the book so validation can tell a cross-book
/// parent apart from a missing one.
async fn parent_snapshot(
    state: &AppState,
    book_id: i64,
    parent_id: i64,
) -> Result<Vec<Category>, ApiError> {
    let mut snapshot = state.store.categories_of_book(book_id).await?;
    if !snapshot.iter().any(|c| c.id == parent_id) {
        if let Some(row) = state.store.category_row(parent_id).await? {
            snapshot.push(row);
        }
    }
    Ok(snapshot)
}

/// Creates an account under a book
pub async fn create_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(book_id): Path<i64>,
    Json(req): Json<CreateAccountRequest>,
) -> ApiResult<Json<Account>> {
    req.validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    gate::can_write(state.store.as_ref(), EntityRef::Book(book_id), auth.user_id)
        .await
        .map_err(ApiError::from)?
        .require()?;

    let account = state.store.create_account(book_id, &req.name).await?;
    Ok(Json(account))
}

/// Lists a book's accounts
pub async fn list_accounts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(book_id): Path<i64>,
) -> ApiResult<Json<Vec<Account>>> {
    gate::can_read(state.store.as_ref(), EntityRef::Book(book_id), auth.user_id)
        .await
        .map_err(ApiError::from)?
        .require()?;

    let accounts = state.store.accounts_of_book(book_id).await?;
    Ok(Json(accounts))
}

/// Creates a category, validating the parent against the book's tree
pub async fn create_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(book_id): Path<i64>,
    Json(req): Json<CreateCategoryRequest>,
) -> ApiResult<Json<Category>> {
    req.validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    gate::can_write(state.store.as_ref(), EntityRef::Book(book_id), auth.user_id)
        .await
        .map_err(ApiError::from)?
        .require()?;

    if let Some(parent_id) = req.parent_category_id {
        let snapshot = parent_snapshot(&state, book_id, parent_id).await?;
        category::validate_parent(&snapshot, book_id, parent_id, None)?;
    }

    let created = state
        .store
        .create_category(CreateCategory {
            book_id,
            name: req.name,
            parent_category_id: req.parent_category_id,
        })
        .await?;
    Ok(Json(created))
}

/// Lists a book's categories
pub async fn list_categories(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(book_id): Path<i64>,
) -> ApiResult<Json<Vec<Category>>> {
    gate::can_read(state.store.as_ref(), EntityRef::Book(book_id), auth.user_id)
        .await
        .map_err(ApiError::from)?
        .require()?;

    let categories = state.store.categories_of_book(book_id).await?;
    Ok(Json(categories))
}

/// Re-parents a category, refusing cross-book parents and cycles
pub async fn set_category_parent(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<SetParentRequest>,
) -> ApiResult<Json<Category>> {
    let existing = state
        .store
        .category_row(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("not found".to_string()))?;

    gate::can_write(
        state.store.as_ref(),
        EntityRef::Book(existing.book_id),
        auth.user_id,
    )
    .await
    .map_err(ApiError::from)?
    .require()?;

    if let Some(parent_id) = req.parent_category_id {
        let snapshot = parent_snapshot(&state, existing.book_id, parent_id).await?;
        category::validate_parent(&snapshot, existing.book_id, parent_id, Some(id))?;
    }

    let updated = state
        .store
        .set_category_parent(id, req.parent_category_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("not found".to_string()))?;
    Ok(Json(updated))
}

/// Records a transaction against an account
pub async fn create_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(account_id): Path<i64>,
    Json(req): Json<CreateTransactionRequest>,
) -> ApiResult<Json<Transaction>> {
    gate::can_write(
        state.store.as_ref(),
        EntityRef::Account(account_id),
        auth.user_id,
    )
    .await
    .map_err(ApiError::from)?
    .require()?;

    // A category, when given, must belong to the account's book
    if let Some(category_id) = req.category_id {
        let account = state
            .store
            .account_row(account_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("not found".to_string()))?;
        let category = state
            .store
            .category_row(category_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("category not found".to_string()))?;
        if category.book_id != account.book_id {
            return Err(ApiError::BadRequest(
                "category belongs to a different book".to_string(),
            ));
        }
    }

    let transaction = state
        .store
        .create_transaction(CreateTransaction {
            account_id,
            category_id: req.category_id,
            amount_cents: req.amount_cents,
            memo: req.memo,
            occurred_at: req.occurred_at,
        })
        .await?;
    Ok(Json(transaction))
}

/// Lists an account's transactions, newest first
pub async fn list_transactions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(account_id): Path<i64>,
) -> ApiResult<Json<Vec<Transaction>>> {
    gate::can_read(
        state.store.as_ref(),
        EntityRef::Account(account_id),
        auth.user_id,
    )
    .await
    .map_err(ApiError::from)?
    .require()?;

    let transactions = state.store.transactions_of_account(account_id).await?;
    Ok(Json(transactions))
}
