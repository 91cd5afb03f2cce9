/// Entity lookup with centralized soft-delete visibility
///
/// This module is the single place that interprets `deleted_at`. No other
/// component re-implements the visibility check: the cascade resolver and
/// role resolver build on these functions, and the stores return raw rows.
///
/// Visibility rules:
///
/// - a Team is visible iff its own `deleted_at` is null;
/// - a Book is visible iff both the Book and its owning Team are visible;
/// - an Account is visible iff its Book is visible (accounts have no
///   soft-delete state of their own).
///
/// Malformed ids (zero, negative) yield `None` without touching storage,
/// keeping callers uniform; only genuine storage failures surface as
/// `StoreError`.

use crate::models::{account::Account, book::Book, team::Team};
use crate::store::{LedgerStore, StoreError};

/// Finds a team by id, honoring soft-delete visibility
///
/// With `include_deleted`, a soft-deleted row is returned as-is; the
/// lifecycle transitions use this to reach restorable entities.
pub async fn find_team(
    store: &dyn LedgerStore,
    team_id: i64,
    include_deleted: bool,
) -> Result<Option<Team>, StoreError> {
    if team_id <= 0 {
        return Ok(None);
    }

    let team = match store.team_row(team_id).await? {
        Some(team) => team,
        None => return Ok(None),
    };

    if team.is_deleted() && !include_deleted {
        return Ok(None);
    }
    Ok(Some(team))
}

/// Finds a book by id
///
/// Returns `None` if the book is deleted or its owning team is deleted,
/// unless `include_deleted`. Even with `include_deleted`, the owning team
/// row must still exist (a purged team takes its books with it).
pub async fn find_book(
    store: &dyn LedgerStore,
    book_id: i64,
    include_deleted: bool,
) -> Result<Option<Book>, StoreError> {
    if book_id <= 0 {
        return Ok(None);
    }

    let book = match store.book_row(book_id).await? {
        Some(book) => book,
        None => return Ok(None),
    };

    let team = match store.team_row(book.team_id).await? {
        Some(team) => team,
        None => return Ok(None),
    };

    if include_deleted {
        return Ok(Some(book));
    }
    if book.is_deleted() || team.is_deleted() {
        return Ok(None);
    }
    Ok(Some(book))
}

/// Finds an account by id
///
/// Returns `None` whenever the governing book/team chain is not visible;
/// a live account row under a deleted book is invisible, never a partial
/// result.
pub async fn find_account(
    store: &dyn LedgerStore,
    account_id: i64,
) -> Result<Option<Account>, StoreError> {
    if account_id <= 0 {
        return Ok(None);
    }

    let account = match store.account_row(account_id).await? {
        Some(account) => account,
        None => return Ok(None),
    };

    match find_book(store, account.book_id, false).await? {
        Some(_) => Ok(Some(account)),
        None => Ok(None),
    }
}
