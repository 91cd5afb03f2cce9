/// Cascade resolution along the ownership chain
///
/// Permission is governed by the Team at the top of the chain, so every
/// lower-level reference (Account → Book → Team) must be walked upward to
/// find the governing team. Each hop re-checks soft-delete visibility: a
/// live account under a deleted book resolves to `None`, never to a stale
/// team.

use crate::models::{book::Book, team::Team};
use crate::rbac::lookup;
use crate::store::{LedgerStore, StoreError};

/// Resolves the team governing a book (one hop)
pub async fn team_of_book(
    store: &dyn LedgerStore,
    book_id: i64,
) -> Result<Option<Team>, StoreError> {
    let book = match lookup::find_book(store, book_id, false).await? {
        Some(book) => book,
        None => return Ok(None),
    };

    lookup::find_team(store, book.team_id, false).await
}

/// Resolves the book governing an account (one hop)
pub async fn book_of_account(
    store: &dyn LedgerStore,
    account_id: i64,
) -> Result<Option<Book>, StoreError> {
    let account = match store.account_row(account_id).await? {
        Some(account) => account,
        None => return Ok(None),
    };

    lookup::find_book(store, account.book_id, false).await
}

/// Resolves the team governing an account (two hops)
pub async fn team_of_account(
    store: &dyn LedgerStore,
    account_id: i64,
) -> Result<Option<Team>, StoreError> {
    let book = match book_of_account(store, account_id).await? {
        Some(book) => book,
        None => return Ok(None),
    };

    lookup::find_team(store, book.team_id, false).await
}
