/// Account model
///
/// An account belongs to exactly one book (`book_id` immutable) and has no
/// soft-delete state of its own: visibility is inherited entirely from the
/// governing book and team.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE account (
///     id BIGSERIAL PRIMARY KEY,
///     book_id BIGINT NOT NULL REFERENCES book(id),
///     name VARCHAR(255) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A ledger account within a book
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    /// Unique account id
    pub id: i64,

    /// Owning book, immutable after creation
    pub book_id: i64,

    /// Display name
    pub name: String,

    /// When the account was created
    pub created_at: DateTime<Utc>,
}
