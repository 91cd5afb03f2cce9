/// Book model
///
/// A book is a ledger/workspace of accounts, categories, and transactions
/// owned by exactly one team. `team_id` is immutable after creation. A
/// book is visible only if both the book itself and its owning team are
/// non-deleted.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE book (
///     id BIGSERIAL PRIMARY KEY,
///     team_id BIGINT NOT NULL REFERENCES team(id),
///     name VARCHAR(255) NOT NULL,
///     deleted_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A ledger owned by one team
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    /// Unique book id
    pub id: i64,

    /// Owning team, immutable after creation
    pub team_id: i64,

    /// Display name
    pub name: String,

    /// Soft-deletion marker for the book itself
    pub deleted_at: Option<DateTime<Utc>>,

    /// When the book was created
    pub created_at: DateTime<Utc>,

    /// When the book was last updated
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Whether the book row itself is soft-deleted
    ///
    /// Visibility additionally depends on the owning team; callers go
    /// through `rbac::lookup` rather than checking this directly.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
