/// Team model
///
/// Teams are the tenancy boundary: they own books and carry the
/// memberships that are the sole source of permission. Deletion is soft:
/// a non-null `deleted_at` makes the team and everything nested under it
/// invisible to the RBAC engine without destroying history.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE team (
///     id BIGSERIAL PRIMARY KEY,
///     name VARCHAR(255) NOT NULL,
///     deleted_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A team owning books and memberships
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    /// Unique team id
    pub id: i64,

    /// Display name
    pub name: String,

    /// Soft-deletion marker; `Some(_)` means the team is invisible
    pub deleted_at: Option<DateTime<Utc>>,

    /// When the team was created
    pub created_at: DateTime<Utc>,

    /// When the team was last updated
    pub updated_at: DateTime<Utc>,
}

impl Team {
    /// Whether the team is currently soft-deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(deleted: bool) -> Team {
        let now = Utc::now();
        Team {
            id: 1,
            name: "Household".to_string(),
            deleted_at: deleted.then_some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_is_deleted() {
        assert!(!team(false).is_deleted());
        assert!(team(true).is_deleted());
    }
}
