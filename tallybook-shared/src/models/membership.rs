/// Membership model and the role lattice
///
/// A membership is the (team, user, role) grant that is the sole source of
/// permission in Tallybook: a user's role for any book, account, or
/// transaction is exactly their membership role in the owning team. There
/// is no per-book or per-account override.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE team_role AS ENUM ('admin', 'collaborator', 'viewer');
///
/// CREATE TABLE team_user (
///     team_id BIGINT NOT NULL REFERENCES team(id),
///     user_id BIGINT NOT NULL REFERENCES users(id),
///     role team_role NOT NULL DEFAULT 'viewer',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (team_id, user_id)
/// );
/// ```
///
/// # Roles
///
/// - **admin**: full control over membership, lifecycle, reads and writes
/// - **collaborator**: read and write ledger content
/// - **viewer**: read-only access
///
/// Role totally orders permission: admin ⊇ collaborator ⊇ viewer. Every
/// operation maps to the minimum role required.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a user within a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "team_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    /// Full control: membership, lifecycle, reads and writes
    Admin,

    /// Can read and write ledger content
    Collaborator,

    /// Read-only access
    Viewer,
}

impl TeamRole {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamRole::Admin => "admin",
            TeamRole::Collaborator => "collaborator",
            TeamRole::Viewer => "viewer",
        }
    }

    /// Parses role from its storage string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(TeamRole::Admin),
            "collaborator" => Some(TeamRole::Collaborator),
            "viewer" => Some(TeamRole::Viewer),
            _ => None,
        }
    }

    /// Whether this role meets the given minimum tier
    ///
    /// Hierarchy: admin > collaborator > viewer.
    pub fn at_least(&self, required: TeamRole) -> bool {
        self.rank() >= required.rank()
    }

    /// Numeric tier for comparison
    fn rank(&self) -> u8 {
        match self {
            TeamRole::Admin => 3,
            TeamRole::Collaborator => 2,
            TeamRole::Viewer => 1,
        }
    }

    /// Can read ledger content
    pub fn can_read(&self) -> bool {
        self.at_least(TeamRole::Viewer)
    }

    /// Can write ledger content (books, accounts, categories, transactions)
    pub fn can_write(&self) -> bool {
        self.at_least(TeamRole::Collaborator)
    }

    /// Can administer the team (membership and lifecycle mutations)
    pub fn can_admin(&self) -> bool {
        matches!(self, TeamRole::Admin)
    }
}

/// A user's grant within a team
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    /// Team id
    pub team_id: i64,

    /// User id
    pub user_id: i64,

    /// Role within the team
    pub role: TeamRole,

    /// When the membership was created
    pub created_at: DateTime<Utc>,
}

impl Membership {
    /// Builds a membership row stamped with the current time
    pub fn new(team_id: i64, user_id: i64, role: TeamRole) -> Self {
        Membership {
            team_id,
            user_id,
            role,
            created_at: Utc::now(),
        }
    }
}
