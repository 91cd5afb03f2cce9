/// Decision values and the closed reason taxonomy
///
/// Every yes/no procedure in the engine (`gate`, `guard`) answers with a
/// [`Decision`]: allowed, or denied with a kind drawn from a closed set
/// and a fixed human-readable reason. Denials are routine outcomes and
/// are always returned as values; only storage failures escape as errors.
///
/// The route layer maps kinds to transport codes (AccessDenied and
/// InsufficientRole → 403, NotFound → 404, InvariantViolation → 400), but
/// the taxonomy itself is this crate's contract, not the HTTP layer's.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Fixed reason strings: the closed taxonomy callers may rely on
pub mod reason {
    /// No membership in the governing team, or the chain does not resolve
    pub const ACCESS_DENIED: &str = "access denied";

    /// Member, but viewer tier cannot write
    pub const WRITE_ACCESS_REQUIRED: &str = "write access required";

    /// Member, but below admin tier
    pub const INSUFFICIENT_PRIVILEGE: &str = "insufficient privilege";

    /// The referenced entity does not exist (or is not visible)
    pub const NOT_FOUND: &str = "not found";

    /// The mutation would leave the team without an admin
    pub const LAST_ADMIN: &str = "last admin";

    /// The mutation would leave the team without any member
    pub const LAST_MEMBER: &str = "last member";

    /// Permanent deletion attempted on an entity that is not soft-deleted
    pub const NOT_DELETED: &str = "not deleted";
}

/// Classification of a denial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// No membership in the governing team (or unresolvable chain)
    AccessDenied,

    /// Membership exists but its role is below the required tier
    InsufficientRole,

    /// The referenced entity does not exist or is not visible
    NotFound,

    /// The mutation would violate a structural team invariant
    InvariantViolation,
}

/// A denial: kind plus its fixed reason string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Denial {
    /// Taxonomy kind
    pub kind: DenialKind,

    /// Reason from [`reason`]
    pub reason: &'static str,
}

/// Outcome of a permission or invariant check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    /// Whether the operation may proceed
    pub allowed: bool,

    /// Present iff `allowed` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denial: Option<Denial>,
}

impl Decision {
    /// An allowing decision
    pub fn allow() -> Self {
        Decision {
            allowed: true,
            denial: None,
        }
    }

    /// A denying decision with the given kind and reason
    pub fn deny(kind: DenialKind, reason: &'static str) -> Self {
        Decision {
            allowed: false,
            denial: Some(Denial { kind, reason }),
        }
    }

    /// The reason string, empty when allowed
    pub fn reason(&self) -> &'static str {
        self.denial.map(|d| d.reason).unwrap_or("")
    }

    /// Converts the decision into a `Result`, for callers that gate a
    /// mutation on it
    pub fn require(self) -> Result<(), EngineError> {
        match self.denial {
            None => Ok(()),
            Some(denial) => Err(denial.into()),
        }
    }
}

impl From<Denial> for EngineError {
    fn from(denial: Denial) -> Self {
        match denial.kind {
            DenialKind::AccessDenied => EngineError::AccessDenied,
            DenialKind::InsufficientRole => EngineError::InsufficientRole(denial.reason),
            DenialKind::NotFound => EngineError::NotFound,
            DenialKind::InvariantViolation => EngineError::InvariantViolation(denial.reason),
        }
    }
}
