/// Engine error taxonomy
///
/// The closed set of outcomes a guarded mutation can take. All variants
/// except `Storage` are routine, expected results the caller branches on;
/// `Storage` is the only fatal path and must never be swallowed.

use crate::store::StoreError;

/// Errors returned by lifecycle transitions and guarded mutations
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No membership in the governing team, or the chain does not resolve
    #[error("access denied")]
    AccessDenied,

    /// Membership exists but its role is below the required tier
    #[error("{0}")]
    InsufficientRole(&'static str),

    /// The referenced entity does not exist or is not visible
    #[error("not found")]
    NotFound,

    /// The mutation would violate a structural invariant
    #[error("{0}")]
    InvariantViolation(&'static str),

    /// The backing store failed; the only fatal variant
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(EngineError::AccessDenied.to_string(), "access denied");
        assert_eq!(EngineError::NotFound.to_string(), "not found");
        assert_eq!(
            EngineError::InvariantViolation("last admin").to_string(),
            "last admin"
        );
        assert_eq!(
            EngineError::InsufficientRole("insufficient privilege").to_string(),
            "insufficient privilege"
        );
    }
}
