//! Error types for the scope runtime

use crate::slot::SlotKey;
use provide_types::ScopeId;
use thiserror::Error;

/// Result type alias for scope operations
pub type Result<T> = std::result::Result<T, ScopeError>;

/// Errors raised by scope operations
///
/// These are programmer errors; callers are not expected to retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    /// The scope was disposed before or during the operation
    #[error("Scope {scope} is disposed")]
    Disposed { scope: ScopeId },

    /// The slot holds no value, e.g. it was already removed
    #[error("Slot {key} in scope {scope} holds no value")]
    SlotReleased { scope: ScopeId, key: SlotKey },

    /// A factory requested its own slot
    #[error("Slot {key} requested again while its value is being created")]
    ReentrantCreation { key: SlotKey },

    /// The cached value is not of the requested type
    #[error("Slot {key} holds a value of another type, expected {expected}")]
    TypeMismatch {
        key: SlotKey,
        expected: &'static str,
    },

    /// No scope with this id encloses the requesting scope
    #[error("No enclosing scope {scope}")]
    UnknownScope { scope: ScopeId },

    /// A fallible factory failed; nothing was stored
    #[error("Failed to create slot {key}: {reason}")]
    Factory { key: SlotKey, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = ScopeError::Disposed {
            scope: ScopeId::new("AppScope"),
        };
        assert_eq!(err.to_string(), "Scope AppScope is disposed");

        let err = ScopeError::Factory {
            key: SlotKey::named("db"),
            reason: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to create slot db: connection refused");
    }
}
