//! Error types for the interaction engine and its collaborators.

use thiserror::Error;

/// Errors reported by the shared-document collaborator.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("CRDT error: {0}")]
    Crdt(#[from] loro::LoroError),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for shared-document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Errors surfaced to callers of canvas mutations.
///
/// Stale layer references, unrecognized transitions and malformed strokes are
/// not errors: they resolve to no-op outcomes.
#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("Layer limit reached ({max} layers)")]
    CapacityExceeded { max: usize },
    #[error(transparent)]
    Document(#[from] DocumentError),
}

impl CanvasError {
    /// Check if this is a capacity rejection.
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, CanvasError::CapacityExceeded { .. })
    }
}

/// Result type for canvas operations.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_message() {
        let err = CanvasError::CapacityExceeded { max: 100 };
        assert!(err.is_capacity_exceeded());
        assert_eq!(err.to_string(), "Layer limit reached (100 layers)");
    }

    #[test]
    fn test_document_error_is_transparent() {
        let err: CanvasError = DocumentError::Backend("offline".to_string()).into();
        assert!(!err.is_capacity_exceeded());
        assert_eq!(err.to_string(), "Backend error: offline");
    }
}
