//! Error types for tfplug

/// Failures reading or writing attribute values
#[derive(Debug, thiserror::Error)]
pub enum TfplugError {
    #[error("Attribute not found: {0}")]
    AttributeNotFound(String),

    #[error("Type mismatch at {path}: expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Invalid attribute path: {0}")]
    InvalidPath(String),

    #[error("Decoding error: {0}")]
    DecodingError(#[from] serde_json::Error),
}

/// Result type alias for tfplug operations
pub type Result<T> = std::result::Result<T, TfplugError>;
