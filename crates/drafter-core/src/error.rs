use thiserror::Error;

pub type Result<T> = std::result::Result<T, DraftError>;

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("Storage error: {0}")]
    Storage(#[from] redb::Error),

    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Storage operation error: {0}")]
    StorageOperation(#[from] redb::StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown key: {0}")]
    UnknownKey(String),

    #[error("Unresolved dependencies for {key}: {}", missing.join(", "))]
    UnresolvedDependency { key: String, missing: Vec<String> },

    #[error("Malformed structured output from {key}: {reason}")]
    MalformedStructuredOutput {
        key: String,
        reason: String,
        raw: String,
    },

    #[error("Unrecognized output shape from {key}")]
    UnrecognizedShape { key: String, raw: String },

    #[error("Model invocation failed for {key}: {message}")]
    ModelInvocation { key: String, message: String },

    #[error("Model call for {key} timed out after {seconds}s")]
    ModelTimeout { key: String, seconds: u64 },

    #[error("Section {0} assembled to empty content")]
    EmptyAssembledSection(String),

    #[error("Template placeholder {{{0}}} has no binding")]
    MissingBinding(String),

    #[error("Version index {index} out of range for {key} ({len} versions)")]
    InvalidVersionIndex { key: String, index: usize, len: usize },

    #[error("Dependency cycle detected at {0}")]
    DependencyCycle(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl DraftError {
    /// Unit-level failures that leave the session usable and let the owning
    /// section fall back to brief-derived content.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DraftError::UnresolvedDependency { .. }
                | DraftError::MalformedStructuredOutput { .. }
                | DraftError::UnrecognizedShape { .. }
        )
    }

    /// Raw model output attached to parse failures, if any.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            DraftError::MalformedStructuredOutput { raw, .. }
            | DraftError::UnrecognizedShape { raw, .. } => Some(raw),
            _ => None,
        }
    }
}
