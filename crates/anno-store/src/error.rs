/// Errors from key-value store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested key does not exist.
    #[error("key not found: {key}")]
    NotFound { key: String },

    /// `insert_new` found the key already present.
    #[error("key already exists: {key}")]
    AlreadyExists { key: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The on-disk log cannot be decoded.
    #[error("corrupt log at offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },

    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// `true` for the not-found tag; every other variant is a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub(crate) fn not_found(key: &str) -> Self {
        Self::NotFound { key: key.to_string() }
    }

    pub(crate) fn already_exists(key: &str) -> Self {
        Self::AlreadyExists { key: key.to_string() }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
