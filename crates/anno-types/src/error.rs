use thiserror::Error;

/// Errors produced by key and identifier operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid {kind} segment {segment:?}: {reason}")]
    InvalidSegment {
        kind: &'static str,
        segment: String,
        reason: &'static str,
    },

    #[error("malformed key {key:?}: expected {expected} segments")]
    MalformedKey { key: String, expected: usize },
}
