use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::key::validate_segment;

/// Identifier of a single annotation within a collection.
///
/// Freshly generated identifiers are lower-case hyphenated UUID v4 strings.
/// Identifiers taken from request paths are only required to be a valid key
/// segment; anything else can never address a stored annotation.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(String);

impl AnnotationId {
    /// Wrap a UUID in its canonical textual form.
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid.hyphenated().to_string())
    }

    /// Accept an identifier taken from a request path.
    pub fn parse(segment: &str) -> Result<Self, TypeError> {
        validate_segment("annotation", segment)?;
        Ok(Self(segment.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short representation (first 8 characters).
    pub fn short_id(&self) -> &str {
        let end = self.0.char_indices().nth(8).map_or(self.0.len(), |(i, _)| i);
        &self.0[..end]
    }
}

impl fmt::Debug for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnnotationId({})", self.short_id())
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of fresh annotation identifiers.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> AnnotationId;
}

/// Random 128-bit identifiers (UUID v4).
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidV4Generator;

impl IdGenerator for UuidV4Generator {
    fn generate(&self) -> AnnotationId {
        AnnotationId::from_uuid(uuid::Uuid::new_v4())
    }
}
