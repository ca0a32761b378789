//! Hierarchical key naming over a flat key space.
//!
//! Rules for every segment:
//! - Must be non-empty
//! - Must not contain the separator `/`
//! - Must not contain control characters

use std::fmt;

use crate::error::TypeError;
use crate::id::AnnotationId;

/// Separator between key segments.
pub const KEY_SEPARATOR: char = '/';

/// Validate a single key segment. `kind` names the segment in errors.
pub fn validate_segment(kind: &'static str, segment: &str) -> Result<(), TypeError> {
    let reason = if segment.is_empty() {
        "must not be empty"
    } else if segment.contains(KEY_SEPARATOR) {
        "must not contain '/'"
    } else if segment.chars().any(char::is_control) {
        "must not contain control characters"
    } else {
        return Ok(());
    };
    Err(TypeError::InvalidSegment {
        kind,
        segment: segment.to_string(),
        reason,
    })
}

/// Key of a collection: `{user}/{collection}`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionKey {
    user: String,
    collection: String,
    key: String,
}

impl CollectionKey {
    pub fn new(user: &str, collection: &str) -> Result<Self, TypeError> {
        validate_segment("user", user)?;
        validate_segment("collection", collection)?;
        Ok(Self {
            user: user.to_string(),
            collection: collection.to_string(),
            key: format!("{user}{KEY_SEPARATOR}{collection}"),
        })
    }

    /// Parse a stored key back into its segments.
    pub fn parse(key: &str) -> Result<Self, TypeError> {
        match key.split(KEY_SEPARATOR).collect::<Vec<_>>().as_slice() {
            [user, collection] => Self::new(user, collection),
            _ => Err(TypeError::MalformedKey {
                key: key.to_string(),
                expected: 2,
            }),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The flat store key.
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Absolute request path of the collection container, with trailing slash.
    pub fn container_path(&self) -> String {
        format!("/{}/", self.key)
    }

    /// Key of an annotation inside this collection.
    pub fn annotation(&self, id: AnnotationId) -> AnnotationKey {
        let key = format!("{}{KEY_SEPARATOR}{}", self.key, id.as_str());
        AnnotationKey {
            collection: self.clone(),
            id,
            key,
        }
    }
}

impl fmt::Debug for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CollectionKey({})", self.key)
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Key of an annotation: `{user}/{collection}/{annotationId}`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotationKey {
    collection: CollectionKey,
    id: AnnotationId,
    key: String,
}

impl AnnotationKey {
    pub fn new(user: &str, collection: &str, id: &str) -> Result<Self, TypeError> {
        let collection = CollectionKey::new(user, collection)?;
        let id = AnnotationId::parse(id)?;
        Ok(collection.annotation(id))
    }

    /// Parse a stored key back into its segments.
    pub fn parse(key: &str) -> Result<Self, TypeError> {
        match key.split(KEY_SEPARATOR).collect::<Vec<_>>().as_slice() {
            [user, collection, id] => Self::new(user, collection, id),
            _ => Err(TypeError::MalformedKey {
                key: key.to_string(),
                expected: 3,
            }),
        }
    }

    pub fn collection(&self) -> &CollectionKey {
        &self.collection
    }

    pub fn id(&self) -> &AnnotationId {
        &self.id
    }

    /// The flat store key.
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Absolute request path, used as the `Location` of a created annotation.
    pub fn path(&self) -> String {
        format!("/{}", self.key)
    }
}

impl fmt::Debug for AnnotationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnnotationKey({})", self.key)
    }
}

impl fmt::Display for AnnotationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
