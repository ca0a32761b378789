use anno_types::CollectionKey;
use serde_json::{json, Value};

use crate::vocab::CONTAINER_TYPES;

/// Container context for annotations of one collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Container {
    key: CollectionKey,
    iri: String,
}

impl Container {
    pub fn new(key: &CollectionKey) -> Self {
        Self {
            key: key.clone(),
            iri: key.container_path(),
        }
    }

    pub fn key(&self) -> &CollectionKey {
        &self.key
    }

    /// Container IRI, relative to the server root (`/{user}/{collection}/`).
    pub fn iri(&self) -> &str {
        &self.iri
    }

    /// JSON-LD description embedded as `partOf` in every member.
    pub fn describe(&self) -> Value {
        json!({
            "id": self.iri,
            "type": CONTAINER_TYPES,
        })
    }
}
