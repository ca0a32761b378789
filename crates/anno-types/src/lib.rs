//! Foundation types for the anno annotation service.
//!
//! Annotations live in a flat key-value store. Nesting is simulated with
//! `/`-joined key segments:
//!
//! - [`CollectionKey`] -- `{user}/{collection}`
//! - [`AnnotationKey`] -- `{user}/{collection}/{annotationId}`
//!
//! Every segment is non-empty and never contains `/`, so a key always
//! parses back into exactly the segments it was built from.
//!
//! Annotation identifiers are random 128-bit values ([`AnnotationId`])
//! produced by an injectable [`IdGenerator`].

pub mod error;
pub mod id;
pub mod key;

pub use error::TypeError;
pub use id::{AnnotationId, IdGenerator, UuidV4Generator};
pub use key::{validate_segment, AnnotationKey, CollectionKey, KEY_SEPARATOR};
