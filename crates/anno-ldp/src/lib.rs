//! Linked Data Platform resource shaping.
//!
//! Stored annotations are plain JSON objects. Before they leave the server
//! they are expanded into Web Annotation / LDP resources:
//!
//! - [`Container`] -- the collection an annotation belongs to, as an LDP
//!   basic container
//! - [`expand_annotation`] -- fills in `@context` and `type`, links the
//!   annotation to its container via `partOf`
//! - [`LdpResource`] -- axum response carrying the LDP media type, `Link`,
//!   `Allow`, `Vary` and `ETag` headers

pub mod container;
pub mod resource;
pub mod shape;
pub mod vocab;

pub use container::Container;
pub use resource::{entity_tag, LdpResource};
pub use shape::expand_annotation;
