//! HTTP server for the anno annotation service.
//!
//! Annotations are nested under collections in a flat key-value store
//! (`{user}/{collection}/{annotationId}`) and served as Linked Data Platform
//! resources:
//!
//! - `POST /{user}/{collection}` creates an annotation (201 + `Location`)
//! - `GET /{user}/{collection}/{annotation}` reads it (200)
//! - `DELETE /{user}/{collection}/{annotation}` removes it (204)
//!
//! Collections are provisioned out of band by writing `{user}/{collection}`
//! into the store.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod service;

pub use config::{ServerConfig, StorageConfig};
pub use error::{ApiError, ApiResult, ErrorBody, ServerError, ServerResult};
pub use server::{open_store, AnnoServer};
pub use service::{AnnotationService, Created};
