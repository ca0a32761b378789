//! Flat key-value storage for the anno annotation service.
//!
//! Keys are `/`-joined path strings (`alice/notes`, `alice/notes/<id>`);
//! values are opaque bytes. The store never interprets either.
//!
//! # Storage Backends
//!
//! All backends implement the [`KvStore`] trait:
//!
//! - [`InMemoryKvStore`] -- `HashMap`-based store for tests and embedding
//! - [`LogKvStore`] -- append-only, CRC-framed log replayed into memory on open
//!
//! # Design Rules
//!
//! 1. A missing key is always reported as [`StoreError::NotFound`], never as
//!    an I/O or corruption error.
//! 2. Single-key operations are atomic with respect to each other.
//! 3. `insert_new` is atomic in every bundled backend.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod log;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use log::{LogConfig, LogKvStore, SyncMode};
pub use memory::InMemoryKvStore;
pub use traits::KvStore;
