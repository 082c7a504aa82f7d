//! Typed accessors over a hierarchical document database.
//!
//! A [`Collection`] is one level of the collection tree. Given a document
//! id and, for nested collections, an [`AncestorMap`] naming the document
//! chosen at every ancestor level, it resolves the physical
//! [`DocumentPath`] and performs one operation through a
//! [`Driver`](docnest_store::Driver).
//!
//! # Guarantees
//!
//! - Every public operation returns a [`Response`]: data or an error,
//!   never both, never neither.
//! - Malformed ids and incomplete or unexpected ancestor maps are rejected
//!   with [`ErrorCode::InvalidParameters`] before any driver call.
//! - Driver failures are mapped to [`ErrorCode::NotFound`],
//!   [`ErrorCode::NotSaved`], or [`ErrorCode::NotDeleted`], keeping the
//!   driver error as the cause.
//! - Operations given a transaction stage their writes in it; this crate
//!   never opens, commits, or rolls back a transaction or batch.
//!
//! # Modules
//!
//! - [`collection`]: [`Collection`] and its operation payloads
//! - [`sub`]: [`SubCollection`], a nested collection with a required
//!   ancestor map
//! - [`batch`]: [`CollectionBatch`] for staging into a write batch
//! - [`hierarchy`]: [`Hierarchy`], a config-driven collection tree
//! - [`response`]: the [`Response`] envelope
//! - [`error`]: [`ErrorCode`], [`ErrorInfo`], [`ErrorGenerator`]

pub mod batch;
pub mod collection;
pub mod error;
pub mod hierarchy;
pub mod response;
pub mod sub;

pub use batch::CollectionBatch;
pub use collection::{Collection, Deleted, DocumentData, Record, SnapshotData, Stored};
pub use error::{ErrorCode, ErrorGenerator, ErrorInfo, HierarchyError};
pub use hierarchy::{CollectionEntry, Hierarchy, HierarchyConfig};
pub use response::Response;
pub use sub::SubCollection;

pub use docnest_types::{AncestorMap, DocumentPath};
