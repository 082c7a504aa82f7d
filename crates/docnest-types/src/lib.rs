//! Foundation types for docnest.
//!
//! A docnest database is a tree of collections. Each collection holds
//! documents, and each document may own further collections, to any depth.
//! This crate provides the identifiers and paths used to address that tree.
//! Every other docnest crate depends on `docnest-types`.
//!
//! # Key Types
//!
//! - [`CollectionName`]: a validated collection path segment
//! - [`DocumentId`]: a validated document path segment
//! - [`AncestorMap`]: ancestor collection name to ancestor document id
//! - [`CollectionPath`]: a resolved physical collection location
//! - [`DocumentPath`]: a resolved physical document location (the handle
//!   a driver understands)
//! - [`Timestamp`]: stored timestamp representation and helpers

pub mod ancestors;
pub mod error;
pub mod names;
pub mod path;
pub mod timestamp;

pub use ancestors::AncestorMap;
pub use error::TypeError;
pub use names::{validate_collection_name, validate_document_id, CollectionName, DocumentId};
pub use path::{CollectionPath, DocumentPath};
pub use timestamp::{Timestamp, TimestampInput};
