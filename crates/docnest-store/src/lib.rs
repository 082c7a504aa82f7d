//! Database driver boundary for docnest.
//!
//! The collection layer never talks to a database directly. It resolves a
//! [`DocumentPath`](docnest_types::DocumentPath) and hands it to a driver
//! through the traits defined here.
//!
//! # Primitives
//!
//! - [`Driver`] -- direct `get`, `set` (overwrite or merge), and `delete`
//! - [`Transaction`] -- a caller-owned context: transactional `get` plus
//!   staged `set`, `create`, and `delete`
//! - [`WriteBatch`] -- a caller-owned atomic batch of staged writes
//!
//! # Backends
//!
//! - [`InMemoryDriver`] -- `BTreeMap`-based store for tests and embedding,
//!   with [`InMemoryTransaction`] and [`InMemoryBatch`] contexts
//!
//! # Design Rules
//!
//! 1. Documents are JSON objects at this layer; typed payloads are the
//!    collection layer's concern.
//! 2. Deleting an absent document succeeds.
//! 3. Transactions and batches apply all staged writes or none of them.
//! 4. Drivers never open, commit, or roll back contexts on their own.

pub mod config;
pub mod document;
pub mod error;
pub mod memory;
pub mod traits;

pub use config::DatabaseConfig;
pub use document::{SetOptions, Snapshot};
pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryBatch, InMemoryDriver, InMemoryTransaction};
pub use traits::{Driver, Transaction, WriteBatch};
