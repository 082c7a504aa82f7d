//! The driver primitives the collection layer depends on.

use async_trait::async_trait;
use docnest_types::DocumentPath;
use serde_json::Value;

use crate::document::{SetOptions, Snapshot};
use crate::error::StoreResult;

/// Direct access to a document database.
///
/// Implementations must be thread-safe and treat each call as independent:
/// two calls against the same document never share state beyond what the
/// database itself stores.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Fetch one document.
    ///
    /// Returns a [`Snapshot`] whether or not the document exists. Returns
    /// `Err` only when the fetch itself failed.
    async fn get(&self, doc: &DocumentPath) -> StoreResult<Snapshot>;

    /// Write one document. With [`SetOptions::merge`] only the supplied
    /// fields are updated; otherwise the stored document is replaced.
    async fn set(&self, doc: &DocumentPath, data: Value, options: SetOptions) -> StoreResult<()>;

    /// Delete one document. Deleting an absent document succeeds.
    async fn delete(&self, doc: &DocumentPath) -> StoreResult<()>;
}

/// A caller-owned transaction.
///
/// Reads go through [`Transaction::get`]. Writes are staged and only take
/// effect when the owner commits; the collection layer never commits or
/// rolls back a transaction it was handed.
#[async_trait]
pub trait Transaction: Send + Sync {
    async fn get(&self, doc: &DocumentPath) -> StoreResult<Snapshot>;

    fn set(&self, doc: &DocumentPath, data: Value, options: SetOptions) -> StoreResult<()>;

    /// Stage a create-only write. The commit fails if the document exists.
    fn create(&self, doc: &DocumentPath, data: Value) -> StoreResult<()>;

    fn delete(&self, doc: &DocumentPath) -> StoreResult<()>;
}

/// A caller-owned atomic batch of writes.
///
/// Staging never touches the database; failures such as a create hitting
/// an existing document surface when the owner commits.
pub trait WriteBatch: Send + Sync {
    fn set(&self, doc: &DocumentPath, data: Value, options: SetOptions) -> StoreResult<()>;

    fn create(&self, doc: &DocumentPath, data: Value) -> StoreResult<()>;

    fn delete(&self, doc: &DocumentPath) -> StoreResult<()>;
}
