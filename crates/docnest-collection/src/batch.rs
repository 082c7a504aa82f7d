use docnest_store::{SetOptions, WriteBatch};
use docnest_types::AncestorMap;
use serde::Serialize;
use tracing::debug;

use crate::collection::Collection;
use crate::error::{ErrorGenerator, ErrorInfo};

/// Stages writes against one collection in a caller-owned [`WriteBatch`].
///
/// Only resolution and staging happen here. Nothing reaches the database
/// until the caller commits the batch, and write outcomes (such as a
/// create hitting an existing document) surface from that commit. The
/// errors returned here are rejected identifiers or ancestor maps, and
/// payloads the batch refused to stage.
pub struct CollectionBatch<'c, T> {
    collection: &'c Collection<T>,
}

impl<'c, T> CollectionBatch<'c, T> {
    pub(crate) fn new(collection: &'c Collection<T>) -> Self {
        Self { collection }
    }
}

impl<T: Serialize> CollectionBatch<'_, T> {
    /// Stage a create-only write. Without `id` the payload's `id` field is
    /// used.
    pub fn create(
        &self,
        batch: &dyn WriteBatch,
        id: Option<&str>,
        ancestors: Option<&AncestorMap>,
        data: &T,
    ) -> Result<(), ErrorInfo> {
        let (doc, value) = self.collection.resolve_write(id, ancestors, data)?;
        debug!(collection = self.collection.name(), path = %doc, "staging create");
        batch.create(&doc, value).map_err(|e| {
            ErrorGenerator::document_not_saved(self.collection.name(), doc.id().as_str(), Some(e))
        })
    }

    /// Stage an unconditional overwrite.
    pub fn set(
        &self,
        batch: &dyn WriteBatch,
        id: Option<&str>,
        ancestors: Option<&AncestorMap>,
        data: &T,
    ) -> Result<(), ErrorInfo> {
        let (doc, value) = self.collection.resolve_write(id, ancestors, data)?;
        debug!(collection = self.collection.name(), path = %doc, "staging set");
        batch
            .set(&doc, value, SetOptions::overwrite())
            .map_err(|e| {
                ErrorGenerator::document_not_saved(self.collection.name(), doc.id().as_str(), Some(e))
            })
    }
}
