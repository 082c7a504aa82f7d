use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use docnest_store::{Driver, SetOptions, Snapshot, StoreError, Transaction};
use docnest_types::{AncestorMap, CollectionName, CollectionPath, DocumentId, DocumentPath, TypeError};
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::batch::CollectionBatch;
use crate::error::{ErrorGenerator, ErrorInfo};
use crate::response::Response;

/// A resolved document and the raw snapshot fetched for it.
#[derive(Clone, Debug)]
pub struct SnapshotData {
    pub doc: DocumentPath,
    pub snapshot: Snapshot,
}

/// A fetched document.
///
/// A document that was fetched but does not exist is still a successful
/// read: `exists()` is `false` and `error()` carries a not-found error the
/// caller can pass on.
#[derive(Clone, Debug)]
pub struct DocumentData<T> {
    doc: DocumentPath,
    snapshot: Snapshot,
    data: Option<T>,
    error: Option<ErrorInfo>,
}

impl<T> DocumentData<T> {
    pub fn doc(&self) -> &DocumentPath {
        &self.doc
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// The not-found error for a missing document.
    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }
}

/// One document to fetch in [`Collection::dataset`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ancestors: Option<AncestorMap>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ancestors: None,
        }
    }

    pub fn with_ancestors(mut self, ancestors: AncestorMap) -> Self {
        self.ancestors = Some(ancestors);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stored {
    pub stored: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deleted {
    pub deleted: bool,
}

/// One level of the collection tree, typed by the documents it holds.
///
/// A collection is either a root collection or a sub-collection nested
/// under a document of its parent collection. The names of every ancestor
/// collection are captured when the node is built, so resolving a path
/// never walks parent links.
///
/// Every operation validates its identifiers and ancestor map before
/// touching the driver, and answers with a [`Response`].
pub struct Collection<T> {
    name: CollectionName,
    /// Ancestor collection names, root first.
    ancestors: Vec<CollectionName>,
    driver: Arc<dyn Driver>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            ancestors: self.ancestors.clone(),
            driver: Arc::clone(&self.driver),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("ancestors", &self.ancestors)
            .finish()
    }
}

impl<T> Collection<T> {
    /// A root collection.
    pub fn new(name: &str, driver: Arc<dyn Driver>) -> Result<Self, TypeError> {
        Ok(Self::from_parts(CollectionName::new(name)?, Vec::new(), driver))
    }

    /// A collection nested under the documents of `parent`.
    ///
    /// Fails if `name` is already used by `parent` or one of its ancestors,
    /// since ancestor ids are keyed by collection name.
    pub fn nested<P>(name: &str, parent: &Collection<P>) -> Result<Self, TypeError> {
        let name = CollectionName::new(name)?;
        let mut ancestors = parent.ancestors.clone();
        ancestors.push(parent.name.clone());
        if ancestors.contains(&name) {
            return Err(TypeError::InvalidCollectionName {
                name: name.to_string(),
                reason: "already used by an ancestor collection".into(),
            });
        }
        Ok(Self::from_parts(name, ancestors, Arc::clone(&parent.driver)))
    }

    pub(crate) fn from_parts(
        name: CollectionName,
        ancestors: Vec<CollectionName>,
        driver: Arc<dyn Driver>,
    ) -> Self {
        Self {
            name,
            ancestors,
            driver,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn is_root(&self) -> bool {
        self.ancestors.is_empty()
    }

    /// Number of ancestor collections.
    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }

    /// Names of the ancestor collections, root first.
    pub fn ancestor_names(&self) -> &[CollectionName] {
        &self.ancestors
    }

    /// Name of the immediate parent collection.
    pub fn parent_name(&self) -> Option<&str> {
        self.ancestors.last().map(CollectionName::as_str)
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// Stage writes against this collection in a caller-owned batch.
    pub fn batch(&self) -> CollectionBatch<'_, T> {
        CollectionBatch::new(self)
    }

    /// Check `ancestors` against this node and return the id for each
    /// ancestor level, root first.
    fn ancestor_ids(&self, ancestors: Option<&AncestorMap>) -> Result<Vec<DocumentId>, ErrorInfo> {
        let supplied = ancestors.filter(|map| !map.is_empty());

        if self.ancestors.is_empty() {
            return match supplied {
                None => Ok(Vec::new()),
                Some(map) => Err(ErrorGenerator::invalid_parameters(
                    map.iter().map(|(name, _)| name.to_string()),
                    format_args!(
                        "ancestor ids were supplied but \"{}\" is a root collection",
                        self.name
                    ),
                )),
            };
        }

        let mut ids = Vec::with_capacity(self.ancestors.len());
        for ancestor in &self.ancestors {
            let raw = supplied
                .and_then(|map| map.get(ancestor.as_str()))
                .ok_or_else(|| ErrorGenerator::missing_ancestor(self.name(), ancestor.as_str()))?;
            let id = DocumentId::new(raw)
                .map_err(|e| ErrorGenerator::invalid_segment(ancestor.as_str(), &e))?;
            ids.push(id);
        }

        if let Some(map) = supplied {
            let unexpected: Vec<&str> = map
                .iter()
                .map(|(name, _)| name)
                .filter(|name| !self.ancestors.iter().any(|a| a.as_str() == *name))
                .collect();
            if !unexpected.is_empty() {
                return Err(ErrorGenerator::invalid_parameters(
                    unexpected,
                    format_args!("not an ancestor collection of \"{}\"", self.name),
                ));
            }
        }

        Ok(ids)
    }

    /// Resolve the physical location of this collection.
    pub fn col(&self, ancestors: Option<&AncestorMap>) -> Result<CollectionPath, ErrorInfo> {
        let ids = self.ancestor_ids(ancestors).inspect_err(|e| {
            debug!(collection = %self.name, error = %e, "rejected ancestor map");
        })?;

        let Some((root, rest)) = self.ancestors.split_first() else {
            return Ok(CollectionPath::root(self.name.clone()));
        };
        let mut path = CollectionPath::root(root.clone());
        let children = rest.iter().chain(std::iter::once(&self.name));
        for (id, child) in ids.into_iter().zip(children) {
            path = path.doc(id).sub_collection(child.clone());
        }
        Ok(path)
    }

    /// Resolve the physical location of document `id`.
    pub fn doc(&self, id: &str, ancestors: Option<&AncestorMap>) -> Result<DocumentPath, ErrorInfo> {
        if id.is_empty() {
            return Err(ErrorGenerator::missing_id(self.name()));
        }
        let id = DocumentId::new(id).map_err(|e| ErrorGenerator::invalid_segment("id", &e))?;
        Ok(self.col(ancestors)?.doc(id))
    }

    /// Explicit id, or the payload's `id` field.
    fn write_id(&self, id: Option<&str>, payload: &Value) -> Result<String, ErrorInfo> {
        id.filter(|id| !id.is_empty())
            .or_else(|| payload.get("id").and_then(Value::as_str))
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ErrorGenerator::missing_id(self.name()))
    }

    /// Serialize a payload and resolve where it should be written.
    pub(crate) fn resolve_write<P: Serialize + ?Sized>(
        &self,
        id: Option<&str>,
        ancestors: Option<&AncestorMap>,
        data: &P,
    ) -> Result<(DocumentPath, Value), ErrorInfo> {
        let value = serde_json::to_value(data).map_err(|e| {
            ErrorGenerator::document_not_saved(
                self.name(),
                id.unwrap_or_default(),
                Some(StoreError::Serialization(e.to_string())),
            )
        })?;
        let id = self.write_id(id, &value)?;
        let doc = self.doc(&id, ancestors)?;
        Ok((doc, value))
    }

    async fn fetch(
        &self,
        id: &str,
        ancestors: Option<&AncestorMap>,
        transaction: Option<&dyn Transaction>,
    ) -> Result<SnapshotData, ErrorInfo> {
        let doc = self.doc(id, ancestors)?;
        let fetched = match transaction {
            Some(tx) => tx.get(&doc).await,
            None => self.driver.get(&doc).await,
        };
        match fetched {
            Ok(snapshot) => Ok(SnapshotData { doc, snapshot }),
            Err(e) => {
                warn!(collection = %self.name, path = %doc, error = %e, "fetch failed");
                Err(ErrorGenerator::document_not_found(self.name(), id, Some(e)))
            }
        }
    }

    async fn write<P: Serialize + ?Sized>(
        &self,
        id: Option<&str>,
        ancestors: Option<&AncestorMap>,
        data: &P,
        options: SetOptions,
        transaction: Option<&dyn Transaction>,
    ) -> Result<Stored, ErrorInfo> {
        let (doc, value) = self.resolve_write(id, ancestors, data).inspect_err(|e| {
            debug!(collection = %self.name, error = %e, "write rejected");
        })?;
        let written = match transaction {
            Some(tx) => tx.set(&doc, value, options),
            None => self.driver.set(&doc, value, options).await,
        };
        written.map(|()| Stored { stored: true }).map_err(|e| {
            warn!(collection = %self.name, path = %doc, error = %e, "write failed");
            ErrorGenerator::document_not_saved(self.name(), doc.id().as_str(), Some(e))
        })
    }

    /// Fetch the raw snapshot of document `id`.
    ///
    /// Reads through `transaction` when one is given. Existence is not
    /// checked here; a failed fetch is a not-found error.
    pub async fn snapshot(
        &self,
        id: &str,
        ancestors: Option<&AncestorMap>,
        transaction: Option<&dyn Transaction>,
    ) -> Response<SnapshotData> {
        self.fetch(id, ancestors, transaction).await.into()
    }

    /// Overwrite a document with `data`.
    ///
    /// Without an explicit `id` the payload's `id` field is used. With a
    /// transaction, the write is staged and takes effect on its commit.
    pub async fn set(
        &self,
        id: Option<&str>,
        ancestors: Option<&AncestorMap>,
        data: &T,
        transaction: Option<&dyn Transaction>,
    ) -> Response<Stored>
    where
        T: Serialize,
    {
        self.write(id, ancestors, data, SetOptions::overwrite(), transaction)
            .await
            .into()
    }

    /// Update only the fields present in `partial`.
    pub async fn merge<P: Serialize + ?Sized>(
        &self,
        id: Option<&str>,
        ancestors: Option<&AncestorMap>,
        partial: &P,
        transaction: Option<&dyn Transaction>,
    ) -> Response<Stored> {
        self.write(id, ancestors, partial, SetOptions::merge(), transaction)
            .await
            .into()
    }

    /// Delete document `id`. Deleting a document that does not exist
    /// succeeds.
    pub async fn delete(
        &self,
        id: &str,
        ancestors: Option<&AncestorMap>,
        transaction: Option<&dyn Transaction>,
    ) -> Response<Deleted> {
        let doc = match self.doc(id, ancestors) {
            Ok(doc) => doc,
            Err(e) => {
                debug!(collection = %self.name, id, error = %e, "delete rejected");
                return Response::Error(e);
            }
        };
        let deleted = match transaction {
            Some(tx) => tx.delete(&doc),
            None => self.driver.delete(&doc).await,
        };
        match deleted {
            Ok(()) => Response::Data(Deleted { deleted: true }),
            Err(e) => {
                warn!(collection = %self.name, path = %doc, error = %e, "delete failed");
                Response::Error(ErrorGenerator::document_not_deleted(self.name(), id, Some(e)))
            }
        }
    }
}

impl<T: DeserializeOwned> Collection<T> {
    /// Fetch and decode document `id`.
    ///
    /// A failed fetch is returned unchanged from [`Collection::snapshot`].
    /// A missing document is a successful read with `exists() == false`.
    pub async fn data(
        &self,
        id: &str,
        ancestors: Option<&AncestorMap>,
        transaction: Option<&dyn Transaction>,
    ) -> Response<DocumentData<T>> {
        let SnapshotData { doc, snapshot } = match self.snapshot(id, ancestors, transaction).await {
            Response::Data(data) => data,
            Response::Error(e) => return Response::Error(e),
        };

        let Some(value) = snapshot.to_value() else {
            let error = ErrorGenerator::document_not_found(self.name(), id, None);
            return Response::Data(DocumentData {
                doc,
                snapshot,
                data: None,
                error: Some(error),
            });
        };

        match serde_json::from_value::<T>(value) {
            Ok(data) => Response::Data(DocumentData {
                doc,
                snapshot,
                data: Some(data),
                error: None,
            }),
            Err(e) => {
                warn!(collection = %self.name, path = %doc, error = %e, "stored document does not decode");
                Response::Error(ErrorGenerator::internal_error(Some(
                    StoreError::Serialization(e.to_string()),
                )))
            }
        }
    }

    /// Fetch several documents concurrently.
    ///
    /// Every record gets its own response, in input order. One record's
    /// failure does not affect the others. All reads share `transaction`.
    pub async fn dataset(
        &self,
        records: &[Record],
        transaction: Option<&dyn Transaction>,
    ) -> Vec<Response<DocumentData<T>>> {
        join_all(
            records
                .iter()
                .map(|record| self.data(&record.id, record.ancestors.as_ref(), transaction)),
        )
        .await
    }
}
