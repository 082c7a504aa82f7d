use std::fmt;
use std::ops::Deref;

use docnest_store::Transaction;
use docnest_types::{AncestorMap, CollectionPath, DocumentPath, TypeError};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::collection::{Collection, Deleted, DocumentData, SnapshotData, Stored};
use crate::error::ErrorInfo;
use crate::response::Response;

/// A collection that is known to be nested.
///
/// Same operations as [`Collection`], but the ancestor map is a required
/// argument instead of an `Option`, so it cannot be left out by mistake.
/// The map is still checked for completeness on every call.
pub struct SubCollection<T> {
    inner: Collection<T>,
}

impl<T> Clone for SubCollection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for SubCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SubCollection").field(&self.inner).finish()
    }
}

impl<T> SubCollection<T> {
    pub fn new<P>(name: &str, parent: &Collection<P>) -> Result<Self, TypeError> {
        Ok(Self {
            inner: Collection::nested(name, parent)?,
        })
    }

    /// The unrestricted collection, e.g. to nest further collections under it.
    pub fn as_collection(&self) -> &Collection<T> {
        &self.inner
    }

    pub fn into_collection(self) -> Collection<T> {
        self.inner
    }

    pub fn col(&self, ancestors: &AncestorMap) -> Result<CollectionPath, ErrorInfo> {
        self.inner.col(Some(ancestors))
    }

    pub fn doc(&self, id: &str, ancestors: &AncestorMap) -> Result<DocumentPath, ErrorInfo> {
        self.inner.doc(id, Some(ancestors))
    }

    pub async fn snapshot(
        &self,
        id: &str,
        ancestors: &AncestorMap,
        transaction: Option<&dyn Transaction>,
    ) -> Response<SnapshotData> {
        self.inner.snapshot(id, Some(ancestors), transaction).await
    }

    pub async fn merge<P: Serialize + ?Sized>(
        &self,
        id: Option<&str>,
        ancestors: &AncestorMap,
        partial: &P,
        transaction: Option<&dyn Transaction>,
    ) -> Response<Stored> {
        self.inner.merge(id, Some(ancestors), partial, transaction).await
    }

    pub async fn delete(
        &self,
        id: &str,
        ancestors: &AncestorMap,
        transaction: Option<&dyn Transaction>,
    ) -> Response<Deleted> {
        self.inner.delete(id, Some(ancestors), transaction).await
    }
}

impl<T: Serialize> SubCollection<T> {
    pub async fn set(
        &self,
        id: Option<&str>,
        ancestors: &AncestorMap,
        data: &T,
        transaction: Option<&dyn Transaction>,
    ) -> Response<Stored> {
        self.inner.set(id, Some(ancestors), data, transaction).await
    }
}

impl<T: DeserializeOwned> SubCollection<T> {
    pub async fn data(
        &self,
        id: &str,
        ancestors: &AncestorMap,
        transaction: Option<&dyn Transaction>,
    ) -> Response<DocumentData<T>> {
        self.inner.data(id, Some(ancestors), transaction).await
    }
}

/// Narrow a collection that turns out to be nested.
impl<T> TryFrom<Collection<T>> for SubCollection<T> {
    type Error = Collection<T>;

    fn try_from(collection: Collection<T>) -> Result<Self, Self::Error> {
        if collection.is_root() {
            Err(collection)
        } else {
            Ok(Self { inner: collection })
        }
    }
}

impl<T> Deref for SubCollection<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::Record;
    use docnest_store::InMemoryDriver;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn tree() -> (Collection<Value>, SubCollection<Value>, SubCollection<Value>) {
        let db = Arc::new(InMemoryDriver::new());
        let items = Collection::new("items", db).unwrap();
        let notes = SubCollection::new("notes", &items).unwrap();
        let tags = SubCollection::new("tags", notes.as_collection()).unwrap();
        (items, notes, tags)
    }

    #[test]
    fn root_cannot_be_narrowed() {
        let (items, notes, _) = tree();
        assert!(SubCollection::try_from(items).is_err());
        assert!(SubCollection::try_from(notes.into_collection()).is_ok());
    }

    #[test]
    fn clone_and_debug_need_no_bounds_on_documents() {
        struct Opaque;

        let db = Arc::new(InMemoryDriver::new());
        let items = Collection::<Opaque>::new("items", db).unwrap();
        let notes = SubCollection::<Opaque>::new("notes", &items).unwrap();
        let copy = notes.clone();
        assert_eq!(copy.name(), "notes");
        assert!(format!("{copy:?}").contains("notes"));
    }

    #[test]
    fn resolves_with_required_map() {
        let (_, _, tags) = tree();
        let ancestors = AncestorMap::new().with("items", "p1").with("notes", "q1");
        assert_eq!(
            tags.doc("t1", &ancestors).unwrap().to_string(),
            "items/p1/notes/q1/tags/t1"
        );
        let err = tags.col(&AncestorMap::new()).unwrap_err();
        assert!(err.is(ErrorCode::InvalidParameters));
    }

    #[tokio::test]
    async fn crud_through_narrowed_node() {
        let (_, notes, _) = tree();
        let ancestors = AncestorMap::new().with("items", "p1");

        assert!(!notes.set(Some("n1"), &ancestors, &json!({"a": 1}), None).await.is_error());
        assert!(!notes.merge(Some("n1"), &ancestors, &json!({"b": 2}), None).await.is_error());

        let read = notes.data("n1", &ancestors, None).await.into_data().unwrap();
        assert_eq!(read.data(), Some(&json!({"a": 1, "b": 2})));
        assert!(notes.snapshot("n1", &ancestors, None).await.into_data().unwrap().snapshot.exists());

        assert!(!notes.delete("n1", &ancestors, None).await.is_error());
        assert!(!notes.data("n1", &ancestors, None).await.into_data().unwrap().exists());
    }

    #[tokio::test]
    async fn dataset_available_through_deref() {
        let (_, notes, _) = tree();
        let ancestors = AncestorMap::new().with("items", "p1");
        let results = notes
            .dataset(&[Record::new("x").with_ancestors(ancestors)], None)
            .await;
        assert_eq!(results.len(), 1);
        assert!(!results[0].data().unwrap().exists());
    }
}
