use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use docnest_types::{CollectionPath, DocumentPath};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::document::{merge_fields, prepare_fields, Fields, SetOptions, Snapshot};
use crate::error::{StoreError, StoreResult};
use crate::traits::{Driver, Transaction, WriteBatch};

fn poisoned(e: impl fmt::Display) -> StoreError {
    StoreError::Internal(format!("lock poisoned: {e}"))
}

/// A write waiting in a transaction or batch.
#[derive(Clone, Debug)]
enum StagedWrite {
    Set {
        doc: DocumentPath,
        fields: Fields,
        options: SetOptions,
    },
    Create {
        doc: DocumentPath,
        fields: Fields,
    },
    Delete {
        doc: DocumentPath,
    },
}

fn apply_write(map: &mut BTreeMap<DocumentPath, Fields>, write: StagedWrite) -> StoreResult<()> {
    match write {
        StagedWrite::Set {
            doc,
            fields,
            options,
        } => {
            if options.merge {
                merge_fields(map.entry(doc).or_default(), fields);
            } else {
                map.insert(doc, fields);
            }
        }
        StagedWrite::Create { doc, fields } => {
            if map.contains_key(&doc) {
                return Err(StoreError::AlreadyExists(doc));
            }
            map.insert(doc, fields);
        }
        StagedWrite::Delete { doc } => {
            map.remove(&doc);
        }
    }
    Ok(())
}

/// In-memory, `BTreeMap`-based document database.
///
/// Intended for tests and embedding. Every call is counted, transactional
/// reads and staging included, so tests can assert that no driver call
/// happened. Batch staging is local and not counted.
///
/// [`InMemoryDriver::fail_with`] makes every following call fail until
/// [`InMemoryDriver::recover`].
pub struct InMemoryDriver {
    config: DatabaseConfig,
    documents: RwLock<BTreeMap<DocumentPath, Fields>>,
    operations: AtomicU64,
    failure: RwLock<Option<String>>,
}

impl InMemoryDriver {
    /// Create a new empty database with default settings.
    pub fn new() -> Self {
        Self::from_config(DatabaseConfig::default())
    }

    pub fn from_config(config: DatabaseConfig) -> Self {
        info!(
            project = config.project_id.as_deref().unwrap_or("local"),
            database = %config.database,
            "in-memory database ready"
        );
        Self {
            config,
            documents: RwLock::new(BTreeMap::new()),
            operations: AtomicU64::new(0),
            failure: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Fully-qualified name of `doc` in this database.
    pub fn resource_name(&self, doc: &DocumentPath) -> String {
        self.config.resource_name(doc)
    }

    /// Number of documents currently stored.
    ///
    /// # Panics
    ///
    /// Panics if a writer panicked while holding the document lock.
    pub fn len(&self) -> usize {
        self.documents.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of driver calls served or refused so far.
    pub fn operation_count(&self) -> u64 {
        self.operations.load(Ordering::SeqCst)
    }

    /// Make every following call fail with [`StoreError::Unavailable`].
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.write().expect("lock poisoned") = Some(reason.into());
    }

    /// Undo [`InMemoryDriver::fail_with`].
    pub fn recover(&self) {
        *self.failure.write().expect("lock poisoned") = None;
    }

    /// Paths of the documents stored directly in `collection`, sorted.
    pub fn documents_in(&self, collection: &CollectionPath) -> StoreResult<Vec<DocumentPath>> {
        let map = self.documents.read().map_err(poisoned)?;
        Ok(map
            .keys()
            .filter(|doc| collection.contains(doc))
            .cloned()
            .collect())
    }

    /// Begin a transaction against this database.
    pub fn transaction(&self) -> InMemoryTransaction<'_> {
        InMemoryTransaction {
            driver: self,
            staged: Mutex::new(Vec::new()),
        }
    }

    /// Begin a write batch against this database.
    pub fn batch(&self) -> InMemoryBatch<'_> {
        InMemoryBatch {
            driver: self,
            staged: Mutex::new(Vec::new()),
        }
    }

    /// Count one call and refuse it if a failure is injected.
    fn admit(&self, operation: &'static str) -> StoreResult<()> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        let failure = self.failure.read().map_err(poisoned)?;
        match failure.as_ref() {
            Some(reason) => {
                debug!(operation, reason = %reason, "refusing call");
                Err(StoreError::Unavailable(reason.clone()))
            }
            None => Ok(()),
        }
    }

    fn read(&self, doc: &DocumentPath) -> StoreResult<Snapshot> {
        let map = self.documents.read().map_err(poisoned)?;
        Ok(Snapshot::new(doc.clone(), map.get(doc).cloned()))
    }

    /// Apply `writes` all-or-nothing.
    fn apply_all(&self, writes: Vec<StagedWrite>) -> StoreResult<()> {
        let mut map = self.documents.write().map_err(poisoned)?;
        let mut working = map.clone();
        for write in writes {
            apply_write(&mut working, write)?;
        }
        *map = working;
        Ok(())
    }
}

impl Default for InMemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryDriver")
            .field("database", &self.config.database)
            .field(
                "document_count",
                &self.documents.read().map(|m| m.len()).ok(),
            )
            .field("operations", &self.operation_count())
            .finish()
    }
}

#[async_trait]
impl Driver for InMemoryDriver {
    async fn get(&self, doc: &DocumentPath) -> StoreResult<Snapshot> {
        self.admit("get")?;
        self.read(doc)
    }

    async fn set(&self, doc: &DocumentPath, data: Value, options: SetOptions) -> StoreResult<()> {
        self.admit("set")?;
        let fields = prepare_fields(doc, data)?;
        let mut map = self.documents.write().map_err(poisoned)?;
        apply_write(
            &mut map,
            StagedWrite::Set {
                doc: doc.clone(),
                fields,
                options,
            },
        )
    }

    async fn delete(&self, doc: &DocumentPath) -> StoreResult<()> {
        self.admit("delete")?;
        let mut map = self.documents.write().map_err(poisoned)?;
        map.remove(doc);
        Ok(())
    }
}

fn stage(staged: &Mutex<Vec<StagedWrite>>, write: StagedWrite) -> StoreResult<()> {
    staged.lock().map_err(poisoned)?.push(write);
    Ok(())
}

/// A transaction over an [`InMemoryDriver`].
///
/// Reads see the live database. Writes are buffered and applied together
/// by [`InMemoryTransaction::commit`]; dropping or rolling back discards
/// them.
pub struct InMemoryTransaction<'a> {
    driver: &'a InMemoryDriver,
    staged: Mutex<Vec<StagedWrite>>,
}

impl InMemoryTransaction<'_> {
    /// Number of staged writes.
    pub fn pending(&self) -> usize {
        self.staged.lock().expect("lock poisoned").len()
    }

    pub async fn commit(self) -> StoreResult<()> {
        self.driver.admit("commit")?;
        let writes = self.staged.into_inner().map_err(poisoned)?;
        debug!(writes = writes.len(), "committing transaction");
        self.driver.apply_all(writes)
    }

    pub fn rollback(self) {
        debug!(discarded = self.pending(), "rolling back transaction");
    }
}

#[async_trait]
impl<'a> Transaction for InMemoryTransaction<'a> {
    async fn get(&self, doc: &DocumentPath) -> StoreResult<Snapshot> {
        self.driver.admit("transaction.get")?;
        self.driver.read(doc)
    }

    fn set(&self, doc: &DocumentPath, data: Value, options: SetOptions) -> StoreResult<()> {
        self.driver.admit("transaction.set")?;
        let fields = prepare_fields(doc, data)?;
        stage(
            &self.staged,
            StagedWrite::Set {
                doc: doc.clone(),
                fields,
                options,
            },
        )
    }

    fn create(&self, doc: &DocumentPath, data: Value) -> StoreResult<()> {
        self.driver.admit("transaction.create")?;
        let fields = prepare_fields(doc, data)?;
        stage(
            &self.staged,
            StagedWrite::Create {
                doc: doc.clone(),
                fields,
            },
        )
    }

    fn delete(&self, doc: &DocumentPath) -> StoreResult<()> {
        self.driver.admit("transaction.delete")?;
        stage(&self.staged, StagedWrite::Delete { doc: doc.clone() })
    }
}

/// A write batch over an [`InMemoryDriver`].
///
/// Staging is local. [`InMemoryBatch::commit`] applies every staged write
/// or none of them; a staged create that hits an existing document fails
/// the whole commit with [`StoreError::AlreadyExists`].
pub struct InMemoryBatch<'a> {
    driver: &'a InMemoryDriver,
    staged: Mutex<Vec<StagedWrite>>,
}

impl InMemoryBatch<'_> {
    /// Number of staged writes.
    pub fn pending(&self) -> usize {
        self.staged.lock().expect("lock poisoned").len()
    }

    pub async fn commit(self) -> StoreResult<()> {
        self.driver.admit("batch.commit")?;
        let writes = self.staged.into_inner().map_err(poisoned)?;
        debug!(writes = writes.len(), "committing batch");
        self.driver.apply_all(writes)
    }
}

impl WriteBatch for InMemoryBatch<'_> {
    fn set(&self, doc: &DocumentPath, data: Value, options: SetOptions) -> StoreResult<()> {
        let fields = prepare_fields(doc, data)?;
        stage(
            &self.staged,
            StagedWrite::Set {
                doc: doc.clone(),
                fields,
                options,
            },
        )
    }

    fn create(&self, doc: &DocumentPath, data: Value) -> StoreResult<()> {
        let fields = prepare_fields(doc, data)?;
        stage(
            &self.staged,
            StagedWrite::Create {
                doc: doc.clone(),
                fields,
            },
        )
    }

    fn delete(&self, doc: &DocumentPath) -> StoreResult<()> {
        stage(&self.staged, StagedWrite::Delete { doc: doc.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(path: &str) -> DocumentPath {
        path.parse().unwrap()
    }

    // -----------------------------------------------------------------------
    // Direct CRUD
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn set_then_get() {
        let db = InMemoryDriver::new();
        let d = doc("items/p1");
        db.set(&d, json!({"name": "a"}), SetOptions::overwrite())
            .await
            .unwrap();

        let snap = db.get(&d).await.unwrap();
        assert!(snap.exists());
        assert_eq!(snap.to_value(), Some(json!({"name": "a"})));
        assert_eq!(db.len(), 1);
    }

    #[tokio::test]
    async fn get_missing_is_not_an_error() {
        let db = InMemoryDriver::new();
        let snap = db.get(&doc("items/nope")).await.unwrap();
        assert!(!snap.exists());
    }

    #[tokio::test]
    async fn overwrite_replaces_fields() {
        let db = InMemoryDriver::new();
        let d = doc("items/p1");
        db.set(&d, json!({"a": 1, "b": 2}), SetOptions::overwrite())
            .await
            .unwrap();
        db.set(&d, json!({"a": 3}), SetOptions::overwrite())
            .await
            .unwrap();
        assert_eq!(db.get(&d).await.unwrap().to_value(), Some(json!({"a": 3})));
    }

    #[tokio::test]
    async fn merge_keeps_absent_fields() {
        let db = InMemoryDriver::new();
        let d = doc("items/p1");
        db.set(&d, json!({"a": 1, "b": 2}), SetOptions::overwrite())
            .await
            .unwrap();
        db.set(&d, json!({"b": 5}), SetOptions::merge()).await.unwrap();
        assert_eq!(
            db.get(&d).await.unwrap().to_value(),
            Some(json!({"a": 1, "b": 5}))
        );
    }

    #[tokio::test]
    async fn merge_creates_missing_document() {
        let db = InMemoryDriver::new();
        let d = doc("items/p9");
        db.set(&d, json!({"b": 5}), SetOptions::merge()).await.unwrap();
        assert_eq!(db.get(&d).await.unwrap().to_value(), Some(json!({"b": 5})));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let db = InMemoryDriver::new();
        let d = doc("items/p1");
        db.set(&d, json!({}), SetOptions::overwrite()).await.unwrap();
        db.delete(&d).await.unwrap();
        assert!(!db.get(&d).await.unwrap().exists());
        db.delete(&d).await.unwrap();
    }

    #[tokio::test]
    async fn non_object_documents_are_rejected() {
        let db = InMemoryDriver::new();
        let err = db
            .set(&doc("items/p1"), json!("text"), SetOptions::overwrite())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidDocument { .. }));
        assert!(db.is_empty());
    }

    // -----------------------------------------------------------------------
    // Call accounting and fault injection
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn every_call_is_counted() {
        let db = InMemoryDriver::new();
        assert_eq!(db.operation_count(), 0);
        let d = doc("items/p1");
        db.set(&d, json!({}), SetOptions::overwrite()).await.unwrap();
        db.get(&d).await.unwrap();
        db.delete(&d).await.unwrap();
        assert_eq!(db.operation_count(), 3);
    }

    #[tokio::test]
    async fn injected_failure_until_recovered() {
        let db = InMemoryDriver::new();
        db.fail_with("offline");
        let err = db.get(&doc("items/p1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(ref r) if r == "offline"));

        db.recover();
        assert!(db.get(&doc("items/p1")).await.is_ok());
    }

    #[tokio::test]
    async fn documents_in_lists_direct_children_only() {
        let db = InMemoryDriver::new();
        for path in ["items/a", "items/b", "items/a/notes/n1", "other/x"] {
            db.set(&doc(path), json!({}), SetOptions::overwrite())
                .await
                .unwrap();
        }
        let items: CollectionPath = "items".parse().unwrap();
        let listed: Vec<String> = db
            .documents_in(&items)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(listed, vec!["items/a", "items/b"]);
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn transaction_writes_wait_for_commit() {
        let db = InMemoryDriver::new();
        let d = doc("items/p1");
        let tx = db.transaction();
        tx.set(&d, json!({"a": 1}), SetOptions::overwrite()).unwrap();
        assert_eq!(tx.pending(), 1);
        assert!(!Transaction::get(&tx, &d).await.unwrap().exists());

        tx.commit().await.unwrap();
        assert!(db.get(&d).await.unwrap().exists());
    }

    #[tokio::test]
    async fn rollback_discards_writes() {
        let db = InMemoryDriver::new();
        let d = doc("items/p1");
        let tx = db.transaction();
        Transaction::delete(&tx, &d).unwrap();
        tx.set(&d, json!({"a": 1}), SetOptions::overwrite()).unwrap();
        tx.rollback();
        assert!(db.is_empty());
    }

    #[tokio::test]
    async fn failed_commit_applies_nothing() {
        let db = InMemoryDriver::new();
        let existing = doc("items/p1");
        db.set(&existing, json!({"v": 1}), SetOptions::overwrite())
            .await
            .unwrap();

        let tx = db.transaction();
        tx.set(&doc("items/p2"), json!({"v": 2}), SetOptions::overwrite())
            .unwrap();
        Transaction::create(&tx, &existing, json!({"v": 3})).unwrap();
        let err = tx.commit().await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));

        assert_eq!(db.len(), 1);
        assert_eq!(
            db.get(&existing).await.unwrap().to_value(),
            Some(json!({"v": 1}))
        );
    }

    // -----------------------------------------------------------------------
    // Batches
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn batch_staging_makes_no_calls() {
        let db = InMemoryDriver::new();
        let batch = db.batch();
        WriteBatch::set(&batch, &doc("items/a"), json!({}), SetOptions::overwrite()).unwrap();
        WriteBatch::create(&batch, &doc("items/b"), json!({})).unwrap();
        assert_eq!(db.operation_count(), 0);
        assert_eq!(batch.pending(), 2);

        batch.commit().await.unwrap();
        assert_eq!(db.operation_count(), 1);
        assert_eq!(db.len(), 2);
    }

    #[tokio::test]
    async fn batch_create_twice_fails_at_commit() {
        let db = InMemoryDriver::new();
        let batch = db.batch();
        WriteBatch::create(&batch, &doc("items/a"), json!({"n": 1})).unwrap();
        WriteBatch::create(&batch, &doc("items/a"), json!({"n": 2})).unwrap();
        assert!(matches!(
            batch.commit().await,
            Err(StoreError::AlreadyExists(_))
        ));
        assert!(db.is_empty());
    }

    fn poison(db: &InMemoryDriver) {
        std::thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = db.documents.write().unwrap();
                    panic!("writer died");
                })
                .join();
        });
    }

    #[test]
    #[should_panic(expected = "lock poisoned")]
    fn poisoned_lock_is_not_hidden_by_len() {
        let db = InMemoryDriver::new();
        poison(&db);
        let _ = db.len();
    }

    #[tokio::test]
    async fn poisoned_lock_fails_calls() {
        let db = InMemoryDriver::new();
        poison(&db);
        let err = db.get(&doc("items/p1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Internal(ref m) if m.contains("lock poisoned")));
    }

    #[test]
    fn debug_format() {
        let db = InMemoryDriver::new();
        let debug = format!("{db:?}");
        assert!(debug.contains("InMemoryDriver"));
        assert!(debug.contains("document_count"));
    }
}
