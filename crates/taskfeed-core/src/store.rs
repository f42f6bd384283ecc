//! Process-local document store carrying the backing store's contract
//!
//! The real backing store is an external collaborator (durable, per-record
//! atomic writes, push-based snapshot subscription); [`TaskStore`] is the
//! process-local stand-in with the same boundary: schemaless records keyed
//! by id, create/update/delete mutations, and a subscription that delivers
//! the *complete* collection after every mutation. Records are plain
//! key/value maps; the task shape is a convention of key names only.
//!
//! Snapshot delivery is monotonic in mutation order: every mutation
//! publishes the full collection while still holding the write lock, so a
//! later mutation can never be observed before an earlier one.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{FeedError, FeedResult};
use crate::types::{Task, TaskId};

/// Schemaless field map of a stored record
pub type Fields = serde_json::Map<String, Value>;

/// Record key holding the task text
pub const FIELD_TEXT: &str = "text";
/// Record key holding the completion flag
pub const FIELD_COMPLETED: &str = "completed";
/// Record key holding the creating session's id
pub const FIELD_OWNER_ID: &str = "ownerId";
/// Record key holding the creation timestamp (milliseconds)
pub const FIELD_CREATED_AT: &str = "createdAt";

/// Capacity of the snapshot broadcast channel
const SNAPSHOT_CHANNEL_CAPACITY: usize = 64;

/// A record as the store holds it: an id plus schemaless fields
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Store-assigned identifier
    pub id: TaskId,
    /// Schemaless key/value fields
    pub fields: Fields,
}

impl RawRecord {
    /// Create a record from an id and a field map
    pub fn new(id: TaskId, fields: Fields) -> Self {
        Self { id, fields }
    }

    /// Encode a task into the store's field convention
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            fields: task_fields(&task.text, task.completed, &task.owner_id, task.created_at),
        }
    }

    /// Parse this record into a canonical task
    ///
    /// Records are validated at this boundary: a missing or mistyped
    /// required field is an error, never a defaulted value.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Translation` naming the offending field.
    pub fn to_task(&self) -> FeedResult<Task> {
        let text = self
            .fields
            .get(FIELD_TEXT)
            .and_then(Value::as_str)
            .ok_or_else(|| self.bad_field(FIELD_TEXT))?;
        let completed = self
            .fields
            .get(FIELD_COMPLETED)
            .and_then(Value::as_bool)
            .ok_or_else(|| self.bad_field(FIELD_COMPLETED))?;
        let owner_id = self
            .fields
            .get(FIELD_OWNER_ID)
            .and_then(Value::as_str)
            .ok_or_else(|| self.bad_field(FIELD_OWNER_ID))?;
        let created_at = self
            .fields
            .get(FIELD_CREATED_AT)
            .and_then(Value::as_i64)
            .ok_or_else(|| self.bad_field(FIELD_CREATED_AT))?;

        Ok(Task {
            id: self.id.clone(),
            text: text.to_string(),
            completed,
            owner_id: owner_id.to_string(),
            created_at,
        })
    }

    fn bad_field(&self, field: &str) -> FeedError {
        FeedError::Translation(format!(
            "record {}: missing or invalid field `{}`",
            self.id, field
        ))
    }
}

/// Build a task field map in the store's key convention
pub fn task_fields(text: &str, completed: bool, owner_id: &str, created_at: i64) -> Fields {
    let mut fields = Fields::new();
    fields.insert(FIELD_TEXT.to_string(), Value::from(text));
    fields.insert(FIELD_COMPLETED.to_string(), Value::from(completed));
    fields.insert(FIELD_OWNER_ID.to_string(), Value::from(owner_id));
    fields.insert(FIELD_CREATED_AT.to_string(), Value::from(created_at));
    fields
}

struct StoreInner {
    /// Collection path, carried for tracing (a real store namespaces by it)
    path: String,
    records: RwLock<HashMap<TaskId, Fields>>,
    snapshot_tx: broadcast::Sender<Vec<RawRecord>>,
}

/// Document store for the task collection
///
/// Cloning is cheap and all clones share the same collection.
#[derive(Clone)]
pub struct TaskStore {
    inner: Arc<StoreInner>,
}

impl TaskStore {
    /// Open the store for the given collection path
    pub fn open(path: impl Into<String>) -> Self {
        let (snapshot_tx, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(StoreInner {
                path: path.into(),
                records: RwLock::new(HashMap::new()),
                snapshot_tx,
            }),
        }
    }

    /// The collection path this store serves
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Create a new record; the store assigns its id
    pub fn create(&self, fields: Fields) -> FeedResult<TaskId> {
        let id = TaskId::new();
        let mut records = self.inner.records.write();
        records.insert(id.clone(), fields);
        debug!(path = %self.inner.path, task_id = %id, "Record created");
        self.publish_locked(&records);
        Ok(id)
    }

    /// Merge the given fields into an existing record (field-level
    /// last-writer-wins)
    ///
    /// # Errors
    ///
    /// Returns `FeedError::NotFound` if the record no longer exists.
    pub fn update(&self, id: &TaskId, fields: Fields) -> FeedResult<()> {
        let mut records = self.inner.records.write();
        let record = records
            .get_mut(id)
            .ok_or_else(|| FeedError::NotFound(id.to_string()))?;
        for (key, value) in fields {
            record.insert(key, value);
        }
        debug!(path = %self.inner.path, task_id = %id, "Record updated");
        self.publish_locked(&records);
        Ok(())
    }

    /// Remove a record
    ///
    /// # Errors
    ///
    /// Returns `FeedError::NotFound` if the record no longer exists.
    pub fn delete(&self, id: &TaskId) -> FeedResult<()> {
        let mut records = self.inner.records.write();
        if records.remove(id).is_none() {
            return Err(FeedError::NotFound(id.to_string()));
        }
        debug!(path = %self.inner.path, task_id = %id, "Record deleted");
        self.publish_locked(&records);
        Ok(())
    }

    /// The complete current collection, in store-native (unsorted) order
    pub fn snapshot(&self) -> Vec<RawRecord> {
        let records = self.inner.records.read();
        Self::collect(&records)
    }

    /// Subscribe to snapshot delivery
    ///
    /// Returns the current collection together with a receiver of every
    /// subsequent snapshot. Taken under the same lock, so no mutation can
    /// fall between the initial snapshot and the first received one.
    pub fn subscribe(&self) -> (Vec<RawRecord>, broadcast::Receiver<Vec<RawRecord>>) {
        let records = self.inner.records.read();
        let rx = self.inner.snapshot_tx.subscribe();
        (Self::collect(&records), rx)
    }

    fn publish_locked(&self, records: &HashMap<TaskId, Fields>) {
        // Ignore the error: no live subscriber just means nothing to notify.
        let _ = self.inner.snapshot_tx.send(Self::collect(records));
    }

    fn collect(records: &HashMap<TaskId, Fields>) -> Vec<RawRecord> {
        records
            .iter()
            .map(|(id, fields)| RawRecord::new(id.clone(), fields.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> TaskStore {
        TaskStore::open("artifacts/test/public/data/tasks")
    }

    #[test]
    fn test_create_assigns_id_and_stores_fields() {
        let store = store();
        let id = store
            .create(task_fields("Buy milk", false, "u1", 100))
            .unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id);
        assert_eq!(
            snapshot[0].fields.get(FIELD_TEXT).and_then(Value::as_str),
            Some("Buy milk")
        );
    }

    #[test]
    fn test_update_merges_fields() {
        let store = store();
        let id = store.create(task_fields("X", false, "u1", 100)).unwrap();

        let mut patch = Fields::new();
        patch.insert(FIELD_COMPLETED.to_string(), Value::from(true));
        store.update(&id, patch).unwrap();

        let record = store.snapshot().remove(0);
        // Only the patched field changed
        assert_eq!(
            record.fields.get(FIELD_COMPLETED).and_then(Value::as_bool),
            Some(true)
        );
        assert_eq!(
            record.fields.get(FIELD_TEXT).and_then(Value::as_str),
            Some("X")
        );
    }

    #[test]
    fn test_update_missing_record_is_not_found() {
        let store = store();
        let err = store.update(&TaskId::new(), Fields::new()).unwrap_err();
        assert!(matches!(err, FeedError::NotFound(_)));
    }

    #[test]
    fn test_delete_removes_record() {
        let store = store();
        let id = store.create(task_fields("X", false, "u1", 100)).unwrap();
        store.delete(&id).unwrap();
        assert!(store.snapshot().is_empty());

        let err = store.delete(&id).unwrap_err();
        assert!(matches!(err, FeedError::NotFound(_)));
    }

    #[test]
    fn test_subscribe_initial_snapshot_and_mutation_delivery() {
        let store = store();
        let id = store.create(task_fields("X", false, "u1", 100)).unwrap();

        let (initial, mut rx) = store.subscribe();
        assert_eq!(initial.len(), 1);

        store.delete(&id).unwrap();
        let next = rx.try_recv().unwrap();
        assert!(next.is_empty());
    }

    #[test]
    fn test_raw_record_roundtrip() {
        let task = Task::new("Buy milk", "u1");
        let record = RawRecord::from_task(&task);
        assert_eq!(record.to_task().unwrap(), task);
    }

    #[test]
    fn test_raw_record_missing_field_is_translation_error() {
        let mut fields = task_fields("X", false, "u1", 100);
        fields.remove(FIELD_CREATED_AT);
        let record = RawRecord::new(TaskId::new(), fields);

        let err = record.to_task().unwrap_err();
        assert!(matches!(err, FeedError::Translation(_)));
        assert!(format!("{}", err).contains(FIELD_CREATED_AT));
    }

    #[test]
    fn test_raw_record_mistyped_field_is_translation_error() {
        let mut fields = task_fields("X", false, "u1", 100);
        fields.insert(FIELD_COMPLETED.to_string(), Value::from("yes"));
        let record = RawRecord::new(TaskId::new(), fields);

        assert!(record.to_task().is_err());
    }
}
