use docnest_types::{DocumentPath, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

/// Stored fields of one document.
pub type Fields = Map<String, Value>;

/// Options for a `set` write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetOptions {
    /// Merge supplied fields into the stored document instead of replacing it.
    pub merge: bool,
}

impl SetOptions {
    pub fn overwrite() -> Self {
        Self { merge: false }
    }

    pub fn merge() -> Self {
        Self { merge: true }
    }
}

/// Result of reading one document.
///
/// A snapshot is returned whether or not the document exists; callers
/// check [`Snapshot::exists`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    path: DocumentPath,
    fields: Option<Fields>,
    read_time: Timestamp,
}

impl Snapshot {
    pub fn new(path: DocumentPath, fields: Option<Fields>) -> Self {
        Self {
            path,
            fields,
            read_time: Timestamp::now(),
        }
    }

    pub fn missing(path: DocumentPath) -> Self {
        Self::new(path, None)
    }

    pub fn path(&self) -> &DocumentPath {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.fields.is_some()
    }

    pub fn fields(&self) -> Option<&Fields> {
        self.fields.as_ref()
    }

    pub fn read_time(&self) -> Timestamp {
        self.read_time
    }

    /// The document as a JSON object, or `None` if it does not exist.
    pub fn to_value(&self) -> Option<Value> {
        self.fields.clone().map(Value::Object)
    }
}

/// Check that `data` is a JSON object and stamp any server timestamps.
pub(crate) fn prepare_fields(path: &DocumentPath, data: Value) -> StoreResult<Fields> {
    let mut data = data;
    resolve_server_timestamps(&mut data, Timestamp::now());
    match data {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::InvalidDocument {
            path: path.clone(),
            reason: format!("expected a JSON object, got {}", type_name(&other)),
        }),
    }
}

fn resolve_server_timestamps(value: &mut Value, now: Timestamp) {
    if Timestamp::is_server_timestamp(value) {
        *value = now.to_value();
        return;
    }
    match value {
        Value::Object(map) => map
            .values_mut()
            .for_each(|v| resolve_server_timestamps(v, now)),
        Value::Array(items) => items
            .iter_mut()
            .for_each(|v| resolve_server_timestamps(v, now)),
        _ => {}
    }
}

/// Merge `patch` into `target`. Nested objects merge field by field; any
/// other value replaces what was stored.
pub(crate) fn merge_fields(target: &mut Fields, patch: Fields) {
    for (key, incoming) in patch {
        match incoming {
            Value::Object(nested) => {
                if let Some(Value::Object(existing)) = target.get_mut(&key) {
                    merge_fields(existing, nested);
                } else {
                    target.insert(key, Value::Object(nested));
                }
            }
            other => {
                target.insert(key, other);
            }
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
