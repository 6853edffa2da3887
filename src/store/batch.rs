//! # Batched Writes
//!
//! A batch is a list of writes plus preconditions committed as one unit:
//! either every write applies, or none does and the store is unchanged.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::document::Collection;
use super::errors::{StoreError, StoreResult};

/// Value written to a single field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Literal value
    Value(Value),
    /// Commit time assigned by the store
    ServerTimestamp,
    /// Add to the existing integer (missing counts as zero)
    Increment(i64),
}

impl FieldValue {
    /// Literal value from anything JSON-convertible
    pub fn set(value: impl Into<Value>) -> Self {
        FieldValue::Value(value.into())
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Value(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Value(Value::Bool(value))
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Value(value.into())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Value(value.into())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Value(value.into())
    }
}

/// Field name to value, in deterministic order
pub type Fields = BTreeMap<String, FieldValue>;

/// Build literal fields from a serialisable struct
///
/// The struct must serialise to a JSON object.
pub fn fields_of<T: Serialize>(value: &T) -> StoreResult<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(k, v)| (k, FieldValue::Value(v)))
            .collect()),
        other => Err(StoreError::Malformed(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

/// A single write inside a batch
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Create a new document; fails if the id is taken
    Create {
        collection: Collection,
        id: String,
        fields: Fields,
    },
    /// Merge fields into an existing document; fails if it is missing
    Update {
        collection: Collection,
        id: String,
        fields: Fields,
    },
    /// Remove a document; missing documents are ignored
    Delete { collection: Collection, id: String },
}

impl Write {
    /// Target collection and id
    pub fn target(&self) -> (Collection, &str) {
        match self {
            Write::Create { collection, id, .. }
            | Write::Update { collection, id, .. }
            | Write::Delete { collection, id } => (*collection, id),
        }
    }
}

/// Condition checked against committed state before any write applies
#[derive(Debug, Clone, PartialEq)]
pub enum Precondition {
    /// Document exists at exactly this revision
    Revision {
        collection: Collection,
        id: String,
        revision: u64,
    },
    /// Document exists and the field holds this value
    FieldEquals {
        collection: Collection,
        id: String,
        field: String,
        value: Value,
    },
}

/// Atomic set of writes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    writes: Vec<Write>,
    preconditions: Vec<Precondition>,
}

impl Batch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a document creation
    pub fn create(&mut self, collection: Collection, id: impl Into<String>, fields: Fields) -> &mut Self {
        self.writes.push(Write::Create {
            collection,
            id: id.into(),
            fields,
        });
        self
    }

    /// Queue a field update
    pub fn update(&mut self, collection: Collection, id: impl Into<String>, fields: Fields) -> &mut Self {
        self.writes.push(Write::Update {
            collection,
            id: id.into(),
            fields,
        });
        self
    }

    /// Queue a deletion
    pub fn delete(&mut self, collection: Collection, id: impl Into<String>) -> &mut Self {
        self.writes.push(Write::Delete {
            collection,
            id: id.into(),
        });
        self
    }

    /// Require a document to still be at the observed revision
    pub fn expect_revision(&mut self, collection: Collection, id: impl Into<String>, revision: u64) -> &mut Self {
        self.preconditions.push(Precondition::Revision {
            collection,
            id: id.into(),
            revision,
        });
        self
    }

    /// Require a document field to hold a value
    pub fn expect_field(
        &mut self,
        collection: Collection,
        id: impl Into<String>,
        field: &str,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.preconditions.push(Precondition::FieldEquals {
            collection,
            id: id.into(),
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    /// Queued writes
    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    /// Queued preconditions
    pub fn preconditions(&self) -> &[Precondition] {
        &self.preconditions
    }

    /// Number of queued writes
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Check if no writes are queued
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Outcome of a committed batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitInfo {
    /// Store-wide commit sequence, strictly increasing
    pub sequence: u64,
    /// Value used for every `ServerTimestamp` in the batch
    pub commit_time: DateTime<Utc>,
}
