//! # Documents
//!
//! Raw stored documents and the collections that hold them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Collections known to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// One document per chapter
    Chapters,
    /// One document per saved revision of a chapter
    Versions,
}

impl Collection {
    /// Collection name as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Chapters => "chapters",
            Collection::Versions => "versions",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document id, unique within its collection
    pub id: String,

    /// Write counter, bumped by the store on every write to this document
    pub revision: u64,

    /// Field data
    pub data: Map<String, Value>,
}

impl Document {
    /// Create a document at revision 1
    pub fn new(id: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            revision: 1,
            data,
        }
    }

    /// Read a field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }
}
