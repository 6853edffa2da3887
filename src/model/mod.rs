//! # Data Model
//!
//! Typed views of the two stored record kinds.
//!
//! - `Chapter` - one authored unit of content, carrying summary fields that
//!   mirror its current version
//! - `Version` - one saved revision of a chapter
//!
//! ## Invariant
//! For every chapter with at least one version, exactly one version has
//! `isCurrent = true` once all in-flight batches have committed. The
//! per-version flag is the source of truth; `Chapter::current_version_id`
//! is a cache kept in step by every operation that moves currency.

mod chapter;
mod ids;
mod version;

pub use chapter::{Chapter, ChapterStatus};
pub use ids::{ChapterId, VersionId};
pub use version::{Version, VersionType};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::store::{Collection, Direction, Document, Query, StoreError, StoreResult};

/// Stored field names
pub mod field {
    pub const OWNER_ID: &str = "ownerId";
    pub const CHAPTER_ID: &str = "chapterId";
    pub const CHAPTER_NUMBER: &str = "chapterNumber";
    pub const TITLE: &str = "title";
    pub const STATUS: &str = "status";
    pub const WORD_COUNT: &str = "wordCount";
    pub const VERSION_COUNT: &str = "versionCount";
    pub const CURRENT_VERSION_ID: &str = "currentVersionId";
    pub const LAST_EDITED: &str = "lastEdited";
    pub const BUTTERFLY_ANALOGY: &str = "butterflyAnalogy";
    pub const BUTTERFLY_STAGE: &str = "butterflyStage";
    pub const CONTENT: &str = "content";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
    pub const IS_CURRENT: &str = "isCurrent";
    pub const VERSION_NUMBER: &str = "versionNumber";
    pub const IS_ARCHIVED: &str = "isArchived";
}

/// Every chapter of an owner, in display order
pub fn chapters_of(owner_id: &str) -> Query {
    Query::collection(Collection::Chapters)
        .where_eq(field::OWNER_ID, owner_id)
        .order_by(field::CHAPTER_NUMBER, Direction::Ascending)
}

/// Every version of a chapter, newest first
pub fn versions_of(chapter_id: &ChapterId) -> Query {
    Query::collection(Collection::Versions)
        .where_eq(field::CHAPTER_ID, chapter_id.as_str())
        .order_by(field::VERSION_NUMBER, Direction::Descending)
}

/// A record type stored in one collection
pub trait Record: DeserializeOwned + Send + 'static {
    /// Collection holding records of this type
    const COLLECTION: Collection;

    /// Decode a stored document
    ///
    /// The document id becomes the record's `id` field.
    fn from_document(doc: &Document) -> StoreResult<Self> {
        let mut data = doc.data.clone();
        data.insert("id".to_string(), Value::String(doc.id.clone()));
        serde_json::from_value(Value::Object(data)).map_err(|e| {
            StoreError::Malformed(format!("{}/{}: {}", Self::COLLECTION, doc.id, e))
        })
    }
}

impl Record for Chapter {
    const COLLECTION: Collection = Collection::Chapters;
}

impl Record for Version {
    const COLLECTION: Collection = Collection::Versions;
}
