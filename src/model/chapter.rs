//! Chapter records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::ids::{ChapterId, VersionId};

/// Editorial status of a chapter
///
/// The set of statuses belongs to the caller. Unknown values are kept
/// verbatim rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChapterStatus {
    Draft,
    InReview,
    Final,
    Other(String),
}

impl ChapterStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ChapterStatus::Draft => "draft",
            ChapterStatus::InReview => "in-review",
            ChapterStatus::Final => "final",
            ChapterStatus::Other(s) => s,
        }
    }
}

impl From<String> for ChapterStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "draft" => ChapterStatus::Draft,
            "in-review" => ChapterStatus::InReview,
            "final" => ChapterStatus::Final,
            _ => ChapterStatus::Other(s),
        }
    }
}

impl From<ChapterStatus> for String {
    fn from(status: ChapterStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ChapterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One authored unit of content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: ChapterId,

    pub owner_id: String,

    /// Display position, unique per owner, starting at 1
    pub chapter_number: u32,

    pub title: String,

    pub status: ChapterStatus,

    /// Mirrors the current version's word count
    pub word_count: u64,

    /// Versions ever created for this chapter; never decreases
    pub version_count: u64,

    /// Cached id of the current version
    #[serde(default, deserialize_with = "empty_as_none")]
    pub current_version_id: Option<VersionId>,

    /// Server-assigned time of the last change
    pub last_edited: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub butterfly_analogy: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub butterfly_stage: Option<String>,
}

/// Older records store a missing current version as an empty string
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<VersionId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()).map(VersionId::from))
}
