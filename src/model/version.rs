//! Version records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ChapterId, VersionId};

/// How a version came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionType {
    /// First version, created with the chapter
    Original,
    Braindump,
    Jung,
    Singer,
    Watts,
    Custom,
    /// Saved by the author as a new version
    Edited,
}

impl VersionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionType::Original => "original",
            VersionType::Braindump => "braindump",
            VersionType::Jung => "jung",
            VersionType::Singer => "singer",
            VersionType::Watts => "watts",
            VersionType::Custom => "custom",
            VersionType::Edited => "edited",
        }
    }
}

impl fmt::Display for VersionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One saved revision of a chapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub id: VersionId,

    /// Owning chapter; never changes
    pub chapter_id: ChapterId,

    pub owner_id: String,

    pub content: String,

    pub created_at: DateTime<Utc>,

    /// Set only by in-place edits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    pub is_current: bool,

    /// Strictly increasing per chapter, starting at 1
    pub version_number: u64,

    #[serde(rename = "type")]
    pub version_type: VersionType,

    #[serde(default)]
    pub is_archived: bool,

    pub word_count: u64,
}
