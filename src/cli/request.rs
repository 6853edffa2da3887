//! Request lines accepted by `folio run`.

use serde::Deserialize;

use crate::model::{ChapterId, ChapterStatus, VersionId, VersionType};

/// One operation, tagged by `op`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    CreateChapter {
        owner_id: String,
        chapter_number: u32,
        title: String,
    },
    GetChapter {
        chapter_id: ChapterId,
    },
    ListChapters {
        owner_id: String,
    },
    UpdateTitle {
        chapter_id: ChapterId,
        title: String,
    },
    UpdateStatus {
        chapter_id: ChapterId,
        status: ChapterStatus,
    },
    UpdateAnalogy {
        chapter_id: ChapterId,
        analogy: String,
        stage: String,
    },
    Reorder {
        chapter_ids: Vec<ChapterId>,
    },
    FetchCurrentVersion {
        chapter_id: ChapterId,
    },
    GetVersion {
        version_id: VersionId,
    },
    ListVersions {
        chapter_id: ChapterId,
    },
    SaveContent {
        chapter_id: ChapterId,
        owner_id: String,
        content: String,
        word_count: u64,
        #[serde(default)]
        as_new_version: bool,
    },
    CreateVersion {
        chapter_id: ChapterId,
        owner_id: String,
        content: String,
        word_count: u64,
        #[serde(rename = "type")]
        version_type: VersionType,
    },
    SetCurrent {
        chapter_id: ChapterId,
        version_id: VersionId,
    },
    Archive {
        version_id: VersionId,
        #[serde(default = "archive_default")]
        archived: bool,
    },
    Delete {
        version_id: VersionId,
    },
    Metrics,
}

fn archive_default() -> bool {
    true
}

impl Request {
    /// Operation name as written on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Request::CreateChapter { .. } => "create_chapter",
            Request::GetChapter { .. } => "get_chapter",
            Request::ListChapters { .. } => "list_chapters",
            Request::UpdateTitle { .. } => "update_title",
            Request::UpdateStatus { .. } => "update_status",
            Request::UpdateAnalogy { .. } => "update_analogy",
            Request::Reorder { .. } => "reorder",
            Request::FetchCurrentVersion { .. } => "fetch_current_version",
            Request::GetVersion { .. } => "get_version",
            Request::ListVersions { .. } => "list_versions",
            Request::SaveContent { .. } => "save_content",
            Request::CreateVersion { .. } => "create_version",
            Request::SetCurrent { .. } => "set_current",
            Request::Archive { .. } => "archive",
            Request::Delete { .. } => "delete",
            Request::Metrics => "metrics",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_create_version() {
        let request: Request = serde_json::from_value(json!({
            "op": "create_version",
            "chapter_id": "c1",
            "owner_id": "u1",
            "content": "two words",
            "word_count": 2,
            "type": "jung"
        }))
        .unwrap();

        assert_eq!(request.name(), "create_version");
        assert!(matches!(
            request,
            Request::CreateVersion { version_type: VersionType::Jung, word_count: 2, .. }
        ));
    }

    #[test]
    fn test_defaults() {
        let save: Request = serde_json::from_value(json!({
            "op": "save_content",
            "chapter_id": "c1",
            "owner_id": "u1",
            "content": "",
            "word_count": 0
        }))
        .unwrap();
        assert!(matches!(save, Request::SaveContent { as_new_version: false, .. }));

        let archive: Request =
            serde_json::from_value(json!({"op": "archive", "version_id": "v1"})).unwrap();
        assert!(matches!(archive, Request::Archive { archived: true, .. }));
    }

    #[test]
    fn test_unknown_op_rejected() {
        let result = serde_json::from_value::<Request>(json!({"op": "drop_everything"}));
        assert!(result.is_err());
    }
}
