//! Version Lifecycle Invariant Tests
//!
//! Single-current invariant, version numbering, autosave and deletion
//! guarantees, exercised through the public API against `MemoryStore`.

use std::sync::Arc;

use folio::model::{ChapterId, VersionType};
use folio::store::{Collection, MemoryStore};
use folio::{FolioError, VersionStore};

fn setup() -> (Arc<MemoryStore>, VersionStore<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let versions = VersionStore::new(Arc::clone(&store));
    (store, versions)
}

async fn current_count(versions: &VersionStore<MemoryStore>, chapter_id: &ChapterId) -> usize {
    versions
        .list_versions(chapter_id)
        .await
        .unwrap()
        .iter()
        .filter(|v| v.is_current)
        .count()
}

// =============================================================================
// SINGLE CURRENT VERSION
// =============================================================================

#[tokio::test]
async fn test_single_current_after_mixed_sequence() {
    let (_store, versions) = setup();
    let chapter_id = versions.create_chapter("u1", 1, "Intro").await.unwrap();
    assert_eq!(current_count(&versions, &chapter_id).await, 1);

    let v2 = versions
        .save_content(&chapter_id, "u1", "first draft", 2, true)
        .await
        .unwrap();
    assert_eq!(current_count(&versions, &chapter_id).await, 1);

    versions
        .create_version(&chapter_id, "u1", "a braindump", 2, VersionType::Braindump)
        .await
        .unwrap();
    assert_eq!(current_count(&versions, &chapter_id).await, 1);

    versions.set_current(&chapter_id, &v2).await.unwrap();
    assert_eq!(current_count(&versions, &chapter_id).await, 1);

    versions
        .save_content(&chapter_id, "u1", "first draft, edited", 3, false)
        .await
        .unwrap();
    assert_eq!(current_count(&versions, &chapter_id).await, 1);

    let current = versions.fetch_current_version(&chapter_id).await.unwrap().unwrap();
    let chapter = versions.get_chapter(&chapter_id).await.unwrap().unwrap();
    assert_eq!(current.id, v2);
    assert_eq!(chapter.current_version_id, Some(v2));
}

#[tokio::test]
async fn test_set_current_is_idempotent() {
    let (_store, versions) = setup();
    let chapter_id = versions.create_chapter("u1", 1, "Intro").await.unwrap();
    let v1 = versions.fetch_current_version(&chapter_id).await.unwrap().unwrap();

    versions.set_current(&chapter_id, &v1.id).await.unwrap();
    versions.set_current(&chapter_id, &v1.id).await.unwrap();

    assert_eq!(current_count(&versions, &chapter_id).await, 1);
}

#[tokio::test]
async fn test_set_current_rejects_version_of_other_chapter() {
    let (_store, versions) = setup();
    let first = versions.create_chapter("u1", 1, "One").await.unwrap();
    let second = versions.create_chapter("u1", 2, "Two").await.unwrap();
    let foreign = versions.fetch_current_version(&second).await.unwrap().unwrap();

    let result = versions.set_current(&first, &foreign.id).await;
    assert!(matches!(result, Err(FolioError::NotFound(_))));

    assert_eq!(current_count(&versions, &first).await, 1);
    assert_eq!(current_count(&versions, &second).await, 1);
}

#[tokio::test]
async fn test_set_current_unknown_version() {
    let (_store, versions) = setup();
    let chapter_id = versions.create_chapter("u1", 1, "Intro").await.unwrap();

    let result = versions.set_current(&chapter_id, &"missing".into()).await;
    assert!(matches!(result, Err(FolioError::NotFound(_))));
}

// =============================================================================
// VERSION NUMBERING
// =============================================================================

#[tokio::test]
async fn test_version_numbers_increase_by_one() {
    let (_store, versions) = setup();
    let chapter_id = versions.create_chapter("u1", 1, "Intro").await.unwrap();

    for i in 0..4u64 {
        versions
            .save_content(&chapter_id, "u1", "text", i, true)
            .await
            .unwrap();
    }

    let numbers: Vec<u64> = versions
        .list_versions(&chapter_id)
        .await
        .unwrap()
        .iter()
        .map(|v| v.version_number)
        .collect();
    assert_eq!(numbers, vec![5, 4, 3, 2, 1]);

    let chapter = versions.get_chapter(&chapter_id).await.unwrap().unwrap();
    assert_eq!(chapter.version_count, 5);
}

#[tokio::test]
async fn test_numbers_not_reused_after_deleting_highest() {
    let (_store, versions) = setup();
    let chapter_id = versions.create_chapter("u1", 1, "Intro").await.unwrap();
    let v1 = versions.fetch_current_version(&chapter_id).await.unwrap().unwrap();
    let v2 = versions
        .create_version(&chapter_id, "u1", "second", 1, VersionType::Singer)
        .await
        .unwrap();

    versions.set_current(&chapter_id, &v1.id).await.unwrap();
    versions.delete(&v2).await.unwrap();

    let v3 = versions
        .create_version(&chapter_id, "u1", "third", 1, VersionType::Watts)
        .await
        .unwrap();
    let v3 = versions.get_version(&v3).await.unwrap().unwrap();
    assert_eq!(v3.version_number, 3);
}

// =============================================================================
// AUTOSAVE
// =============================================================================

#[tokio::test]
async fn test_autosave_never_creates_versions() {
    let (store, versions) = setup();
    let chapter_id = versions.create_chapter("u1", 1, "Intro").await.unwrap();

    for words in 1..=5u64 {
        versions
            .save_content(&chapter_id, "u1", "typing", words, false)
            .await
            .unwrap();
    }

    let chapter = versions.get_chapter(&chapter_id).await.unwrap().unwrap();
    assert_eq!(chapter.version_count, 1);
    assert_eq!(chapter.word_count, 5);
    assert_eq!(store.document_count(Collection::Versions), 1);

    let current = versions.fetch_current_version(&chapter_id).await.unwrap().unwrap();
    assert_eq!(current.version_number, 1);
    assert_eq!(current.word_count, 5);
}

// =============================================================================
// DELETION
// =============================================================================

#[tokio::test]
async fn test_delete_current_rejected_without_changes() {
    let (store, versions) = setup();
    let chapter_id = versions.create_chapter("u1", 1, "Intro").await.unwrap();
    let current = versions.fetch_current_version(&chapter_id).await.unwrap().unwrap();
    let sequence = store.sequence();

    let result = versions.delete(&current.id).await;
    assert!(matches!(result, Err(FolioError::InvalidOperation(_))));

    assert_eq!(store.sequence(), sequence);
    assert!(versions.get_version(&current.id).await.unwrap().is_some());
    assert_eq!(versions.metrics().snapshot().deletes_rejected, 1);
}

#[tokio::test]
async fn test_delete_non_current_version() {
    let (_store, versions) = setup();
    let chapter_id = versions.create_chapter("u1", 1, "Intro").await.unwrap();
    let v1 = versions.fetch_current_version(&chapter_id).await.unwrap().unwrap();
    versions
        .create_version(&chapter_id, "u1", "newer", 1, VersionType::Custom)
        .await
        .unwrap();

    versions.delete(&v1.id).await.unwrap();

    assert!(versions.get_version(&v1.id).await.unwrap().is_none());
    assert_eq!(versions.list_versions(&chapter_id).await.unwrap().len(), 1);
    assert_eq!(current_count(&versions, &chapter_id).await, 1);
}

// =============================================================================
// END TO END
// =============================================================================

#[tokio::test]
async fn test_create_then_jung_version() {
    let (_store, versions) = setup();
    let chapter_id = versions.create_chapter("u1", 1, "Intro").await.unwrap();

    let v1 = versions.fetch_current_version(&chapter_id).await.unwrap().unwrap();
    assert_eq!(v1.version_number, 1);
    assert_eq!(v1.version_type, VersionType::Original);
    assert_eq!(v1.content, "");

    let v2_id = versions
        .create_version(&chapter_id, "u1", "shadow work", 2, VersionType::Jung)
        .await
        .unwrap();

    let v2 = versions.fetch_current_version(&chapter_id).await.unwrap().unwrap();
    assert_eq!(v2.id, v2_id);
    assert_eq!(v2.version_number, 2);
    assert!(!v2.is_archived);

    let v1 = versions.get_version(&v1.id).await.unwrap().unwrap();
    assert!(!v1.is_current);

    let chapter = versions.get_chapter(&chapter_id).await.unwrap().unwrap();
    assert_eq!(chapter.version_count, 2);
    assert_eq!(chapter.word_count, 2);
    assert_eq!(chapter.current_version_id, Some(v2_id));
}

// =============================================================================
// STORE FAILURES
// =============================================================================

#[tokio::test]
async fn test_unavailable_store_leaves_no_partial_effects() {
    let (store, versions) = setup();
    let chapter_id = versions.create_chapter("u1", 1, "Intro").await.unwrap();
    let sequence = store.sequence();

    store.set_available(false);
    let result = versions
        .create_version(&chapter_id, "u1", "lost", 1, VersionType::Jung)
        .await;
    assert!(matches!(result, Err(FolioError::StoreUnavailable(_))));
    store.set_available(true);

    assert_eq!(store.sequence(), sequence);
    assert_eq!(store.document_count(Collection::Versions), 1);
    let chapter = versions.get_chapter(&chapter_id).await.unwrap().unwrap();
    assert_eq!(chapter.version_count, 1);
}

#[tokio::test]
async fn test_transient_failure_surfaces_unchanged() {
    let (store, versions) = setup();
    let chapter_id = versions.create_chapter("u1", 1, "Intro").await.unwrap();
    let before = store.sequence();

    store.fail_next(1);
    let result = versions.save_content(&chapter_id, "u1", "x", 1, true).await;
    let err = result.unwrap_err();
    assert!(matches!(err, FolioError::StoreUnavailable(_)));
    assert!(err.is_retryable());
    assert_eq!(store.sequence(), before);

    // No hidden retry consumed the next call
    versions.save_content(&chapter_id, "u1", "x", 1, true).await.unwrap();
    assert_eq!(store.sequence(), before + 1);
}
