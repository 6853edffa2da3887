//! Chapter/version lifecycle over a [`DocumentStore`].

use std::sync::Arc;

use serde::Serialize;

use crate::config::{ConsistencyPolicy, FolioConfig};
use crate::error::{FolioError, FolioResult};
use crate::model::{
    chapters_of, field, versions_of, Chapter, ChapterId, ChapterStatus, Record, Version,
    VersionId, VersionType,
};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::store::{fields_of, Batch, Collection, Document, DocumentStore, FieldValue, Fields};

use super::commit::commit_batch;

/// Literal fields of a freshly created chapter
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewChapter<'a> {
    owner_id: &'a str,
    chapter_number: u32,
    title: &'a str,
    status: ChapterStatus,
    word_count: u64,
    version_count: u64,
    current_version_id: &'a VersionId,
}

/// Literal fields of a freshly created version
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewVersion<'a> {
    chapter_id: &'a ChapterId,
    owner_id: &'a str,
    content: &'a str,
    is_current: bool,
    version_number: u64,
    #[serde(rename = "type")]
    version_type: VersionType,
    is_archived: bool,
    word_count: u64,
}

/// Chapter together with the revision it was read at
struct ChapterRead {
    chapter: Chapter,
    revision: u64,
}

/// Chapter and version lifecycle operations
pub struct VersionStore<S: DocumentStore> {
    store: Arc<S>,
    policy: ConsistencyPolicy,
    save_as_new_type: VersionType,
    metrics: Arc<MetricsRegistry>,
}

impl<S: DocumentStore> VersionStore<S> {
    /// Create a version store with default configuration
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, &FolioConfig::default())
    }

    /// Create a version store from configuration
    pub fn with_config(store: Arc<S>, config: &FolioConfig) -> Self {
        Self {
            store,
            policy: config.consistency,
            save_as_new_type: config.save_as_new_type,
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    /// Share a metrics registry with other components
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn policy(&self) -> ConsistencyPolicy {
        self.policy
    }

    // ==================
    // Reads
    // ==================

    /// Point read of a chapter
    pub async fn get_chapter(&self, chapter_id: &ChapterId) -> FolioResult<Option<Chapter>> {
        let doc = self.store.get(Collection::Chapters, chapter_id.as_str()).await?;
        Ok(doc.as_ref().map(Chapter::from_document).transpose()?)
    }

    /// Point read of a version
    pub async fn get_version(&self, version_id: &VersionId) -> FolioResult<Option<Version>> {
        let doc = self.store.get(Collection::Versions, version_id.as_str()).await?;
        Ok(doc.as_ref().map(Version::from_document).transpose()?)
    }

    /// Chapters of an owner, ascending by chapter number
    pub async fn list_chapters(&self, owner_id: &str) -> FolioResult<Vec<Chapter>> {
        let docs = self.store.query(&chapters_of(owner_id)).await?;
        decode_all(&docs)
    }

    /// Versions of a chapter, descending by version number
    pub async fn list_versions(&self, chapter_id: &ChapterId) -> FolioResult<Vec<Version>> {
        let docs = self.store.query(&versions_of(chapter_id)).await?;
        decode_all(&docs)
    }

    /// The version currently marked authoritative, if any
    ///
    /// Records written around this store (or by an older writer) may leave
    /// more than one version flagged; the highest version number is
    /// returned in that case and the next promotion demotes the rest.
    pub async fn fetch_current_version(&self, chapter_id: &ChapterId) -> FolioResult<Option<Version>> {
        let current = self.current_versions(chapter_id).await?;

        if current.len() > 1 {
            let count = current.len().to_string();
            log_event_with_fields(
                Event::ConcurrentCurrentDetected,
                &[("chapter_id", chapter_id.as_str()), ("count", count.as_str())],
            );
        }

        Ok(current.into_iter().next())
    }

    async fn load_chapter(&self, chapter_id: &ChapterId) -> FolioResult<ChapterRead> {
        let doc = self
            .store
            .get(Collection::Chapters, chapter_id.as_str())
            .await?
            .ok_or_else(|| FolioError::not_found(format!("chapter {}", chapter_id)))?;

        Ok(ChapterRead {
            chapter: Chapter::from_document(&doc)?,
            revision: doc.revision,
        })
    }

    async fn load_version(&self, version_id: &VersionId) -> FolioResult<Version> {
        let doc = self
            .store
            .get(Collection::Versions, version_id.as_str())
            .await?
            .ok_or_else(|| FolioError::not_found(format!("version {}", version_id)))?;

        Ok(Version::from_document(&doc)?)
    }

    async fn current_versions(&self, chapter_id: &ChapterId) -> FolioResult<Vec<Version>> {
        let query = versions_of(chapter_id).where_eq(field::IS_CURRENT, true);
        let docs = self.store.query(&query).await?;
        decode_all(&docs)
    }

    // ==================
    // Chapter lifecycle
    // ==================

    /// Create a chapter together with its first, current version
    ///
    /// Both records go out in one batch under client-generated ids, so no
    /// reader ever sees a chapter without a version.
    pub async fn create_chapter(
        &self,
        owner_id: &str,
        chapter_number: u32,
        title: &str,
    ) -> FolioResult<ChapterId> {
        if chapter_number == 0 {
            return Err(FolioError::invalid("chapter number must be positive"));
        }

        let taken = self
            .store
            .query(&chapters_of(owner_id).where_eq(field::CHAPTER_NUMBER, chapter_number).limit(1))
            .await?;
        if !taken.is_empty() {
            return Err(FolioError::invalid(format!(
                "chapter number {} is already used by owner {}",
                chapter_number, owner_id
            )));
        }

        let chapter_id = ChapterId::new(self.store.generate_id());
        let version_id = VersionId::new(self.store.generate_id());

        let mut chapter_fields = fields_of(&NewChapter {
            owner_id,
            chapter_number,
            title,
            status: ChapterStatus::Draft,
            word_count: 0,
            version_count: 1,
            current_version_id: &version_id,
        })?;
        chapter_fields.insert(field::LAST_EDITED.to_string(), FieldValue::ServerTimestamp);

        let mut version_fields = fields_of(&NewVersion {
            chapter_id: &chapter_id,
            owner_id,
            content: "",
            is_current: true,
            version_number: 1,
            version_type: VersionType::Original,
            is_archived: false,
            word_count: 0,
        })?;
        version_fields.insert(field::CREATED_AT.to_string(), FieldValue::ServerTimestamp);

        let mut batch = Batch::new();
        batch
            .create(Collection::Chapters, chapter_id.as_str(), chapter_fields)
            .create(Collection::Versions, version_id.as_str(), version_fields);
        commit_batch(self.store.as_ref(), batch, &self.metrics, "create_chapter").await?;

        self.metrics.increment_chapters_created();
        self.metrics.increment_versions_created();
        let number = chapter_number.to_string();
        log_event_with_fields(
            Event::ChapterCreated,
            &[
                ("chapter_id", chapter_id.as_str()),
                ("chapter_number", number.as_str()),
                ("owner_id", owner_id),
                ("version_id", version_id.as_str()),
            ],
        );

        Ok(chapter_id)
    }

    pub async fn update_title(&self, chapter_id: &ChapterId, title: &str) -> FolioResult<()> {
        let fields = Fields::from([(field::TITLE.to_string(), FieldValue::from(title))]);
        self.update_chapter(chapter_id, fields, "update_title").await
    }

    pub async fn update_status(&self, chapter_id: &ChapterId, status: ChapterStatus) -> FolioResult<()> {
        let fields = Fields::from([(field::STATUS.to_string(), FieldValue::from(String::from(status)))]);
        self.update_chapter(chapter_id, fields, "update_status").await
    }

    /// Set the free-form annotation pair
    pub async fn update_analogy(&self, chapter_id: &ChapterId, analogy: &str, stage: &str) -> FolioResult<()> {
        let fields = Fields::from([
            (field::BUTTERFLY_ANALOGY.to_string(), FieldValue::from(analogy)),
            (field::BUTTERFLY_STAGE.to_string(), FieldValue::from(stage)),
        ]);
        self.update_chapter(chapter_id, fields, "update_analogy").await
    }

    async fn update_chapter(&self, chapter_id: &ChapterId, mut fields: Fields, operation: &str) -> FolioResult<()> {
        fields.insert(field::LAST_EDITED.to_string(), FieldValue::ServerTimestamp);

        let mut batch = Batch::new();
        batch.update(Collection::Chapters, chapter_id.as_str(), fields);
        commit_batch(self.store.as_ref(), batch, &self.metrics, operation).await?;

        log_event_with_fields(
            Event::ChapterUpdated,
            &[("chapter_id", chapter_id.as_str()), ("operation", operation)],
        );
        Ok(())
    }

    // ==================
    // Version lifecycle
    // ==================

    /// Save chapter content
    ///
    /// With `as_new_version` the content becomes a new current version.
    /// Otherwise the current version is overwritten in place, leaving its
    /// number and the chapter's version count untouched. Returns the id of
    /// the version written.
    pub async fn save_content(
        &self,
        chapter_id: &ChapterId,
        owner_id: &str,
        content: &str,
        word_count: u64,
        as_new_version: bool,
    ) -> FolioResult<VersionId> {
        if as_new_version {
            return self
                .insert_version(
                    chapter_id,
                    owner_id,
                    content,
                    word_count,
                    self.save_as_new_type,
                    "save_content",
                )
                .await;
        }

        let read = self.load_chapter(chapter_id).await?;
        let current = self
            .fetch_current_version(chapter_id)
            .await?
            .ok_or_else(|| FolioError::not_found(format!("current version of chapter {}", chapter_id)))?;

        let version_fields = Fields::from([
            (field::CONTENT.to_string(), FieldValue::from(content)),
            (field::WORD_COUNT.to_string(), FieldValue::from(word_count)),
            (field::UPDATED_AT.to_string(), FieldValue::ServerTimestamp),
        ]);
        let chapter_fields = Fields::from([
            (field::WORD_COUNT.to_string(), FieldValue::from(word_count)),
            (field::LAST_EDITED.to_string(), FieldValue::ServerTimestamp),
        ]);

        let mut batch = Batch::new();
        batch
            .update(Collection::Versions, current.id.as_str(), version_fields)
            .update(Collection::Chapters, chapter_id.as_str(), chapter_fields);
        if self.policy == ConsistencyPolicy::Optimistic {
            batch.expect_field(Collection::Versions, current.id.as_str(), field::IS_CURRENT, true);
            pin(&mut batch, &read);
        }
        commit_batch(self.store.as_ref(), batch, &self.metrics, "autosave").await?;

        self.metrics.increment_autosaves();
        let words = word_count.to_string();
        log_event_with_fields(
            Event::ContentAutosaved,
            &[
                ("chapter_id", chapter_id.as_str()),
                ("version_id", current.id.as_str()),
                ("word_count", words.as_str()),
            ],
        );

        Ok(current.id)
    }

    /// Create a version of the given type and make it current
    pub async fn create_version(
        &self,
        chapter_id: &ChapterId,
        owner_id: &str,
        content: &str,
        word_count: u64,
        version_type: VersionType,
    ) -> FolioResult<VersionId> {
        self.insert_version(chapter_id, owner_id, content, word_count, version_type, "create_version")
            .await
    }

    /// Demote every current version and insert the next one as current
    async fn insert_version(
        &self,
        chapter_id: &ChapterId,
        owner_id: &str,
        content: &str,
        word_count: u64,
        version_type: VersionType,
        operation: &str,
    ) -> FolioResult<VersionId> {
        let mut attempt = 1;
        loop {
            match self
                .try_insert_version(chapter_id, owner_id, content, word_count, version_type, operation)
                .await
            {
                Err(FolioError::Conflict(_)) if self.rerun_on_conflict(attempt) => attempt += 1,
                result => return result,
            }
        }
    }

    async fn try_insert_version(
        &self,
        chapter_id: &ChapterId,
        owner_id: &str,
        content: &str,
        word_count: u64,
        version_type: VersionType,
        operation: &str,
    ) -> FolioResult<VersionId> {
        let read = self.load_chapter(chapter_id).await?;
        let existing = self.list_versions(chapter_id).await?;

        // version_count covers deleted versions, so numbers are never reused
        let highest = existing.iter().map(|v| v.version_number).max().unwrap_or(0);
        let version_number = highest.max(read.chapter.version_count) + 1;
        let version_id = VersionId::new(self.store.generate_id());

        let mut batch = Batch::new();
        for version in existing.iter().filter(|v| v.is_current) {
            batch.update(Collection::Versions, version.id.as_str(), currency(false));
        }

        let mut version_fields = fields_of(&NewVersion {
            chapter_id,
            owner_id,
            content,
            is_current: true,
            version_number,
            version_type,
            is_archived: false,
            word_count,
        })?;
        version_fields.insert(field::CREATED_AT.to_string(), FieldValue::ServerTimestamp);
        batch.create(Collection::Versions, version_id.as_str(), version_fields);

        let chapter_fields = Fields::from([
            (field::VERSION_COUNT.to_string(), FieldValue::Increment(1)),
            (field::WORD_COUNT.to_string(), FieldValue::from(word_count)),
            (field::CURRENT_VERSION_ID.to_string(), FieldValue::from(version_id.as_str())),
            (field::LAST_EDITED.to_string(), FieldValue::ServerTimestamp),
        ]);
        batch.update(Collection::Chapters, chapter_id.as_str(), chapter_fields);

        pin(&mut batch, &read);
        commit_batch(self.store.as_ref(), batch, &self.metrics, operation).await?;

        self.metrics.increment_versions_created();
        let number = version_number.to_string();
        log_event_with_fields(
            Event::VersionCreated,
            &[
                ("chapter_id", chapter_id.as_str()),
                ("type", version_type.as_str()),
                ("version_id", version_id.as_str()),
                ("version_number", number.as_str()),
            ],
        );

        Ok(version_id)
    }

    /// Make a version of the chapter the current one
    ///
    /// Fails with `NotFound` if the version belongs to another chapter:
    /// promoting it would break the invariant for both chapters.
    pub async fn set_current(&self, chapter_id: &ChapterId, version_id: &VersionId) -> FolioResult<()> {
        let mut attempt = 1;
        loop {
            match self.try_set_current(chapter_id, version_id).await {
                Err(FolioError::Conflict(_)) if self.rerun_on_conflict(attempt) => attempt += 1,
                result => return result,
            }
        }
    }

    async fn try_set_current(&self, chapter_id: &ChapterId, version_id: &VersionId) -> FolioResult<()> {
        let read = self.load_chapter(chapter_id).await?;
        let target = self.load_version(version_id).await?;
        if &target.chapter_id != chapter_id {
            return Err(FolioError::not_found(format!(
                "version {} in chapter {}",
                version_id, chapter_id
            )));
        }

        let current = self.current_versions(chapter_id).await?;

        let mut batch = Batch::new();
        let mut demoted = 0usize;
        for version in current.iter().filter(|v| v.id != target.id) {
            batch.update(Collection::Versions, version.id.as_str(), currency(false));
            demoted += 1;
        }
        batch.update(Collection::Versions, target.id.as_str(), currency(true));

        let chapter_fields = Fields::from([
            (field::CURRENT_VERSION_ID.to_string(), FieldValue::from(target.id.as_str())),
            (field::WORD_COUNT.to_string(), FieldValue::from(target.word_count)),
            (field::LAST_EDITED.to_string(), FieldValue::ServerTimestamp),
        ]);
        batch.update(Collection::Chapters, chapter_id.as_str(), chapter_fields);

        pin(&mut batch, &read);
        commit_batch(self.store.as_ref(), batch, &self.metrics, "set_current").await?;

        self.metrics.increment_promotions();
        let demoted = demoted.to_string();
        log_event_with_fields(
            Event::CurrentChanged,
            &[
                ("chapter_id", chapter_id.as_str()),
                ("demoted", demoted.as_str()),
                ("version_id", version_id.as_str()),
            ],
        );
        Ok(())
    }

    /// Set or clear the archive flag; currency is unaffected
    pub async fn archive(&self, version_id: &VersionId, archived: bool) -> FolioResult<()> {
        let fields = Fields::from([(field::IS_ARCHIVED.to_string(), FieldValue::from(archived))]);

        let mut batch = Batch::new();
        batch.update(Collection::Versions, version_id.as_str(), fields);
        commit_batch(self.store.as_ref(), batch, &self.metrics, "archive").await?;

        log_event_with_fields(
            Event::VersionArchived,
            &[
                ("archived", if archived { "true" } else { "false" }),
                ("version_id", version_id.as_str()),
            ],
        );
        Ok(())
    }

    /// Delete a non-current version
    ///
    /// The current version can never be deleted; promote another version
    /// first. The check is repeated as a batch precondition so a version
    /// promoted after the read is not removed either.
    pub async fn delete(&self, version_id: &VersionId) -> FolioResult<()> {
        let version = self.load_version(version_id).await?;
        if version.is_current {
            return Err(self.reject_delete(
                version_id,
                format!(
                    "version {} is the current version of chapter {}",
                    version_id, version.chapter_id
                ),
            ));
        }

        let mut batch = Batch::new();
        batch
            .delete(Collection::Versions, version_id.as_str())
            .expect_field(Collection::Versions, version_id.as_str(), field::IS_CURRENT, false);

        match commit_batch(self.store.as_ref(), batch, &self.metrics, "delete").await {
            Ok(_) => {}
            Err(FolioError::Conflict(reason)) => {
                // Either promoted or removed since the read
                let gone = self
                    .store
                    .get(Collection::Versions, version_id.as_str())
                    .await?
                    .is_none();
                if gone {
                    return Err(FolioError::not_found(format!("version {}", version_id)));
                }
                return Err(self.reject_delete(version_id, reason));
            }
            Err(err) => return Err(err),
        }

        log_event_with_fields(
            Event::VersionDeleted,
            &[
                ("chapter_id", version.chapter_id.as_str()),
                ("version_id", version_id.as_str()),
            ],
        );
        Ok(())
    }

    fn reject_delete(&self, version_id: &VersionId, reason: String) -> FolioError {
        self.metrics.increment_deletes_rejected();
        log_event_with_fields(
            Event::DeleteRejected,
            &[("reason", reason.as_str()), ("version_id", version_id.as_str())],
        );
        FolioError::InvalidOperation(reason)
    }

    /// Whether a stale chapter revision re-runs the operation
    ///
    /// `LastWriterWins` re-reads and commits again, so the writer that
    /// finishes last decides the outcome. `Optimistic` hands the conflict to
    /// the caller.
    fn rerun_on_conflict(&self, attempt: u32) -> bool {
        self.policy == ConsistencyPolicy::LastWriterWins && attempt < MAX_PINNED_ATTEMPTS
    }
}

/// Attempts of one current-changing operation under `LastWriterWins`
const MAX_PINNED_ATTEMPTS: u32 = 16;

/// Require the chapter to be at the revision the batch was built from
///
/// Every batch that moves currency or numbers a version writes the chapter
/// record too, so two such batches built from the same read cannot both
/// commit.
fn pin(batch: &mut Batch, read: &ChapterRead) {
    batch.expect_revision(Collection::Chapters, read.chapter.id.as_str(), read.revision);
}

fn currency(is_current: bool) -> Fields {
    Fields::from([(field::IS_CURRENT.to_string(), FieldValue::from(is_current))])
}

fn decode_all<T: Record>(docs: &[Document]) -> FolioResult<Vec<T>> {
    docs.iter()
        .map(|doc| T::from_document(doc).map_err(FolioError::from))
        .collect()
}
