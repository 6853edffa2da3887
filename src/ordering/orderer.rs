//! Batch renumbering of chapters.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{FolioError, FolioResult};
use crate::model::{field, ChapterId};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::store::{Batch, Collection, DocumentStore, FieldValue, Fields};
use crate::versions::commit::commit_batch;

/// Assigns chapter numbers from a caller-supplied order
pub struct ChapterOrderer<S: DocumentStore> {
    store: Arc<S>,
    metrics: Arc<MetricsRegistry>,
}

impl<S: DocumentStore> ChapterOrderer<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    /// Share a metrics registry with other components
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Give each chapter the number of its position in `order`, from 1
    ///
    /// An empty order is a no-op. Chapters not listed keep their numbers;
    /// the caller supplies the owner's full list to keep numbers unique.
    /// Unknown ids fail the whole batch with `NotFound`.
    pub async fn reorder(&self, order: &[ChapterId]) -> FolioResult<()> {
        if order.is_empty() {
            return Ok(());
        }

        let mut seen = HashSet::with_capacity(order.len());
        if let Some(dup) = order.iter().find(|id| !seen.insert(*id)) {
            return Err(FolioError::invalid(format!(
                "chapter {} appears more than once in the new order",
                dup
            )));
        }

        let mut batch = Batch::new();
        for (position, chapter_id) in order.iter().enumerate() {
            let fields = Fields::from([
                (
                    field::CHAPTER_NUMBER.to_string(),
                    FieldValue::from(position as u64 + 1),
                ),
                (field::LAST_EDITED.to_string(), FieldValue::ServerTimestamp),
            ]);
            batch.update(Collection::Chapters, chapter_id.as_str(), fields);
        }
        commit_batch(self.store.as_ref(), batch, &self.metrics, "reorder").await?;

        let count = order.len().to_string();
        log_event_with_fields(Event::ChaptersReordered, &[("chapters", count.as_str())]);
        Ok(())
    }
}
