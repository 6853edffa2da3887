//! Store listeners turned into typed subscriptions.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::NotifierConfig;
use crate::error::FolioResult;
use crate::model::{chapters_of, versions_of, Chapter, ChapterId, Record, Version};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::store::{Document, DocumentStore, Query, QuerySnapshot};

use super::subscription::{Cancellation, Snapshot, Subscription};

/// Opens subscriptions over a document store
pub struct ChangeNotifier<S: DocumentStore + 'static> {
    store: Arc<S>,
    capacity: usize,
    metrics: Arc<MetricsRegistry>,
}

impl<S: DocumentStore + 'static> ChangeNotifier<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, &NotifierConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: &NotifierConfig) -> Self {
        Self {
            store,
            capacity: config.channel_capacity.max(1),
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    /// Share a metrics registry with other components
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Observe an owner's chapters, ascending by chapter number
    ///
    /// Must be called from within a Tokio runtime.
    pub fn watch_chapters(&self, owner_id: &str) -> FolioResult<Subscription<Chapter>> {
        self.watch(chapters_of(owner_id), format!("chapters:{}", owner_id))
    }

    /// Observe a chapter's versions, descending by version number
    ///
    /// Must be called from within a Tokio runtime.
    pub fn watch_versions(&self, chapter_id: &ChapterId) -> FolioResult<Subscription<Version>> {
        self.watch(versions_of(chapter_id), format!("versions:{}", chapter_id))
    }

    fn watch<T: Record>(&self, query: Query, label: String) -> FolioResult<Subscription<T>> {
        let listener = self.store.listen(query)?;
        let listener_id = listener.id;

        let (sender, receiver) = mpsc::channel(self.capacity);
        let task = tokio::spawn(forward(
            listener.snapshots,
            sender,
            Arc::clone(&self.metrics),
            label.clone(),
        ));

        let store = Arc::clone(&self.store);
        let release = Box::new(move || {
            store.unlisten(listener_id);
        });

        self.metrics.increment_subscriptions_opened();
        log_event_with_fields(Event::SubscriptionOpened, &[("subscription", label.as_str())]);

        Ok(Subscription::new(
            receiver,
            Cancellation::new(release, task, Arc::clone(&self.metrics), label),
        ))
    }
}

/// Decode and relay store snapshots until either side goes away
///
/// The store queue is drained as fast as it fills. When the observer's
/// channel is full, at most one snapshot waits here and a newer one replaces
/// it: each snapshot is a full result set, so only the latest matters.
async fn forward<T: Record>(
    mut snapshots: mpsc::UnboundedReceiver<QuerySnapshot>,
    sender: mpsc::Sender<Snapshot<T>>,
    metrics: Arc<MetricsRegistry>,
    label: String,
) {
    let mut last_sequence: Option<u64> = None;
    let mut pending: Option<Snapshot<T>> = None;

    loop {
        tokio::select! {
            // Deliver before accepting more so a keeping-up observer sees every commit
            biased;

            permit = sender.reserve(), if pending.is_some() => {
                let Ok(permit) = permit else { break };
                if let Some(snapshot) = pending.take() {
                    permit.send(snapshot);
                    metrics.increment_snapshots_delivered();
                }
            }

            received = snapshots.recv() => {
                let Some(snapshot) = received else { break };

                if let Some(last) = last_sequence {
                    if snapshot.sequence <= last {
                        metrics.increment_snapshots_dropped();
                        let sequence = snapshot.sequence.to_string();
                        let last = last.to_string();
                        log_event_with_fields(
                            Event::StaleSnapshotDropped,
                            &[
                                ("last", last.as_str()),
                                ("sequence", sequence.as_str()),
                                ("subscription", label.as_str()),
                            ],
                        );
                        continue;
                    }
                }
                last_sequence = Some(snapshot.sequence);

                let typed = Snapshot {
                    sequence: snapshot.sequence,
                    records: decode(&snapshot.documents, &label),
                };
                if let Some(superseded) = pending.replace(typed) {
                    metrics.increment_snapshots_dropped();
                    let sequence = superseded.sequence.to_string();
                    log_event_with_fields(
                        Event::SnapshotSuperseded,
                        &[("sequence", sequence.as_str()), ("subscription", label.as_str())],
                    );
                }
            }
        }
    }
}

fn decode<T: Record>(documents: &[Document], label: &str) -> Vec<T> {
    documents
        .iter()
        .filter_map(|doc| match T::from_document(doc) {
            Ok(record) => Some(record),
            Err(err) => {
                let message = err.to_string();
                log_event_with_fields(
                    Event::RecordSkipped,
                    &[
                        ("error", message.as_str()),
                        ("id", doc.id.as_str()),
                        ("subscription", label),
                    ],
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{fields_of, Collection, MemoryStore};
    use crate::versions::VersionStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_initial_snapshot_delivered() {
        let store = Arc::new(MemoryStore::new());
        let versions = VersionStore::new(Arc::clone(&store));
        versions.create_chapter("u1", 1, "Intro").await.unwrap();

        let notifier = ChangeNotifier::new(Arc::clone(&store));
        let mut sub = notifier.watch_chapters("u1").unwrap();

        let snapshot = sub.next().await.unwrap();
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.records[0].title, "Intro");
    }

    #[tokio::test]
    async fn test_malformed_record_skipped() {
        let store = Arc::new(MemoryStore::new());
        let versions = VersionStore::new(Arc::clone(&store));
        versions.create_chapter("u1", 1, "Intro").await.unwrap();

        // Matches the query but lacks required fields
        let broken = fields_of(&json!({"ownerId": "u1", "chapterNumber": 2})).unwrap();
        store.create(Collection::Chapters, broken).await.unwrap();

        let notifier = ChangeNotifier::new(Arc::clone(&store));
        let mut sub = notifier.watch_chapters("u1").unwrap();

        let snapshot = sub.next().await.unwrap();
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.records[0].chapter_number, 1);
    }

    #[tokio::test]
    async fn test_cancel_releases_listener() {
        let store = Arc::new(MemoryStore::new());
        let notifier = ChangeNotifier::new(Arc::clone(&store));

        let mut sub = notifier.watch_chapters("u1").unwrap();
        assert_eq!(store.listener_count(), 1);

        assert!(sub.cancel());
        assert!(!sub.cancel());
        assert_eq!(store.listener_count(), 0);
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_drop_cancels() {
        let store = Arc::new(MemoryStore::new());
        let metrics = Arc::new(MetricsRegistry::new());
        let notifier = ChangeNotifier::new(Arc::clone(&store)).with_metrics(Arc::clone(&metrics));

        {
            let _sub = notifier.watch_versions(&ChapterId::from("c1")).unwrap();
            assert_eq!(metrics.active_subscriptions(), 1);
        }

        assert_eq!(store.listener_count(), 0);
        assert_eq!(metrics.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_cancel_handle_from_other_task() {
        let store = Arc::new(MemoryStore::new());
        let notifier = ChangeNotifier::new(Arc::clone(&store));
        let mut sub = notifier.watch_chapters("u1").unwrap();
        let handle = sub.cancel_handle();

        // Drain the initial snapshot
        sub.next().await.unwrap();

        let canceller = tokio::spawn(async move { handle.cancel() });
        assert!(canceller.await.unwrap());

        assert!(sub.is_cancelled());
        assert!(sub.next().await.is_none());
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_lagging_observer_gets_latest_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let metrics = Arc::new(MetricsRegistry::new());
        let versions = VersionStore::new(Arc::clone(&store));
        let chapter_id = versions.create_chapter("u1", 1, "Intro").await.unwrap();

        let notifier = ChangeNotifier::with_config(
            Arc::clone(&store),
            &NotifierConfig { channel_capacity: 1 },
        )
        .with_metrics(Arc::clone(&metrics));
        let mut sub = notifier.watch_chapters("u1").unwrap();

        for words in 1..=20u64 {
            versions
                .save_content(&chapter_id, "u1", "typing", words, false)
                .await
                .unwrap();
        }
        // Let the forwarder drain the store queue while nobody reads
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let initial = sub.next().await.unwrap();
        assert_eq!(initial.records[0].word_count, 0);

        let latest = sub.next().await.unwrap();
        assert_eq!(latest.records[0].word_count, 20);
        assert!(sub.try_next().is_none());

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.snapshots_dropped, 19);
    }
}
