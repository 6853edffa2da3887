//! Batch commit with failure accounting.

use crate::error::{FolioError, FolioResult};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::store::{Batch, CommitInfo, DocumentStore, StoreError};

/// Commit a batch, recording the outcome
///
/// Store failures are surfaced unchanged (converted to `FolioError`); a
/// failed batch is never retried here.
pub(crate) async fn commit_batch<S>(
    store: &S,
    batch: Batch,
    metrics: &MetricsRegistry,
    operation: &str,
) -> FolioResult<CommitInfo>
where
    S: DocumentStore + ?Sized,
{
    let writes = batch.len().to_string();

    match store.commit(batch).await {
        Ok(info) => {
            metrics.increment_batches_committed();
            Ok(info)
        }
        Err(err) => {
            let message = err.to_string();
            let event = if matches!(err, StoreError::PreconditionFailed(_)) {
                metrics.increment_conflicts();
                Event::BatchConflict
            } else {
                metrics.increment_batches_failed();
                Event::BatchFailed
            };
            log_event_with_fields(
                event,
                &[
                    ("error", message.as_str()),
                    ("operation", operation),
                    ("writes", writes.as_str()),
                ],
            );
            Err(FolioError::from(err))
        }
    }
}
