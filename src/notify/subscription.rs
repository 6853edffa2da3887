//! Subscription handles.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::observability::{log_event_with_fields, Event, MetricsRegistry};

/// Result set of a subscription at one commit
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    /// Store commit sequence the records reflect
    pub sequence: u64,
    /// Decoded records in query order
    pub records: Vec<T>,
}

/// Shared teardown state of one subscription
pub(crate) struct Cancellation {
    cancelled: AtomicBool,
    release: Box<dyn Fn() + Send + Sync>,
    task: Mutex<Option<JoinHandle<()>>>,
    metrics: Arc<MetricsRegistry>,
    label: String,
}

impl Cancellation {
    pub(crate) fn new(
        release: Box<dyn Fn() + Send + Sync>,
        task: JoinHandle<()>,
        metrics: Arc<MetricsRegistry>,
        label: String,
    ) -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            release,
            task: Mutex::new(Some(task)),
            metrics,
            label,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Tear down once; later calls return false
    fn cancel(&self) -> bool {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return false;
        }

        (self.release)();
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }

        self.metrics.increment_subscriptions_closed();
        log_event_with_fields(Event::SubscriptionClosed, &[("subscription", self.label.as_str())]);
        true
    }
}

/// Cancels a subscription from elsewhere
#[derive(Clone)]
pub struct CancelHandle {
    inner: Arc<Cancellation>,
}

impl CancelHandle {
    /// Cancel the subscription; returns false if it was already cancelled
    pub fn cancel(&self) -> bool {
        self.inner.cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("label", &self.inner.label)
            .field("cancelled", &self.inner.is_cancelled())
            .finish()
    }
}

/// A live stream of typed snapshots
///
/// Dropping the subscription cancels it.
pub struct Subscription<T> {
    receiver: mpsc::Receiver<Snapshot<T>>,
    cancellation: Arc<Cancellation>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(receiver: mpsc::Receiver<Snapshot<T>>, cancellation: Cancellation) -> Self {
        Self {
            receiver,
            cancellation: Arc::new(cancellation),
        }
    }

    /// Wait for the next snapshot
    ///
    /// Returns `None` once the subscription is cancelled or the store
    /// listener has gone away.
    pub async fn next(&mut self) -> Option<Snapshot<T>> {
        if self.cancellation.is_cancelled() {
            return None;
        }
        let snapshot = self.receiver.recv().await?;
        // Cancelled while waiting
        if self.cancellation.is_cancelled() {
            return None;
        }
        Some(snapshot)
    }

    /// Take a buffered snapshot without waiting
    pub fn try_next(&mut self) -> Option<Snapshot<T>> {
        if self.cancellation.is_cancelled() {
            return None;
        }
        self.receiver.try_recv().ok()
    }

    /// Stop delivery and release the store listener
    ///
    /// Idempotent; returns true only for the call that actually cancelled.
    pub fn cancel(&self) -> bool {
        self.cancellation.cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Handle that can cancel this subscription from another task
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            inner: Arc::clone(&self.cancellation),
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("label", &self.cancellation.label)
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish()
    }
}
