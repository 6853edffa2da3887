//! Metrics registry
//!
//! Counters only. Relaxed ordering: values are exact once writers are quiet,
//! which is all the registry promises.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    batches_committed: AtomicU64,
    batches_failed: AtomicU64,
    conflicts: AtomicU64,
    chapters_created: AtomicU64,
    versions_created: AtomicU64,
    autosaves: AtomicU64,
    promotions: AtomicU64,
    deletes_rejected: AtomicU64,
    subscriptions_opened: AtomicU64,
    subscriptions_closed: AtomicU64,
    snapshots_delivered: AtomicU64,
    snapshots_dropped: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_batches_committed(&self) {
        self.batches_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_batches_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_conflicts(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_chapters_created(&self) {
        self.chapters_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_versions_created(&self) {
        self.versions_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_autosaves(&self) {
        self.autosaves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_promotions(&self) {
        self.promotions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deletes_rejected(&self) {
        self.deletes_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_subscriptions_opened(&self) {
        self.subscriptions_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_subscriptions_closed(&self) {
        self.subscriptions_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_snapshots_delivered(&self) {
        self.snapshots_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_snapshots_dropped(&self) {
        self.snapshots_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Subscriptions opened and not yet closed
    pub fn active_subscriptions(&self) -> u64 {
        let opened = self.subscriptions_opened.load(Ordering::Relaxed);
        let closed = self.subscriptions_closed.load(Ordering::Relaxed);
        opened.saturating_sub(closed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_committed: self.batches_committed.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            chapters_created: self.chapters_created.load(Ordering::Relaxed),
            versions_created: self.versions_created.load(Ordering::Relaxed),
            autosaves: self.autosaves.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
            deletes_rejected: self.deletes_rejected.load(Ordering::Relaxed),
            subscriptions_opened: self.subscriptions_opened.load(Ordering::Relaxed),
            subscriptions_closed: self.subscriptions_closed.load(Ordering::Relaxed),
            snapshots_delivered: self.snapshots_delivered.load(Ordering::Relaxed),
            snapshots_dropped: self.snapshots_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of every counter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub batches_committed: u64,
    pub batches_failed: u64,
    pub conflicts: u64,
    pub chapters_created: u64,
    pub versions_created: u64,
    pub autosaves: u64,
    pub promotions: u64,
    pub deletes_rejected: u64,
    pub subscriptions_opened: u64,
    pub subscriptions_closed: u64,
    pub snapshots_delivered: u64,
    pub snapshots_dropped: u64,
}
