//! Observable events
//!
//! Every lifecycle transition the consistency layer performs has a named
//! event. Event names are stable, upper snake case.

use std::fmt;

use super::logger::Severity;

/// Observable events in Folio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded from disk
    ConfigLoaded,

    // Chapter lifecycle
    /// Chapter and its first version committed
    ChapterCreated,
    /// Title, status or annotation changed
    ChapterUpdated,
    /// Chapters renumbered
    ChaptersReordered,

    // Version lifecycle
    /// Current version content replaced in place
    ContentAutosaved,
    /// New version committed and made current
    VersionCreated,
    /// A different version promoted to current
    CurrentChanged,
    /// Archive flag changed
    VersionArchived,
    /// Non-current version removed
    VersionDeleted,
    /// Attempt to delete the current version refused
    DeleteRejected,
    /// More than one current version observed
    ConcurrentCurrentDetected,

    // Store interaction
    /// Batch rejected or store unreachable
    BatchFailed,
    /// Optimistic token was stale
    BatchConflict,

    // Subscriptions
    /// Observer registered
    SubscriptionOpened,
    /// Observer cancelled or dropped
    SubscriptionClosed,
    /// Snapshot older than one already delivered was discarded
    StaleSnapshotDropped,
    /// Undelivered snapshot replaced by a newer one for a lagging observer
    SnapshotSuperseded,
    /// Stored record failed to decode and was skipped
    RecordSkipped,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::ChapterCreated => "CHAPTER_CREATED",
            Event::ChapterUpdated => "CHAPTER_UPDATED",
            Event::ChaptersReordered => "CHAPTERS_REORDERED",

            Event::ContentAutosaved => "CONTENT_AUTOSAVED",
            Event::VersionCreated => "VERSION_CREATED",
            Event::CurrentChanged => "CURRENT_CHANGED",
            Event::VersionArchived => "VERSION_ARCHIVED",
            Event::VersionDeleted => "VERSION_DELETED",
            Event::DeleteRejected => "DELETE_REJECTED",
            Event::ConcurrentCurrentDetected => "CONCURRENT_CURRENT_DETECTED",

            Event::BatchFailed => "BATCH_FAILED",
            Event::BatchConflict => "BATCH_CONFLICT",

            Event::SubscriptionOpened => "SUBSCRIPTION_OPENED",
            Event::SubscriptionClosed => "SUBSCRIPTION_CLOSED",
            Event::StaleSnapshotDropped => "STALE_SNAPSHOT_DROPPED",
            Event::SnapshotSuperseded => "SNAPSHOT_SUPERSEDED",
            Event::RecordSkipped => "RECORD_SKIPPED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::ContentAutosaved
            | Event::SubscriptionOpened
            | Event::SubscriptionClosed
            | Event::StaleSnapshotDropped
            | Event::SnapshotSuperseded => Severity::Trace,
            Event::DeleteRejected
            | Event::ConcurrentCurrentDetected
            | Event::BatchConflict
            | Event::RecordSkipped => Severity::Warn,
            Event::BatchFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_upper_snake_case() {
        let events = [
            Event::ConfigLoaded,
            Event::ChapterCreated,
            Event::ChapterUpdated,
            Event::ChaptersReordered,
            Event::ContentAutosaved,
            Event::VersionCreated,
            Event::CurrentChanged,
            Event::VersionArchived,
            Event::VersionDeleted,
            Event::DeleteRejected,
            Event::ConcurrentCurrentDetected,
            Event::BatchFailed,
            Event::BatchConflict,
            Event::SubscriptionOpened,
            Event::SubscriptionClosed,
            Event::StaleSnapshotDropped,
            Event::SnapshotSuperseded,
            Event::RecordSkipped,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_event_severity() {
        assert_eq!(Event::BatchFailed.severity(), Severity::Error);
        assert_eq!(Event::DeleteRejected.severity(), Severity::Warn);
        assert_eq!(Event::VersionCreated.severity(), Severity::Info);
        assert_eq!(Event::ContentAutosaved.severity(), Severity::Trace);
    }
}
