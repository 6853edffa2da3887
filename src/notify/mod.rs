//! # Change Notification
//!
//! Live, typed views of an owner's chapters and a chapter's versions.
//!
//! Each subscription delivers the full result set after every relevant
//! commit, in commit order. Snapshots older than one already delivered are
//! discarded, and records that fail to decode are skipped rather than
//! ending the stream. An observer that stops reading holds at most its
//! channel capacity plus one pending snapshot; newer snapshots replace the
//! pending one.
//!
//! Cancelling a subscription (explicitly, through a [`CancelHandle`], or by
//! dropping it) removes the store listener and stops the forwarding task.
//! No snapshot is delivered after cancellation.

mod notifier;
mod subscription;

pub use notifier::ChangeNotifier;
pub use subscription::{CancelHandle, Snapshot, Subscription};
