//! folio - chapter and version consistency engine
//!
//! Keeps a chapter's versions consistent on top of a document store:
//! exactly one current version per chapter at rest, strictly increasing
//! version numbers, atomic multi-record updates and ordered change
//! notification.
//!
//! - `versions` - chapter and version lifecycle
//! - `ordering` - atomic chapter renumbering
//! - `notify` - live subscriptions
//! - `store` - the document store contract and an in-memory implementation

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod observability;
pub mod ordering;
pub mod store;
pub mod versions;

pub use config::{ConsistencyPolicy, FolioConfig};
pub use error::{FolioError, FolioResult};
pub use model::{Chapter, ChapterId, ChapterStatus, Version, VersionId, VersionType};
pub use notify::{ChangeNotifier, Snapshot, Subscription};
pub use ordering::ChapterOrderer;
pub use store::{DocumentStore, MemoryStore};
pub use versions::VersionStore;
