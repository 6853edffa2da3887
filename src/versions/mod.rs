//! # Version Store
//!
//! Chapter and version lifecycle operations.
//!
//! Every operation follows the same shape: point reads and queries first,
//! then exactly one atomic batch. Nothing is pushed to observers from here;
//! they see changes through store listeners (see `notify`).
//!
//! ## Single-current invariant
//! Each current-changing batch demotes every version it observed as current,
//! promotes exactly one, and is pinned to the chapter revision read at the
//! start of the operation. Two such batches built from the same read can
//! never both commit, so version numbers stay unique and one version stays
//! current. The policies differ in what a stale pin means: `LastWriterWins`
//! re-runs the operation against fresh reads, `Optimistic` returns
//! `Conflict` to the caller. Only `Optimistic` pins autosaves.

pub(crate) mod commit;
mod store;

pub use store::VersionStore;
