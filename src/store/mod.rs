//! # Document Store Contract
//!
//! The consistency layer runs against a document store holding two
//! collections, `chapters` and `versions`. The store is an external
//! collaborator; this module fixes the contract it must satisfy.
//!
//! ## Guarantees required from an implementation
//!
//! - **Point reads and equality queries** with a single ordering field.
//! - **Atomic batches**: every write in a [`Batch`] applies, or none does.
//!   No reader ever observes a partially applied batch.
//! - **Preconditions** are checked against committed state inside the same
//!   atomic step as the writes.
//! - **Server timestamps and ids**: `ServerTimestamp` fields receive the
//!   commit time; `generate_id` hands out opaque unique ids.
//! - **Live listeners**: a listener receives the full result set of its
//!   query immediately and again after every commit that touches a matching
//!   document, in commit order.
//!
//! [`MemoryStore`] is an in-process implementation of the contract.

mod batch;
mod document;
mod errors;
mod memory;
mod query;

pub use batch::{fields_of, Batch, CommitInfo, FieldValue, Fields, Precondition, Write};
pub use document::{Collection, Document};
pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use query::{Direction, Filter, OrderBy, Query};

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Identifies a registered listener
pub type ListenerId = u64;

/// Full result set of a listened query at one commit
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySnapshot {
    /// Commit sequence the result set reflects
    pub sequence: u64,
    /// Matching documents in query order
    pub documents: Vec<Document>,
}

/// A registered live query
#[derive(Debug)]
pub struct Listener {
    /// Id to pass to [`DocumentStore::unlisten`]
    pub id: ListenerId,
    /// Snapshots in commit order; closes once the listener is removed
    pub snapshots: mpsc::UnboundedReceiver<QuerySnapshot>,
}

/// Document store consumed by the consistency layer
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Hand out a fresh document id
    fn generate_id(&self) -> String;

    /// Point read
    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>>;

    /// Filtered query
    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>>;

    /// Commit a batch atomically
    async fn commit(&self, batch: Batch) -> StoreResult<CommitInfo>;

    /// Register a live query
    fn listen(&self, query: Query) -> StoreResult<Listener>;

    /// Remove a live query, releasing its resources
    ///
    /// Returns false if the listener was already gone.
    fn unlisten(&self, id: ListenerId) -> bool;

    /// Create a single document under a store-assigned id
    async fn create(&self, collection: Collection, fields: Fields) -> StoreResult<String> {
        let id = self.generate_id();
        let mut batch = Batch::new();
        batch.create(collection, id.clone(), fields);
        self.commit(batch).await?;
        Ok(id)
    }

    /// Update a single document
    async fn update(&self, collection: Collection, id: &str, fields: Fields) -> StoreResult<CommitInfo> {
        let mut batch = Batch::new();
        batch.update(collection, id, fields);
        self.commit(batch).await
    }

    /// Delete a single document
    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<CommitInfo> {
        let mut batch = Batch::new();
        batch.delete(collection, id);
        self.commit(batch).await
    }
}
