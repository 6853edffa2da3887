//! Shared test fixtures.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use folio::store::{
    Batch, Collection, CommitInfo, Document, DocumentStore, Listener, ListenerId, MemoryStore,
    Query, StoreResult,
};

/// `MemoryStore` that pauses after every read
///
/// Concurrent operations all finish their reads before any of them
/// commits, which is the interleaving that exposes read-then-write races.
pub struct SlowReads {
    pub inner: Arc<MemoryStore>,
    delay: Duration,
}

impl SlowReads {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: Arc::new(MemoryStore::new()),
            delay,
        }
    }
}

#[async_trait]
impl DocumentStore for SlowReads {
    fn generate_id(&self) -> String {
        self.inner.generate_id()
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>> {
        let doc = self.inner.get(collection, id).await;
        tokio::time::sleep(self.delay).await;
        doc
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let docs = self.inner.query(query).await;
        tokio::time::sleep(self.delay).await;
        docs
    }

    async fn commit(&self, batch: Batch) -> StoreResult<CommitInfo> {
        self.inner.commit(batch).await
    }

    fn listen(&self, query: Query) -> StoreResult<Listener> {
        self.inner.listen(query)
    }

    fn unlisten(&self, id: ListenerId) -> bool {
        self.inner.unlisten(id)
    }
}
