//! # In-Memory Store
//!
//! Reference implementation of [`DocumentStore`].
//!
//! All committed state lives behind one lock. A batch is validated against
//! a staged overlay and only swapped in once every write and precondition
//! has passed, so a failed batch leaves nothing behind. Listener snapshots
//! are produced while the write lock is still held, which keeps them in
//! commit order.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::batch::{Batch, CommitInfo, FieldValue, Fields, Precondition, Write};
use super::document::{Collection, Document};
use super::errors::{StoreError, StoreResult};
use super::query::Query;
use super::{DocumentStore, Listener, ListenerId, QuerySnapshot};

/// Registered live query
#[derive(Debug)]
struct ListenerEntry {
    query: Query,
    sender: mpsc::UnboundedSender<QuerySnapshot>,
}

#[derive(Debug, Default)]
struct StoreState {
    collections: HashMap<Collection, BTreeMap<String, Document>>,
    sequence: u64,
    listeners: HashMap<ListenerId, ListenerEntry>,
}

impl StoreState {
    fn document(&self, collection: Collection, id: &str) -> Option<&Document> {
        self.collections.get(&collection).and_then(|docs| docs.get(id))
    }

    fn evaluate(&self, query: &Query) -> Vec<Document> {
        match self.collections.get(&query.collection) {
            Some(docs) => query.evaluate(docs.values()),
            None => Vec::new(),
        }
    }
}

/// Pending change to one document: (before, after)
type Staged = BTreeMap<(Collection, String), (Option<Document>, Option<Document>)>;

/// In-process document store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
    next_listener: AtomicU64,
    offline: AtomicBool,
    injected_failures: AtomicU32,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the store offline (or back online)
    ///
    /// While offline every request fails with `Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    /// Fail the next `count` requests with `Unavailable`
    pub fn fail_next(&self, count: u32) {
        self.injected_failures.store(count, Ordering::SeqCst);
    }

    /// Number of live listeners
    pub fn listener_count(&self) -> usize {
        self.state.read().map(|s| s.listeners.len()).unwrap_or(0)
    }

    /// Number of documents in a collection
    pub fn document_count(&self, collection: Collection) -> usize {
        self.state
            .read()
            .map(|s| s.collections.get(&collection).map_or(0, |docs| docs.len()))
            .unwrap_or(0)
    }

    /// Latest commit sequence
    pub fn sequence(&self) -> u64 {
        self.state.read().map(|s| s.sequence).unwrap_or(0)
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is offline".into()));
        }

        let injected = self
            .injected_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(StoreError::Unavailable("injected failure".into()));
        }

        Ok(())
    }

    fn poisoned() -> StoreError {
        StoreError::Unavailable("Lock poisoned".into())
    }

    fn check_precondition(state: &StoreState, precondition: &Precondition) -> StoreResult<()> {
        match precondition {
            Precondition::Revision {
                collection,
                id,
                revision,
            } => match state.document(*collection, id) {
                Some(doc) if doc.revision == *revision => Ok(()),
                Some(doc) => Err(StoreError::PreconditionFailed(format!(
                    "{}/{} is at revision {}, expected {}",
                    collection, id, doc.revision, revision
                ))),
                None => Err(StoreError::PreconditionFailed(format!(
                    "{}/{} does not exist",
                    collection, id
                ))),
            },
            Precondition::FieldEquals {
                collection,
                id,
                field,
                value,
            } => match state.document(*collection, id) {
                Some(doc) if doc.get(field) == Some(value) => Ok(()),
                Some(_) => Err(StoreError::PreconditionFailed(format!(
                    "{}/{} field {} is not {}",
                    collection, id, field, value
                ))),
                None => Err(StoreError::PreconditionFailed(format!(
                    "{}/{} does not exist",
                    collection, id
                ))),
            },
        }
    }

    /// Apply every write to an overlay without touching committed state
    fn stage(state: &StoreState, batch: &Batch, commit_time: DateTime<Utc>) -> StoreResult<Staged> {
        let mut staged: Staged = BTreeMap::new();

        for write in batch.writes() {
            let (collection, id) = write.target();
            let key = (collection, id.to_string());
            let current = match staged.get(&key) {
                Some((_, after)) => after.clone(),
                None => state.document(collection, id).cloned(),
            };

            let next = match write {
                Write::Create { fields, .. } => {
                    if current.is_some() {
                        return Err(StoreError::AlreadyExists {
                            collection,
                            id: id.to_string(),
                        });
                    }
                    let mut data = Map::new();
                    apply_fields(&mut data, fields, commit_time)?;
                    Some(Document::new(id, data))
                }
                Write::Update { fields, .. } => {
                    let Some(mut doc) = current else {
                        return Err(StoreError::not_found(collection, id));
                    };
                    apply_fields(&mut doc.data, fields, commit_time)?;
                    Some(doc)
                }
                Write::Delete { .. } => None,
            };

            let before = match staged.remove(&key) {
                Some((before, _)) => before,
                None => state.document(collection, id).cloned(),
            };
            staged.insert(key, (before, next));
        }

        Ok(staged)
    }

    /// Send fresh snapshots to listeners whose result set may have changed
    fn notify(state: &mut StoreState, staged: &Staged) {
        let mut closed = Vec::new();

        for (listener_id, entry) in &state.listeners {
            let affected = staged.iter().any(|((collection, _), (before, after))| {
                *collection == entry.query.collection
                    && (before.as_ref().is_some_and(|d| entry.query.matches(d))
                        || after.as_ref().is_some_and(|d| entry.query.matches(d)))
            });
            if !affected {
                continue;
            }

            let snapshot = QuerySnapshot {
                sequence: state.sequence,
                documents: state.evaluate(&entry.query),
            };
            if entry.sender.send(snapshot).is_err() {
                closed.push(*listener_id);
            }
        }

        for id in closed {
            state.listeners.remove(&id);
        }
    }
}

/// Merge field values into document data
fn apply_fields(
    data: &mut Map<String, Value>,
    fields: &Fields,
    commit_time: DateTime<Utc>,
) -> StoreResult<()> {
    for (field, value) in fields {
        let resolved = match value {
            FieldValue::Value(v) => v.clone(),
            FieldValue::ServerTimestamp => {
                Value::String(commit_time.to_rfc3339_opts(SecondsFormat::Micros, true))
            }
            FieldValue::Increment(delta) => {
                let current = match data.get(field) {
                    None | Some(Value::Null) => 0,
                    Some(v) => v.as_i64().ok_or_else(|| {
                        StoreError::Malformed(format!("cannot increment non-integer field {}", field))
                    })?,
                };
                Value::from(current + delta)
            }
        };
        data.insert(field.clone(), resolved);
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>> {
        self.check_available()?;
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        Ok(state.document(collection, id).cloned())
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        self.check_available()?;
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        Ok(state.evaluate(query))
    }

    async fn commit(&self, batch: Batch) -> StoreResult<CommitInfo> {
        self.check_available()?;
        let mut state = self.state.write().map_err(|_| Self::poisoned())?;
        let commit_time = Utc::now();

        for precondition in batch.preconditions() {
            Self::check_precondition(&state, precondition)?;
        }

        if batch.is_empty() {
            return Ok(CommitInfo {
                sequence: state.sequence,
                commit_time,
            });
        }

        let staged = Self::stage(&state, &batch, commit_time)?;

        state.sequence += 1;
        for ((collection, id), (before, after)) in &staged {
            let docs = state.collections.entry(*collection).or_default();
            match after {
                Some(doc) => {
                    let mut doc = doc.clone();
                    doc.revision = before.as_ref().map_or(1, |b| b.revision + 1);
                    docs.insert(id.clone(), doc);
                }
                None => {
                    docs.remove(id);
                }
            }
        }

        Self::notify(&mut state, &staged);

        Ok(CommitInfo {
            sequence: state.sequence,
            commit_time,
        })
    }

    fn listen(&self, query: Query) -> StoreResult<Listener> {
        self.check_available()?;
        let mut state = self.state.write().map_err(|_| Self::poisoned())?;

        let (sender, snapshots) = mpsc::unbounded_channel();
        let initial = QuerySnapshot {
            sequence: state.sequence,
            documents: state.evaluate(&query),
        };
        // Receiver is still in hand, so this cannot fail
        let _ = sender.send(initial);

        let id = self.next_listener.fetch_add(1, Ordering::SeqCst) + 1;
        state.listeners.insert(id, ListenerEntry { query, sender });

        Ok(Listener { id, snapshots })
    }

    fn unlisten(&self, id: ListenerId) -> bool {
        match self.state.write() {
            Ok(mut state) => state.listeners.remove(&id).is_some(),
            Err(_) => false,
        }
    }
}
