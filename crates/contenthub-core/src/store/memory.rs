//! In-memory document store

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::error::{Error, Result};

use super::{
    CollectionSnapshot, Document, DocumentSnapshot, DocumentStore, FieldValue, Operation,
    WriteBatch,
};

/// In-process [`DocumentStore`] with the same observable contract as the
/// hosted backend. Backs tests and offline development.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Document>>,
    feeds: Vec<Feed>,
    disconnected: bool,
    writes: u64,
}

struct Feed {
    collection: String,
    order_by: String,
    sender: watch::Sender<CollectionSnapshot>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document under a caller-chosen id, notifying feeds.
    /// Primarily for seeding test fixtures.
    pub async fn insert(&self, collection: &str, id: &str, fields: Document) {
        let mut inner = self.inner.lock().await;
        let resolved = resolve_timestamps(fields, Utc::now());
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), resolved);
        inner.notify(collection);
    }

    /// Current contents of `collection` ordered by `order_by`.
    pub async fn snapshot(&self, collection: &str, order_by: &str) -> CollectionSnapshot {
        let inner = self.inner.lock().await;
        inner.snapshot(collection, order_by)
    }

    /// Number of writes accepted through the [`DocumentStore`] surface
    /// (creates plus committed batches). Seeding via [`Self::insert`] does
    /// not count.
    pub async fn write_count(&self) -> u64 {
        self.inner.lock().await.writes
    }

    /// Drop every live feed and reject all further traffic, simulating a
    /// lost connection to the backend.
    pub async fn disconnect(&self) {
        let mut inner = self.inner.lock().await;
        inner.disconnected = true;
        inner.feeds.clear();
        tracing::debug!("Memory store disconnected; all feeds closed");
    }
}

impl Inner {
    fn snapshot(&self, collection: &str, order_by: &str) -> CollectionSnapshot {
        let mut docs: Vec<DocumentSnapshot> = self
            .collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|(_, fields)| fields.contains_key(order_by))
                    .map(|(id, fields)| DocumentSnapshot {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        docs.sort_by(|a, b| {
            let left = a.fields.get(order_by);
            let right = b.fields.get(order_by);
            left.cmp(&right).then_with(|| a.id.cmp(&b.id))
        });

        CollectionSnapshot { docs }
    }

    fn notify(&mut self, collection: &str) {
        self.feeds.retain(|feed| !feed.sender.is_closed());
        for feed in &self.feeds {
            if feed.collection == collection {
                let snapshot = self.snapshot(&feed.collection, &feed.order_by);
                feed.sender.send_replace(snapshot);
            }
        }
    }

    fn apply(&mut self, operation: Operation, now: DateTime<Utc>) {
        match operation {
            Operation::Set {
                collection,
                id,
                fields,
            } => {
                let resolved = resolve_timestamps(fields, now);
                self.collections
                    .entry(collection)
                    .or_default()
                    .insert(id, resolved);
            }
            Operation::Update {
                collection,
                id,
                fields,
            } => {
                let resolved = resolve_timestamps(fields, now);
                if let Some(existing) = self
                    .collections
                    .get_mut(&collection)
                    .and_then(|documents| documents.get_mut(&id))
                {
                    existing.extend(resolved);
                }
            }
            Operation::Delete { collection, id } => {
                if let Some(documents) = self.collections.get_mut(&collection) {
                    documents.remove(&id);
                }
            }
        }
    }
}

/// Replace [`FieldValue::ServerTimestamp`] sentinels with the commit time.
fn resolve_timestamps(fields: Document, now: DateTime<Utc>) -> Document {
    fields
        .into_iter()
        .map(|(name, value)| {
            let value = if value == FieldValue::ServerTimestamp {
                FieldValue::Timestamp(now)
            } else {
                value
            };
            (name, value)
        })
        .collect()
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn subscribe(
        &self,
        collection: &str,
        order_by: &str,
    ) -> Result<watch::Receiver<CollectionSnapshot>> {
        let mut inner = self.inner.lock().await;
        if inner.disconnected {
            return Err(Error::Subscription(collection.to_string()));
        }

        let (sender, receiver) = watch::channel(inner.snapshot(collection, order_by));
        inner.feeds.push(Feed {
            collection: collection.to_string(),
            order_by: order_by.to_string(),
            sender,
        });
        tracing::debug!("Opened feed over '{collection}' ordered by '{order_by}'");
        Ok(receiver)
    }

    async fn create(&self, collection: &str, fields: Document) -> Result<String> {
        let mut inner = self.inner.lock().await;
        if inner.disconnected {
            return Err(Error::RemoteWrite(format!(
                "store unreachable while writing to '{collection}'"
            )));
        }

        let id = Uuid::now_v7().to_string();
        let resolved = resolve_timestamps(fields, Utc::now());
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), resolved);
        inner.writes += 1;
        inner.notify(collection);
        tracing::debug!("Created document '{id}' in '{collection}'");
        Ok(id)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        let operations = batch.into_operations();
        let mut inner = self.inner.lock().await;
        if inner.disconnected {
            return Err(Error::RemoteWrite("store unreachable".to_string()));
        }

        // Validate against the pre-batch state so a bad operation rejects
        // the whole batch before anything is applied.
        for operation in &operations {
            if let Operation::Update { collection, id, .. } = operation {
                let exists = inner
                    .collections
                    .get(collection)
                    .is_some_and(|documents| documents.contains_key(id));
                if !exists {
                    return Err(Error::RemoteWrite(format!(
                        "no document to update at '{collection}/{id}'"
                    )));
                }
            }
        }

        let now = Utc::now();
        let mut touched: Vec<String> = Vec::new();
        for operation in operations {
            let collection = match &operation {
                Operation::Set { collection, .. }
                | Operation::Update { collection, .. }
                | Operation::Delete { collection, .. } => collection.clone(),
            };
            if !touched.contains(&collection) {
                touched.push(collection);
            }
            inner.apply(operation, now);
        }
        inner.writes += 1;

        tracing::debug!("Committed batch touching {} collection(s)", touched.len());
        for collection in touched {
            inner.notify(&collection);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(pairs: &[(&str, FieldValue)]) -> Document {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.clone()))
            .collect()
    }

    fn ordered(order: i64) -> Document {
        doc(&[("order", FieldValue::Integer(order))])
    }

    fn snapshot_ids(snapshot: &CollectionSnapshot) -> Vec<&str> {
        snapshot.docs.iter().map(|doc| doc.id.as_str()).collect()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn subscribe_seeds_current_contents() {
        let store = MemoryStore::new();
        store.insert("boards/ideas/cards", "a", ordered(0)).await;

        let receiver = store.subscribe("boards/ideas/cards", "order").await.unwrap();
        assert_eq!(snapshot_ids(&receiver.borrow()), vec!["a"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_notifies_feeds_and_resolves_server_timestamps() {
        let store = MemoryStore::new();
        let mut receiver = store.subscribe("boards/ideas/cards", "order").await.unwrap();

        let id = store
            .create(
                "boards/ideas/cards",
                doc(&[
                    ("order", FieldValue::Integer(0)),
                    ("createdAt", FieldValue::ServerTimestamp),
                ]),
            )
            .await
            .unwrap();

        assert!(receiver.has_changed().unwrap());
        let snapshot = receiver.borrow_and_update().clone();
        assert_eq!(snapshot_ids(&snapshot), vec![id.as_str()]);
        assert!(matches!(
            snapshot.docs[0].fields.get("createdAt"),
            Some(FieldValue::Timestamp(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn snapshots_sort_by_field_then_id() {
        let store = MemoryStore::new();
        store.insert("c", "b", ordered(1)).await;
        store.insert("c", "a", ordered(1)).await;
        store.insert("c", "z", ordered(0)).await;

        let snapshot = store.snapshot("c", "order").await;
        assert_eq!(snapshot_ids(&snapshot), vec!["z", "a", "b"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn documents_without_the_sort_field_are_omitted() {
        let store = MemoryStore::new();
        store.insert("c", "kept", ordered(0)).await;
        store
            .insert("c", "skipped", doc(&[("content", FieldValue::Text("x".into()))]))
            .await;

        let snapshot = store.snapshot("c", "order").await;
        assert_eq!(snapshot_ids(&snapshot), vec!["kept"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_merges_into_existing_fields() {
        let store = MemoryStore::new();
        store
            .insert(
                "c",
                "a",
                doc(&[
                    ("order", FieldValue::Integer(0)),
                    ("content", FieldValue::Text("<p>old</p>".into())),
                ]),
            )
            .await;

        let mut batch = WriteBatch::new();
        batch.update("c", "a", doc(&[("content", FieldValue::Text("<p>new</p>".into()))]));
        store.commit(batch).await.unwrap();

        let snapshot = store.snapshot("c", "order").await;
        assert_eq!(
            snapshot.docs[0].fields.get("content"),
            Some(&FieldValue::Text("<p>new</p>".into()))
        );
        assert_eq!(
            snapshot.docs[0].fields.get("order"),
            Some(&FieldValue::Integer(0))
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_batch_applies_nothing() {
        let store = MemoryStore::new();
        store.insert("c", "a", ordered(0)).await;

        let mut batch = WriteBatch::new();
        batch.update("c", "a", ordered(5));
        batch.update("c", "ghost", ordered(1));
        let error = store.commit(batch).await.unwrap_err();
        assert!(matches!(error, Error::RemoteWrite(_)));

        let snapshot = store.snapshot("c", "order").await;
        assert_eq!(
            snapshot.docs[0].fields.get("order"),
            Some(&FieldValue::Integer(0))
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn deleting_an_absent_document_is_a_noop() {
        let store = MemoryStore::new();
        store.insert("c", "a", ordered(0)).await;

        let mut batch = WriteBatch::new();
        batch.delete("c", "ghost");
        store.commit(batch).await.unwrap();

        assert_eq!(snapshot_ids(&store.snapshot("c", "order").await), vec!["a"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn write_count_tracks_creates_and_commits_only() {
        let store = MemoryStore::new();
        store.insert("c", "a", ordered(0)).await;
        assert_eq!(store.write_count().await, 0);

        store.create("c", ordered(1)).await.unwrap();
        let mut batch = WriteBatch::new();
        batch.delete("c", "a");
        store.commit(batch).await.unwrap();
        assert_eq!(store.write_count().await, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn disconnect_closes_feeds_and_rejects_new_ones() {
        let store = MemoryStore::new();
        let mut receiver = store.subscribe("c", "order").await.unwrap();

        store.disconnect().await;

        assert!(receiver.changed().await.is_err());
        assert!(store.subscribe("c", "order").await.is_err());
        assert!(store.create("c", ordered(0)).await.is_err());
    }
}
