//! Document-store interface
//!
//! The subset of the hosted store's contract the app relies on: live
//! ordered collection subscriptions, document creation with store-assigned
//! ids, and atomic multi-document write batches. Production clients adapt
//! the vendor SDK behind [`DocumentStore`]; [`MemoryStore`] is the
//! in-process implementation backing tests and offline development.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::Result;

mod memory;

pub use memory::MemoryStore;

/// A typed field value stored in a document.
///
/// Variant order matches the store's cross-type sort order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldValue {
    Integer(i64),
    Timestamp(DateTime<Utc>),
    Text(String),
    /// Write-side sentinel replaced with the store's clock at commit;
    /// never present in delivered snapshots
    ServerTimestamp,
}

/// The field map of one document.
pub type Document = BTreeMap<String, FieldValue>;

/// One document plus its id within the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    pub id: String,
    pub fields: Document,
}

/// The full ordered contents of one collection, pushed on every change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CollectionSnapshot {
    pub docs: Vec<DocumentSnapshot>,
}

/// A single write within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Replace the document, creating it when absent
    Set {
        collection: String,
        id: String,
        fields: Document,
    },
    /// Merge fields into an existing document; rejected when it is absent
    Update {
        collection: String,
        id: String,
        fields: Document,
    },
    /// Remove the document; removing an absent document is a no-op
    Delete { collection: String, id: String },
}

/// An ordered group of writes that commits atomically.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    operations: Vec<Operation>,
}

impl WriteBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a full-document write.
    pub fn set(
        &mut self,
        collection: impl Into<String>,
        id: impl Into<String>,
        fields: Document,
    ) -> &mut Self {
        self.operations.push(Operation::Set {
            collection: collection.into(),
            id: id.into(),
            fields,
        });
        self
    }

    /// Queue a field merge into an existing document.
    pub fn update(
        &mut self,
        collection: impl Into<String>,
        id: impl Into<String>,
        fields: Document,
    ) -> &mut Self {
        self.operations.push(Operation::Update {
            collection: collection.into(),
            id: id.into(),
            fields,
        });
        self
    }

    /// Queue a document removal.
    pub fn delete(&mut self, collection: impl Into<String>, id: impl Into<String>) -> &mut Self {
        self.operations.push(Operation::Delete {
            collection: collection.into(),
            id: id.into(),
        });
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Consume the batch into its ordered operations.
    #[must_use]
    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }
}

/// Store contract the synchronization layer runs against.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Open a live feed over `collection`, ordered ascending by the
    /// `order_by` field.
    ///
    /// The receiver starts seeded with the current contents and observes a
    /// full refreshed [`CollectionSnapshot`] after every committed change.
    /// Documents lacking the sort field are not part of the ordered view.
    /// A closed channel means the feed is dead and will not recover.
    async fn subscribe(
        &self,
        collection: &str,
        order_by: &str,
    ) -> Result<watch::Receiver<CollectionSnapshot>>;

    /// Create a document under a store-assigned id, returning the id.
    async fn create(&self, collection: &str, fields: Document) -> Result<String>;

    /// Apply every operation in `batch` atomically: all of them take
    /// effect together or none do.
    async fn commit(&self, batch: WriteBatch) -> Result<()>;
}
