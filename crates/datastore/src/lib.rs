use async_trait::async_trait;
use domain::{Collection, Document, Timestamp};
use serde_json::Value;
use std::fmt;

mod error;
mod memory;
mod mongo;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use mongo::MongoStore;

/// Equality match on a single top-level field
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Modification applied by [`DocumentStore::update_one`]
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Overwrite the given fields, leaving every other field untouched (`$set`)
    Set(Document),
    /// Append one value to an array field, creating it when absent (`$push`)
    Push { field: String, value: Value },
}

/// Identifier the store assigned to a freshly inserted document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertedId(pub String);

impl fmt::Display for InsertedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted: u64,
}

/// Document store abstraction shared by every route handler.
/// Each method is one operation against one collection; nothing spans
/// multiple documents or collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents of a collection in natural order
    async fn find_all(&self, collection: Collection) -> Result<Vec<Document>, StoreError>;

    /// First document matching the filter
    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError>;

    /// Every document matching the filter
    async fn find_many(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Document>, StoreError>;

    /// Insert a document, stamping `collection.timestamp_field()` with `created_at`
    async fn insert_one(
        &self,
        collection: Collection,
        document: Document,
        created_at: Timestamp,
    ) -> Result<InsertedId, StoreError>;

    /// Apply `update` to the first document matching the filter
    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        update: Update,
    ) -> Result<UpdateOutcome, StoreError>;

    /// Remove the first document matching the filter
    async fn delete_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<DeleteOutcome, StoreError>;
}
