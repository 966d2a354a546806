//! The database seam. Every bootstrap step talks to the target database through
//! [`DocumentStore`], so the same sequence runs against MongoDB or the in-memory backend.

use async_trait::async_trait;
use bson::Document;

use crate::error::StoreError;
use crate::module::IndexSpec;

/// Outcome of a single upsert-by-key write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    AlreadyPresent,
}

/// Login to create on the selected database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub roles: Vec<String>,
}

/// Handle bound to one logical database
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Name of the selected database
    fn database_name(&self) -> &str;

    /// Create `index` on `collection`, returning the server-side index name.
    /// Re-creating an identical index is a no-op.
    async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<String, StoreError>;

    /// Names of every index on `collection`, including `_id_`
    async fn list_index_names(&self, collection: &str) -> Result<Vec<String>, StoreError>;

    /// Bulk insert. Returns the number of documents written.
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        ordered: bool,
    ) -> Result<u64, StoreError>;

    /// Insert `document` unless a document with the same `key` value already exists
    async fn upsert_by_key(
        &self,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<UpsertOutcome, StoreError>;

    async fn count(&self, collection: &str, filter: Document) -> Result<u64, StoreError>;

    async fn find(&self, collection: &str, filter: Document) -> Result<Vec<Document>, StoreError>;

    async fn create_user(&self, user: &NewUser) -> Result<(), StoreError>;
}
