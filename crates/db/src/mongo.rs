use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::error::{Error as MongoError, ErrorKind, IndexedWriteError, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Database, IndexModel};

use seed_kernel::{DocumentStore, IndexSpec, NewUser, StoreError, UpsertOutcome};

const DUPLICATE_KEY_CODES: &[i32] = &[11000, 11001, 12582];
const INDEX_CONFLICT_CODES: &[i32] = &[
    68, // IndexAlreadyExists
    85, // IndexOptionsConflict
    86, // IndexKeySpecsConflict
];

/// [`DocumentStore`] backed by a live MongoDB database
#[derive(Clone, Debug)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    fn collection(&self, name: &str) -> mongodb::Collection<Document> {
        self.database.collection::<Document>(name)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn database_name(&self) -> &str {
        self.database.name()
    }

    async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<String, StoreError> {
        let name = index.name();
        let options = IndexOptions::builder()
            .name(name.clone())
            .unique(index.unique.then_some(true))
            .build();
        let model = IndexModel::builder()
            .keys(index.keys())
            .options(options)
            .build();

        let created = self
            .collection(collection)
            .create_index(model)
            .await
            .map_err(|e| classify(collection, Some(name.as_str()), e))?;

        Ok(created.index_name)
    }

    async fn list_index_names(&self, collection: &str) -> Result<Vec<String>, StoreError> {
        match self.collection(collection).list_index_names().await {
            Ok(names) => Ok(names),
            // NamespaceNotFound: the collection has never been written to
            Err(e) if command_code(&e) == Some(26) => Ok(vec![]),
            Err(e) => Err(classify(collection, None, e)),
        }
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        ordered: bool,
    ) -> Result<u64, StoreError> {
        let total = documents.len() as u64;
        if total == 0 {
            return Ok(0);
        }

        match self
            .collection(collection)
            .insert_many(documents)
            .ordered(ordered)
            .await
        {
            Ok(result) => Ok(result.inserted_ids.len() as u64),
            Err(e) => Err(classify_insert_many(collection, total, ordered, e)),
        }
    }

    async fn upsert_by_key(
        &self,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<UpsertOutcome, StoreError> {
        let value = document.get(key).cloned().ok_or_else(|| {
            anyhow::anyhow!("seed document for '{}' has no '{}' field", collection, key)
        })?;

        let mut filter = Document::new();
        filter.insert(key, value);

        let result = self
            .collection(collection)
            .update_one(filter, doc! { "$setOnInsert": document })
            .upsert(true)
            .await
            .map_err(|e| classify(collection, None, e))?;

        Ok(match result.upserted_id {
            Some(_) => UpsertOutcome::Inserted,
            None => UpsertOutcome::AlreadyPresent,
        })
    }

    async fn count(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
        self.collection(collection)
            .count_documents(filter)
            .await
            .map_err(|e| classify(collection, None, e))
    }

    async fn find(&self, collection: &str, filter: Document) -> Result<Vec<Document>, StoreError> {
        let cursor = self
            .collection(collection)
            .find(filter)
            .await
            .map_err(|e| classify(collection, None, e))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| classify(collection, None, e))
    }

    async fn create_user(&self, user: &NewUser) -> Result<(), StoreError> {
        let roles: Vec<Bson> = user
            .roles
            .iter()
            .map(|role| Bson::String(role.clone()))
            .collect();

        self.database
            .run_command(doc! {
                "createUser": user.username.as_str(),
                "pwd": user.password.as_str(),
                "roles": roles,
            })
            .await
            .map_err(|e| classify(self.database.name(), None, e))?;

        Ok(())
    }
}

fn command_code(error: &MongoError) -> Option<i32> {
    match error.kind.as_ref() {
        ErrorKind::Command(command) => Some(command.code),
        _ => None,
    }
}

fn by_code(collection: &str, index: Option<&str>, code: i32, message: &str) -> StoreError {
    if DUPLICATE_KEY_CODES.contains(&code) {
        StoreError::duplicate(collection, message, 0)
    } else if INDEX_CONFLICT_CODES.contains(&code) {
        StoreError::index_conflict(collection, index.unwrap_or("<unknown>"), message)
    } else {
        StoreError::rejected(collection, code, message)
    }
}

/// Map a driver error onto the store taxonomy
pub(crate) fn classify(collection: &str, index: Option<&str>, error: MongoError) -> StoreError {
    let classified = match error.kind.as_ref() {
        ErrorKind::Command(command) => {
            Some(by_code(collection, index, command.code, &command.message))
        }
        ErrorKind::Write(WriteFailure::WriteError(write)) => {
            Some(by_code(collection, index, write.code, &write.message))
        }
        ErrorKind::ServerSelection { message, .. }
        | ErrorKind::Authentication { message, .. }
        | ErrorKind::ConnectionPoolCleared { message, .. } => {
            Some(StoreError::connection(message.clone()))
        }
        ErrorKind::Io(io) => Some(StoreError::connection(io.to_string())),
        _ => None,
    };

    classified.unwrap_or_else(|| StoreError::Other(anyhow::Error::new(error)))
}

/// Bulk insert failures carry one write error per rejected document. Ordered batches stop at
/// the first one, so everything before its index landed; unordered batches skip only the
/// rejected documents.
fn classify_insert_many(
    collection: &str,
    total: u64,
    ordered: bool,
    error: MongoError,
) -> StoreError {
    let summarized = match error.kind.as_ref() {
        ErrorKind::InsertMany(failure) => failure
            .write_errors
            .as_deref()
            .and_then(|write_errors| summarize_write_errors(collection, total, ordered, write_errors)),
        _ => None,
    };

    summarized.unwrap_or_else(|| classify(collection, None, error))
}

fn summarize_write_errors(
    collection: &str,
    total: u64,
    ordered: bool,
    write_errors: &[IndexedWriteError],
) -> Option<StoreError> {
    let first = write_errors.first()?;
    let failures: Vec<(usize, i32)> = write_errors.iter().map(|e| (e.index, e.code)).collect();

    Some(summarize_failures(collection, total, ordered, &failures, &first.message))
}

/// `failures` holds the batch position and server code of each rejected document
fn summarize_failures(
    collection: &str,
    total: u64,
    ordered: bool,
    failures: &[(usize, i32)],
    message: &str,
) -> StoreError {
    let inserted = inserted_before_failure(total, ordered, failures);

    match failures.first() {
        Some(&(_, code)) if !failures.iter().all(|(_, c)| DUPLICATE_KEY_CODES.contains(c)) => {
            StoreError::rejected(collection, code, message)
        }
        _ => StoreError::duplicate(collection, message, inserted),
    }
}

fn inserted_before_failure(total: u64, ordered: bool, failures: &[(usize, i32)]) -> u64 {
    if ordered {
        failures
            .iter()
            .map(|&(index, _)| index as u64)
            .min()
            .unwrap_or(total)
    } else {
        total.saturating_sub(failures.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_codes_map_to_unique_violation() {
        let error = by_code("users", None, 11000, "E11000 duplicate key error");
        assert!(error.is_duplicate());
    }

    #[test]
    fn index_option_conflicts_keep_the_index_name() {
        let error = by_code("users", Some("email_1"), 85, "Index already exists with different options");
        assert!(matches!(error, StoreError::IndexConflict { ref index, .. } if index == "email_1"));
    }

    #[test]
    fn ordered_batch_counts_documents_ahead_of_the_failure() {
        assert_eq!(inserted_before_failure(3, true, &[(1, 11000)]), 1);
        assert_eq!(inserted_before_failure(3, true, &[(0, 11000)]), 0);
    }

    #[test]
    fn unordered_batch_counts_everything_not_rejected() {
        assert_eq!(inserted_before_failure(3, false, &[(0, 11000), (2, 11000)]), 1);
        assert_eq!(inserted_before_failure(2, false, &[(0, 11000)]), 1);
    }

    #[test]
    fn duplicate_only_failures_keep_the_inserted_count() {
        let error = summarize_failures(
            "products",
            3,
            false,
            &[(0, 11000), (1, 11000), (2, 11000)],
            "E11000 duplicate key error",
        );
        assert!(matches!(
            error,
            StoreError::UniqueConstraintViolation { inserted: 0, ref collection, .. } if collection == "products"
        ));

        let error = summarize_failures("users", 2, true, &[(1, 11000)], "E11000 duplicate key error");
        assert!(matches!(error, StoreError::UniqueConstraintViolation { inserted: 1, .. }));
    }

    #[test]
    fn mixed_failures_are_rejections_with_the_first_code() {
        let error = summarize_failures(
            "products",
            3,
            false,
            &[(0, 121), (2, 11000)],
            "Document failed validation",
        );
        assert!(matches!(error, StoreError::Rejected { code: 121, .. }));
    }

    #[test]
    fn other_codes_are_rejections() {
        let error = by_code("products", None, 13, "not authorized");
        assert!(matches!(error, StoreError::Rejected { code: 13, .. }));
    }
}
