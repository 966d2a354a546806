//! In-process [`DocumentStore`] with MongoDB semantics for the operations the seeder uses.
//! Backs `--dry-run` and the test suites.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document};

use seed_kernel::{DocumentStore, IndexKind, IndexSpec, NewUser, StoreError, UpsertOutcome};

const TEXT_INDEX_REQUIRED: i32 = 27;
const BAD_VALUE: i32 = 2;
const USER_EXISTS: i32 = 51003;

#[derive(Debug, Default, Clone)]
struct CollectionState {
    indexes: Vec<IndexSpec>,
    documents: Vec<Document>,
}

impl CollectionState {
    fn text_index(&self) -> Option<&IndexSpec> {
        self.indexes.iter().find(|i| i.kind == IndexKind::Text)
    }

    /// Message for the first unique index `candidate` would breach
    fn duplicate_of(&self, namespace: &str, candidate: &Document) -> Option<String> {
        self.indexes.iter().filter(|i| i.unique).find_map(|index| {
            let value = indexed_value(candidate, index.field);
            self.documents
                .iter()
                .any(|existing| indexed_value(existing, index.field) == value)
                .then(|| duplicate_message(namespace, index, value))
        })
    }
}

static MISSING: Bson = Bson::Null;

/// Key a document contributes to an index; absent fields are indexed as null
fn indexed_value<'a>(document: &'a Document, field: &str) -> &'a Bson {
    document.get(field).unwrap_or(&MISSING)
}

fn duplicate_message(namespace: &str, index: &IndexSpec, value: &Bson) -> String {
    format!(
        "E11000 duplicate key error collection: {} index: {} dup key: {{ {}: {} }}",
        namespace,
        index.name(),
        index.field,
        value
    )
}

/// Volatile store; everything lives until the value is dropped
#[derive(Debug)]
pub struct MemoryStore {
    database: String,
    collections: Mutex<BTreeMap<String, CollectionState>>,
    users: Mutex<Vec<NewUser>>,
}

impl MemoryStore {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collections: Mutex::new(BTreeMap::new()),
            users: Mutex::new(Vec::new()),
        }
    }

    /// Usernames created so far
    pub fn usernames(&self) -> Vec<String> {
        lock(&self.users).iter().map(|u| u.username.clone()).collect()
    }

    /// Names of collections that exist, in lexical order
    pub fn collection_names(&self) -> Vec<String> {
        lock(&self.collections).keys().cloned().collect()
    }

    fn namespace(&self, collection: &str) -> String {
        format!("{}.{}", self.database, collection)
    }

    fn insert_one(
        &self,
        state: &mut CollectionState,
        collection: &str,
        mut document: Document,
    ) -> Result<(), String> {
        if let Some(message) = state.duplicate_of(&self.namespace(collection), &document) {
            return Err(message);
        }
        if !document.contains_key("_id") {
            document.insert("_id", ObjectId::new());
        }
        state.documents.push(document);
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding the lock leaves plain data behind; keep serving it.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Lower-cased words of `text`, split on anything that is not alphanumeric
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn filter_matches(
    collection: &str,
    state: &CollectionState,
    document: &Document,
    filter: &Document,
) -> Result<bool, StoreError> {
    for (key, expected) in filter {
        let matched = if key == "$text" {
            let index = state.text_index().ok_or_else(|| {
                StoreError::rejected(collection, TEXT_INDEX_REQUIRED, "text index required for $text query")
            })?;
            let search = expected
                .as_document()
                .and_then(|spec| spec.get_str("$search").ok())
                .ok_or_else(|| {
                    StoreError::rejected(collection, BAD_VALUE, "$text needs a $search string")
                })?;
            let haystack = document
                .get_str(index.field)
                .map(words)
                .unwrap_or_default();
            words(search).iter().any(|term| haystack.contains(term))
        } else if key.starts_with('$') {
            return Err(StoreError::rejected(
                collection,
                BAD_VALUE,
                format!("unsupported top-level operator {}", key),
            ));
        } else {
            match document.get(key) {
                Some(Bson::Array(values)) if !matches!(expected, Bson::Array(_)) => {
                    values.contains(expected)
                }
                Some(actual) => actual == expected,
                None => matches!(expected, Bson::Null),
            }
        };

        if !matched {
            return Ok(false);
        }
    }

    Ok(true)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn database_name(&self) -> &str {
        &self.database
    }

    async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<String, StoreError> {
        let mut collections = lock(&self.collections);
        let state = collections.entry(collection.to_string()).or_default();
        let name = index.name();

        if let Some(existing) = state.indexes.iter().find(|i| i.name() == name) {
            if existing == index {
                return Ok(name);
            }
            return Err(StoreError::index_conflict(
                collection,
                name,
                "an index with the same name already exists with different options",
            ));
        }

        if index.kind == IndexKind::Text {
            if let Some(existing) = state.text_index() {
                return Err(StoreError::index_conflict(
                    collection,
                    name,
                    format!(
                        "only one text index per collection allowed, found {}",
                        existing.name()
                    ),
                ));
            }
        }

        if index.unique {
            let mut seen: Vec<&Bson> = Vec::new();
            for value in state.documents.iter().map(|d| indexed_value(d, index.field)) {
                if seen.contains(&value) {
                    return Err(StoreError::duplicate(
                        collection,
                        duplicate_message(&self.namespace(collection), index, value),
                        0,
                    ));
                }
                seen.push(value);
            }
        }

        state.indexes.push(index.clone());
        Ok(name)
    }

    async fn list_index_names(&self, collection: &str) -> Result<Vec<String>, StoreError> {
        let collections = lock(&self.collections);
        Ok(match collections.get(collection) {
            Some(state) => std::iter::once("_id_".to_string())
                .chain(state.indexes.iter().map(IndexSpec::name))
                .collect(),
            None => vec![],
        })
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        ordered: bool,
    ) -> Result<u64, StoreError> {
        let mut collections = lock(&self.collections);
        let state = collections.entry(collection.to_string()).or_default();

        let mut inserted = 0;
        let mut first_failure = None;

        for document in documents {
            match self.insert_one(state, collection, document) {
                Ok(()) => inserted += 1,
                Err(message) => {
                    first_failure.get_or_insert(message);
                    if ordered {
                        break;
                    }
                }
            }
        }

        match first_failure {
            Some(message) => Err(StoreError::duplicate(collection, message, inserted)),
            None => Ok(inserted),
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

        let mut collections = lock(&self.collections);
        let state = collections.entry(collection.to_string()).or_default();

        if state.documents.iter().any(|d| d.get(key) == Some(&value)) {
            return Ok(UpsertOutcome::AlreadyPresent);
        }

        self.insert_one(state, collection, document)
            .map_err(|message| StoreError::duplicate(collection, message, 0))?;
        Ok(UpsertOutcome::Inserted)
    }

    async fn count(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
        Ok(self.find(collection, filter).await?.len() as u64)
    }

    async fn find(&self, collection: &str, filter: Document) -> Result<Vec<Document>, StoreError> {
        let collections = lock(&self.collections);
        let Some(state) = collections.get(collection) else {
            return Ok(vec![]);
        };

        let mut found = Vec::new();
        for document in &state.documents {
            if filter_matches(collection, state, document, &filter)? {
                found.push(document.clone());
            }
        }
        Ok(found)
    }

    async fn create_user(&self, user: &NewUser) -> Result<(), StoreError> {
        let mut users = lock(&self.users);
        if users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::rejected(
                &self.database,
                USER_EXISTS,
                format!("User \"{}@{}\" already exists", user.username, self.database),
            ));
        }
        users.push(user.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn store() -> MemoryStore {
        MemoryStore::new("springboot_db")
    }

    #[tokio::test]
    async fn identical_index_is_a_noop() {
        let store = store();
        store.create_index("users", &IndexSpec::unique("email")).await.unwrap();
        store.create_index("users", &IndexSpec::unique("email")).await.unwrap();

        assert_eq!(
            store.list_index_names("users").await.unwrap(),
            vec!["_id_", "email_1"]
        );
    }

    #[tokio::test]
    async fn same_name_with_other_options_conflicts() {
        let store = store();
        store.create_index("users", &IndexSpec::ascending("email")).await.unwrap();

        let err = store
            .create_index("users", &IndexSpec::unique("email"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::IndexConflict { ref index, .. } if index == "email_1"));
    }

    #[tokio::test]
    async fn second_text_index_conflicts() {
        let store = store();
        store.create_index("products", &IndexSpec::text("name")).await.unwrap();

        let err = store
            .create_index("products", &IndexSpec::text("description"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::IndexConflict { .. }));
    }

    #[tokio::test]
    async fn ordered_insert_stops_at_first_duplicate() {
        let store = store();
        store.create_index("users", &IndexSpec::unique("email")).await.unwrap();
        store
            .insert_many("users", vec![doc! { "email": "a@example.com" }], true)
            .await
            .unwrap();

        let err = store
            .insert_many(
                "users",
                vec![
                    doc! { "email": "b@example.com" },
                    doc! { "email": "a@example.com" },
                    doc! { "email": "c@example.com" },
                ],
                true,
            )
            .await
            .unwrap_err();

        match err {
            StoreError::UniqueConstraintViolation { inserted, message, .. } => {
                assert_eq!(inserted, 1);
                assert!(message.contains("springboot_db.users index: email_1"));
            }
            other => panic!("expected duplicate, got {other:?}"),
        }
        assert_eq!(store.count("users", doc! {}).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn unordered_insert_keeps_going_past_duplicates() {
        let store = store();
        store.create_index("users", &IndexSpec::unique("email")).await.unwrap();
        store
            .insert_many("users", vec![doc! { "email": "a@example.com" }], true)
            .await
            .unwrap();

        let err = store
            .insert_many(
                "users",
                vec![
                    doc! { "email": "a@example.com" },
                    doc! { "email": "c@example.com" },
                ],
                false,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::UniqueConstraintViolation { inserted: 1, .. }));
        assert_eq!(store.count("users", doc! {}).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn unique_index_over_duplicated_data_fails() {
        let store = store();
        store
            .insert_many(
                "users",
                vec![doc! { "email": "a@example.com" }, doc! { "email": "a@example.com" }],
                true,
            )
            .await
            .unwrap();

        let err = store
            .create_index("users", &IndexSpec::unique("email"))
            .await
            .unwrap_err();
        assert!(err.is_duplicate());
    }

    #[tokio::test]
    async fn documents_missing_the_unique_field_collide_on_null() {
        let store = store();
        store.create_index("users", &IndexSpec::unique("email")).await.unwrap();

        let err = store
            .insert_many(
                "users",
                vec![doc! { "name": "Sem Email" }, doc! { "name": "Outro Sem Email" }],
                true,
            )
            .await
            .unwrap_err();

        match err {
            StoreError::UniqueConstraintViolation { inserted, message, .. } => {
                assert_eq!(inserted, 1);
                assert!(message.contains("{ email: null }"));
            }
            other => panic!("expected duplicate, got {other:?}"),
        }
        assert_eq!(store.count("users", doc! {}).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn explicit_null_collides_with_a_missing_field() {
        let store = store();
        store.create_index("users", &IndexSpec::unique("email")).await.unwrap();
        store
            .insert_many("users", vec![doc! { "name": "Sem Email" }], true)
            .await
            .unwrap();

        let err = store
            .insert_many("users", vec![doc! { "email": null }], true)
            .await
            .unwrap_err();
        assert!(err.is_duplicate());
    }

    #[tokio::test]
    async fn unique_index_over_documents_missing_the_field_fails() {
        let store = store();
        store
            .insert_many("users", vec![doc! { "name": "A" }, doc! { "name": "B" }], true)
            .await
            .unwrap();

        let err = store
            .create_index("users", &IndexSpec::unique("email"))
            .await
            .unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(store.list_index_names("users").await.unwrap(), vec!["_id_"]);
    }

    #[tokio::test]
    async fn text_search_needs_a_text_index() {
        let store = store();
        store
            .insert_many("products", vec![doc! { "name": "Notebook Dell Inspiron" }], true)
            .await
            .unwrap();

        let err = store
            .find("products", doc! { "$text": { "$search": "dell" } })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected { code: TEXT_INDEX_REQUIRED, .. }));

        store.create_index("products", &IndexSpec::text("name")).await.unwrap();
        let found = store
            .find("products", doc! { "$text": { "$search": "dell" } })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn equality_filter_matches_array_members() {
        let store = store();
        store
            .insert_many(
                "products",
                vec![
                    doc! { "tags": ["mouse", "logitech"] },
                    doc! { "tags": ["teclado"] },
                ],
                true,
            )
            .await
            .unwrap();

        assert_eq!(store.count("products", doc! { "tags": "mouse" }).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn upsert_skips_existing_key() {
        let store = store();
        let first = store
            .upsert_by_key("products", "name", doc! { "name": "Mouse", "stock": 1 })
            .await
            .unwrap();
        let second = store
            .upsert_by_key("products", "name", doc! { "name": "Mouse", "stock": 99 })
            .await
            .unwrap();

        assert_eq!(first, UpsertOutcome::Inserted);
        assert_eq!(second, UpsertOutcome::AlreadyPresent);
        let stored = store.find("products", doc! { "name": "Mouse" }).await.unwrap();
        assert_eq!(stored[0].get_i32("stock").unwrap(), 1);
    }

    #[tokio::test]
    async fn creating_the_same_user_twice_is_rejected() {
        let store = store();
        let user = NewUser {
            username: "springboot_user".to_string(),
            password: "secret".to_string(),
            roles: vec!["readWrite".to_string()],
        };

        store.create_user(&user).await.unwrap();
        let err = store.create_user(&user).await.unwrap_err();

        assert!(matches!(err, StoreError::Rejected { code: USER_EXISTS, .. }));
        assert_eq!(store.usernames(), vec!["springboot_user"]);
    }
}
