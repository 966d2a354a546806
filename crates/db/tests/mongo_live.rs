//! Runs only when `SEED_TEST_MONGODB_URI` points at a disposable MongoDB server.

use bson::doc;
use seed_db::connect;
use seed_kernel::settings::DatabaseSettings;
use seed_kernel::{DocumentStore, IndexSpec, StoreError, UpsertOutcome};

fn live_settings(database: &str) -> Option<DatabaseSettings> {
    let uri = std::env::var("SEED_TEST_MONGODB_URI").ok()?;
    Some(DatabaseSettings {
        uri,
        name: format!("{}_{}", database, std::process::id()),
        ..Default::default()
    })
}

async fn drop_database(settings: &DatabaseSettings) {
    let client = mongodb::Client::with_uri_str(&settings.uri).await.unwrap();
    client.database(&settings.name).drop().await.unwrap();
}

#[tokio::test]
async fn duplicate_email_maps_to_unique_violation() {
    let Some(settings) = live_settings("seed_live_dup") else {
        return;
    };
    let connection = connect(&settings).await.unwrap();
    let store = connection.store();

    store
        .create_index("users", &IndexSpec::unique("email"))
        .await
        .unwrap();
    store
        .insert_many("users", vec![doc! { "email": "joao@example.com" }], true)
        .await
        .unwrap();

    let err = store
        .insert_many(
            "users",
            vec![
                doc! { "email": "maria@example.com" },
                doc! { "email": "joao@example.com" },
            ],
            true,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::UniqueConstraintViolation { inserted: 1, .. }));
    assert_eq!(store.count("users", doc! {}).await.unwrap(), 2);

    connection.shutdown().await;
    drop_database(&settings).await;
}

#[tokio::test]
async fn conflicting_index_options_map_to_index_conflict() {
    let Some(settings) = live_settings("seed_live_idx") else {
        return;
    };
    let connection = connect(&settings).await.unwrap();
    let store = connection.store();

    store
        .create_index("users", &IndexSpec::ascending("email"))
        .await
        .unwrap();
    let err = store
        .create_index("users", &IndexSpec::unique("email"))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::IndexConflict { .. }));

    connection.shutdown().await;
    drop_database(&settings).await;
}

#[tokio::test]
async fn text_search_and_upsert_against_server() {
    let Some(settings) = live_settings("seed_live_text") else {
        return;
    };
    let connection = connect(&settings).await.unwrap();
    let store = connection.store();

    store
        .create_index("products", &IndexSpec::text("name"))
        .await
        .unwrap();
    let outcome = store
        .upsert_by_key("products", "name", doc! { "name": "Notebook Dell Inspiron" })
        .await
        .unwrap();
    let again = store
        .upsert_by_key("products", "name", doc! { "name": "Notebook Dell Inspiron" })
        .await
        .unwrap();

    assert_eq!(outcome, UpsertOutcome::Inserted);
    assert_eq!(again, UpsertOutcome::AlreadyPresent);
    let found = store
        .find("products", doc! { "$text": { "$search": "Dell" } })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(
        store.list_index_names("products").await.unwrap(),
        vec!["_id_", "name_text"]
    );

    connection.shutdown().await;
    drop_database(&settings).await;
}

#[tokio::test]
async fn unreachable_server_is_a_connection_error() {
    if std::env::var("SEED_TEST_MONGODB_URI").is_err() {
        return;
    }
    let settings = DatabaseSettings {
        uri: "mongodb://127.0.0.1:1".to_string(),
        server_selection_timeout_ms: 200,
        connect_timeout_ms: 200,
        ..Default::default()
    };

    let err = connect(&settings).await.err().unwrap();
    assert!(matches!(err, StoreError::Connection { .. }));
}
