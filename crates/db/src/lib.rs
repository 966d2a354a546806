//! MongoDB client factory and the document store backends.

use std::time::Duration;

use bson::doc;
use mongodb::options::ClientOptions;
use mongodb::Client;

use seed_kernel::settings::DatabaseSettings;
use seed_kernel::StoreError;

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Owned client plus the store bound to the configured database.
/// Call [`Connection::shutdown`] once the run is over.
pub struct Connection {
    client: Client,
    store: MongoStore,
}

impl Connection {
    pub fn store(&self) -> &MongoStore {
        &self.store
    }

    /// Close pooled connections and stop background monitoring
    pub async fn shutdown(self) {
        let Connection { client, store } = self;
        drop(store);
        client.shutdown().await;
        tracing::debug!(target: "seed-db", "mongodb client shut down");
    }
}

/// Build client options from settings without touching the network
pub async fn client_options(settings: &DatabaseSettings) -> Result<ClientOptions, StoreError> {
    let mut options = ClientOptions::parse(&settings.uri)
        .await
        .map_err(|e| StoreError::connection(format!("invalid uri '{}': {}", settings.uri, e)))?;

    options.app_name = Some(settings.app_name.clone());
    options.connect_timeout = Some(Duration::from_millis(settings.connect_timeout_ms));
    options.server_selection_timeout =
        Some(Duration::from_millis(settings.server_selection_timeout_ms));

    Ok(options)
}

/// Connect, select the configured database and confirm the server answers a ping
pub async fn connect(settings: &DatabaseSettings) -> Result<Connection, StoreError> {
    let options = client_options(settings).await?;
    let client = Client::with_options(options)
        .map_err(|e| mongo::classify(&settings.name, None, e))?;

    let database = client.database(&settings.name);
    if let Err(e) = database.run_command(doc! { "ping": 1 }).await {
        client.shutdown().await;
        return Err(mongo::classify(&settings.name, None, e));
    }

    tracing::info!(
        target: "seed-db",
        database = %settings.name,
        app_name = %settings.app_name,
        "connected to mongodb"
    );

    Ok(Connection {
        client,
        store: MongoStore::new(database),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn client_options_carry_settings() {
        let settings = DatabaseSettings {
            uri: "mongodb://db.internal:27017".to_string(),
            app_name: "seed-test".to_string(),
            connect_timeout_ms: 1500,
            ..Default::default()
        };

        let options = client_options(&settings).await.unwrap();

        assert_eq!(options.app_name.as_deref(), Some("seed-test"));
        assert_eq!(options.connect_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(options.hosts.len(), 1);
    }

    #[tokio::test]
    async fn malformed_uri_is_a_connection_error() {
        let settings = DatabaseSettings {
            uri: "postgres://nope".to_string(),
            ..Default::default()
        };

        let err = client_options(&settings).await.unwrap_err();
        assert!(matches!(err, StoreError::Connection { .. }));
    }
}
