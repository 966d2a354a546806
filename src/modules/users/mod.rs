pub mod models;

use anyhow::Context;
use bson::{DateTime, Document};
use seed_kernel::settings::Settings;
use seed_kernel::{CollectionModule, IndexSpec};

/// The `users` collection: unique emails, an `active` flag index and name search
pub struct UsersModule;

impl UsersModule {
    pub const fn new() -> Self {
        Self
    }
}

impl CollectionModule for UsersModule {
    fn name(&self) -> &'static str {
        "users"
    }

    fn indexes(&self) -> Vec<IndexSpec> {
        vec![
            IndexSpec::unique("email"),
            IndexSpec::ascending("active"),
            IndexSpec::text("name"),
        ]
    }

    fn natural_key(&self) -> Option<&'static str> {
        Some("email")
    }

    fn seed_documents(&self, settings: &Settings) -> anyhow::Result<Vec<Document>> {
        models::seed_users(&settings.seed.created_by, DateTime::now())
            .iter()
            .map(|user| {
                bson::to_document(user)
                    .with_context(|| format!("failed to encode user '{}'", user.email))
            })
            .collect()
    }
}

/// Create a new instance of the users module
pub fn create_module() -> std::sync::Arc<dyn CollectionModule> {
    std::sync::Arc::new(UsersModule::new())
}
