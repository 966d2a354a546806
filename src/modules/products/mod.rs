pub mod models;

use anyhow::Context;
use bson::{DateTime, Document};
use seed_kernel::settings::Settings;
use seed_kernel::{CollectionModule, IndexSpec};

/// The `products` collection: name search plus category, availability and price lookups
pub struct ProductsModule;

impl ProductsModule {
    pub const fn new() -> Self {
        Self
    }
}

impl CollectionModule for ProductsModule {
    fn name(&self) -> &'static str {
        "products"
    }

    fn indexes(&self) -> Vec<IndexSpec> {
        vec![
            IndexSpec::text("name"),
            IndexSpec::ascending("category"),
            IndexSpec::ascending("available"),
            IndexSpec::ascending("price"),
        ]
    }

    // Nothing enforces this server-side; upsert mode is the only guard against re-run duplicates.
    fn natural_key(&self) -> Option<&'static str> {
        Some("name")
    }

    fn seed_documents(&self, settings: &Settings) -> anyhow::Result<Vec<Document>> {
        models::seed_products(&settings.seed.created_by, DateTime::now())
            .iter()
            .map(|product| {
                bson::to_document(product)
                    .with_context(|| format!("failed to encode product '{}'", product.name))
            })
            .collect()
    }
}

/// Create a new instance of the products module
pub fn create_module() -> std::sync::Arc<dyn CollectionModule> {
    std::sync::Arc::new(ProductsModule::new())
}
