//! Offline description of what an initializer run would write.

use seed_kernel::settings::Settings;
use seed_kernel::CollectionRegistry;
use serde_json::{json, Value};

/// Index plan and seed documents as relaxed extended JSON
pub fn describe(registry: &CollectionRegistry, settings: &Settings) -> anyhow::Result<Value> {
    let mut collections = Vec::new();

    for module in registry.modules() {
        let indexes: Vec<Value> = module
            .indexes()
            .iter()
            .map(|index| {
                json!({
                    "name": index.name(),
                    "keys": bson::Bson::Document(index.keys()).into_relaxed_extjson(),
                    "unique": index.unique,
                })
            })
            .collect();

        let documents: Vec<Value> = module
            .seed_documents(settings)?
            .into_iter()
            .map(|document| bson::Bson::Document(document).into_relaxed_extjson())
            .collect();

        collections.push(json!({
            "name": module.name(),
            "naturalKey": module.natural_key(),
            "indexes": indexes,
            "documents": documents,
        }));
    }

    Ok(json!({
        "database": settings.database.name,
        "mode": format!("{:?}", settings.seed.mode).to_lowercase(),
        "collections": collections,
    }))
}
