use anyhow::{anyhow, Context};
use std::sync::Arc;

use crate::error::StoreError;
use crate::module::{CollectionModule, InitCtx};
use crate::settings::{DuplicatePolicy, SeedMode};
use crate::store::UpsertOutcome;

/// An index that exists on the server after provisioning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedIndex {
    pub collection: String,
    pub name: String,
}

/// Seeding result for one collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSeed {
    pub collection: String,
    pub inserted: u64,
    /// Documents left alone because their natural key already existed
    pub skipped: u64,
    /// Unique constraint message when `on_duplicate = continue` swallowed one
    pub violation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub collections: Vec<CollectionSeed>,
}

impl SeedReport {
    pub fn total_inserted(&self) -> u64 {
        self.collections.iter().map(|c| c.inserted).sum()
    }

    pub fn violations(&self) -> impl Iterator<Item = &CollectionSeed> {
        self.collections.iter().filter(|c| c.violation.is_some())
    }
}

/// Collection registry; modules are provisioned and seeded in registration order
pub struct CollectionRegistry {
    modules: Vec<Arc<dyn CollectionModule>>,
}

impl CollectionRegistry {
    /// Create a new collection registry
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Register a collection module with the registry
    pub fn register(&mut self, module: Arc<dyn CollectionModule>) {
        self.modules.push(module);
    }

    /// Get all registered modules
    pub fn modules(&self) -> &[Arc<dyn CollectionModule>] {
        &self.modules
    }

    /// Get a module by collection name
    pub fn get_module(&self, name: &str) -> Option<&Arc<dyn CollectionModule>> {
        self.modules.iter().find(|module| module.name() == name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Create every declared index. The first failure aborts the remaining steps.
    pub async fn provision_indexes(
        &self,
        ctx: &InitCtx<'_>,
    ) -> anyhow::Result<Vec<ProvisionedIndex>> {
        let mut provisioned = Vec::new();

        for module in &self.modules {
            for index in module.indexes() {
                let name = ctx
                    .store
                    .create_index(module.name(), &index)
                    .await
                    .with_context(|| {
                        format!(
                            "failed to create index '{}' on '{}'",
                            index.name(),
                            module.name()
                        )
                    })?;

                tracing::info!(
                    collection = module.name(),
                    index = %name,
                    unique = index.unique,
                    "index ready"
                );

                provisioned.push(ProvisionedIndex {
                    collection: module.name().to_string(),
                    name,
                });
            }
        }

        Ok(provisioned)
    }

    /// Write every module's seed documents according to the seed settings
    pub async fn seed_collections(&self, ctx: &InitCtx<'_>) -> anyhow::Result<SeedReport> {
        let policy = &ctx.settings.seed;
        let mut report = SeedReport::default();

        for module in &self.modules {
            let documents = module
                .seed_documents(ctx.settings)
                .with_context(|| format!("failed to build seed documents for '{}'", module.name()))?;

            tracing::info!(
                collection = module.name(),
                documents = documents.len(),
                mode = ?policy.mode,
                "seeding collection"
            );

            let outcome = match policy.mode {
                SeedMode::Insert => ctx
                    .store
                    .insert_many(module.name(), documents, policy.ordered)
                    .await
                    .map(|inserted| CollectionSeed {
                        collection: module.name().to_string(),
                        inserted,
                        skipped: 0,
                        violation: None,
                    }),
                SeedMode::Upsert => upsert_documents(ctx, module.as_ref(), documents).await,
            };

            let entry = match outcome {
                Ok(entry) => entry,
                Err(StoreError::UniqueConstraintViolation {
                    collection,
                    message,
                    inserted,
                }) if policy.on_duplicate == DuplicatePolicy::Continue => {
                    tracing::warn!(
                        collection = %collection,
                        inserted,
                        error = %message,
                        "unique constraint rejected seed documents; continuing"
                    );
                    CollectionSeed {
                        collection,
                        inserted,
                        skipped: 0,
                        violation: Some(message),
                    }
                }
                Err(e) => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("failed to seed collection '{}'", module.name())));
                }
            };

            tracing::info!(
                collection = %entry.collection,
                inserted = entry.inserted,
                skipped = entry.skipped,
                "collection seeded"
            );
            report.collections.push(entry);
        }

        Ok(report)
    }
}

async fn upsert_documents(
    ctx: &InitCtx<'_>,
    module: &dyn CollectionModule,
    documents: Vec<bson::Document>,
) -> Result<CollectionSeed, StoreError> {
    let key = module.natural_key().ok_or_else(|| {
        anyhow!(
            "collection '{}' declares no natural key; upsert mode needs one",
            module.name()
        )
    })?;

    let mut entry = CollectionSeed {
        collection: module.name().to_string(),
        inserted: 0,
        skipped: 0,
        violation: None,
    };

    for document in documents {
        match ctx.store.upsert_by_key(module.name(), key, document).await? {
            UpsertOutcome::Inserted => entry.inserted += 1,
            UpsertOutcome::AlreadyPresent => entry.skipped += 1,
        }
    }

    Ok(entry)
}

impl Default for CollectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
