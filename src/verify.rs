//! Read-only inspection of a bootstrapped database.

use std::fmt;

use anyhow::Context;
use bson::Document;
use seed_kernel::{CollectionRegistry, InitCtx};

const ID_INDEX: &str = "_id_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionStatus {
    pub collection: String,
    pub present: Vec<String>,
    pub missing: Vec<String>,
    /// Indexes on the server that no module declares
    pub extra: Vec<String>,
    pub documents: u64,
    pub expected_documents: u64,
}

impl CollectionStatus {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.documents >= self.expected_documents
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub database: String,
    pub collections: Vec<CollectionStatus>,
}

impl VerificationReport {
    pub fn is_complete(&self) -> bool {
        self.collections.iter().all(CollectionStatus::is_complete)
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionStatus> {
        self.collections.iter().find(|c| c.collection == name)
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "database {}", self.database)?;
        for status in &self.collections {
            let state = if status.is_complete() { "ok" } else { "INCOMPLETE" };
            writeln!(
                f,
                "  {} [{}] documents {}/{} indexes {}",
                status.collection,
                state,
                status.documents,
                status.expected_documents,
                status.present.join(", ")
            )?;
            if !status.missing.is_empty() {
                writeln!(f, "    missing: {}", status.missing.join(", "))?;
            }
            if !status.extra.is_empty() {
                writeln!(f, "    undeclared: {}", status.extra.join(", "))?;
            }
        }
        Ok(())
    }
}

/// Compare the live database with what the registry declares
pub async fn verify(
    ctx: &InitCtx<'_>,
    registry: &CollectionRegistry,
) -> anyhow::Result<VerificationReport> {
    let mut collections = Vec::new();

    for module in registry.modules() {
        let name = module.name();
        let declared: Vec<String> = module.indexes().iter().map(|i| i.name()).collect();
        let existing = ctx
            .store
            .list_index_names(name)
            .await
            .with_context(|| format!("failed to list indexes of '{}'", name))?;
        let documents = ctx
            .store
            .count(name, Document::new())
            .await
            .with_context(|| format!("failed to count documents in '{}'", name))?;
        let expected_documents = module.seed_documents(ctx.settings)?.len() as u64;

        let (present, missing) = declared
            .into_iter()
            .partition::<Vec<_>, _>(|index| existing.contains(index));
        let extra = existing
            .into_iter()
            .filter(|index| index != ID_INDEX && !present.contains(index))
            .collect();

        collections.push(CollectionStatus {
            collection: name.to_string(),
            present,
            missing,
            extra,
            documents,
            expected_documents,
        });
    }

    Ok(VerificationReport {
        database: ctx.store.database_name().to_string(),
        collections,
    })
}
