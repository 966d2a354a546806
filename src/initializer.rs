//! The bootstrap sequence: database selection, optional application login, indexes, seed data.

use anyhow::Context;
use seed_kernel::{CollectionRegistry, InitCtx, NewUser, ProvisionedIndex, SeedReport};

/// Printed on stdout once every step succeeded
pub const COMPLETION_NOTICE: &str = "Banco de dados inicializado com sucesso!";

#[derive(Debug, Clone)]
pub struct InitReport {
    pub database: String,
    pub app_user: Option<String>,
    pub indexes: Vec<ProvisionedIndex>,
    pub seed: SeedReport,
}

impl InitReport {
    pub fn index_count(&self, collection: &str) -> usize {
        self.indexes
            .iter()
            .filter(|index| index.collection == collection)
            .count()
    }
}

/// Run every step in order against `ctx.store`. The first failure aborts the run and leaves
/// whatever was already written in place.
pub async fn run(ctx: &InitCtx<'_>, registry: &CollectionRegistry) -> anyhow::Result<InitReport> {
    let database = ctx.store.database_name().to_string();
    tracing::info!(database = %database, collections = registry.len(), "bootstrapping database");

    let app_user = match &ctx.settings.seed.app_user {
        Some(user) => {
            ctx.store
                .create_user(&NewUser {
                    username: user.username.clone(),
                    password: user.password.clone(),
                    roles: user.roles.clone(),
                })
                .await
                .with_context(|| format!("failed to create application user '{}'", user.username))?;
            tracing::info!(username = %user.username, roles = ?user.roles, "application user created");
            Some(user.username.clone())
        }
        None => None,
    };

    let indexes = registry.provision_indexes(ctx).await?;
    let seed = registry.seed_collections(ctx).await?;

    tracing::info!(
        database = %database,
        indexes = indexes.len(),
        inserted = seed.total_inserted(),
        violations = seed.violations().count(),
        "database bootstrap finished"
    );

    Ok(InitReport {
        database,
        app_user,
        indexes,
        seed,
    })
}
