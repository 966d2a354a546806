use anyhow::Context;
use seed_kernel::settings::Settings;
use seed_kernel::InitCtx;
use springboot_seed::COMPLETION_NOTICE;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load seeder settings")?;
    seed_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.name,
        "springboot-seed bootstrap starting"
    );

    let registry = springboot_seed::registry();
    let connection = seed_db::connect(&settings.database)
        .await
        .with_context(|| "failed to connect to mongodb")?;

    let outcome = {
        let ctx = InitCtx {
            settings: &settings,
            store: connection.store(),
        };
        springboot_seed::run(&ctx, &registry).await
    };
    connection.shutdown().await;
    outcome?;

    println!("{}", COMPLETION_NOTICE);
    Ok(())
}
