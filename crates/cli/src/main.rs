use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};

use seed_db::MemoryStore;
use seed_kernel::settings::{DuplicatePolicy, SeedMode, Settings};
use seed_kernel::{DocumentStore, InitCtx};
use springboot_seed::{InitReport, COMPLETION_NOTICE};

#[derive(Debug, Parser)]
#[command(name = "seed-cli", version, about = "Seed and inspect the springboot_db database")]
struct Cli {
    /// MongoDB connection string, overriding configuration
    #[arg(long, global = true)]
    uri: Option<String>,

    /// Target database name, overriding configuration
    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create indexes and insert seed documents
    Init {
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Insert every non-conflicting document of a batch instead of stopping at the first
        #[arg(long)]
        unordered: bool,

        /// Report unique constraint violations and keep seeding the next collection
        #[arg(long)]
        continue_on_duplicate: bool,

        /// Run against an in-memory store instead of MongoDB
        #[arg(long)]
        dry_run: bool,
    },
    /// Report declared indexes and document counts; fails when anything is missing
    Verify,
    /// Print the index plan and seed documents as JSON without connecting
    Plan,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Insert,
    Upsert,
}

impl From<ModeArg> for SeedMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Insert => SeedMode::Insert,
            ModeArg::Upsert => SeedMode::Upsert,
        }
    }
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(uri) = &self.uri {
            settings.database.uri = uri.clone();
        }
        if let Some(database) = &self.database {
            settings.database.name = database.clone();
        }
        if let Command::Init {
            mode,
            unordered,
            continue_on_duplicate,
            ..
        } = &self.command
        {
            if let Some(mode) = mode {
                settings.seed.mode = (*mode).into();
            }
            if *unordered {
                settings.seed.ordered = false;
            }
            if *continue_on_duplicate {
                settings.seed.on_duplicate = DuplicatePolicy::Continue;
            }
        }
    }
}

fn print_init_report(report: &InitReport) {
    for entry in &report.seed.collections {
        println!(
            "{}: {} inserted, {} skipped, {} indexes",
            entry.collection,
            entry.inserted,
            entry.skipped,
            report.index_count(&entry.collection)
        );
        if let Some(violation) = &entry.violation {
            println!("  duplicate: {}", violation);
        }
    }
}

async fn init(settings: &Settings, dry_run: bool) -> anyhow::Result<()> {
    let registry = springboot_seed::registry();

    let report = if dry_run {
        let store = MemoryStore::new(settings.database.name.clone());
        run_on(settings, &store, &registry).await?
    } else {
        let connection = seed_db::connect(&settings.database)
            .await
            .with_context(|| "failed to connect to mongodb")?;
        let outcome = run_on(settings, connection.store(), &registry).await;
        connection.shutdown().await;
        outcome?
    };

    print_init_report(&report);
    println!("{}", COMPLETION_NOTICE);
    Ok(())
}

async fn run_on(
    settings: &Settings,
    store: &dyn DocumentStore,
    registry: &seed_kernel::CollectionRegistry,
) -> anyhow::Result<InitReport> {
    let ctx = InitCtx { settings, store };
    springboot_seed::run(&ctx, registry).await
}

async fn verify(settings: &Settings) -> anyhow::Result<()> {
    let registry = springboot_seed::registry();
    let connection = seed_db::connect(&settings.database)
        .await
        .with_context(|| "failed to connect to mongodb")?;

    let outcome = {
        let ctx = InitCtx {
            settings,
            store: connection.store(),
        };
        springboot_seed::verify::verify(&ctx, &registry).await
    };
    connection.shutdown().await;
    let report = outcome?;

    print!("{}", report);
    if !report.is_complete() {
        bail!("database '{}' is not fully initialized", report.database);
    }
    Ok(())
}

fn plan(settings: &Settings) -> anyhow::Result<()> {
    let plan = springboot_seed::plan::describe(&springboot_seed::registry(), settings)?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().with_context(|| "failed to load seeder settings")?;
    cli.apply(&mut settings);
    seed_telemetry::init(&settings.telemetry)?;

    tracing::debug!(
        env = ?settings.environment,
        db = %settings.database.name,
        command = ?cli.command,
        "seed-cli starting"
    );

    match cli.command {
        Command::Init { dry_run, .. } => init(&settings, dry_run).await,
        Command::Verify => verify(&settings).await,
        Command::Plan => plan(&settings),
    }
}
