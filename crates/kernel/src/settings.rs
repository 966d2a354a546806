use std::path::PathBuf;

use anyhow::{anyhow, Context};
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "SEED_ENV";
const CONFIG_DIR_ENV: &str = "SEED_CONFIG_DIR";

/// Deployment environment the seeder is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub seed: SeedSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, and environment overlay.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .with_context(|| "unable to resolve current directory")?
                .join("config"),
        };

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix("SEED")
                    .prefix_separator("_")
                    .separator("__"),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = parse_environment(&environment)?;

        Ok(settings)
    }
}

fn parse_environment(value: &str) -> anyhow::Result<Environment> {
    match value {
        "local" => Ok(Environment::Local),
        "staging" => Ok(Environment::Staging),
        "production" => Ok(Environment::Production),
        other => Err(anyhow!(
            "unsupported environment '{}'; expected local/staging/production",
            other
        )),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "DatabaseSettings::default_uri")]
    pub uri: String,
    #[serde(default = "DatabaseSettings::default_name")]
    pub name: String,
    #[serde(default = "DatabaseSettings::default_app_name")]
    pub app_name: String,
    #[serde(default = "DatabaseSettings::default_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "DatabaseSettings::default_timeout_ms")]
    pub server_selection_timeout_ms: u64,
}

impl DatabaseSettings {
    fn default_uri() -> String {
        "mongodb://127.0.0.1:27017".to_string()
    }

    fn default_name() -> String {
        "springboot_db".to_string()
    }

    fn default_app_name() -> String {
        "springboot-seed".to_string()
    }

    fn default_timeout_ms() -> u64 {
        10000
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            uri: Self::default_uri(),
            name: Self::default_name(),
            app_name: Self::default_app_name(),
            connect_timeout_ms: Self::default_timeout_ms(),
            server_selection_timeout_ms: Self::default_timeout_ms(),
        }
    }
}

/// How seed documents are written.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SeedMode {
    /// Plain bulk insert; re-runs duplicate anything without a unique index.
    #[default]
    Insert,
    /// Insert only documents whose natural key is not present yet.
    Upsert,
}

/// What happens to the run after a unique constraint rejects a seed document.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    #[default]
    Abort,
    Continue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedSettings {
    #[serde(default)]
    pub mode: SeedMode,
    /// Ordered inserts stop a batch at its first failing document.
    #[serde(default = "SeedSettings::default_ordered")]
    pub ordered: bool,
    #[serde(default)]
    pub on_duplicate: DuplicatePolicy,
    #[serde(default = "SeedSettings::default_created_by")]
    pub created_by: String,
    #[serde(default)]
    pub app_user: Option<AppUserSettings>,
}

impl SeedSettings {
    fn default_ordered() -> bool {
        true
    }

    fn default_created_by() -> String {
        "system".to_string()
    }
}

impl Default for SeedSettings {
    fn default() -> Self {
        Self {
            mode: SeedMode::default(),
            ordered: Self::default_ordered(),
            on_duplicate: DuplicatePolicy::default(),
            created_by: Self::default_created_by(),
            app_user: None,
        }
    }
}

/// Application login created on the target database before seeding.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AppUserSettings {
    pub username: String,
    pub password: String,
    #[serde(default = "AppUserSettings::default_roles")]
    pub roles: Vec<String>,
}

impl AppUserSettings {
    fn default_roles() -> Vec<String> {
        vec!["readWrite".to_string()]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default = "TelemetrySettings::default_level")]
    pub level: String,
}

impl TelemetrySettings {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            level: Self::default_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
