use std::collections::HashMap;
use std::path::Path;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use sqlx::sqlite::SqliteJournalMode;
use tracing::warn;

pub const DEFAULT_DATA_FILE: &str = "sqlbench.sqlite";
pub const DEFAULT_CONFIG_FILE: &str = "sqlbench.toml";
const ENV_PREFIX: &str = "SQLBENCH";

#[derive(Deserialize, Debug, PartialEq, Eq, Default, Clone)]
pub struct SqlbenchConfig {
    #[serde(default)]
    pub store: Store,
    pub generator: Option<Generator>,
    #[serde(default)]
    pub misc: Misc,
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    #[default]
    Wal,
    Off,
}

impl From<JournalMode> for SqliteJournalMode {
    fn from(mode: JournalMode) -> Self {
        match mode {
            JournalMode::Delete => SqliteJournalMode::Delete,
            JournalMode::Truncate => SqliteJournalMode::Truncate,
            JournalMode::Persist => SqliteJournalMode::Persist,
            JournalMode::Memory => SqliteJournalMode::Memory,
            JournalMode::Wal => SqliteJournalMode::Wal,
            JournalMode::Off => SqliteJournalMode::Off,
        }
    }
}

/// Where the durable store (database images, history, preferences) lives
#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct Store {
    pub dsn: String,
    pub journal_mode: JournalMode,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            dsn: DEFAULT_DATA_FILE.to_string(),
            journal_mode: JournalMode::default(),
        }
    }
}

/// OpenAI-compatible chat completion endpoint for natural-language queries
#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Generator {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_tokens() -> u32 {
    512
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct Misc {
    /// Append every successfully executed statement to the history log
    pub record_history: bool,
    /// Persist the database after row-returning statements even when they
    /// can't have written anything
    pub persist_read_only: bool,
}

impl Default for Misc {
    fn default() -> Self {
        Self {
            record_history: true,
            persist_read_only: true,
        }
    }
}

pub fn validate_config(config: SqlbenchConfig) -> Result<SqlbenchConfig, ConfigError> {
    if config.store.dsn.contains(":memory:") {
        warn!("Using an in-memory store: nothing will survive a restart");
    }

    if let Some(generator) = &config.generator {
        if generator.endpoint.trim().is_empty() {
            return Err(ConfigError::Message(
                "The generator endpoint can't be empty".to_string(),
            ));
        }
    }

    Ok(config)
}

fn env_source(env_override: Option<HashMap<String, String>>) -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
        .source(env_override)
}

/// Load the config from a TOML file, overlaid with `SQLBENCH__*` environment
/// variables. A missing file is only an error if `required` is set.
pub fn load_config(path: &Path, required: bool) -> Result<SqlbenchConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path).required(required))
        .add_source(env_source(None));

    config.build()?.try_deserialize().and_then(validate_config)
}

// Load a config from a string (to test our structs are defined correctly)
pub fn load_config_from_string(
    config_str: &str,
    skip_validation: bool,
    env_override: Option<HashMap<String, String>>,
) -> Result<SqlbenchConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(config_str, FileFormat::Toml))
        .add_source(env_source(env_override));

    if skip_validation {
        config.build()?.try_deserialize()
    } else {
        config.build()?.try_deserialize().and_then(validate_config)
    }
}
