use std::path::Path;

use config::{Config, ConfigError, Environment, File, FileFormat};
use datafusion_pg_views::descriptor::compile_patterns;
use datafusion_pg_views::DialectRegistry;
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "pgview.toml";
pub const ENV_PREFIX: &str = "PGVIEW";
pub const MEBIBYTES: u64 = 1024 * 1024;

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct PgViewConfig {
    pub source: Source,
    #[serde(default)]
    pub runtime: Runtime,
    #[serde(default)]
    pub misc: Misc,
}

/// The remote database whose views get exposed
#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Source {
    pub connection_string: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_dialect")]
    pub dialect: String,
    /// Glob patterns for the view names to expose, tried in order
    #[serde(default = "default_tables_to_expose")]
    pub tables_to_expose: Vec<String>,
    /// Also expose base tables, not only views
    #[serde(default)]
    pub include_tables: bool,
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_dialect() -> String {
    "postgres".to_string()
}

fn default_tables_to_expose() -> Vec<String> {
    vec!["*".to_string()]
}

#[derive(Deserialize, Debug, PartialEq, Eq, Default, Clone)]
pub struct Runtime {
    /// Memory limit for query execution, in MiB
    pub max_memory: Option<u64>,
}

impl Runtime {
    /// The memory limit in bytes, if one is set
    pub fn max_memory_bytes(&self) -> Result<Option<usize>, ConfigError> {
        self.max_memory
            .map(|mib| {
                mib.checked_mul(MEBIBYTES)
                    .and_then(|bytes| usize::try_from(bytes).ok())
                    .ok_or_else(|| {
                        ConfigError::Message(format!(
                            "runtime.max_memory of {mib} MiB is too large"
                        ))
                    })
            })
            .transpose()
    }
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct Misc {
    /// Maximum number of rows in a record batch
    pub batch_size: usize,
}

impl Default for Misc {
    fn default() -> Self {
        Self { batch_size: 8192 }
    }
}

pub fn validate_config(config: PgViewConfig) -> Result<PgViewConfig, ConfigError> {
    if config.source.schema.is_empty() {
        return Err(ConfigError::Message(
            "source.schema can't be empty".to_string(),
        ));
    }

    if config.misc.batch_size == 0 {
        return Err(ConfigError::Message(
            "misc.batch_size must be positive".to_string(),
        ));
    }

    config.runtime.max_memory_bytes()?;

    let dialects = DialectRegistry::default();
    if let Err(e) = dialects.get(&config.source.dialect) {
        return Err(ConfigError::Message(format!(
            "{e}, supported dialects are {}",
            dialects.names().join(", ")
        )));
    }

    compile_patterns(&config.source.tables_to_expose)
        .map_err(|e| ConfigError::Message(e.to_string()))?;

    Ok(config)
}

fn env_source() -> Environment {
    // e.g. PGVIEW__SOURCE__SCHEMA=analytics or PGVIEW__SOURCE__TABLES_TO_EXPOSE=a_*,b
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("source.tables_to_expose")
}

pub fn load_config(path: &Path) -> Result<PgViewConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path))
        .add_source(env_source());

    config.build()?.try_deserialize().and_then(validate_config)
}

// Load a config from a string (to test our structs are defined correctly)
pub fn load_config_from_string(
    config_str: &str,
    skip_validation: bool,
) -> Result<PgViewConfig, ConfigError> {
    let config =
        Config::builder().add_source(File::from_str(config_str, FileFormat::Toml));

    if skip_validation {
        config.build()?.try_deserialize()
    } else {
        config.build()?.try_deserialize().and_then(validate_config)
    }
}
