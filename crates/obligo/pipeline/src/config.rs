//! Configuration for obligo-pipeline

use std::path::{Path, PathBuf};

use obligo_engine::EngineConfig;
use obligo_ledger::LedgerHandle;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Environment variable prefix, e.g. `OBLIGO_ENGINE__PROXIMITY_WINDOW=300`.
pub const ENV_PREFIX: &str = "OBLIGO";

/// Keys read from the environment as comma-separated lists, e.g.
/// `OBLIGO_DETECTION__DISABLED_PATTERNS=req.should,req.may`.
const ENV_LIST_KEYS: [&str; 1] = ["detection.disabled_patterns"];

/// Main pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub detection: DetectionConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Rule selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Builtin pattern ids to leave out. A non-empty list yields a
    /// `+filtered` ruleset version.
    #[serde(default)]
    pub disabled_patterns: Vec<String>,
}

/// Ledger location
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Ledger directory; no ledger is recorded when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl LedgerConfig {
    /// Open the configured ledger directory, or `None` when none is set.
    pub fn open(&self) -> Result<Option<LedgerHandle>> {
        match &self.directory {
            Some(dir) => Ok(Some(LedgerHandle::open(dir)?)),
            None => Ok(None),
        }
    }
}

/// Batch fan-out
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Worker threads for `analyze_batch`; 0 means available parallelism.
    #[serde(default)]
    pub max_threads: usize,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl PipelineConfig {
    /// Layer defaults, an optional file, then `OBLIGO_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&PipelineConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let mut environment = config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .try_parsing(true);
        for key in ENV_LIST_KEYS {
            environment = environment.with_list_parse_key(key);
        }
        builder = builder.add_source(environment);

        Ok(builder.build()?.try_deserialize()?)
    }
}
