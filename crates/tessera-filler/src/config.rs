//! Filler configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tessera_exceptions::{Exception, ParseExceptionError};
use tessera_t8n::{Engine, ExternalTool, ExternalToolConfig};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`FillConfig`]
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// An exception override names a kind that does not exist
    #[error("exception override for {name}: {source}")]
    UnknownException {
        /// Name as written
        name: String,
        /// Parse failure
        #[source]
        source: ParseExceptionError,
    },

    /// Zero workers would never fill anything
    #[error("workers must be at least 1")]
    NoWorkers,
}

/// Transition tool section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct T8nConfig {
    /// Executable; defaults to the engine's usual binary (`evm` for geth)
    #[serde(default)]
    pub binary: Option<PathBuf>,
    /// Wire dialect
    #[serde(default)]
    pub engine: Engine,
    /// Per-invocation timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Collect EVM traces
    #[serde(default)]
    pub trace: bool,
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for T8nConfig {
    fn default() -> Self {
        Self {
            binary: None,
            engine: Engine::default(),
            timeout_secs: default_timeout_secs(),
            trace: false,
        }
    }
}

/// Top-level filler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillConfig {
    /// Root of the fixture tree
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Scenarios filled concurrently
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Chain id every scenario must be signed for
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// Default log level when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Transition tool
    #[serde(default)]
    pub t8n: T8nConfig,
    /// Extra engine message substrings, keyed by exception name
    #[serde(default)]
    pub exception_overrides: BTreeMap<String, Vec<String>>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("fixtures")
}

fn default_workers() -> usize {
    4
}

fn default_chain_id() -> u64 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            workers: default_workers(),
            chain_id: default_chain_id(),
            log_level: default_log_level(),
            t8n: T8nConfig::default(),
            exception_overrides: BTreeMap::new(),
        }
    }
}

impl FillConfig {
    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FillConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Load from a file, or use the defaults if it does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        self.overrides()?;
        Ok(())
    }

    fn overrides(&self) -> Result<Vec<(Exception, Vec<String>)>, ConfigError> {
        self.exception_overrides
            .iter()
            .map(|(name, substrings)| {
                name.parse::<Exception>()
                    .map(|kind| (kind, substrings.clone()))
                    .map_err(|source| ConfigError::UnknownException {
                        name: name.clone(),
                        source,
                    })
            })
            .collect()
    }

    /// Per-invocation timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.t8n.timeout_secs)
    }

    /// The configured engine with its exception table and overrides
    pub fn transition_tool(&self) -> Result<ExternalTool, ConfigError> {
        let mut tool_config = ExternalToolConfig::new(self.t8n.engine)
            .timeout(self.timeout())
            .trace(self.t8n.trace);
        if let Some(binary) = &self.t8n.binary {
            tool_config = tool_config.binary(binary.clone());
        }

        let mut exceptions = self.t8n.engine.exception_map();
        for (kind, substrings) in self.overrides()? {
            exceptions.extend(kind, substrings);
        }
        Ok(ExternalTool::new(tool_config).with_exception_map(exceptions))
    }
}
