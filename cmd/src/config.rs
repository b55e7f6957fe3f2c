//! Configuration module for parsing YAML configuration files.

use nm_ruleset::engine::{Engine, DEFAULT_MAX_EXPR_DEPTH, DEFAULT_MAX_OPERATIONS};
use serde::Deserialize;
use snafu::{OptionExt, ResultExt, Snafu};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    #[snafu(display("failed to read {}: {}", path, source))]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[snafu(display("failed to parse YAML: {}", source))]
    Parse { source: serde_yaml::Error },

    #[snafu(display("invalid log level '{}'", level))]
    LogLevel { level: String },
}

/// Main configuration struct that holds all configuration options for the application.
#[derive(Deserialize, Debug, Default)]
pub struct CliConfig {
    /// Logging configuration.
    #[serde(default)]
    pub log: CliConfigLog,
    /// Expression engine limits.
    #[serde(default)]
    pub engine: CliConfigEngine,
}

/// Logging configuration struct.
#[derive(Deserialize, Debug)]
pub struct CliConfigLog {
    /// One of trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Colored output.
    #[serde(default = "default_true")]
    pub ansi: bool,
    /// Include source file and line in each event.
    #[serde(default)]
    pub with_file: bool,
}

/// Expression engine configuration struct.
#[derive(Deserialize, Debug)]
pub struct CliConfigEngine {
    /// Maximum operations per evaluation, 0 disables the limit.
    #[serde(default = "default_max_operations")]
    pub max_operations: u64,
    /// Maximum nesting depth of an expression.
    #[serde(default = "default_max_expr_depth")]
    pub max_expr_depth: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_operations() -> u64 {
    DEFAULT_MAX_OPERATIONS
}

fn default_max_expr_depth() -> usize {
    DEFAULT_MAX_EXPR_DEPTH
}

impl CliConfigLog {
    pub fn max_level(&self) -> Result<tracing::Level, ConfigError> {
        self.level
            .parse::<tracing::Level>()
            .ok()
            .context(LogLevelSnafu { level: &self.level })
    }
}

impl CliConfigEngine {
    /// Engine settings with these limits.
    pub fn engine(&self) -> Engine {
        Engine::new(self.max_operations, self.max_expr_depth)
    }
}

/// Parses YAML configuration from a string and returns a `CliConfig` struct.
pub fn load_config_from_string(yaml_str: &str) -> Result<CliConfig, ConfigError> {
    serde_yaml::from_str(yaml_str).context(ParseSnafu)
}

/// Parses YAML configuration from a file and returns a `CliConfig` struct.
pub async fn load_config_from_file(file_path: &str) -> Result<CliConfig, ConfigError> {
    let file = File::open(file_path)
        .await
        .context(ReadSnafu { path: file_path })?;

    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader
        .read_to_string(&mut contents)
        .await
        .context(ReadSnafu { path: file_path })?;

    load_config_from_string(&contents)
}

/// Provide default values by implementing `Default` trait for each struct
impl Default for CliConfigLog {
    fn default() -> Self {
        CliConfigLog {
            level: default_log_level(),
            ansi: true,
            with_file: false,
        }
    }
}

impl Default for CliConfigEngine {
    fn default() -> Self {
        CliConfigEngine {
            max_operations: default_max_operations(),
            max_expr_depth: default_max_expr_depth(),
        }
    }
}
