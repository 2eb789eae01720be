//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tessera_core::PluginsConfig;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TesseraConfig {
    /// Name reported in boot logs.
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Raw per-plugin arguments, keyed by plugin name.
    ///
    /// Each value is expected to be an object; see [`PluginsConfig::from_args`]
    /// for how other values are treated.
    #[serde(default, alias = "plugins-args")]
    pub plugins_args: HashMap<String, Value>,
}

impl Default for TesseraConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            logging: LoggingConfig::default(),
            plugins_args: HashMap::new(),
        }
    }
}

impl TesseraConfig {
    /// Builds the per-plugin configuration consumed by the registry.
    pub fn plugins_config(&self) -> PluginsConfig {
        PluginsConfig::from_args(
            self.plugins_args
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        )
    }
}

fn default_instance_name() -> String {
    "default".to_string()
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature.
    #[cfg(feature = "json-log")]
    Json,
}

/// Where log lines are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file, used when `output` is `file`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Number of daily log files to keep.
    #[serde(default = "default_max_files")]
    pub max_files: u32,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line in each record.
    #[serde(default)]
    pub file_location: bool,

    /// Per-module level overrides, e.g. `tessera_engine = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
            max_files: default_max_files(),
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            filters: HashMap::new(),
        }
    }
}

fn default_max_files() -> u32 {
    5
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = TesseraConfig::default();
        assert_eq!(config.instance_name, "default");
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.output, LogOutput::Stdout);
        assert_eq!(config.logging.max_files, 5);
        assert!(config.plugins_args.is_empty());
    }

    #[test]
    fn test_plugins_args_alias() {
        let config: TesseraConfig = serde_json::from_value(json!({
            "plugins-args": {
                "ping": { "enabled": false, "uri": "/ping" },
            },
        }))
        .unwrap();
        let plugins = config.plugins_config();
        assert!(!plugins.is_enabled("ping", true));
        assert_eq!(plugins.get("ping").and_then(|c| c.get("uri")), Some(&json!("/ping")));
    }

    #[test]
    fn test_level_parsing() {
        let logging: LoggingConfig =
            serde_json::from_value(json!({ "level": "debug", "filters": { "tessera_engine": "trace" } }))
                .unwrap();
        assert_eq!(logging.level, LogLevel::Debug);
        assert_eq!(logging.filters["tessera_engine"], LogLevel::Trace);
        assert_eq!(logging.level.to_tracing_level(), tracing::Level::DEBUG);
    }
}
