//! Configuration validation utilities.

use std::fmt;

use serde_json::Value;

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, TesseraConfig};

/// A problem that does not prevent booting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A `plugins_args` entry is not a map and will be treated as empty.
    PluginArgsNotMap { plugin: String },
    /// A per-module filter names an empty module.
    EmptyFilterModule,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PluginArgsNotMap { plugin } => {
                write!(f, "args of plugin '{plugin}' are not a map and will be ignored")
            }
            Self::EmptyFilterModule => f.write_str("logging filter with an empty module name"),
        }
    }
}

/// Validates the entire configuration.
///
/// Returns the warnings found if the configuration is usable.
pub fn validate_config(config: &TesseraConfig) -> ConfigResult<Vec<ConfigWarning>> {
    if config.instance_name.trim().is_empty() {
        return Err(ConfigError::missing_field("instance_name"));
    }

    let mut warnings = validate_logging(&config.logging)?;

    let mut plugins: Vec<_> = config
        .plugins_args
        .iter()
        .filter(|(_, value)| !matches!(value, Value::Object(_)))
        .map(|(name, _)| name.clone())
        .collect();
    plugins.sort();
    warnings.extend(
        plugins
            .into_iter()
            .map(|plugin| ConfigWarning::PluginArgsNotMap { plugin }),
    );

    Ok(warnings)
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<Vec<ConfigWarning>> {
    if logging.output == LogOutput::File {
        if logging.file_path.is_none() {
            return Err(ConfigError::missing_field("logging.file_path"));
        }
        if logging.max_files == 0 {
            return Err(ConfigError::validation(
                "logging.max_files must be greater than 0 when logging to a file",
            ));
        }
    }

    let mut warnings = Vec::new();
    if logging.filters.keys().any(|module| module.trim().is_empty()) {
        warnings.push(ConfigWarning::EmptyFilterModule);
    }
    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_validate_default_config() {
        let config = TesseraConfig::default();
        assert!(validate_config(&config).unwrap().is_empty());
    }

    #[test]
    fn test_file_output_requires_path() {
        let mut config = TesseraConfig::default();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));

        config.logging.file_path = Some(PathBuf::from("logs/tessera.log"));
        assert!(validate_config(&config).is_ok());

        config.logging.max_files = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_non_map_plugin_args_warn() {
        let mut config = TesseraConfig::default();
        config.plugins_args.insert("ok".into(), json!({ "enabled": true }));
        config.plugins_args.insert("scalar".into(), json!(42));
        config.plugins_args.insert("list".into(), json!([1, 2]));

        let warnings = validate_config(&config).unwrap();
        assert_eq!(
            warnings,
            [
                ConfigWarning::PluginArgsNotMap { plugin: "list".into() },
                ConfigWarning::PluginArgsNotMap { plugin: "scalar".into() },
            ]
        );
    }

    #[test]
    fn test_empty_filter_module_warns() {
        let mut config = TesseraConfig::default();
        config.logging.filters.insert(" ".into(), LogLevel::Debug);
        assert_eq!(validate_config(&config).unwrap(), [ConfigWarning::EmptyFilterModule]);
    }

    #[test]
    fn test_blank_instance_name() {
        let config = TesseraConfig {
            instance_name: "  ".into(),
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
