//! Runtime configuration.
//!
//! Settings are merged from built-in defaults, TOML/YAML files, `TESSERA_*`
//! environment variables and programmatic overrides, then validated.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    LogFormat, LogLevel, LogOutput, LoggingConfig, SpanEventConfig, TesseraConfig,
};
pub use validation::{ConfigWarning, validate_config};
