//! Error types for plugin construction, injection and lifecycle hooks.

use std::error::Error as StdError;

use thiserror::Error;

/// Boxed error used as the source of wrapped failures.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors raised while assembling a single plugin.
///
/// None of these ever abort the boot sequence: the engine logs them and the
/// affected plugin is left out (or, for injection failures, left with the
/// field unset).
#[derive(Debug, Error)]
pub enum PluginError {
    /// The plugin is structurally invalid: no usable constructor, a
    /// mismatched lifecycle hook, an incompatible API version, a failing
    /// hook or an unmet dependency precondition.
    #[error("plugin '{plugin}': {message}")]
    Configuration {
        plugin: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A named provider could not be resolved at injection time.
    #[error("plugin '{plugin}': no provider found for field '{field}' (provider '{provider}')")]
    NoProvider {
        plugin: String,
        field: String,
        provider: String,
    },

    /// An external library or artifact the plugin needs is not available.
    #[error("missing external artifact '{artifact}'")]
    MissingArtifact { artifact: String },

    /// A value could not be stored in an injection slot.
    #[error(transparent)]
    Injection(#[from] InjectionError),

    /// A constructor, provider or hook panicked.
    #[error("plugin '{plugin}' panicked: {message}")]
    Panicked { plugin: String, message: String },

    /// Free-form error raised by plugin code.
    #[error("{0}")]
    Custom(String),

    /// Any other error raised by plugin code.
    #[error("{0}")]
    Other(#[source] BoxError),
}

impl PluginError {
    /// Creates a configuration error without an underlying cause.
    pub fn configuration(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            plugin: plugin.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a configuration error wrapping `source`.
    pub fn configuration_caused_by(
        plugin: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Configuration {
            plugin: plugin.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn missing_artifact(artifact: impl Into<String>) -> Self {
        Self::MissingArtifact {
            artifact: artifact.into(),
        }
    }

    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Wraps an error from a foreign library, keeping it as the source.
    pub fn other(err: impl Into<BoxError>) -> Self {
        Self::Other(err.into())
    }
}

/// Errors raised by a plugin's generated injection setter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InjectionError {
    #[error("no injectable field named '{field}'")]
    UnknownField { field: String },

    #[error("field '{field}' expects '{expected}' but the provider produced '{found}'")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("field '{field}' has already been injected")]
    AlreadyInjected { field: String },
}

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

// ─── Cause-chain helpers ──────────────────────────────────────────────────────

/// Follows `source()` to the innermost error.
pub fn root_cause<'a>(err: &'a (dyn StdError + 'static)) -> &'a (dyn StdError + 'static) {
    let mut current = err;
    while let Some(next) = current.source() {
        current = next;
    }
    current
}

/// Returns `true` if any error in the chain reports a missing external
/// artifact.
pub fn is_missing_artifact(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if matches!(
            e.downcast_ref::<PluginError>(),
            Some(PluginError::MissingArtifact { .. })
        ) {
            return true;
        }
        current = e.source();
    }
    false
}
