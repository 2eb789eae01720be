//! Boot sequence: configuration, logging, registry assembly and
//! initializer execution.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tessera_runtime::TesseraRuntime;
//!
//! let runtime = TesseraRuntime::builder()
//!     .config_file("config/tessera.toml")
//!     .profile("production")
//!     .build()?;
//!
//! runtime.boot();
//! // ... start serving ...
//! runtime.after_startup();
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use tessera_core::{
    Discovery, InitPoint, PluginCategory, PluginError, Registry, StaticDiscovery,
    is_missing_artifact,
};
use tessera_engine::{MISSING_ARTIFACT_HINT, PluginRegistry, guarded, log_failure};
use tracing::{debug, info, info_span, warn};

use crate::config::{ConfigLoader, TesseraConfig};
use crate::error::RuntimeResult;
use crate::logging;

/// An initializer that failed at its init point.
#[derive(Debug)]
pub struct InitializerFailure {
    pub initializer: &'static str,
    pub point: InitPoint,
    pub error: PluginError,
}

impl fmt::Display for InitializerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if is_missing_artifact(&self.error) {
            write!(f, "initializer {} ({}): {MISSING_ARTIFACT_HINT}", self.initializer, self.point)
        } else {
            write!(f, "initializer {} ({}): {}", self.initializer, self.point, self.error)
        }
    }
}

/// Owns the plugin registry and drives it through the host lifecycle.
pub struct TesseraRuntime {
    config: TesseraConfig,
    registry: Arc<PluginRegistry>,
    before_startup: OnceLock<Vec<InitializerFailure>>,
    after_startup: OnceLock<Vec<InitializerFailure>>,
}

impl TesseraRuntime {
    /// Creates a runtime from the default configuration locations.
    ///
    /// If loading fails, default settings are used.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                TesseraConfig::default()
            });
        Self::from_config(&config)
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime over every plugin registered with `register_plugin!`.
    pub fn from_config(config: &TesseraConfig) -> Self {
        Self::with_discovery(config, StaticDiscovery::collect_all())
    }

    /// Creates a runtime over an explicit descriptor source.
    ///
    /// Initializes logging from `config` unless a subscriber is already
    /// installed.
    pub fn with_discovery(config: &TesseraConfig, discovery: impl Discovery + 'static) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            instance = %config.instance_name,
            log_level = %config.logging.level,
            plugins_configured = config.plugins_args.len(),
            "Runtime initialized from configuration"
        );

        Self {
            registry: PluginRegistry::new(discovery, config.plugins_config()),
            config: config.clone(),
            before_startup: OnceLock::new(),
            after_startup: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &TesseraConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Assembles the registry and runs the `BeforeStartup` initializers.
    ///
    /// Runs once; later calls return the failures of the first run.
    pub fn boot(&self) -> &[InitializerFailure] {
        self.before_startup.get_or_init(|| {
            let span = info_span!("boot", instance = %self.config.instance_name);
            let _enter = span.enter();

            let report = self.registry.assemble();
            if !report.failures.is_empty() {
                warn!(
                    failed = report.failures.len(),
                    "Some plugins were registered without their dependencies"
                );
            }
            self.run_initializers(InitPoint::BeforeStartup)
        })
    }

    /// Runs the `AfterStartup` initializers, booting first if needed.
    ///
    /// Runs once; later calls return the failures of the first run.
    pub fn after_startup(&self) -> &[InitializerFailure] {
        self.boot();
        self.after_startup.get_or_init(|| {
            let failures = self.run_initializers(InitPoint::AfterStartup);
            info!(stats = %self.stats(), "Startup complete");
            failures
        })
    }

    pub fn is_booted(&self) -> bool {
        self.before_startup.get().is_some()
    }

    /// Runs every initializer bound to `point`, in priority order.
    ///
    /// A failing or panicking initializer is logged and skipped.
    fn run_initializers(&self, point: InitPoint) -> Vec<InitializerFailure> {
        let registry: &dyn Registry = &*self.registry;
        let mut failures = Vec::new();

        for init in self
            .registry
            .initializers()
            .iter()
            .filter(|i| i.registration.init_point == point)
        {
            match guarded(init.name, || init.instance.init(registry)) {
                Ok(()) => debug!(initializer = init.name, %point, "Executed initializer"),
                Err(error) => {
                    log_failure(PluginCategory::Initializer, init.name, "Error executing", &error);
                    failures.push(InitializerFailure {
                        initializer: init.name,
                        point,
                        error,
                    });
                }
            }
        }
        failures
    }

    /// Snapshot of the assembled registry.
    pub fn stats(&self) -> RegistryStats {
        let registry = &self.registry;
        let initializer_failures = self.before_startup.get().map_or(0, Vec::len)
            + self.after_startup.get().map_or(0, Vec::len);

        RegistryStats {
            providers: registry.providers().len(),
            initializers: registry.initializers().len(),
            auth_mechanisms: registry.auth_mechanisms().len(),
            authorizers: registry.authorizers().len(),
            token_managers: usize::from(registry.token_manager().is_some()),
            authenticators: registry.authenticators().len(),
            interceptors: registry.interceptors().len(),
            services: registry.services().len(),
            excluded_providers: registry.validation().findings.len(),
            injection_failures: registry.injection_failures().len(),
            initializer_failures,
        }
    }
}

impl Default for TesseraRuntime {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// RegistryStats
// =============================================================================

/// Counts of assembled plugins and failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub providers: usize,
    pub initializers: usize,
    pub auth_mechanisms: usize,
    pub authorizers: usize,
    /// 0 or 1.
    pub token_managers: usize,
    pub authenticators: usize,
    pub interceptors: usize,
    pub services: usize,
    /// Providers rejected by graph validation.
    pub excluded_providers: usize,
    pub injection_failures: usize,
    pub initializer_failures: usize,
}

impl fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Plugins: {} providers, {} initializers, {} auth mechanisms, {} authorizers, \
             {} token managers, {} authenticators, {} interceptors, {} services; \
             {} providers excluded, {} injection failures, {} initializer failures",
            self.providers,
            self.initializers,
            self.auth_mechanisms,
            self.authorizers,
            self.token_managers,
            self.authenticators,
            self.interceptors,
            self.services,
            self.excluded_providers,
            self.injection_failures,
            self.initializer_failures
        )
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`TesseraRuntime`] with custom configuration.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    discovery: Option<Box<dyn Discovery>>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            discovery: None,
        }
    }

    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges a whole configuration over the loaded sources.
    pub fn merge(mut self, config: TesseraConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Overrides a single configuration key.
    pub fn set(mut self, key: &str, value: impl serde::Serialize) -> Self {
        self.config_loader = self.config_loader.set(key, value);
        self
    }

    /// Replaces link-time discovery with another descriptor source.
    pub fn discovery(mut self, discovery: impl Discovery + 'static) -> Self {
        self.discovery = Some(Box::new(discovery));
        self
    }

    /// Loads the configuration and builds the runtime.
    pub fn build(self) -> RuntimeResult<TesseraRuntime> {
        let config = self.config_loader.load()?;
        Ok(match self.discovery {
            Some(discovery) => TesseraRuntime::with_discovery(&config, discovery),
            None => TesseraRuntime::from_config(&config),
        })
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
