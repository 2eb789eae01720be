//! Dependency resolution and lifecycle engine for Tessera plugins.
//!
//! The pipeline, leaf first:
//!
//! 1. [`GraphValidator`] reduces the provider dependency graph to a valid,
//!    acyclic fixpoint.
//! 2. [`check_dependencies`] gates every non-provider plugin on the valid
//!    provider set.
//! 3. [`PluginFactory`] instantiates each category in priority order, one
//!    plugin failure never affecting another.
//! 4. [`Injector`] fills injected fields and runs post-construct hooks.
//! 5. [`PluginRegistry`] drives the above once and serves the assembled
//!    collections, including the cached [`InterceptorIndex`] view.
//!
//! The engine also supplies the [`builtin`] `config` and `registry`
//! providers.
//!
//! ```rust,ignore
//! use tessera_core::{PluginsConfig, Registry, StaticDiscovery};
//! use tessera_engine::PluginRegistry;
//!
//! let registry = PluginRegistry::new(StaticDiscovery::collect_all(), PluginsConfig::new());
//! for service in registry.services() {
//!     println!("{} ({})", service.name, service.implementation);
//! }
//! ```

pub mod builtin;
pub mod checker;
pub mod factory;
pub mod graph;
pub mod injector;
pub mod interceptors;
pub mod registry;

pub use checker::{ValidProvider, ValidProviders, check_dependencies};
pub use factory::{Instantiated, MISSING_ARTIFACT_HINT, PendingInjection, PluginFactory, log_failure};
pub use graph::{Exclusion, Finding, GraphValidator, ProviderTypeTable, Validation};
pub use injector::{InjectionFailure, InjectionReport, Injector, guarded};
pub use interceptors::{InterceptorIndex, applicable_interceptors};
pub use registry::PluginRegistry;
