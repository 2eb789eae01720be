//! # Tessera
//!
//! Dependency resolution and lifecycle engine for plugins registered at
//! link time.
//!
//! ## Architecture
//!
//! ```text
//! register_plugin! ──▶ Discovery ──▶ GraphValidator ──▶ PluginFactory ──▶ Injector ──▶ PluginRegistry
//!  (descriptors)                     (providers)        (per category)    (fields,      (services,
//!                                                                          hooks)        interceptors, …)
//! ```
//!
//! - **Descriptors**: static metadata per plugin: category, name, priority,
//!   injection points and a constructor
//! - **Providers**: named plugins producing values injected into other plugins
//! - **Registry**: the assembled collections, queried by the host
//! - **Runtime**: configuration, logging and initializer execution at the
//!   host's init points
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tessera::prelude::*;
//!
//! struct Clock;
//!
//! #[derive(Default, Plugin)]
//! #[plugin(crate = tessera::core)]
//! struct ClockProvider;
//!
//! impl Provider for ClockProvider {
//!     fn produced_type(&self) -> TypeInfo {
//!         TypeInfo::of::<Clock>()
//!     }
//!     fn produce(&self, _: &PluginRecord<dyn Plugin>) -> Result<Provided, PluginError> {
//!         Ok(Provided::new(Clock))
//!     }
//! }
//!
//! #[derive(Default, Plugin)]
//! #[plugin(crate = tessera::core)]
//! struct Status {
//!     #[inject("clock")]
//!     clock: Injected<Clock>,
//! }
//!
//! impl Service for Status {}
//!
//! register_plugin!(Provider: ClockProvider => Registration::new("clock"));
//! register_plugin!(Service: Status => Registration::new("status"));
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = TesseraRuntime::builder().build()?;
//!     runtime.boot();
//!     runtime.after_startup();
//!     Ok(())
//! }
//! ```
//!
//! The derive macro refers to `::tessera_core` unless told otherwise, hence
//! the `#[plugin(crate = ...)]` attribute in crates depending only on this
//! facade.
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use tessera_core as core;
pub use tessera_engine as engine;
pub use tessera_runtime as runtime;

pub use tessera_core::{register_plugin, plugin_descriptor};
pub use tessera_macros::Plugin;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use tessera::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use tessera_runtime::{RegistryStats, TesseraRuntime};

    // Registry and its consumer-facing surface
    pub use tessera_core::{ConfigMap, Registry, RegistryHandle};
    pub use tessera_engine::PluginRegistry;

    // Declaring plugins
    pub use tessera_core::{
        Contract, InitPoint, Injected, InterceptPoint, Plugin, PluginCategory, PluginDescriptor,
        PluginError, PluginRecord, Provided, Registration, TypeInfo, plugin_descriptor,
        register_plugin,
    };
    pub use tessera_macros::Plugin;

    // Category traits
    pub use tessera_core::{
        AuthMechanism, Authenticator, Authorizer, Initializer, Interceptor, Provider, Service,
        TokenManager,
    };
}
