//! Core types for the Tessera plugin engine.
//!
//! This crate defines everything a plugin author and the engine share:
//!
//! - [`PluginDescriptor`]: the immutable, static description of a discovered
//!   plugin and its [`InjectionDescriptor`]s.
//! - [`Plugin`] and the per-category traits ([`Provider`], [`Service`],
//!   [`Interceptor`], …).
//! - [`PluginRecord`]: the live, assembled unit handed to consumers.
//! - [`PluginsConfig`]: per-plugin configuration and enablement overrides.
//! - [`Discovery`] / [`StaticDiscovery`] and the [`register_plugin!`] macro.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tessera_core::*;
//!
//! #[derive(Default)]
//! struct Ping;
//! impl Plugin for Ping {}
//! impl InjectionPoints for Ping {}
//! impl Service for Ping {}
//!
//! register_plugin!(Service: Ping => Registration::new("ping"));
//! ```

pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod inject;
mod macros;
pub mod plugin;
pub mod record;
pub mod registry;
pub mod types;

#[doc(hidden)]
pub use linkme;

pub use descriptor::{
    ClassIdentity, Constructor, DEFAULT_PRIORITY, FieldInjection, HookKind, InjectionDescriptor,
    MethodInjection, PluginCategory, PluginDescriptor, Registration, TESSERA_PLUGIN_API_VERSION,
    identity_of,
};
pub use discovery::{DISCOVERED_PLUGINS, Discovery, StaticDiscovery, duplicate_names};
pub use error::{
    BoxError, InjectionError, PluginError, PluginResult, is_missing_artifact, root_cause,
};
pub use inject::{Injected, Provided};
pub use plugin::{
    AuthMechanism, AuthMechanisms, Authenticator, Authenticators, Authorizer, Authorizers,
    Category, Initializer, Initializers, InjectionPoints, Interceptor, Interceptors, Plugin,
    PluginInstance, Provider, Providers, Service, Services, TokenManager, TokenManagers,
};
pub use record::{ConfigMap, ENABLED_KEY, PluginRecord, PluginsConfig};
pub use registry::{
    CONFIG_PROVIDER, InterceptorRecord, REGISTRY_PROVIDER, Registry, RegistryHandle, ServiceRecord,
};
pub use types::{ByteStream, Contract, ExchangeType, InitPoint, InterceptPoint, TypeInfo};
