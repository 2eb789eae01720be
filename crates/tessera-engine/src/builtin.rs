//! Providers supplied by the engine itself.
//!
//! `config` hands every consumer its own configuration section and
//! `registry` a [`RegistryHandle`].  They are validated like discovered
//! providers, so a consumer declaring the wrong field type is still
//! excluded, but their names are reserved: a discovered provider using one
//! is rejected.

use std::sync::{Arc, Weak};

use tessera_core::{
    CONFIG_PROVIDER, ClassIdentity, ConfigMap, Plugin, PluginCategory, PluginDescriptor,
    PluginError, PluginRecord, Provided, Provider, Providers, REGISTRY_PROVIDER, Registration,
    Registry, RegistryHandle, TypeInfo,
};

use crate::factory::{Instantiated, PluginFactory};

/// Built-ins sort ahead of every discovered provider.
const BUILTIN_PRIORITY: i32 = i32::MIN;

pub static CONFIG: PluginDescriptor = PluginDescriptor::new(
    PluginCategory::Provider,
    ClassIdentity::new(concat!(module_path!(), "::ConfigProvider")),
    Registration::new(CONFIG_PROVIDER)
        .description("Injects the consumer's configuration section")
        .priority(BUILTIN_PRIORITY),
);

pub static REGISTRY: PluginDescriptor = PluginDescriptor::new(
    PluginCategory::Provider,
    ClassIdentity::new(concat!(module_path!(), "::RegistryProvider")),
    Registration::new(REGISTRY_PROVIDER)
        .description("Injects a handle to the plugin registry")
        .priority(BUILTIN_PRIORITY),
);

pub fn descriptors() -> [PluginDescriptor; 2] {
    [CONFIG, REGISTRY]
}

pub fn is_reserved(name: &str) -> bool {
    name == CONFIG_PROVIDER || name == REGISTRY_PROVIDER
}

/// Registers the enabled built-ins with `factory`.
pub(crate) fn instantiate(
    factory: &PluginFactory,
    registry: Weak<dyn Registry>,
) -> Vec<Instantiated<Providers>> {
    let config: Arc<dyn Provider> = Arc::new(ConfigProvider);
    let registry: Arc<dyn Provider> = Arc::new(RegistryProvider { registry });
    [(&CONFIG, config), (&REGISTRY, registry)]
        .into_iter()
        .filter_map(|(desc, instance)| factory.adopt_provider(desc, instance))
        .collect()
}

/// Produces the consumer's `plugins_args` section, empty if it has none.
struct ConfigProvider;

impl Plugin for ConfigProvider {}

impl Provider for ConfigProvider {
    fn produced_type(&self) -> TypeInfo {
        TypeInfo::of::<ConfigMap>()
    }

    fn produce(&self, consumer: &PluginRecord<dyn Plugin>) -> Result<Provided, PluginError> {
        Ok(Provided::new(consumer.config.clone().unwrap_or_default()))
    }
}

struct RegistryProvider {
    registry: Weak<dyn Registry>,
}

impl Plugin for RegistryProvider {}

impl Provider for RegistryProvider {
    fn produced_type(&self) -> TypeInfo {
        TypeInfo::of::<RegistryHandle>()
    }

    fn produce(&self, _: &PluginRecord<dyn Plugin>) -> Result<Provided, PluginError> {
        Ok(Provided::new(RegistryHandle::new(self.registry.clone())))
    }
}
