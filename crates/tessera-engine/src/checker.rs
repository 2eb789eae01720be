//! Dependency precondition check for non-provider plugins.

use std::collections::HashMap;

use tessera_core::{ClassIdentity, PluginDescriptor, PluginsConfig, TypeInfo};
use tracing::{error, warn};

use crate::graph::{ProviderTypeTable, Validation};

/// A provider that survived graph validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidProvider {
    pub class: ClassIdentity,
    pub produced: TypeInfo,
}

/// The validated provider set, by name.
#[derive(Debug, Clone, Default)]
pub struct ValidProviders {
    entries: HashMap<&'static str, ValidProvider>,
}

impl ValidProviders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the valid providers of `validation` with their produced types.
    pub fn from_validation(validation: &Validation, types: &ProviderTypeTable) -> Self {
        let mut valid = Self::new();
        for desc in &validation.valid {
            if let Some(produced) = types.get(desc.name()) {
                valid.insert(desc.name(), desc.class, produced);
            }
        }
        valid
    }

    pub fn insert(&mut self, name: &'static str, class: ClassIdentity, produced: TypeInfo) {
        self.entries.insert(name, ValidProvider { class, produced });
    }

    pub fn get(&self, name: &str) -> Option<&ValidProvider> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Returns `true` if `desc` may be instantiated.
///
/// Disabled descriptors always pass: they are never instantiated.  Otherwise
/// every field must name a valid provider whose produced type is assignable
/// to the field.  A field naming the plugin itself is reported but does not
/// fail the check on its own.
pub fn check_dependencies(
    valid: &ValidProviders,
    desc: &PluginDescriptor,
    config: &PluginsConfig,
) -> bool {
    if !config.is_descriptor_enabled(desc) {
        return true;
    }

    let mut ok = true;
    for field in desc.field_injections() {
        if field.provider == desc.name() {
            warn!(
                plugin = desc.name(),
                field = field.field,
                "Plugin depends on itself"
            );
        }

        match valid.get(field.provider) {
            None => {
                error!(
                    plugin = desc.name(),
                    category = %desc.category,
                    provider = field.provider,
                    "Plugin disabled: no provider found for '{}'",
                    field.provider
                );
                ok = false;
            }
            Some(provider) if !provider.produced.is_assignable_to(&field.declared_type) => {
                error!(
                    plugin = desc.name(),
                    category = %desc.category,
                    provider = field.provider,
                    field = field.field,
                    expected = %field.declared_type,
                    found = %provider.produced,
                    "Plugin disabled: provider type not assignable to field"
                );
                ok = false;
            }
            Some(_) => {}
        }
    }
    ok
}
