//! Live plugin records and per-plugin configuration.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::descriptor::{PluginDescriptor, Registration};

/// Per-plugin configuration section.
pub type ConfigMap = serde_json::Map<String, Value>;

/// Key of the configuration entry overriding `enabled_by_default`.
pub const ENABLED_KEY: &str = "enabled";

// ─── PluginsConfig ────────────────────────────────────────────────────────────

/// Plugin name → configuration section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginsConfig {
    sections: HashMap<String, ConfigMap>,
}

impl PluginsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the configuration from raw per-plugin values.
    ///
    /// A value that is not a JSON object is replaced by an empty map.
    pub fn from_args<I, K>(args: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let sections = args
            .into_iter()
            .map(|(name, value)| {
                let name = name.into();
                let section = match value {
                    Value::Object(map) => map,
                    other => {
                        warn!(
                            plugin = %name,
                            value = %other,
                            "Plugin args are not a map, using empty configuration"
                        );
                        ConfigMap::new()
                    }
                };
                (name, section)
            })
            .collect();
        Self { sections }
    }

    pub fn get(&self, name: &str) -> Option<&ConfigMap> {
        self.sections.get(name)
    }

    /// Effective enablement: the `enabled` override when it is a boolean,
    /// otherwise `enabled_by_default`.
    pub fn is_enabled(&self, name: &str, enabled_by_default: bool) -> bool {
        self.get(name)
            .and_then(|section| section.get(ENABLED_KEY))
            .and_then(Value::as_bool)
            .unwrap_or(enabled_by_default)
    }

    /// Effective enablement of a descriptor.
    pub fn is_descriptor_enabled(&self, desc: &PluginDescriptor) -> bool {
        self.is_enabled(desc.name(), desc.enabled_by_default())
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

// ─── PluginRecord ─────────────────────────────────────────────────────────────

/// The live, assembled unit exposed to consumers.
///
/// `T` is usually a category trait object (`dyn Service`, `dyn Provider`, …)
/// or the erased `dyn Plugin`.
pub struct PluginRecord<T: ?Sized> {
    pub name: &'static str,
    pub description: &'static str,
    pub secure: bool,
    pub enabled_by_default: bool,
    /// Implementation identity (`module::Type`).
    pub implementation: &'static str,
    pub registration: Registration,
    pub config: Option<ConfigMap>,
    /// Computed once from the configuration in effect at instantiation.
    pub enabled: bool,
    pub instance: Arc<T>,
}

impl<T: ?Sized> PluginRecord<T> {
    /// Assembles the record for `desc` with the effective configuration.
    pub fn new(desc: &PluginDescriptor, config: &PluginsConfig, instance: Arc<T>) -> Self {
        let reg = desc.registration;
        Self {
            name: reg.name,
            description: reg.description,
            secure: reg.secure,
            enabled_by_default: reg.enabled_by_default,
            implementation: desc.class.as_str(),
            registration: reg,
            config: config.get(reg.name).cloned(),
            enabled: config.is_enabled(reg.name, reg.enabled_by_default),
            instance,
        }
    }

    /// Same record with a differently-typed view of the instance.
    pub fn map_instance<U: ?Sized>(&self, f: impl FnOnce(&Arc<T>) -> Arc<U>) -> PluginRecord<U> {
        PluginRecord {
            name: self.name,
            description: self.description,
            secure: self.secure,
            enabled_by_default: self.enabled_by_default,
            implementation: self.implementation,
            registration: self.registration,
            config: self.config.clone(),
            enabled: self.enabled,
            instance: f(&self.instance),
        }
    }

    /// Typed lookup of a configuration value.
    pub fn config_value(&self, key: &str) -> Option<&Value> {
        self.config.as_ref().and_then(|c| c.get(key))
    }
}

impl<T: ?Sized> Clone for PluginRecord<T> {
    fn clone(&self) -> Self {
        self.map_instance(Arc::clone)
    }
}

impl<T: ?Sized> fmt::Debug for PluginRecord<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRecord")
            .field("name", &self.name)
            .field("implementation", &self.implementation)
            .field("enabled", &self.enabled)
            .field("secure", &self.secure)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::descriptor::{ClassIdentity, PluginCategory};

    #[test]
    fn test_non_object_args_become_empty() {
        let cfg = PluginsConfig::from_args([
            ("a".to_string(), json!({ "enabled": false, "uri": "/a" })),
            ("b".to_string(), json!("garbage")),
            ("c".to_string(), Value::Null),
        ]);
        assert_eq!(cfg.len(), 3);
        assert_eq!(cfg.get("a").and_then(|m| m.get("uri")), Some(&json!("/a")));
        assert!(cfg.get("b").is_some_and(|m| m.is_empty()));
        assert!(cfg.get("c").is_some_and(|m| m.is_empty()));
    }

    #[test]
    fn test_enabled_override() {
        let cfg = PluginsConfig::from_args([
            ("off", json!({ "enabled": false })),
            ("on", json!({ "enabled": true })),
            ("weird", json!({ "enabled": "yes" })),
        ]);
        assert!(!cfg.is_enabled("off", true));
        assert!(cfg.is_enabled("on", false));
        assert!(cfg.is_enabled("weird", true));
        assert!(!cfg.is_enabled("weird", false));
        assert!(cfg.is_enabled("absent", true));
    }

    #[test]
    fn test_record_from_descriptor() {
        const DESC: PluginDescriptor = PluginDescriptor::new(
            PluginCategory::Service,
            ClassIdentity::new("tests::Echo"),
            crate::descriptor::Registration::new("echo")
                .description("echoes")
                .enabled_by_default(false),
        );
        let cfg = PluginsConfig::from_args([("echo", json!({ "enabled": true, "x": 1 }))]);
        let record = PluginRecord::new(&DESC, &cfg, Arc::new(42u8));
        assert!(record.enabled);
        assert!(!record.enabled_by_default);
        assert_eq!(record.implementation, "tests::Echo");
        assert_eq!(record.config_value("x"), Some(&json!(1)));

        let mapped: PluginRecord<u8> = record.map_instance(Arc::clone);
        assert_eq!(*mapped.instance, 42);
        assert_eq!(mapped.name, "echo");
    }
}
