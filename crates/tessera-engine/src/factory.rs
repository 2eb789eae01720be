//! Instantiation engine.
//!
//! [`PluginFactory`] turns descriptors of one category into live
//! [`PluginRecord`]s: it orders them by priority, resolves enablement,
//! constructs each enabled plugin and records it.  Every failure is confined
//! to the plugin that caused it.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tessera_core::{
    Category, ClassIdentity, Plugin, PluginCategory, PluginDescriptor, PluginError,
    PluginInstance, PluginRecord, PluginsConfig, Provider, Providers, TESSERA_PLUGIN_API_VERSION,
    duplicate_names, is_missing_artifact, root_cause,
};
use tracing::{debug, error, warn};

use crate::graph::ProviderTypeTable;

/// Text appended to failures caused by a missing external artifact.
pub const MISSING_ARTIFACT_HINT: &str = "an external dependency is missing. \
     Make the missing library available to the host and restart";

/// Signature every plugin constructor must have.
const CONSTRUCTOR_SIGNATURE: &str = "fn() -> Result<PluginInstance, PluginError>";

/// A plugin with injection points, waiting for the injection orchestrator.
#[derive(Debug, Clone)]
pub struct PendingInjection {
    pub descriptor: PluginDescriptor,
    pub record: PluginRecord<dyn Plugin>,
}

/// One successfully instantiated plugin.
pub struct Instantiated<C: Category> {
    pub descriptor: PluginDescriptor,
    pub record: PluginRecord<C::Instance>,
}

// =============================================================================
// PluginFactory
// =============================================================================

/// Instantiates plugins and keeps the tables shared across categories.
pub struct PluginFactory {
    config: PluginsConfig,
    /// Filled by provider instantiation, read by graph validation.
    types: RwLock<ProviderTypeTable>,
    /// Implementation identity → erased record.
    records: RwLock<HashMap<ClassIdentity, PluginRecord<dyn Plugin>>>,
    pending: Mutex<Vec<PendingInjection>>,
}

impl PluginFactory {
    pub fn new(config: PluginsConfig) -> Self {
        Self {
            config,
            types: RwLock::new(ProviderTypeTable::new()),
            records: RwLock::new(HashMap::new()),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &PluginsConfig {
        &self.config
    }

    /// Snapshot of the provider produced-type table.
    pub fn provider_types(&self) -> ProviderTypeTable {
        self.types.read().clone()
    }

    /// The erased record of an instantiated implementation.
    pub fn record(&self, class: ClassIdentity) -> Option<PluginRecord<dyn Plugin>> {
        self.records.read().get(&class).cloned()
    }

    pub fn instantiated_count(&self) -> usize {
        self.records.read().len()
    }

    /// Instantiates the descriptors of category `C`.
    ///
    /// Descriptors failing `precondition` are dropped first; the rest are
    /// processed in ascending priority, ties keeping input order.  Disabled
    /// plugins are skipped without being constructed.
    pub fn instantiate<C: Category>(
        &self,
        descriptors: &[PluginDescriptor],
        precondition: impl Fn(&PluginDescriptor) -> bool,
    ) -> Vec<Instantiated<C>> {
        let category = C::KIND;

        for name in duplicate_names(descriptors) {
            warn!(%category, plugin = name, "Several plugins share this name");
        }

        let mut ordered: Vec<PluginDescriptor> = descriptors
            .iter()
            .filter(|d| {
                if d.category != category {
                    warn!(
                        %category,
                        plugin = d.name(),
                        actual = %d.category,
                        "Descriptor listed under the wrong category, ignoring"
                    );
                    return false;
                }
                precondition(d)
            })
            .copied()
            .collect();
        // Stable: equal priorities keep discovery order.
        ordered.sort_by_key(PluginDescriptor::priority);

        let mut out = Vec::with_capacity(ordered.len());
        for desc in ordered {
            if !self.config.is_descriptor_enabled(&desc) {
                debug!(%category, plugin = desc.name(), "Plugin disabled");
                continue;
            }

            match self.construct::<C>(&desc) {
                Ok(instance) => out.push(self.register::<C>(desc, instance)),
                Err(err) => log_failure(category, desc.name(), "Error registering", &err),
            }
        }
        out
    }

    /// Registers a provider built by the engine instead of by a descriptor
    /// constructor.  Returns `None` if configuration disables it.
    pub fn adopt_provider(
        &self,
        desc: &PluginDescriptor,
        instance: Arc<dyn Provider>,
    ) -> Option<Instantiated<Providers>> {
        if !self.config.is_descriptor_enabled(desc) {
            debug!(plugin = desc.name(), "Built-in provider disabled");
            return None;
        }
        self.types.write().insert(desc.name(), instance.produced_type());
        Some(self.register::<Providers>(*desc, instance))
    }

    fn register<C: Category>(&self, desc: PluginDescriptor, instance: Arc<C::Instance>) -> Instantiated<C> {
        let record = PluginRecord::new(&desc, &self.config, instance);
        self.records
            .write()
            .insert(desc.class, record.map_instance(C::erase));
        debug!(
            category = %C::KIND,
            plugin = desc.name(),
            priority = desc.priority(),
            secure = desc.registration.secure,
            "Registered plugin"
        );
        Instantiated {
            descriptor: desc,
            record,
        }
    }

    fn construct<C: Category>(&self, desc: &PluginDescriptor) -> Result<Arc<C::Instance>, PluginError> {
        if !desc.is_compatible() {
            return Err(PluginError::configuration(
                desc.name(),
                format!(
                    "incompatible plugin API version {:#010x} (host {:#010x})",
                    desc.api_version, TESSERA_PLUGIN_API_VERSION
                ),
            ));
        }

        let Some(constructor) = desc.constructor() else {
            return Err(PluginError::configuration(
                desc.name(),
                format!(
                    "{} has no zero-argument constructor, expected `{CONSTRUCTOR_SIGNATURE}`",
                    desc.class
                ),
            ));
        };

        let instance = catch_unwind(AssertUnwindSafe(|| -> Result<PluginInstance, PluginError> {
            let instance = constructor()?;
            if let (PluginCategory::Provider, PluginInstance::Provider(provider)) =
                (C::KIND, &instance)
            {
                self.types.write().insert(desc.name(), provider.produced_type());
            }
            Ok(instance)
        }))
        .map_err(|payload| PluginError::Panicked {
            plugin: desc.name().to_string(),
            message: panic_message(payload.as_ref()),
        })?
        .map_err(|err| {
            PluginError::configuration_caused_by(desc.name(), "constructor failed", err)
        })?;

        let actual = instance.category();
        C::from_instance(instance).ok_or_else(|| {
            PluginError::configuration(
                desc.name(),
                format!("constructor produced a {actual} instance, expected a {}", C::KIND),
            )
        })
    }

    /// Queues `desc` for injection if it declares injection points and was
    /// instantiated.
    pub fn enqueue(&self, desc: &PluginDescriptor) {
        if desc.injections().is_empty() {
            return;
        }
        let Some(record) = self.record(desc.class) else {
            return;
        };
        self.pending.lock().push(PendingInjection {
            descriptor: *desc,
            record,
        });
    }

    /// Drops an instantiated implementation from the lookup table.
    pub fn forget(&self, class: ClassIdentity) {
        self.records.write().remove(&class);
    }

    /// Takes every queued injection, in queue order.
    pub fn drain_pending(&self) -> Vec<PendingInjection> {
        std::mem::take(&mut *self.pending.lock())
    }
}

// =============================================================================
// Failure reporting
// =============================================================================

/// Logs a per-plugin failure with its root cause.
pub fn log_failure(category: PluginCategory, plugin: &str, action: &str, err: &PluginError) {
    if is_missing_artifact(err) {
        error!(
            %category,
            plugin,
            cause = %root_cause(err),
            "{action} {category} {plugin}: {MISSING_ARTIFACT_HINT}"
        );
    } else {
        error!(
            %category,
            plugin,
            cause = %root_cause(err),
            "{action} {category} {plugin}: {err}"
        );
    }
}

/// Extracts the message of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
