//! Consumer-facing registry surface.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::plugin::{Interceptor, Service};
use crate::record::PluginRecord;
use crate::types::InterceptPoint;

pub type ServiceRecord = PluginRecord<dyn Service>;
pub type InterceptorRecord = PluginRecord<dyn Interceptor>;

/// Built-in provider injecting the consumer's own configuration section as
/// a [`ConfigMap`](crate::ConfigMap).
pub const CONFIG_PROVIDER: &str = "config";

/// Built-in provider injecting a [`RegistryHandle`].
pub const REGISTRY_PROVIDER: &str = "registry";

/// Query and mutation surface over the assembled plugins.
///
/// Handed to initializers so they can register plugins after the main boot
/// sequence.  Every mutation invalidates the derived interceptor view.
pub trait Registry: Send + Sync {
    /// Enabled services, in priority order.
    fn services(&self) -> Vec<ServiceRecord>;

    /// Enabled interceptors, in priority order.
    fn interceptors(&self) -> Vec<InterceptorRecord>;

    /// Interceptors to run for `service` (by name) at `point`.
    ///
    /// `None` selects traffic not handled by a service, which is matched
    /// against the byte-stream contract.
    fn interceptors_for(&self, service: Option<&str>, point: InterceptPoint)
    -> Arc<[InterceptorRecord]>;

    fn add_interceptor(&self, record: InterceptorRecord);

    /// Removes every interceptor matching `predicate`, returning how many
    /// were removed.
    fn remove_interceptor_if(&self, predicate: &dyn Fn(&InterceptorRecord) -> bool) -> usize;

    fn add_service(&self, record: ServiceRecord);

    fn remove_service_if(&self, predicate: &dyn Fn(&ServiceRecord) -> bool) -> usize;
}

/// Handle to the registry, injected by the built-in `registry` provider.
///
/// Plugins are owned by the registry, so the handle does not keep it alive.
/// The registry is still assembling while post-construct hooks run: query it
/// from initializers or later, never from a hook.
#[derive(Clone)]
pub struct RegistryHandle(Weak<dyn Registry>);

impl RegistryHandle {
    pub fn new(registry: Weak<dyn Registry>) -> Self {
        Self(registry)
    }

    /// The registry, or `None` once it has been dropped.
    pub fn get(&self) -> Option<Arc<dyn Registry>> {
        self.0.upgrade()
    }
}

impl fmt::Debug for RegistryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryHandle")
            .field("alive", &(self.0.strong_count() > 0))
            .finish()
    }
}
