//! Plugin discovery.
//!
//! The engine consumes descriptors through the [`Discovery`] trait and makes
//! no assumption about where they come from.  [`StaticDiscovery`] is the
//! built-in source: plugins register themselves at link time with
//! [`register_plugin!`](crate::register_plugin), which appends to the
//! [`DISCOVERED_PLUGINS`] distributed slice.

use std::collections::HashSet;

use linkme::distributed_slice;
use tracing::warn;

use crate::descriptor::{PluginCategory, PluginDescriptor};

/// Link-time registry of every plugin registered with `register_plugin!`.
#[distributed_slice]
pub static DISCOVERED_PLUGINS: [PluginDescriptor];

/// Source of plugin descriptors.
pub trait Discovery: Send + Sync {
    /// Descriptors of `category`, in discovery order.
    fn descriptors(&self, category: PluginCategory) -> Vec<PluginDescriptor>;
}

impl<D: Discovery + ?Sized> Discovery for Box<D> {
    fn descriptors(&self, category: PluginCategory) -> Vec<PluginDescriptor> {
        (**self).descriptors(category)
    }
}

/// An in-memory descriptor list.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    descriptors: Vec<PluginDescriptor>,
}

impl StaticDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a discovery from every descriptor registered via
    /// `register_plugin!`.
    ///
    /// Link order is unspecified, so descriptors are ordered by implementation
    /// path.  If the same implementation is registered twice a warning is
    /// emitted and the first one wins.
    pub fn collect_all() -> Self {
        let mut sorted: Vec<PluginDescriptor> = DISCOVERED_PLUGINS.iter().copied().collect();
        sorted.sort_by_key(|d| d.class);
        let mut discovery = Self::new();
        discovery.extend(sorted);
        discovery
    }

    /// Appends one descriptor.
    pub fn with(mut self, desc: PluginDescriptor) -> Self {
        self.push(desc);
        self
    }

    pub fn extend(&mut self, descriptors: impl IntoIterator<Item = PluginDescriptor>) {
        for desc in descriptors {
            self.push(desc);
        }
    }

    fn push(&mut self, desc: PluginDescriptor) {
        if self.descriptors.iter().any(|d| d.class == desc.class) {
            warn!(
                class = %desc.class,
                plugin = desc.name(),
                "Implementation discovered twice, keeping the first descriptor"
            );
            return;
        }
        self.descriptors.push(desc);
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn all(&self) -> &[PluginDescriptor] {
        &self.descriptors
    }
}

impl Discovery for StaticDiscovery {
    fn descriptors(&self, category: PluginCategory) -> Vec<PluginDescriptor> {
        self.descriptors
            .iter()
            .filter(|d| d.category == category)
            .copied()
            .collect()
    }
}

/// Names of the plugins in `descriptors` that share a name with an earlier
/// descriptor of the same category.
pub fn duplicate_names(descriptors: &[PluginDescriptor]) -> Vec<&'static str> {
    let mut seen = HashSet::new();
    descriptors
        .iter()
        .filter(|d| !seen.insert((d.category, d.name())))
        .map(|d| d.name())
        .collect()
}
