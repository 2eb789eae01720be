//! Derived view: which interceptors apply to which service at which point.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tessera_core::{Contract, InterceptPoint, InterceptorRecord, PluginCategory, ServiceRecord};
use tracing::trace;

use crate::factory::log_failure;
use crate::injector::guarded;

type Key = (Option<String>, InterceptPoint);

/// Memoized interceptor lookups.
///
/// Entries are computed on demand and dropped all at once by
/// [`invalidate`](Self::invalidate) whenever the service or interceptor set
/// changes.  A lookup that raced an invalidation returns its result but does
/// not store it.
#[derive(Debug, Default)]
pub struct InterceptorIndex {
    cache: RwLock<HashMap<Key, Arc<[InterceptorRecord]>>>,
    generation: AtomicU64,
}

impl InterceptorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached list for `(service, point)`, computing it with
    /// `compute` on a miss.
    pub fn get_or_compute(
        &self,
        service: Option<&str>,
        point: InterceptPoint,
        compute: impl FnOnce() -> Vec<InterceptorRecord>,
    ) -> Arc<[InterceptorRecord]> {
        let key: Key = (service.map(str::to_owned), point);
        let generation = self.generation.load(Ordering::Acquire);

        if let Some(hit) = self.cache.read().get(&key) {
            return Arc::clone(hit);
        }

        let computed: Arc<[InterceptorRecord]> = compute().into();
        let mut cache = self.cache.write();
        if self.generation.load(Ordering::Acquire) != generation {
            trace!(?point, "Interceptor view invalidated during lookup, not caching");
            return computed;
        }
        Arc::clone(cache.entry(key).or_insert(computed))
    }

    /// Drops every cached entry.
    pub fn invalidate(&self) {
        let mut cache = self.cache.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }
}

/// Interceptors applicable to an exchange.
///
/// `service` is `None` for traffic not handled by a service, which is
/// matched against [`Contract::byte_stream`].  A service opting out of
/// `point` gets no interceptors.  A plugin whose contract panics is left out:
/// an interceptor is skipped, a service gets no interceptors.
pub fn applicable_interceptors(
    interceptors: &[InterceptorRecord],
    service: Option<&ServiceRecord>,
    point: InterceptPoint,
) -> Vec<InterceptorRecord> {
    let target = match service {
        Some(svc) => {
            if svc.registration.dont_intercept.contains(&point) {
                return Vec::new();
            }
            match guarded(svc.name, || Ok(svc.instance.contract())) {
                Ok(contract) => contract,
                Err(err) => {
                    log_failure(PluginCategory::Service, svc.name, "Error reading contract of", &err);
                    return Vec::new();
                }
            }
        }
        None => Contract::byte_stream(),
    };

    interceptors
        .iter()
        .filter(|i| i.enabled)
        .filter(|i| i.registration.intercept_point == point)
        .filter(|i| match guarded(i.name, || Ok(i.instance.contract())) {
            Ok(contract) => contract.accepts(&target),
            Err(err) => {
                log_failure(PluginCategory::Interceptor, i.name, "Skipping", &err);
                false
            }
        })
        .cloned()
        .collect()
}
