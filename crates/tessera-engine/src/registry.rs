//! The assembled plugin registry.
//!
//! [`PluginRegistry`] owns the whole pipeline: it instantiates every category
//! in boot order, validates providers, runs the injection orchestrator and
//! then serves read queries for the rest of the process.
//!
//! The registry is always shared behind an [`Arc`] so that the built-in
//! `registry` provider can hand out weak handles to it.
//!
//! Assembly happens once, on first access, behind a [`OnceLock`]; concurrent
//! first readers block until it completes instead of racing.  Afterwards only
//! the service and interceptor collections (and the interceptor view derived
//! from them) change.

use std::sync::{Arc, OnceLock, Weak};

use parking_lot::RwLock;
use tessera_core::{
    AuthMechanism, AuthMechanisms, Authenticator, Authenticators, Authorizer, Authorizers,
    Category, Discovery, Initializer, Initializers, InterceptPoint, InterceptorRecord,
    Interceptors, PluginCategory, PluginDescriptor, PluginError, PluginRecord, PluginsConfig,
    Provider, Providers, Registry, ServiceRecord, Services, TokenManager, TokenManagers,
};
use tracing::{debug, error, info, warn};

use crate::builtin;

use crate::checker::{ValidProviders, check_dependencies};
use crate::factory::PluginFactory;
use crate::graph::{GraphValidator, ProviderTypeTable, Validation};
use crate::injector::{InjectionFailure, InjectionReport, Injector};
use crate::interceptors::{InterceptorIndex, applicable_interceptors};

/// Validated providers and the validation that produced them.
struct ProviderSet {
    records: Vec<PluginRecord<dyn Provider>>,
    validation: Validation,
    valid: ValidProviders,
}

/// Central registry of assembled plugins.
pub struct PluginRegistry {
    this: Weak<PluginRegistry>,
    discovery: Box<dyn Discovery>,
    factory: PluginFactory,

    providers: OnceLock<ProviderSet>,
    initializers: OnceLock<Vec<PluginRecord<dyn Initializer>>>,
    auth_mechanisms: OnceLock<Vec<PluginRecord<dyn AuthMechanism>>>,
    authorizers: OnceLock<Vec<PluginRecord<dyn Authorizer>>>,
    token_manager: OnceLock<Option<PluginRecord<dyn TokenManager>>>,
    authenticators: OnceLock<Vec<PluginRecord<dyn Authenticator>>>,
    interceptors: OnceLock<RwLock<Vec<InterceptorRecord>>>,
    services: OnceLock<RwLock<Vec<ServiceRecord>>>,

    injection: OnceLock<InjectionReport>,
    index: InterceptorIndex,
}

impl PluginRegistry {
    pub fn new(discovery: impl Discovery + 'static, config: PluginsConfig) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            discovery: Box::new(discovery),
            factory: PluginFactory::new(config),
            providers: OnceLock::new(),
            initializers: OnceLock::new(),
            auth_mechanisms: OnceLock::new(),
            authorizers: OnceLock::new(),
            token_manager: OnceLock::new(),
            authenticators: OnceLock::new(),
            interceptors: OnceLock::new(),
            services: OnceLock::new(),
            injection: OnceLock::new(),
            index: InterceptorIndex::new(),
        })
    }

    pub fn config(&self) -> &PluginsConfig {
        self.factory.config()
    }

    /// Instantiates every category and runs injection, once.
    ///
    /// Every public accessor calls this first, so calling it explicitly is
    /// only needed to control when the work happens.
    pub fn assemble(&self) -> &InjectionReport {
        self.injection.get_or_init(|| {
            for category in PluginCategory::BOOT_ORDER {
                self.force(category);
            }
            let pending = self.factory.drain_pending();
            let report = Injector::new(&self.provider_set().records).inject_all(pending);
            info!(
                plugins = self.factory.instantiated_count(),
                injected = report.completed,
                failed = report.failures.len(),
                "Plugin registry assembled"
            );
            report
        })
    }

    fn force(&self, category: PluginCategory) {
        match category {
            PluginCategory::Provider => {
                self.provider_set();
            }
            PluginCategory::Initializer => {
                self.initializer_cell();
            }
            PluginCategory::AuthMechanism => {
                self.auth_mechanism_cell();
            }
            PluginCategory::Authorizer => {
                self.authorizer_cell();
            }
            PluginCategory::TokenManager => {
                self.token_manager_cell();
            }
            PluginCategory::Authenticator => {
                self.authenticator_cell();
            }
            PluginCategory::Interceptor => {
                self.interceptor_cell();
            }
            PluginCategory::Service => {
                self.service_cell();
            }
        }
    }

    // ─── Per-category construction ───────────────────────────────────────────

    fn provider_set(&self) -> &ProviderSet {
        self.providers.get_or_init(|| {
            let discovered: Vec<PluginDescriptor> = self
                .discovery
                .descriptors(PluginCategory::Provider)
                .into_iter()
                .filter(|d| {
                    let reserved = builtin::is_reserved(d.name());
                    if reserved {
                        error!(
                            provider = d.name(),
                            class = %d.class,
                            "Provider name is reserved for a built-in provider, ignoring"
                        );
                    }
                    !reserved
                })
                .collect();

            // Populates the produced-type table read by the validator.
            let this: Weak<dyn Registry> = self.this.clone();
            let mut built = builtin::instantiate(&self.factory, this);
            built.extend(self.factory.instantiate::<Providers>(&discovered, |_| true));

            let mut descriptors = builtin::descriptors().to_vec();
            descriptors.extend(discovered);

            let types = self.factory.provider_types();
            let validation = GraphValidator::new(self.config(), &types).validate(&descriptors);
            let valid = ValidProviders::from_validation(&validation, &types);

            let mut records = Vec::with_capacity(built.len());
            for item in built {
                if validation.valid.contains(&item.descriptor) {
                    records.push(item.record);
                } else {
                    debug!(provider = item.record.name, "Dropping invalid provider");
                    self.factory.forget(item.descriptor.class);
                }
            }
            for desc in &validation.load_order {
                self.factory.enqueue(desc);
            }

            ProviderSet {
                records,
                validation,
                valid,
            }
        })
    }

    /// Instantiates category `C`, keeping only descriptors whose
    /// dependencies are all valid providers.
    fn build<C: Category>(&self) -> Vec<PluginRecord<C::Instance>> {
        let valid = &self.provider_set().valid;
        let config = self.config();
        let descriptors = self.discovery.descriptors(C::KIND);

        self.factory
            .instantiate::<C>(&descriptors, |d| check_dependencies(valid, d, config))
            .into_iter()
            .map(|item| {
                self.factory.enqueue(&item.descriptor);
                item.record
            })
            .collect()
    }

    fn initializer_cell(&self) -> &[PluginRecord<dyn Initializer>] {
        self.initializers.get_or_init(|| self.build::<Initializers>())
    }

    fn auth_mechanism_cell(&self) -> &[PluginRecord<dyn AuthMechanism>] {
        self.auth_mechanisms.get_or_init(|| self.build::<AuthMechanisms>())
    }

    fn authorizer_cell(&self) -> &[PluginRecord<dyn Authorizer>] {
        self.authorizers.get_or_init(|| self.build::<Authorizers>())
    }

    fn token_manager_cell(&self) -> Option<&PluginRecord<dyn TokenManager>> {
        self.token_manager
            .get_or_init(|| {
                let mut all = self.build::<TokenManagers>().into_iter();
                let first = all.next();
                if let Some(tm) = &first {
                    for other in all {
                        warn!(
                            using = tm.name,
                            ignored = other.name,
                            "Multiple token managers enabled, using the first"
                        );
                    }
                }
                first
            })
            .as_ref()
    }

    fn authenticator_cell(&self) -> &[PluginRecord<dyn Authenticator>] {
        self.authenticators.get_or_init(|| self.build::<Authenticators>())
    }

    fn interceptor_cell(&self) -> &RwLock<Vec<InterceptorRecord>> {
        self.interceptors
            .get_or_init(|| RwLock::new(self.build::<Interceptors>()))
    }

    fn service_cell(&self) -> &RwLock<Vec<ServiceRecord>> {
        self.services.get_or_init(|| RwLock::new(self.build::<Services>()))
    }

    // ─── Public accessors ────────────────────────────────────────────────────

    /// Valid, enabled providers in priority order, built-ins first.
    pub fn providers(&self) -> &[PluginRecord<dyn Provider>] {
        self.assemble();
        &self.provider_set().records
    }

    pub fn initializers(&self) -> &[PluginRecord<dyn Initializer>] {
        self.assemble();
        self.initializer_cell()
    }

    pub fn auth_mechanisms(&self) -> &[PluginRecord<dyn AuthMechanism>] {
        self.assemble();
        self.auth_mechanism_cell()
    }

    pub fn authorizers(&self) -> &[PluginRecord<dyn Authorizer>] {
        self.assemble();
        self.authorizer_cell()
    }

    /// The first enabled token manager, if any.
    pub fn token_manager(&self) -> Option<&PluginRecord<dyn TokenManager>> {
        self.assemble();
        self.token_manager_cell()
    }

    pub fn authenticators(&self) -> &[PluginRecord<dyn Authenticator>] {
        self.assemble();
        self.authenticator_cell()
    }

    /// Looks up an authenticator by name.
    pub fn authenticator(&self, name: &str) -> Result<&PluginRecord<dyn Authenticator>, PluginError> {
        self.authenticators()
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| PluginError::configuration(name, format!("Authenticator {name} not found")))
    }

    /// Outcome of provider graph validation.
    pub fn validation(&self) -> &Validation {
        self.assemble();
        &self.provider_set().validation
    }

    pub fn valid_providers(&self) -> &ValidProviders {
        self.assemble();
        &self.provider_set().valid
    }

    pub fn provider_types(&self) -> ProviderTypeTable {
        self.assemble();
        self.factory.provider_types()
    }

    /// Plugins that stayed registered although their injection failed.
    pub fn injection_failures(&self) -> &[InjectionFailure] {
        &self.assemble().failures
    }

    /// Number of cached interceptor lookups.
    pub fn cached_views(&self) -> usize {
        self.index.len()
    }

    fn compute_interceptors(&self, service: Option<&str>, point: InterceptPoint) -> Vec<InterceptorRecord> {
        let interceptors = self.interceptor_cell().read().clone();
        match service {
            None => applicable_interceptors(&interceptors, None, point),
            Some(name) => {
                let svc = self
                    .service_cell()
                    .read()
                    .iter()
                    .find(|s| s.enabled && s.name == name)
                    .cloned();
                match svc {
                    Some(svc) => applicable_interceptors(&interceptors, Some(&svc), point),
                    None => {
                        debug!(service = name, "No enabled service with this name");
                        Vec::new()
                    }
                }
            }
        }
    }
}

/// Inserts `record` after every record with a lower or equal priority.
fn insert_by_priority<T: ?Sized>(list: &mut Vec<PluginRecord<T>>, record: PluginRecord<T>) {
    let priority = record.registration.priority;
    let pos = list.partition_point(|r| r.registration.priority <= priority);
    list.insert(pos, record);
}

impl Registry for PluginRegistry {
    fn services(&self) -> Vec<ServiceRecord> {
        self.assemble();
        self.service_cell()
            .read()
            .iter()
            .filter(|s| s.enabled)
            .cloned()
            .collect()
    }

    fn interceptors(&self) -> Vec<InterceptorRecord> {
        self.assemble();
        self.interceptor_cell()
            .read()
            .iter()
            .filter(|i| i.enabled)
            .cloned()
            .collect()
    }

    fn interceptors_for(
        &self,
        service: Option<&str>,
        point: InterceptPoint,
    ) -> Arc<[InterceptorRecord]> {
        self.assemble();
        self.index
            .get_or_compute(service, point, || self.compute_interceptors(service, point))
    }

    fn add_interceptor(&self, record: InterceptorRecord) {
        self.assemble();
        debug!(interceptor = record.name, "Adding interceptor");
        insert_by_priority(&mut self.interceptor_cell().write(), record);
        self.index.invalidate();
    }

    fn remove_interceptor_if(&self, predicate: &dyn Fn(&InterceptorRecord) -> bool) -> usize {
        self.assemble();
        let removed = {
            let mut list = self.interceptor_cell().write();
            let before = list.len();
            list.retain(|r| !predicate(r));
            before - list.len()
        };
        if removed > 0 {
            self.index.invalidate();
        }
        removed
    }

    fn add_service(&self, record: ServiceRecord) {
        self.assemble();
        debug!(service = record.name, "Adding service");
        insert_by_priority(&mut self.service_cell().write(), record);
        self.index.invalidate();
    }

    fn remove_service_if(&self, predicate: &dyn Fn(&ServiceRecord) -> bool) -> usize {
        self.assemble();
        let removed = {
            let mut list = self.service_cell().write();
            let before = list.len();
            list.retain(|r| !predicate(r));
            before - list.len()
        };
        if removed > 0 {
            self.index.invalidate();
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use tessera_core::{
        ClassIdentity, ConfigMap, Contract, Injected, Interceptor, Plugin, Provided,
        Registration, RegistryHandle, Service, StaticDiscovery, TypeInfo, plugin_descriptor,
    };
    use tessera_macros::Plugin;

    use super::*;
    use crate::graph::Exclusion;

    // ─── Fixtures ────────────────────────────────────────────────────────────

    struct Foo;
    struct Bar;

    #[derive(Default, Plugin)]
    struct FooProvider;
    impl Provider for FooProvider {
        fn produced_type(&self) -> TypeInfo {
            TypeInfo::of::<Foo>()
        }
        fn produce(&self, _: &PluginRecord<dyn Plugin>) -> Result<Provided, PluginError> {
            Ok(Provided::new(Foo))
        }
    }

    #[derive(Default, Plugin)]
    struct BarProvider;
    impl Provider for BarProvider {
        fn produced_type(&self) -> TypeInfo {
            TypeInfo::of::<Bar>()
        }
        fn produce(&self, _: &PluginRecord<dyn Plugin>) -> Result<Provided, PluginError> {
            Ok(Provided::new(Bar))
        }
    }

    /// Validates fine but fails every time it is asked for a value.
    #[derive(Default, Plugin)]
    struct FlakyProvider;
    impl Provider for FlakyProvider {
        fn produced_type(&self) -> TypeInfo {
            TypeInfo::of::<Foo>()
        }
        fn produce(&self, _: &PluginRecord<dyn Plugin>) -> Result<Provided, PluginError> {
            Err(PluginError::missing_artifact("libfoo"))
        }
    }

    #[derive(Default, Plugin)]
    struct PingProvider {
        #[inject("pong")]
        pong: Injected<Bar>,
    }
    impl Provider for PingProvider {
        fn produced_type(&self) -> TypeInfo {
            TypeInfo::of::<Foo>()
        }
        fn produce(&self, _: &PluginRecord<dyn Plugin>) -> Result<Provided, PluginError> {
            Ok(Provided::new(Foo))
        }
    }

    #[derive(Default, Plugin)]
    struct PongProvider {
        #[inject("ping")]
        ping: Injected<Foo>,
    }
    impl Provider for PongProvider {
        fn produced_type(&self) -> TypeInfo {
            TypeInfo::of::<Bar>()
        }
        fn produce(&self, _: &PluginRecord<dyn Plugin>) -> Result<Provided, PluginError> {
            Ok(Provided::new(Bar))
        }
    }

    #[derive(Default, Plugin)]
    struct FooService {
        #[inject("foo")]
        foo: Injected<Foo>,
    }
    impl Service for FooService {}

    #[derive(Default, Plugin)]
    struct MismatchedService {
        #[inject("bar")]
        bar: Injected<Foo>,
    }
    impl Service for MismatchedService {}

    #[derive(Default, Plugin)]
    struct PingService {
        #[inject("ping")]
        ping: Injected<Foo>,
    }
    impl Service for PingService {}

    static ONCE_CALLS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Default, Plugin)]
    #[plugin(post_construct(started))]
    struct OnceService;
    impl OnceService {
        fn started(&self) -> Result<(), PluginError> {
            ONCE_CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
    impl Service for OnceService {}

    #[derive(Default, Plugin)]
    struct PlainService;
    impl Service for PlainService {}

    #[derive(Default, Plugin)]
    struct Wildcard;
    impl Interceptor for Wildcard {
        fn contract(&self) -> Contract {
            Contract::ANY
        }
    }

    #[derive(Default, Plugin)]
    struct Tm;
    impl TokenManager for Tm {}

    #[derive(Default, Plugin)]
    struct OtherTm;
    impl TokenManager for OtherTm {}

    #[derive(Default, Plugin)]
    struct Basic;
    impl Authenticator for Basic {}

    #[derive(Default, Plugin)]
    struct SharedNameService {
        #[inject("x")]
        x: Injected<Foo>,
    }
    impl Service for SharedNameService {}

    static CONFIGURED_GREETING: OnceLock<String> = OnceLock::new();
    static CONFIGURED_HANDLE_ALIVE: AtomicUsize = AtomicUsize::new(0);

    #[derive(Default, Plugin)]
    #[plugin(post_construct(ready))]
    struct Configured {
        #[inject("config")]
        config: Injected<ConfigMap>,
        #[inject("registry")]
        registry: Injected<RegistryHandle>,
    }
    impl Configured {
        fn ready(&self) -> Result<(), PluginError> {
            let greeting = self
                .config
                .get()
                .and_then(|c| c.get("greeting"))
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            let _ = CONFIGURED_GREETING.set(greeting.to_string());
            if self.registry.get().and_then(RegistryHandle::get).is_some() {
                CONFIGURED_HANDLE_ALIVE.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }
    }
    impl Service for Configured {}

    #[derive(Default, Plugin)]
    struct MistypedConfig {
        #[inject("config")]
        config: Injected<Foo>,
    }
    impl Service for MistypedConfig {}

    static FOO: PluginDescriptor = plugin_descriptor!(Provider: FooProvider => Registration::new("foo"));
    static BAR: PluginDescriptor = plugin_descriptor!(Provider: BarProvider => Registration::new("bar"));
    static FLAKY: PluginDescriptor =
        plugin_descriptor!(Provider: FlakyProvider => Registration::new("foo"));
    static PING: PluginDescriptor = plugin_descriptor!(Provider: PingProvider => Registration::new("ping"));
    static PONG: PluginDescriptor = plugin_descriptor!(Provider: PongProvider => Registration::new("pong"));
    static FOO_SERVICE: PluginDescriptor =
        plugin_descriptor!(Service: FooService => Registration::new("foo-service").priority(2));
    static MISMATCHED: PluginDescriptor =
        plugin_descriptor!(Service: MismatchedService => Registration::new("mismatched"));
    static PING_SERVICE: PluginDescriptor =
        plugin_descriptor!(Service: PingService => Registration::new("ping-service"));
    static ONCE: PluginDescriptor = plugin_descriptor!(Service: OnceService => Registration::new("once"));
    static PLAIN: PluginDescriptor =
        plugin_descriptor!(Service: PlainService => Registration::new("plain").priority(1));
    static WILDCARD: PluginDescriptor =
        plugin_descriptor!(Interceptor: Wildcard => Registration::new("wildcard"));
    static TM: PluginDescriptor =
        plugin_descriptor!(TokenManager: Tm => Registration::new("tm").priority(1));
    static OTHER_TM: PluginDescriptor =
        plugin_descriptor!(TokenManager: OtherTm => Registration::new("other-tm").priority(5));
    static BASIC: PluginDescriptor =
        plugin_descriptor!(Authenticator: Basic => Registration::new("basic"));

    static X_FOO: PluginDescriptor =
        plugin_descriptor!(Provider: FooProvider => Registration::new("x").priority(20));
    static X_BAR: PluginDescriptor =
        plugin_descriptor!(Provider: BarProvider => Registration::new("x").priority(1));
    static SHARED_NAME: PluginDescriptor =
        plugin_descriptor!(Service: SharedNameService => Registration::new("s"));
    static SHADOW_CONFIG: PluginDescriptor =
        plugin_descriptor!(Provider: FlakyProvider => Registration::new("config"));
    static CONFIGURED: PluginDescriptor =
        plugin_descriptor!(Service: Configured => Registration::new("configured"));
    static MISTYPED_CONFIG: PluginDescriptor =
        plugin_descriptor!(Service: MistypedConfig => Registration::new("mistyped-config"));

    fn build_registry(descriptors: &[PluginDescriptor], config: PluginsConfig) -> Arc<PluginRegistry> {
        let mut discovery = StaticDiscovery::new();
        discovery.extend(descriptors.iter().copied());
        PluginRegistry::new(discovery, config)
    }

    fn service_names(registry: &PluginRegistry) -> Vec<&'static str> {
        registry.services().iter().map(|s| s.name).collect()
    }

    fn provider_names(registry: &PluginRegistry) -> Vec<&'static str> {
        registry.providers().iter().map(|p| p.name).collect()
    }

    fn interceptor_record(registry: &PluginRegistry, name: &'static str, priority: i32) -> InterceptorRecord {
        let desc = PluginDescriptor::new(
            PluginCategory::Interceptor,
            ClassIdentity::new("tests::Dynamic"),
            Registration::new(name).priority(priority),
        );
        let instance: Arc<dyn Interceptor> = Arc::new(Wildcard);
        PluginRecord::new(&desc, registry.config(), instance)
    }

    // ─── Assembly ────────────────────────────────────────────────────────────

    #[test]
    fn test_full_assembly() {
        let registry = build_registry(
            &[FOO_SERVICE, FOO, PLAIN, WILDCARD, TM, BASIC],
            PluginsConfig::new(),
        );
        assert_eq!(service_names(&registry), ["plain", "foo-service"]);
        assert_eq!(provider_names(&registry), ["config", "registry", "foo"]);
        assert!(registry.injection_failures().is_empty());
        assert_eq!(registry.token_manager().map(|t| t.name), Some("tm"));
        assert!(registry.authenticator("basic").is_ok());
        assert_eq!(registry.interceptors().len(), 1);

        let services = registry.services();
        let foo_service = services.iter().find(|s| s.name == "foo-service").unwrap();
        assert!(foo_service.implementation.ends_with("FooService"));
    }

    #[test]
    fn test_type_mismatch_service_never_instantiated() {
        let registry = build_registry(&[BAR, MISMATCHED, PLAIN], PluginsConfig::new());
        assert_eq!(service_names(&registry), ["plain"]);
        assert!(registry.validation().is_valid("bar"));
    }

    #[test]
    fn test_missing_provider_excludes_service() {
        let registry = build_registry(&[FOO_SERVICE, PLAIN], PluginsConfig::new());
        assert_eq!(service_names(&registry), ["plain"]);
    }

    #[test]
    fn test_disabled_provider_excludes_dependents() {
        let config = PluginsConfig::from_args([("foo", json!({ "enabled": false }))]);
        let registry = build_registry(&[FOO, FOO_SERVICE], config);
        assert_eq!(provider_names(&registry), ["config", "registry"]);
        assert!(registry.services().is_empty());
    }

    #[test]
    fn test_provider_cycle_excludes_dependents() {
        let registry = build_registry(&[PING, PONG, PING_SERVICE, PLAIN], PluginsConfig::new());
        assert_eq!(provider_names(&registry), ["config", "registry"]);
        assert!(!registry.validation().is_valid("ping"));
        assert!(!registry.validation().is_valid("pong"));
        assert_eq!(service_names(&registry), ["plain"]);
    }

    #[test]
    fn test_shared_provider_name_excludes_all_holders() {
        let registry = build_registry(&[X_FOO, X_BAR, SHARED_NAME, PLAIN], PluginsConfig::new());
        assert_eq!(service_names(&registry), ["plain"]);
        assert_eq!(provider_names(&registry), ["config", "registry"]);
        assert!(registry.injection_failures().is_empty());

        let causes: Vec<_> = registry
            .validation()
            .findings
            .iter()
            .filter(|f| f.provider == "x")
            .map(|f| f.cause.clone())
            .collect();
        assert_eq!(causes, [Exclusion::DuplicateName, Exclusion::DuplicateName]);
    }

    #[test]
    fn test_builtin_providers_inject_config_and_registry() {
        let config = PluginsConfig::from_args([("configured", json!({ "greeting": "hello" }))]);
        let registry = build_registry(&[SHADOW_CONFIG, CONFIGURED, MISTYPED_CONFIG], config);

        // The discovered "config" provider is ignored, not treated as a duplicate.
        assert_eq!(provider_names(&registry), ["config", "registry"]);
        assert!(registry.validation().findings.is_empty());

        assert_eq!(service_names(&registry), ["configured"]);
        assert!(registry.injection_failures().is_empty());
        assert_eq!(CONFIGURED_GREETING.get().map(String::as_str), Some("hello"));
        assert_eq!(CONFIGURED_HANDLE_ALIVE.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_injection_keeps_plugin_registered() {
        let registry = build_registry(&[FLAKY, FOO_SERVICE], PluginsConfig::new());
        assert_eq!(service_names(&registry), ["foo-service"]);

        let failures = registry.injection_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].plugin, "foo-service");
        assert!(failures[0].is_missing_artifact());
    }

    #[test]
    fn test_first_token_manager_wins() {
        let registry = build_registry(&[OTHER_TM, TM], PluginsConfig::new());
        assert_eq!(registry.token_manager().map(|t| t.name), Some("tm"));

        let config = PluginsConfig::from_args([("tm", json!({ "enabled": false }))]);
        let registry = build_registry(&[OTHER_TM, TM], config);
        assert_eq!(registry.token_manager().map(|t| t.name), Some("other-tm"));
    }

    #[test]
    fn test_unknown_authenticator_is_configuration_error() {
        let registry = build_registry(&[BASIC], PluginsConfig::new());
        let err = registry.authenticator("digest").unwrap_err();
        assert!(err.to_string().contains("Authenticator digest not found"));
    }

    #[test]
    fn test_assembly_runs_once() {
        let registry = build_registry(&[ONCE], PluginsConfig::new());
        registry.assemble();
        registry.assemble();
        assert_eq!(service_names(&registry), ["once"]);
        assert_eq!(ONCE_CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_first_access_assembles_once() {
        let registry = build_registry(&[PLAIN, WILDCARD], PluginsConfig::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.services().len())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1);
        }
    }

    // ─── Dynamic registration ────────────────────────────────────────────────

    #[test]
    fn test_interceptor_view_invalidated_on_mutation() {
        let registry = build_registry(&[PLAIN, WILDCARD], PluginsConfig::new());
        let point = InterceptPoint::RequestAfterAuth;

        assert_eq!(registry.interceptors_for(Some("plain"), point).len(), 1);
        assert_eq!(registry.cached_views(), 1);

        registry.add_interceptor(interceptor_record(&registry, "extra", 0));
        assert_eq!(registry.cached_views(), 0);

        let names: Vec<_> = registry
            .interceptors_for(Some("plain"), point)
            .iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, ["extra", "wildcard"]);

        assert_eq!(registry.remove_interceptor_if(&|i| i.name == "extra"), 1);
        assert_eq!(registry.interceptors_for(Some("plain"), point).len(), 1);
        assert_eq!(registry.remove_interceptor_if(&|i| i.name == "missing"), 0);
    }

    #[test]
    fn test_added_interceptor_goes_after_equal_priority() {
        let registry = build_registry(&[WILDCARD], PluginsConfig::new());
        registry.add_interceptor(interceptor_record(&registry, "late", 10));
        let names: Vec<_> = registry.interceptors().iter().map(|i| i.name).collect();
        assert_eq!(names, ["wildcard", "late"]);
    }

    #[test]
    fn test_unknown_service_has_no_interceptors() {
        let registry = build_registry(&[WILDCARD], PluginsConfig::new());
        let point = InterceptPoint::RequestAfterAuth;
        assert!(registry.interceptors_for(Some("nope"), point).is_empty());
        // Traffic without a service still sees the wildcard.
        assert_eq!(registry.interceptors_for(None, point).len(), 1);
    }

    #[test]
    fn test_dynamic_service_registration() {
        let registry = build_registry(&[PLAIN], PluginsConfig::new());
        let desc = PluginDescriptor::new(
            PluginCategory::Service,
            ClassIdentity::new("tests::Late"),
            Registration::new("late").priority(50),
        );
        let instance: Arc<dyn Service> = Arc::new(PlainService);
        registry.add_service(PluginRecord::new(&desc, registry.config(), instance));
        assert_eq!(service_names(&registry), ["plain", "late"]);

        assert_eq!(registry.remove_service_if(&|s| s.name == "late"), 1);
        assert_eq!(service_names(&registry), ["plain"]);
    }
}
