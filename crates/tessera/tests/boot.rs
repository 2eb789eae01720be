//! Boots the runtime over plugins registered with `register_plugin!`.

use std::sync::OnceLock;

use serde_json::json;
use tessera::core::{Discovery, StaticDiscovery};
use tessera::prelude::*;
use tessera::runtime::TesseraConfig;

// ─── Plugins ─────────────────────────────────────────────────────────────────

struct Greeting(String);

#[derive(Default, Plugin)]
#[plugin(crate = tessera::core)]
struct GreetingProvider;

impl Provider for GreetingProvider {
    fn produced_type(&self) -> TypeInfo {
        TypeInfo::of::<Greeting>()
    }

    fn produce(&self, consumer: &PluginRecord<dyn Plugin>) -> Result<Provided, PluginError> {
        Ok(Provided::new(Greeting(format!("hello {}", consumer.name))))
    }
}

static GREETED: OnceLock<String> = OnceLock::new();

#[derive(Default, Plugin)]
#[plugin(crate = tessera::core, post_construct(ready))]
struct Greeter {
    #[inject("e2e-greeting")]
    greeting: Injected<Greeting>,
}

impl Greeter {
    fn ready(&self) -> Result<(), PluginError> {
        let greeting = self
            .greeting
            .get()
            .ok_or_else(|| PluginError::custom("greeting not injected"))?;
        let _ = GREETED.set(greeting.0.clone());
        Ok(())
    }
}

impl Service for Greeter {}

#[derive(Default, Plugin)]
#[plugin(crate = tessera::core)]
struct LeftProvider {
    #[inject("e2e-right")]
    right: Injected<Greeting>,
}

impl Provider for LeftProvider {
    fn produced_type(&self) -> TypeInfo {
        TypeInfo::of::<Greeting>()
    }

    fn produce(&self, _: &PluginRecord<dyn Plugin>) -> Result<Provided, PluginError> {
        Ok(Provided::new(Greeting("left".into())))
    }
}

#[derive(Default, Plugin)]
#[plugin(crate = tessera::core)]
struct RightProvider {
    #[inject("e2e-left")]
    left: Injected<Greeting>,
}

impl Provider for RightProvider {
    fn produced_type(&self) -> TypeInfo {
        TypeInfo::of::<Greeting>()
    }

    fn produce(&self, _: &PluginRecord<dyn Plugin>) -> Result<Provided, PluginError> {
        Ok(Provided::new(Greeting("right".into())))
    }
}

#[derive(Default, Plugin)]
#[plugin(crate = tessera::core)]
struct Stranded {
    #[inject("e2e-left")]
    left: Injected<Greeting>,
}

impl Service for Stranded {}

#[derive(Default, Plugin)]
#[plugin(crate = tessera::core)]
struct AuditLog;

impl Interceptor for AuditLog {
    fn contract(&self) -> Contract {
        Contract::ANY
    }
}

#[derive(Default, Plugin)]
#[plugin(crate = tessera::core)]
struct Optional;

impl Service for Optional {}

static CENSUS: OnceLock<usize> = OnceLock::new();

/// Reaches the registry and its settings through built-in injections only.
#[derive(Default, Plugin)]
#[plugin(crate = tessera::core)]
struct Census {
    #[inject("config")]
    config: Injected<ConfigMap>,
    #[inject("registry")]
    registry: Injected<RegistryHandle>,
}

impl Initializer for Census {
    fn init(&self, _: &dyn Registry) -> Result<(), PluginError> {
        let registry = self
            .registry
            .get()
            .and_then(RegistryHandle::get)
            .ok_or_else(|| PluginError::custom("registry handle not injected"))?;
        let expected = self
            .config
            .get()
            .and_then(|c| c.get("expected_services"))
            .and_then(|v| v.as_u64())
            .ok_or_else(|| PluginError::custom("expected_services not configured"))?;

        let services = registry.services().len();
        if services as u64 != expected {
            return Err(PluginError::custom(format!(
                "expected {expected} services, found {services}"
            )));
        }
        let _ = CENSUS.set(services);
        Ok(())
    }
}

register_plugin!(Provider: GreetingProvider => Registration::new("e2e-greeting"));
register_plugin!(Service: Greeter => Registration::new("e2e-greeter").priority(1));
register_plugin!(Provider: LeftProvider => Registration::new("e2e-left"));
register_plugin!(Provider: RightProvider => Registration::new("e2e-right"));
register_plugin!(Service: Stranded => Registration::new("e2e-stranded"));
register_plugin!(
    Interceptor: AuditLog => Registration::new("e2e-audit").intercept_point(InterceptPoint::Response)
);
register_plugin!(Service: Optional => Registration::new("e2e-optional").priority(5));
register_plugin!(Initializer: Census => Registration::new("e2e-census"));

fn config() -> TesseraConfig {
    let mut config = TesseraConfig::default();
    config
        .plugins_args
        .insert("e2e-optional".into(), json!({ "enabled": false }));
    config
        .plugins_args
        .insert("e2e-census".into(), json!({ "expected_services": 1 }));
    config
}

fn runtime() -> TesseraRuntime {
    TesseraRuntime::with_discovery(&config(), StaticDiscovery::collect_all())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[test]
fn test_link_time_discovery() {
    let discovery = StaticDiscovery::collect_all();
    let providers: Vec<_> = discovery
        .descriptors(PluginCategory::Provider)
        .iter()
        .map(|d| d.name())
        .collect();
    for name in ["e2e-greeting", "e2e-left", "e2e-right"] {
        assert!(providers.contains(&name), "{name} not discovered");
    }

    let greeter = discovery
        .descriptors(PluginCategory::Service)
        .into_iter()
        .find(|d| d.name() == "e2e-greeter")
        .unwrap();
    assert!(greeter.class.as_str().ends_with("::Greeter"));
    assert_eq!(greeter.field_injections().count(), 1);
    assert_eq!(greeter.method_injections().count(), 1);
}

#[test]
fn test_boot_assembles_registry() {
    let rt = runtime();
    assert!(rt.boot().is_empty());

    let registry = rt.registry();
    let services: Vec<_> = registry.services().iter().map(|s| s.name).collect();
    assert_eq!(services, ["e2e-greeter"]);

    let validation = registry.validation();
    assert!(validation.is_valid("e2e-greeting"));
    assert!(!validation.is_valid("e2e-left"));
    assert!(!validation.is_valid("e2e-right"));

    assert!(registry.injection_failures().is_empty());
    assert_eq!(GREETED.get().map(String::as_str), Some("hello e2e-greeter"));
}

#[test]
fn test_interceptor_lookup() {
    let rt = runtime();
    rt.boot();
    let registry = rt.registry();

    let response = registry.interceptors_for(Some("e2e-greeter"), InterceptPoint::Response);
    assert_eq!(response.len(), 1);
    assert_eq!(response[0].name, "e2e-audit");
    assert!(
        registry
            .interceptors_for(Some("e2e-greeter"), InterceptPoint::RequestAfterAuth)
            .is_empty()
    );
}

#[test]
fn test_stats_after_startup() {
    let rt = runtime();
    assert!(rt.after_startup().is_empty());

    let stats = rt.stats();
    // e2e-greeting plus the built-in config and registry providers.
    assert_eq!(stats.providers, 3);
    assert_eq!(stats.initializers, 1);
    assert_eq!(stats.services, 1);
    assert_eq!(stats.interceptors, 1);
    assert_eq!(stats.excluded_providers, 2);
    assert_eq!(stats.initializer_failures, 0);
}

#[test]
fn test_builtin_config_and_registry_injection() {
    let rt = runtime();
    assert!(rt.after_startup().is_empty());
    assert_eq!(CENSUS.get().copied(), Some(1));

    let providers: Vec<_> = rt.registry().providers().iter().map(|p| p.name).collect();
    assert_eq!(&providers[..2], ["config", "registry"]);
}
