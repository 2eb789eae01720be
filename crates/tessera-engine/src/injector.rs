//! Injection orchestrator.
//!
//! Runs once, after every category has been instantiated.  For each queued
//! plugin it fills the declared fields from the named providers, then runs the
//! post-construct hooks.  A failure stops the affected plugin's injection and
//! is recorded; the plugin itself stays registered.

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tessera_core::{
    HookKind, MethodInjection, Plugin, PluginCategory, PluginDescriptor, PluginError,
    PluginRecord, Provider, is_missing_artifact,
};
use tracing::{debug, trace};

use crate::factory::{MISSING_ARTIFACT_HINT, PendingInjection, log_failure, panic_message};

/// A plugin whose injection did not complete.
#[derive(Debug)]
pub struct InjectionFailure {
    pub plugin: &'static str,
    pub category: PluginCategory,
    pub error: PluginError,
}

impl InjectionFailure {
    /// Whether the cause is a missing external artifact.
    pub fn is_missing_artifact(&self) -> bool {
        is_missing_artifact(&self.error)
    }
}

impl fmt::Display for InjectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_missing_artifact() {
            write!(f, "{} {}: {MISSING_ARTIFACT_HINT}", self.category, self.plugin)
        } else {
            write!(f, "{} {}: {}", self.category, self.plugin, self.error)
        }
    }
}

/// Outcome of an injection run.
#[derive(Debug, Default)]
pub struct InjectionReport {
    /// Plugins whose fields and hooks all completed.
    pub completed: usize,
    pub failures: Vec<InjectionFailure>,
}

/// Resolves field injections against the final provider collection.
pub struct Injector<'a> {
    providers: HashMap<&'static str, &'a PluginRecord<dyn Provider>>,
}

impl<'a> Injector<'a> {
    /// `providers` should be the enabled, validated provider records.
    pub fn new(providers: &'a [PluginRecord<dyn Provider>]) -> Self {
        let mut by_name = HashMap::with_capacity(providers.len());
        for record in providers.iter().filter(|r| r.enabled) {
            by_name.entry(record.name).or_insert(record);
        }
        Self { providers: by_name }
    }

    /// Injects every queued plugin, in order.
    pub fn inject_all(&self, pending: Vec<PendingInjection>) -> InjectionReport {
        let mut report = InjectionReport::default();
        for item in pending {
            let category = item.descriptor.category;
            let plugin = item.descriptor.name();
            match self.inject(&item.descriptor, &item.record) {
                Ok(()) => report.completed += 1,
                Err(error) => {
                    log_failure(category, plugin, "Error injecting dependencies into", &error);
                    report.failures.push(InjectionFailure {
                        plugin,
                        category,
                        error,
                    });
                }
            }
        }
        report
    }

    /// Injects one plugin.
    pub fn inject(
        &self,
        desc: &PluginDescriptor,
        consumer: &PluginRecord<dyn Plugin>,
    ) -> Result<(), PluginError> {
        for field in desc.field_injections() {
            let provider =
                self.providers
                    .get(field.provider)
                    .ok_or_else(|| PluginError::NoProvider {
                        plugin: desc.name().to_string(),
                        field: field.field.to_string(),
                        provider: field.provider.to_string(),
                    })?;

            let value = guarded(desc.name(), || provider.instance.produce(consumer)).map_err(
                |err| {
                    PluginError::configuration_caused_by(
                        desc.name(),
                        format!("provider '{}' failed to produce a value", field.provider),
                        err,
                    )
                },
            )?;

            consumer
                .instance
                .inject(field.field, value)
                .map_err(|err| {
                    PluginError::configuration_caused_by(
                        desc.name(),
                        format!("cannot inject field '{}'", field.field),
                        err,
                    )
                })?;
            trace!(plugin = desc.name(), field = field.field, provider = field.provider, "Injected field");
        }

        for hook in desc.method_injections() {
            match hook.kind {
                HookKind::PostConstruct => run_post_construct(desc, consumer, hook)?,
            }
        }
        Ok(())
    }
}

fn run_post_construct(
    desc: &PluginDescriptor,
    consumer: &PluginRecord<dyn Plugin>,
    hook: &MethodInjection,
) -> Result<(), PluginError> {
    let mapped = desc
        .method_injections()
        .filter(|m| m.identity == hook.identity)
        .count();
    if mapped != 1 {
        debug!(
            plugin = desc.name(),
            method = hook.method,
            mapped,
            "Lifecycle method tagged more than once, not invoking"
        );
        return Ok(());
    }

    let signature = format!("fn {}(&self) -> Result<(), PluginError>", hook.method);
    guarded(desc.name(), || {
        consumer
            .instance
            .invoke(hook.method)
            .ok_or_else(|| {
                PluginError::configuration(
                    desc.name(),
                    format!("post-construct method not found, expected `{signature}`"),
                )
            })?
            .map_err(|err| {
                PluginError::configuration_caused_by(
                    desc.name(),
                    format!("error executing post-construct method `{}`", hook.method),
                    err,
                )
            })
    })?;
    debug!(plugin = desc.name(), method = hook.method, "Ran post-construct method");
    Ok(())
}

/// Runs plugin code, turning a panic into [`PluginError::Panicked`].
pub fn guarded<T>(
    plugin: &str,
    f: impl FnOnce() -> Result<T, PluginError>,
) -> Result<T, PluginError> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(PluginError::Panicked {
            plugin: plugin.to_string(),
            message: panic_message(payload.as_ref()),
        })
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tessera_core::{
        ClassIdentity, InjectionDescriptor, Injected, InjectionPoints, PluginsConfig, Provided,
        Registration, Service, TypeInfo, identity_of,
    };
    use tessera_macros::Plugin;

    use super::*;

    // ─── Fixtures ────────────────────────────────────────────────────────────

    #[derive(Default)]
    struct Greeting(String);

    #[derive(Default)]
    struct GreetingProvider;
    impl Plugin for GreetingProvider {}
    impl InjectionPoints for GreetingProvider {}
    impl Provider for GreetingProvider {
        fn produced_type(&self) -> TypeInfo {
            TypeInfo::of::<Greeting>()
        }
        fn produce(&self, consumer: &PluginRecord<dyn Plugin>) -> Result<Provided, PluginError> {
            Ok(Provided::new(Greeting(format!("hello {}", consumer.name))))
        }
    }

    #[derive(Default)]
    struct BrokenProvider;
    impl Plugin for BrokenProvider {}
    impl InjectionPoints for BrokenProvider {}
    impl Provider for BrokenProvider {
        fn produced_type(&self) -> TypeInfo {
            TypeInfo::of::<Greeting>()
        }
        fn produce(&self, _: &PluginRecord<dyn Plugin>) -> Result<Provided, PluginError> {
            Err(PluginError::missing_artifact("libgreeting"))
        }
    }

    #[derive(Default, Plugin)]
    #[plugin(post_construct(ready))]
    struct Greeter {
        #[inject("greeting")]
        greeting: Injected<Greeting>,
        ready_calls: AtomicUsize,
    }

    impl Greeter {
        fn ready(&self) -> Result<(), PluginError> {
            self.ready_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
    impl Service for Greeter {}

    #[derive(Default, Plugin)]
    #[plugin(post_construct(ready, ready))]
    struct DoubleTagged {
        ready_calls: AtomicUsize,
    }

    impl DoubleTagged {
        fn ready(&self) -> Result<(), PluginError> {
            self.ready_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
    impl Service for DoubleTagged {}

    #[derive(Default, Plugin)]
    #[plugin(post_construct(explode))]
    struct FailingHook;

    impl FailingHook {
        fn explode(&self) -> Result<(), PluginError> {
            Err(PluginError::custom("hook failed"))
        }
    }
    impl Service for FailingHook {}

    fn provider_record(name: &'static str, instance: Arc<dyn Provider>) -> PluginRecord<dyn Provider> {
        let desc = PluginDescriptor::new(
            PluginCategory::Provider,
            ClassIdentity::new(name),
            Registration::new(name),
        );
        PluginRecord::new(&desc, &PluginsConfig::new(), instance)
    }

    fn pending<T: Plugin + InjectionPoints>(name: &'static str, instance: Arc<T>) -> PendingInjection {
        let desc = PluginDescriptor::new(
            PluginCategory::Service,
            ClassIdentity::new(name),
            Registration::new(name),
        )
        .with_injections(T::INJECTIONS);
        let instance: Arc<dyn Plugin> = instance;
        PendingInjection {
            descriptor: desc,
            record: PluginRecord::new(&desc, &PluginsConfig::new(), instance),
        }
    }

    // ─── Tests ───────────────────────────────────────────────────────────────

    #[test]
    fn test_field_injection_and_post_construct() {
        let providers = [provider_record("greeting", Arc::new(GreetingProvider))];
        let greeter = Arc::new(Greeter::default());
        let report = Injector::new(&providers).inject_all(vec![pending("greeter", greeter.clone())]);

        assert_eq!(report.completed, 1);
        assert!(report.failures.is_empty());
        assert_eq!(greeter.greeting.get().map(|g| g.0.as_str()), Some("hello greeter"));
        assert_eq!(greeter.ready_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_provider_leaves_field_unset() {
        let greeter = Arc::new(Greeter::default());
        let report = Injector::new(&[]).inject_all(vec![pending("greeter", greeter.clone())]);

        assert_eq!(report.completed, 0);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0].error,
            PluginError::NoProvider { ref provider, .. } if provider == "greeting"
        ));
        assert!(!greeter.greeting.is_set());
        assert_eq!(greeter.ready_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_duplicate_hook_mapping_is_skipped() {
        assert_eq!(DoubleTagged::INJECTIONS.len(), 2);
        let plugin = Arc::new(DoubleTagged::default());
        let report = Injector::new(&[]).inject_all(vec![pending("double", plugin.clone())]);
        assert_eq!(report.completed, 1);
        assert_eq!(plugin.ready_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_hook_method_is_configuration_error() {
        static HOOK: &[InjectionDescriptor] =
            &[InjectionDescriptor::post_construct("vanished", identity_of("Greeter::vanished"))];
        let desc = PluginDescriptor::new(
            PluginCategory::Service,
            ClassIdentity::new("tests::Greeter"),
            Registration::new("greeter"),
        )
        .with_injections(HOOK);
        let instance: Arc<dyn Plugin> = Arc::new(Greeter::default());
        let record = PluginRecord::new(&desc, &PluginsConfig::new(), instance);

        let err = Injector::new(&[]).inject(&desc, &record).unwrap_err();
        assert!(err.to_string().contains("fn vanished(&self)"));
    }

    #[test]
    fn test_hook_error_is_wrapped() {
        let report =
            Injector::new(&[]).inject_all(vec![pending("failing", Arc::new(FailingHook))]);
        assert_eq!(report.failures.len(), 1);
        let err = &report.failures[0].error;
        assert!(matches!(err, PluginError::Configuration { .. }));
        assert_eq!(tessera_core::root_cause(err).to_string(), "hook failed");
    }

    #[test]
    fn test_missing_artifact_reported_with_hint() {
        let providers = [provider_record("greeting", Arc::new(BrokenProvider))];
        let report = Injector::new(&providers)
            .inject_all(vec![pending("greeter", Arc::new(Greeter::default()))]);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].is_missing_artifact());
        assert!(report.failures[0].to_string().contains(MISSING_ARTIFACT_HINT));
    }
}
