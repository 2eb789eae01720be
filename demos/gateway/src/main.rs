//! Gateway Example
//!
//! A tiny API gateway assembled entirely from plugins discovered at link time.
//!
//! # Plugins
//!
//! ```text
//! request-counter (provider) ──► ping (service) ◄── config (built-in)
//!                           └──► request-log (interceptor, any service)
//! proxy-audit (interceptor, proxied traffic only)
//! mount-health (initializer, before startup) ──► health (service)
//! banner (initializer, after startup)
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package gateway
//! cargo run --package gateway -- --config gateway.toml --profile dev
//! ```
//!
//! Plugins can be switched off through the configuration:
//!
//! ```toml
//! [plugins_args.proxy-audit]
//! enabled = false
//!
//! [plugins_args.ping]
//! reply = "pong"
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use clap::Parser;
use tessera::core::PluginsConfig;
use tessera::prelude::*;
use tracing::info;

// ============================================================================
// Exchange Types
// ============================================================================

struct PingRequest;
struct PingResponse;

/// Shared counter handed to every consumer of `request-counter`.
#[derive(Default)]
struct RequestCounter(AtomicU64);

impl RequestCounter {
    fn hit(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

// ============================================================================
// Providers
// ============================================================================

#[derive(Default, Plugin)]
#[plugin(crate = tessera::core)]
struct RequestCounterProvider {
    counter: std::sync::Arc<RequestCounter>,
}

impl Provider for RequestCounterProvider {
    fn produced_type(&self) -> TypeInfo {
        TypeInfo::of::<RequestCounter>()
    }

    fn produce(&self, consumer: &PluginRecord<dyn Plugin>) -> Result<Provided, PluginError> {
        info!(consumer = consumer.name, "Sharing request counter");
        Ok(Provided::from_arc(self.counter.clone()))
    }
}

register_plugin!(
    Provider: RequestCounterProvider => Registration::new("request-counter")
        .description("Counts requests across services")
);

// ============================================================================
// Services
// ============================================================================

#[derive(Default, Plugin)]
#[plugin(crate = tessera::core, post_construct(ready))]
struct Ping {
    #[inject("request-counter")]
    counter: Injected<RequestCounter>,
    #[inject("config")]
    config: Injected<ConfigMap>,
}

impl Ping {
    fn ready(&self) -> Result<(), PluginError> {
        let counter = self
            .counter
            .get()
            .ok_or_else(|| PluginError::custom("request counter not injected"))?;
        let reply = self
            .config
            .get()
            .and_then(|c| c.get("reply"))
            .and_then(|v| v.as_str())
            .unwrap_or("pong");
        info!(hits = counter.hit(), reply, "Ping service ready");
        Ok(())
    }
}

impl Service for Ping {
    fn contract(&self) -> Contract {
        Contract::of::<PingRequest, PingResponse>()
    }
}

register_plugin!(
    Service: Ping => Registration::new("ping")
        .description("Replies to liveness probes")
        .default_uri("/ping")
        .secure(false)
);

/// Mounted at startup by `mount-health` rather than discovered.
#[derive(Default, Plugin)]
#[plugin(crate = tessera::core)]
struct Health;

impl Service for Health {}

static HEALTH: PluginDescriptor = plugin_descriptor!(
    Service: Health => Registration::new("health").default_uri("/health")
);

// ============================================================================
// Interceptors
// ============================================================================

#[derive(Default, Plugin)]
#[plugin(crate = tessera::core)]
struct RequestLog {
    #[inject("request-counter")]
    counter: Injected<RequestCounter>,
}

impl Interceptor for RequestLog {
    fn contract(&self) -> Contract {
        Contract::ANY
    }
}

register_plugin!(
    Interceptor: RequestLog => Registration::new("request-log")
        .intercept_point(InterceptPoint::RequestAfterAuth)
        .priority(1)
);

#[derive(Default, Plugin)]
#[plugin(crate = tessera::core)]
struct ProxyAudit;

impl Interceptor for ProxyAudit {
    fn contract(&self) -> Contract {
        Contract::byte_stream()
    }
}

register_plugin!(
    Interceptor: ProxyAudit => Registration::new("proxy-audit")
        .intercept_point(InterceptPoint::RequestAfterAuth)
);

// ============================================================================
// Initializers
// ============================================================================

#[derive(Default, Plugin)]
#[plugin(crate = tessera::core)]
struct MountHealth;

impl Initializer for MountHealth {
    fn init(&self, registry: &dyn Registry) -> Result<(), PluginError> {
        let instance: std::sync::Arc<dyn Service> = std::sync::Arc::new(Health);
        registry.add_service(PluginRecord::new(&HEALTH, &PluginsConfig::new(), instance));
        Ok(())
    }
}

register_plugin!(
    Initializer: MountHealth => Registration::new("mount-health").init_point(InitPoint::BeforeStartup)
);

#[derive(Default, Plugin)]
#[plugin(crate = tessera::core)]
struct Banner;

impl Initializer for Banner {
    fn init(&self, registry: &dyn Registry) -> Result<(), PluginError> {
        for service in registry.services() {
            let uri = service.registration.default_uri.unwrap_or("/");
            info!(service = service.name, uri, "Serving");
        }
        Ok(())
    }
}

register_plugin!(Initializer: Banner => Registration::new("banner"));

// ============================================================================
// Main Entry Point
// ============================================================================

#[derive(Debug, Parser)]
#[command(about = "Boots a gateway from link-time registered plugins")]
struct Args {
    /// Configuration file (TOML by default).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. `dev` or `prod`.
    #[arg(short, long)]
    profile: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = TesseraRuntime::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = args.profile {
        builder = builder.profile(profile);
    }
    let runtime = builder.build()?;

    runtime.boot();
    runtime.after_startup();

    let registry = runtime.registry();
    for point in [InterceptPoint::RequestAfterAuth, InterceptPoint::Response] {
        let handled: Vec<_> = registry
            .interceptors_for(Some("ping"), point)
            .iter()
            .map(|i| i.name)
            .collect();
        let proxied: Vec<_> = registry
            .interceptors_for(None, point)
            .iter()
            .map(|i| i.name)
            .collect();
        info!(point = point.as_str(), ?handled, ?proxied, "Interceptor chains");
    }

    info!("{}", runtime.stats());
    Ok(())
}
