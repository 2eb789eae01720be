//! Plugin descriptor: the static, `Copy` description of a discovered plugin.
//!
//! A [`PluginDescriptor`] is produced once by discovery and never changes
//! afterwards.  It carries the plugin's category, implementation identity,
//! registration metadata, declared injection points and a constructor.

use std::fmt;

use crate::error::PluginError;
use crate::plugin::PluginInstance;
use crate::types::{InitPoint, InterceptPoint, TypeInfo};

// ─── API versioning ───────────────────────────────────────────────────────────

/// Current Tessera plugin API version (1.0).
pub const TESSERA_PLUGIN_API_VERSION: u32 = 0x0001_0000;

/// Priority assigned to plugins that do not declare one.
pub const DEFAULT_PRIORITY: i32 = 10;

// ─── ClassIdentity ────────────────────────────────────────────────────────────

/// Stable, comparable handle to a plugin's implementation.
///
/// Discovery never yields two descriptors with the same identity in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassIdentity(&'static str);

impl ClassIdentity {
    pub const fn new(path: &'static str) -> Self {
        Self(path)
    }

    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ClassIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

// ─── PluginCategory ───────────────────────────────────────────────────────────

/// The kind of extension a plugin is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PluginCategory {
    Provider,
    Initializer,
    AuthMechanism,
    Authorizer,
    TokenManager,
    Authenticator,
    Interceptor,
    Service,
}

impl PluginCategory {
    /// Fixed instantiation order.  Later categories may depend on earlier ones
    /// through injection, never the reverse.
    pub const BOOT_ORDER: [PluginCategory; 8] = [
        PluginCategory::Provider,
        PluginCategory::Initializer,
        PluginCategory::AuthMechanism,
        PluginCategory::Authorizer,
        PluginCategory::TokenManager,
        PluginCategory::Authenticator,
        PluginCategory::Interceptor,
        PluginCategory::Service,
    ];

    /// Human-readable label used in log output.
    pub const fn label(&self) -> &'static str {
        match self {
            PluginCategory::Provider => "provider",
            PluginCategory::Initializer => "initializer",
            PluginCategory::AuthMechanism => "auth mechanism",
            PluginCategory::Authorizer => "authorizer",
            PluginCategory::TokenManager => "token manager",
            PluginCategory::Authenticator => "authenticator",
            PluginCategory::Interceptor => "interceptor",
            PluginCategory::Service => "service",
        }
    }
}

impl fmt::Display for PluginCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ─── Registration ─────────────────────────────────────────────────────────────

/// Registration metadata attached to a plugin implementation.
///
/// Every setter is `const` so a registration can be written directly in a
/// `static` descriptor:
///
/// ```rust,ignore
/// const REG: Registration = Registration::new("ping")
///     .description("replies with pong")
///     .priority(5)
///     .secure(true);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub name: &'static str,
    pub description: &'static str,
    /// Lower values are instantiated (and run) first.
    pub priority: i32,
    pub enabled_by_default: bool,
    pub secure: bool,
    /// Interceptors only.
    pub intercept_point: InterceptPoint,
    /// Initializers only.
    pub init_point: InitPoint,
    /// Services only: intercept points this service opts out of.
    pub dont_intercept: &'static [InterceptPoint],
    /// Services only.
    pub default_uri: Option<&'static str>,
}

impl Registration {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            description: "",
            priority: DEFAULT_PRIORITY,
            enabled_by_default: true,
            secure: false,
            intercept_point: InterceptPoint::RequestAfterAuth,
            init_point: InitPoint::AfterStartup,
            dont_intercept: &[],
            default_uri: None,
        }
    }

    pub const fn description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub const fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub const fn enabled_by_default(mut self, enabled: bool) -> Self {
        self.enabled_by_default = enabled;
        self
    }

    pub const fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub const fn intercept_point(mut self, point: InterceptPoint) -> Self {
        self.intercept_point = point;
        self
    }

    pub const fn init_point(mut self, point: InitPoint) -> Self {
        self.init_point = point;
        self
    }

    pub const fn dont_intercept(mut self, points: &'static [InterceptPoint]) -> Self {
        self.dont_intercept = points;
        self
    }

    pub const fn default_uri(mut self, uri: &'static str) -> Self {
        self.default_uri = Some(uri);
        self
    }
}

// ─── Injection points ─────────────────────────────────────────────────────────

/// "Field `field` must receive the value produced by provider `provider`."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInjection {
    pub field: &'static str,
    pub declared_type: TypeInfo,
    pub provider: &'static str,
}

/// Lifecycle hook kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// Runs once, after every field of the plugin has been injected.
    PostConstruct,
}

/// A tagged lifecycle method.
///
/// `identity` identifies the method implementation.  A hook only runs when
/// exactly one descriptor on the plugin carries that identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodInjection {
    pub method: &'static str,
    pub kind: HookKind,
    pub identity: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionDescriptor {
    Field(FieldInjection),
    Method(MethodInjection),
}

impl InjectionDescriptor {
    /// Field injection of a `T` from the provider named `provider`.
    pub const fn field<T: ?Sized + 'static>(field: &'static str, provider: &'static str) -> Self {
        InjectionDescriptor::Field(FieldInjection {
            field,
            declared_type: TypeInfo::of::<T>(),
            provider,
        })
    }

    /// Post-construct hook named `method`, identified by `identity`.
    pub const fn post_construct(method: &'static str, identity: u64) -> Self {
        InjectionDescriptor::Method(MethodInjection {
            method,
            kind: HookKind::PostConstruct,
            identity,
        })
    }
}

/// 64-bit FNV-1a hash, usable in `const` context.
///
/// Derive macros use it to compute [`MethodInjection::identity`] from
/// `"Type::method"`.
pub const fn identity_of(key: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let bytes = key.as_bytes();
    let mut hash = OFFSET;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(PRIME);
        i += 1;
    }
    hash
}

// ─── PluginDescriptor ─────────────────────────────────────────────────────────

/// Zero-argument constructor contract.
pub type Constructor = fn() -> Result<PluginInstance, PluginError>;

/// A static, `Copy` descriptor that identifies and instantiates a plugin.
///
/// Use [`plugin_descriptor!`](crate::plugin_descriptor) or
/// [`register_plugin!`](crate::register_plugin) to build one from a type.
#[derive(Clone, Copy)]
pub struct PluginDescriptor {
    /// Plugin API version this descriptor was compiled against.
    pub api_version: u32,
    pub category: PluginCategory,
    pub class: ClassIdentity,
    pub registration: Registration,
    injections: &'static [InjectionDescriptor],
    constructor: Option<Constructor>,
}

impl PluginDescriptor {
    /// Descriptor with no injections and no constructor.
    pub const fn new(
        category: PluginCategory,
        class: ClassIdentity,
        registration: Registration,
    ) -> Self {
        Self {
            api_version: TESSERA_PLUGIN_API_VERSION,
            category,
            class,
            registration,
            injections: &[],
            constructor: None,
        }
    }

    pub const fn with_injections(mut self, injections: &'static [InjectionDescriptor]) -> Self {
        self.injections = injections;
        self
    }

    pub const fn with_constructor(mut self, constructor: Constructor) -> Self {
        self.constructor = Some(constructor);
        self
    }

    pub const fn with_api_version(mut self, version: u32) -> Self {
        self.api_version = version;
        self
    }

    /// Returns `true` if this descriptor's API version is compatible with the
    /// running engine.
    ///
    /// The major part must match exactly; the descriptor's minor part must be
    /// ≤ the host's minor part.
    pub fn is_compatible(&self) -> bool {
        let host_major = TESSERA_PLUGIN_API_VERSION >> 16;
        let host_minor = TESSERA_PLUGIN_API_VERSION & 0xFFFF;
        let desc_major = self.api_version >> 16;
        let desc_minor = self.api_version & 0xFFFF;
        desc_major == host_major && desc_minor <= host_minor
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.registration.name
    }

    #[inline]
    pub fn priority(&self) -> i32 {
        self.registration.priority
    }

    #[inline]
    pub fn enabled_by_default(&self) -> bool {
        self.registration.enabled_by_default
    }

    #[inline]
    pub fn injections(&self) -> &'static [InjectionDescriptor] {
        self.injections
    }

    #[inline]
    pub fn constructor(&self) -> Option<Constructor> {
        self.constructor
    }

    pub fn field_injections(&self) -> impl Iterator<Item = &'static FieldInjection> + use<> {
        let injections: &'static [InjectionDescriptor] = self.injections;
        injections.iter().filter_map(|i| match i {
            InjectionDescriptor::Field(f) => Some(f),
            InjectionDescriptor::Method(_) => None,
        })
    }

    pub fn method_injections(&self) -> impl Iterator<Item = &'static MethodInjection> + use<> {
        let injections: &'static [InjectionDescriptor] = self.injections;
        injections.iter().filter_map(|i| match i {
            InjectionDescriptor::Method(m) => Some(m),
            InjectionDescriptor::Field(_) => None,
        })
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("name", &self.registration.name)
            .field("category", &self.category)
            .field("class", &self.class)
            .field("priority", &self.registration.priority)
            .field("injections", &self.injections)
            .field("has_constructor", &self.constructor.is_some())
            .finish()
    }
}

// Descriptors are compared by implementation identity.
impl PartialEq for PluginDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class
    }
}

impl Eq for PluginDescriptor {}

impl std::hash::Hash for PluginDescriptor {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.class.hash(state);
    }
}
