//! Plugin contracts: the base [`Plugin`] trait, one trait per category and
//! the [`PluginInstance`] / [`Category`] glue used to keep collections typed.

use std::fmt;
use std::sync::Arc;

use crate::descriptor::{InjectionDescriptor, PluginCategory};
use crate::error::{InjectionError, PluginError};
use crate::inject::Provided;
use crate::record::PluginRecord;
use crate::registry::Registry;
use crate::types::{Contract, TypeInfo};

// =============================================================================
// Base trait
// =============================================================================

/// Base contract shared by every plugin.
///
/// The two methods replace reflective field assignment and method lookup.
/// They are normally generated by `#[derive(Plugin)]`; a plugin without
/// injection points can rely on the defaults.
pub trait Plugin: Send + Sync + 'static {
    /// Stores a provider's value into the field named `field`.
    fn inject(&self, field: &str, value: Provided) -> Result<(), InjectionError> {
        let _ = value;
        Err(InjectionError::UnknownField {
            field: field.to_string(),
        })
    }

    /// Invokes the zero-argument lifecycle method named `method`.
    ///
    /// Returns `None` if the plugin has no such method.
    fn invoke(&self, method: &str) -> Option<Result<(), PluginError>> {
        let _ = method;
        None
    }
}

/// Static table of a plugin type's declared injection points.
///
/// Kept separate from [`Plugin`] so the latter stays object safe.
pub trait InjectionPoints {
    const INJECTIONS: &'static [InjectionDescriptor] = &[];
}

// =============================================================================
// Category traits
// =============================================================================

/// A named plugin whose purpose is to produce values injected into other
/// plugins.
pub trait Provider: Plugin {
    /// Type of the values returned by [`produce`](Provider::produce).
    ///
    /// Must be answerable without producing a value.
    fn produced_type(&self) -> TypeInfo;

    /// Produces the value for one consumer.
    ///
    /// `consumer` is the record of the plugin receiving the value, which
    /// allows per-consumer values (e.g. a logger named after the consumer).
    fn produce(&self, consumer: &PluginRecord<dyn Plugin>) -> Result<Provided, PluginError>;
}

/// Runs custom logic at a host [`InitPoint`](crate::InitPoint).
pub trait Initializer: Plugin {
    fn init(&self, registry: &dyn Registry) -> Result<(), PluginError>;
}

/// Handles one request type and produces one response type.
pub trait Service: Plugin {
    fn contract(&self) -> Contract {
        Contract::byte_stream()
    }
}

/// Runs at an intercept point on exchanges matching its contract.
pub trait Interceptor: Plugin {
    /// [`Contract::ANY`] matches every service.
    fn contract(&self) -> Contract {
        Contract::byte_stream()
    }
}

/// Extracts credentials from a request.
pub trait AuthMechanism: Plugin {}

/// Decides whether an authenticated request may proceed.
pub trait Authorizer: Plugin {}

/// Verifies credentials against an account store.
pub trait Authenticator: Plugin {}

/// Issues and verifies authentication tokens.
pub trait TokenManager: Plugin {}

// =============================================================================
// PluginInstance
// =============================================================================

/// A freshly constructed plugin, tagged with its category.
#[derive(Clone)]
pub enum PluginInstance {
    Provider(Arc<dyn Provider>),
    Initializer(Arc<dyn Initializer>),
    AuthMechanism(Arc<dyn AuthMechanism>),
    Authorizer(Arc<dyn Authorizer>),
    TokenManager(Arc<dyn TokenManager>),
    Authenticator(Arc<dyn Authenticator>),
    Interceptor(Arc<dyn Interceptor>),
    Service(Arc<dyn Service>),
}

impl PluginInstance {
    pub fn category(&self) -> PluginCategory {
        match self {
            PluginInstance::Provider(_) => PluginCategory::Provider,
            PluginInstance::Initializer(_) => PluginCategory::Initializer,
            PluginInstance::AuthMechanism(_) => PluginCategory::AuthMechanism,
            PluginInstance::Authorizer(_) => PluginCategory::Authorizer,
            PluginInstance::TokenManager(_) => PluginCategory::TokenManager,
            PluginInstance::Authenticator(_) => PluginCategory::Authenticator,
            PluginInstance::Interceptor(_) => PluginCategory::Interceptor,
            PluginInstance::Service(_) => PluginCategory::Service,
        }
    }

    /// Erases the category, keeping the same allocation.
    pub fn as_plugin(&self) -> Arc<dyn Plugin> {
        match self {
            PluginInstance::Provider(p) => p.clone(),
            PluginInstance::Initializer(p) => p.clone(),
            PluginInstance::AuthMechanism(p) => p.clone(),
            PluginInstance::Authorizer(p) => p.clone(),
            PluginInstance::TokenManager(p) => p.clone(),
            PluginInstance::Authenticator(p) => p.clone(),
            PluginInstance::Interceptor(p) => p.clone(),
            PluginInstance::Service(p) => p.clone(),
        }
    }
}

impl fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PluginInstance").field(&self.category()).finish()
    }
}

// =============================================================================
// Category markers
// =============================================================================

/// Maps a category marker to the trait object stored in its collection.
pub trait Category: 'static {
    type Instance: ?Sized + Plugin;

    const KIND: PluginCategory;

    /// Extracts the typed instance, or `None` if `instance` belongs to a
    /// different category.
    fn from_instance(instance: PluginInstance) -> Option<Arc<Self::Instance>>;

    fn erase(instance: &Arc<Self::Instance>) -> Arc<dyn Plugin>;
}

macro_rules! category_marker {
    ($(#[$meta:meta])* $marker:ident => $variant:ident : $instance:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub enum $marker {}

        impl Category for $marker {
            type Instance = dyn $instance;

            const KIND: PluginCategory = PluginCategory::$variant;

            fn from_instance(instance: PluginInstance) -> Option<Arc<dyn $instance>> {
                match instance {
                    PluginInstance::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn erase(instance: &Arc<dyn $instance>) -> Arc<dyn Plugin> {
                instance.clone()
            }
        }
    };
}

category_marker!(
    /// Marker for the provider category.
    Providers => Provider: Provider
);
category_marker!(
    /// Marker for the initializer category.
    Initializers => Initializer: Initializer
);
category_marker!(AuthMechanisms => AuthMechanism: AuthMechanism);
category_marker!(Authorizers => Authorizer: Authorizer);
category_marker!(TokenManagers => TokenManager: TokenManager);
category_marker!(Authenticators => Authenticator: Authenticator);
category_marker!(
    /// Marker for the interceptor category.
    Interceptors => Interceptor: Interceptor
);
category_marker!(
    /// Marker for the service category.
    Services => Service: Service
);

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping;
    impl Plugin for Ping {}
    impl Service for Ping {}

    #[test]
    fn test_instance_category_and_erasure() {
        let service: Arc<dyn Service> = Arc::new(Ping);
        let instance = PluginInstance::Service(Arc::clone(&service));
        assert_eq!(instance.category(), PluginCategory::Service);

        let erased = instance.as_plugin();
        assert_eq!(Arc::strong_count(&service), 3);
        assert!(erased.invoke("anything").is_none());
        assert!(matches!(
            erased.inject("field", Provided::new(1u8)),
            Err(InjectionError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_category_downcast() {
        let instance = PluginInstance::Service(Arc::new(Ping));
        assert!(Services::from_instance(instance.clone()).is_some());
        assert!(Interceptors::from_instance(instance).is_none());
        assert_eq!(Services::KIND, PluginCategory::Service);
    }

    #[test]
    fn test_default_service_contract() {
        assert_eq!(Ping.contract(), Contract::byte_stream());
    }
}
