// ─── plugin_descriptor! ───────────────────────────────────────────────────────

/// Creates a [`PluginDescriptor`](crate::PluginDescriptor) for a plugin type.
///
/// The type must implement its category trait and
/// [`InjectionPoints`](crate::InjectionPoints) (both usually via
/// `#[derive(Plugin)]`).  By default it is constructed with
/// `Default::default()`; pass `constructor = path` to use a fallible
/// `fn() -> Result<T, PluginError>` instead.
///
/// # Syntax
///
/// ```rust,ignore
/// static PING: PluginDescriptor = plugin_descriptor!(
///     Service: PingService => Registration::new("ping").priority(5)
/// );
///
/// static DB: PluginDescriptor = plugin_descriptor!(
///     Provider: DbProvider => Registration::new("db"),
///     constructor = DbProvider::connect
/// );
/// ```
///
/// The first token is the category: `Provider`, `Initializer`,
/// `AuthMechanism`, `Authorizer`, `TokenManager`, `Authenticator`,
/// `Interceptor` or `Service`.
#[macro_export]
macro_rules! plugin_descriptor {
    ($category:ident : $ty:ty => $registration:expr $(,)?) => {
        $crate::__descriptor_base!($category: $ty => $registration).with_constructor(|| {
            ::core::result::Result::Ok($crate::PluginInstance::$category(
                ::std::sync::Arc::new(<$ty as ::core::default::Default>::default()),
            ))
        })
    };

    ($category:ident : $ty:ty => $registration:expr, constructor = $ctor:path $(,)?) => {
        $crate::__descriptor_base!($category: $ty => $registration).with_constructor(|| {
            let plugin: $ty = $ctor()?;
            ::core::result::Result::Ok($crate::PluginInstance::$category(
                ::std::sync::Arc::new(plugin),
            ))
        })
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! __descriptor_base {
    ($category:ident : $ty:ty => $registration:expr) => {
        $crate::PluginDescriptor::new(
            $crate::PluginCategory::$category,
            $crate::ClassIdentity::new(::core::concat!(
                ::core::module_path!(),
                "::",
                ::core::stringify!($ty)
            )),
            $registration,
        )
        .with_injections(<$ty as $crate::InjectionPoints>::INJECTIONS)
    };
}

// ─── register_plugin! ─────────────────────────────────────────────────────────

/// Registers a plugin for link-time discovery.
///
/// Accepts the same arguments as [`plugin_descriptor!`] and appends the
/// descriptor to [`DISCOVERED_PLUGINS`](crate::DISCOVERED_PLUGINS), where
/// [`StaticDiscovery::collect_all`](crate::StaticDiscovery::collect_all)
/// finds it.
///
/// ```rust,ignore
/// register_plugin!(Service: PingService => Registration::new("ping"));
/// ```
#[macro_export]
macro_rules! register_plugin {
    ($($args:tt)*) => {
        const _: () = {
            #[$crate::linkme::distributed_slice($crate::DISCOVERED_PLUGINS)]
            #[linkme(crate = $crate::linkme)]
            static DESCRIPTOR: $crate::PluginDescriptor = $crate::plugin_descriptor!($($args)*);
        };
    };
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        InjectionPoints, Plugin, PluginCategory, PluginDescriptor, PluginError, PluginInstance,
        Registration, Service,
    };

    #[derive(Default)]
    struct Echo;
    impl Plugin for Echo {}
    impl InjectionPoints for Echo {}
    impl Service for Echo {}

    struct Fallible;
    impl Plugin for Fallible {}
    impl InjectionPoints for Fallible {}
    impl Service for Fallible {}

    impl Fallible {
        fn open() -> Result<Self, PluginError> {
            Err(PluginError::custom("backend unavailable"))
        }
    }

    static ECHO: PluginDescriptor =
        plugin_descriptor!(Service: Echo => Registration::new("echo").priority(1));

    static FALLIBLE: PluginDescriptor = plugin_descriptor!(
        Service: Fallible => Registration::new("fallible"),
        constructor = Fallible::open
    );

    #[test]
    fn test_descriptor_from_type() {
        assert_eq!(ECHO.category, PluginCategory::Service);
        assert_eq!(ECHO.name(), "echo");
        assert!(ECHO.class.as_str().ends_with("::Echo"));
        assert!(ECHO.injections().is_empty());

        let ctor = ECHO.constructor().unwrap();
        let instance = ctor().unwrap();
        assert!(matches!(instance, PluginInstance::Service(_)));
        let _: Arc<dyn Plugin> = instance.as_plugin();
    }

    #[test]
    fn test_custom_constructor_error_propagates() {
        let ctor = FALLIBLE.constructor().unwrap();
        let err = ctor().unwrap_err();
        assert_eq!(err.to_string(), "backend unavailable");
    }
}
