//! Procedural macros for the Tessera plugin engine.
//!
//! This crate provides `#[derive(Plugin)]`, which turns a plain struct into a
//! plugin with named-provider field injection and post-construct hooks:
//!
//! ```rust,ignore
//! use tessera_core::{Injected, PluginError};
//! use tessera_macros::Plugin;
//!
//! #[derive(Default, Plugin)]
//! #[plugin(post_construct(warm_up))]
//! pub struct Greeter {
//!     #[inject("app-config")]
//!     config: Injected<AppConfig>,
//!     #[inject]
//!     clock: Injected<Clock>,
//! }
//!
//! impl Greeter {
//!     fn warm_up(&self) -> Result<(), PluginError> {
//!         Ok(())
//!     }
//! }
//! ```

mod plugin;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `Plugin` and `InjectionPoints` for a struct.
///
/// # Field attributes
///
/// - `#[inject("provider")]`: inject the value produced by the provider named
///   `provider`.  The field must be an `Injected<T>`.
/// - `#[inject]`: same, using the field name as the provider name.
///
/// # Struct attributes
///
/// - `#[plugin(post_construct(a, b))]`: methods run after injection, in
///   order.  Each must be `fn(&self) -> Result<(), PluginError>`.
/// - `#[plugin(crate = path)]`: path to `tessera_core` when it is re-exported
///   (default `::tessera_core`).
#[proc_macro_derive(Plugin, attributes(plugin, inject))]
pub fn derive_plugin(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match plugin::derive_plugin(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
