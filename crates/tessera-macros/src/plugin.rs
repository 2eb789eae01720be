//! `#[derive(Plugin)]` implementation.
//!
//! Generates two impls:
//!
//! 1. `impl InjectionPoints`: the static injection table (fields first, then
//!    hooks, in declaration order).
//! 2. `impl Plugin`: `inject` dispatches on the field name to
//!    `Injected::fill`, `invoke` dispatches on the hook name.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Fields, GenericArgument, Ident, LitStr, Path, PathArguments,
    Type, spanned::Spanned,
};

// ============================================================================
// Attribute structures
// ============================================================================

struct StructAttrs {
    krate: Path,
    post_construct: Vec<Ident>,
}

struct InjectField {
    ident: Ident,
    provider: String,
    inner: Type,
}

// ============================================================================
// Entry point
// ============================================================================

pub fn derive_plugin(input: &DeriveInput) -> syn::Result<TokenStream> {
    let attrs = parse_struct_attrs(&input.attrs)?;
    let fields = match &input.data {
        Data::Struct(data) => collect_inject_fields(&data.fields)?,
        _ => {
            return Err(syn::Error::new(
                input.span(),
                "#[derive(Plugin)] is only supported on structs",
            ));
        }
    };

    let name = &input.ident;
    let krate = &attrs.krate;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let field_entries = fields.iter().map(|f| {
        let field = f.ident.to_string();
        let provider = &f.provider;
        let inner = &f.inner;
        quote! {
            #krate::InjectionDescriptor::field::<#inner>(#field, #provider)
        }
    });

    let hook_entries = attrs.post_construct.iter().map(|m| {
        let method = m.to_string();
        let identity = format!("{name}::{method}");
        quote! {
            #krate::InjectionDescriptor::post_construct(#method, #krate::identity_of(#identity))
        }
    });

    let inject_arms = fields.iter().map(|f| {
        let ident = &f.ident;
        let field = ident.to_string();
        quote! {
            #field => self.#ident.fill(field, value),
        }
    });

    // Duplicate names would produce unreachable match arms.
    let mut unique_hooks: Vec<&Ident> = Vec::new();
    for hook in &attrs.post_construct {
        if !unique_hooks.contains(&hook) {
            unique_hooks.push(hook);
        }
    }
    let invoke_arms = unique_hooks.iter().map(|m| {
        let method = m.to_string();
        quote! {
            #method => ::core::option::Option::Some(Self::#m(self)),
        }
    });

    Ok(quote! {
        impl #impl_generics #krate::InjectionPoints for #name #ty_generics #where_clause {
            const INJECTIONS: &'static [#krate::InjectionDescriptor] = &[
                #(#field_entries,)*
                #(#hook_entries,)*
            ];
        }

        impl #impl_generics #krate::Plugin for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn inject(
                &self,
                field: &str,
                value: #krate::Provided,
            ) -> ::core::result::Result<(), #krate::InjectionError> {
                match field {
                    #(#inject_arms)*
                    _ => ::core::result::Result::Err(#krate::InjectionError::UnknownField {
                        field: ::std::string::ToString::to_string(field),
                    }),
                }
            }

            fn invoke(
                &self,
                method: &str,
            ) -> ::core::option::Option<::core::result::Result<(), #krate::PluginError>> {
                match method {
                    #(#invoke_arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    })
}

// ============================================================================
// Parsing
// ============================================================================

fn parse_struct_attrs(attrs: &[Attribute]) -> syn::Result<StructAttrs> {
    let mut result = StructAttrs {
        krate: syn::parse_quote!(::tessera_core),
        post_construct: Vec::new(),
    };

    for attr in attrs {
        if !attr.path().is_ident("plugin") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("crate") {
                result.krate = meta.value()?.parse::<Path>()?;
                Ok(())
            } else if meta.path.is_ident("post_construct") {
                meta.parse_nested_meta(|hook| {
                    let ident = hook.path.get_ident().cloned().ok_or_else(|| {
                        syn::Error::new(hook.path.span(), "expected a method name")
                    })?;
                    result.post_construct.push(ident);
                    Ok(())
                })
            } else {
                Err(meta.error("unknown #[plugin] key, expected `post_construct` or `crate`"))
            }
        })?;
    }

    Ok(result)
}

fn collect_inject_fields(fields: &Fields) -> syn::Result<Vec<InjectField>> {
    let mut result = Vec::new();

    for field in fields {
        let Some(attr) = field.attrs.iter().find(|a| a.path().is_ident("inject")) else {
            continue;
        };
        let ident = field.ident.clone().ok_or_else(|| {
            syn::Error::new(field.span(), "#[inject] requires a named field")
        })?;

        let provider = match &attr.meta {
            syn::Meta::Path(_) => ident.to_string(),
            _ => attr.parse_args::<LitStr>()?.value(),
        };

        let inner = injected_inner_type(&field.ty).ok_or_else(|| {
            syn::Error::new(field.ty.span(), "#[inject] fields must have type `Injected<T>`")
        })?;

        result.push(InjectField {
            ident,
            provider,
            inner,
        });
    }

    Ok(result)
}

/// Extracts `T` from a type written as `Injected<T>` (any path prefix).
fn injected_inner_type(ty: &Type) -> Option<Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Injected" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner.clone()),
        _ => None,
    }
}
