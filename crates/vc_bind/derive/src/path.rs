//! Paths into `vc_bind` used by the generated code.

use proc_macro2::TokenStream;
use quote::quote;
use syn::Generics;

/// The path of the `vc_bind` crate as seen from the crate being compiled.
///
/// Resolved from the caller's `Cargo.toml`; inside `vc_bind` itself this is
/// `::vc_bind` too, which the crate aliases to itself.
pub(crate) fn vc_bind() -> syn::Path {
    vc_macro_utils::Manifest::shared(|manifest| manifest.get_crate_path("vc_bind"))
}

#[inline(always)]
pub(crate) fn info_(vc_bind_path: &syn::Path) -> TokenStream {
    quote! { #vc_bind_path::info }
}

#[inline(always)]
pub(crate) fn box_(vc_bind_path: &syn::Path) -> TokenStream {
    quote! { #vc_bind_path::__macro_exports::Box }
}

/// Adds a `Bind` bound to every type parameter and rejects lifetimes.
pub(crate) fn bind_generics(generics: &Generics, vc_bind_path: &syn::Path) -> syn::Result<Generics> {
    if let Some(lifetime) = generics.lifetimes().next() {
        return Err(syn::Error::new_spanned(
            lifetime,
            "`Bind` types must be `'static`, remove the lifetime parameter",
        ));
    }
    let mut generics = generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(syn::parse_quote!(#vc_bind_path::Bind));
    }
    Ok(generics)
}
