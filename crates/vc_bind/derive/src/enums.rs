//! Code generation for field-less enums.

use std::collections::HashMap;

use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::ext::IdentExt;
use syn::{DataEnum, DeriveInput, Fields};

use crate::attributes::{TypeAttributes, VariantAttributes};
use crate::path;

pub(crate) fn impl_enum(ast: &DeriveInput, data: &DataEnum, vc_bind_path: &syn::Path) -> syn::Result<TokenStream> {
    TypeAttributes::parse_attrs(&ast.attrs)?.reject_all("enums")?;
    let info_ = path::info_(vc_bind_path);
    let box_ = path::box_(vc_bind_path);

    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(&ast.ident, "`Bind` needs at least one variant"));
    }

    let mut names = Vec::with_capacity(data.variants.len());
    let mut seen: HashMap<String, Span> = HashMap::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                &variant.fields,
                "`Bind` enums cannot carry data, use a struct instead",
            ));
        }
        let attrs = VariantAttributes::parse_attrs(&variant.attrs)?;
        let name = match &attrs.rename {
            Some(rename) => rename.value(),
            None => variant.ident.unraw().to_string(),
        };
        if let Some(previous) = seen.insert(name.clone(), variant.ident.span()) {
            let mut err = syn::Error::new(variant.ident.span(), format!("duplicate wire name `{name}`"));
            err.combine(syn::Error::new(previous, "first used here"));
            return Err(err);
        }
        names.push(name);
    }

    let variants: Vec<_> = data.variants.iter().map(|variant| &variant.ident).collect();
    let indices: Vec<usize> = (0..variants.len()).collect();

    let generics = path::bind_generics(&ast.generics, vc_bind_path)?;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let ident = &ast.ident;
    let type_name = ident.unraw().to_string();

    Ok(quote! {
        impl #impl_generics #vc_bind_path::Bind for #ident #ty_generics #where_clause {
            fn shape() -> #info_::Shape {
                #info_::Shape::Enum(#info_::EnumInfo::new(
                    &[#(#names),*],
                    |index| match index {
                        #(#indices => ::core::option::Option::Some(#box_::new(Self::#variants) as #vc_bind_path::BoxedValue),)*
                        _ => ::core::option::Option::None,
                    },
                    |value| value.downcast_ref::<Self>().map(|value| match value {
                        #(Self::#variants => #indices,)*
                    }),
                ))
            }

            #[inline]
            fn type_name() -> &'static str {
                #type_name
            }
        }
    })
}
