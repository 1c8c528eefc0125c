//! Code generation for structs.

use std::collections::HashMap;

use proc_macro2::{Span, TokenStream};
use quote::{ToTokens, quote};
use syn::ext::IdentExt;
use syn::{DataStruct, DeriveInput, Fields, Index, Member};

use crate::attributes::{FieldAttributes, TypeAttributes};
use crate::path;

pub(crate) fn impl_struct(ast: &DeriveInput, data: &DataStruct, vc_bind_path: &syn::Path) -> syn::Result<TokenStream> {
    let attrs = TypeAttributes::parse_attrs(&ast.attrs)?;
    let info_ = path::info_(vc_bind_path);
    let box_ = path::box_(vc_bind_path);

    let mut builder = Vec::new();
    if attrs.default.is_some() {
        builder.push(quote! { .with_default_ctor(#info_::construct_default::<Self>) });
    }
    if attrs.from_str.is_some() {
        builder.push(quote! { .with_string_ctor(#info_::construct_from_str::<Self>) });
    }
    if attrs.flatten.is_some() {
        builder.push(quote! { .with_flatten(true) });
    }
    if let Some(key) = &attrs.discriminator {
        let value = match &attrs.discriminator_value {
            Some(value) => value.value(),
            None => ast.ident.unraw().to_string(),
        };
        builder.push(quote! { .with_discriminator(#key, #value) });
    }

    match &data.fields {
        Fields::Named(fields) => {
            let mut wire_names: HashMap<String, Span> = HashMap::new();
            let mut base = None;

            for field in &fields.named {
                let field_attrs = FieldAttributes::parse_attrs(&field.attrs)?;
                if field_attrs.skip.is_some() {
                    continue;
                }
                // Named fields always carry an ident.
                let Some(ident) = &field.ident else { continue };
                let member = Member::Named(ident.clone());
                let ty = &field.ty;

                if let Some(span) = field_attrs.base {
                    if base.is_some() {
                        return Err(syn::Error::new(span, "a type has at most one `base` field"));
                    }
                    base = Some(quote! {
                        .with_base(#info_::BaseInfo::new::<#ty>(
                            |this| this.downcast_ref::<Self>().map(|this| &this.#member as &dyn ::core::any::Any),
                            |this| this.downcast_mut::<Self>().map(|this| &mut this.#member as &mut dyn ::core::any::Any),
                        ))
                    });
                    continue;
                }

                let name = ident.unraw().to_string();
                let wire = field_attrs.rename.as_ref().map_or_else(|| name.clone(), syn::LitStr::value);
                if let Some(previous) = wire_names.insert(wire.clone(), ident.span()) {
                    let mut err = syn::Error::new(ident.span(), format!("duplicate wire name `{wire}`"));
                    err.combine(syn::Error::new(previous, "first used here"));
                    return Err(err);
                }

                builder.push(prop_tokens(vc_bind_path, &name, &wire, &member, ty, &field_attrs));
            }
            if let Some(base) = base {
                builder.insert(0, base);
            }
        }
        Fields::Unnamed(fields) => {
            let mut iter = fields.unnamed.iter();
            let (Some(field), None) = (iter.next(), iter.next()) else {
                return Err(syn::Error::new_spanned(
                    &fields.unnamed,
                    "tuple structs need exactly one field, use named fields instead",
                ));
            };
            FieldAttributes::parse_attrs(&field.attrs)?.reject_all()?;

            let ty = &field.ty;
            let member = Member::Unnamed(Index::from(0));
            builder.push(quote! {
                .with_value_ctor(|value| {
                    #info_::unbox::<#ty>(value).map(|inner| #box_::new(Self(inner)) as #vc_bind_path::BoxedValue)
                })
            });
            builder.push(quote! {
                .with_prop(
                    #info_::PropInfo::new::<#ty>("0")
                        .with_getter(#info_::AccessorKind::Field, |this| {
                            this.downcast_ref::<Self>().map(|this| &this.#member as &dyn #vc_bind_path::Bindable)
                        })
                        .with_flags(#info_::PropFlags::VALUE)
                )
            });
        }
        Fields::Unit => {
            if attrs.default.is_none() {
                builder.push(quote! {
                    .with_default_ctor(|| #box_::new(Self) as #vc_bind_path::BoxedValue)
                });
            }
        }
    }

    let generics = path::bind_generics(&ast.generics, vc_bind_path)?;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let ident = &ast.ident;
    let type_name = ident.unraw().to_string();

    Ok(quote! {
        impl #impl_generics #vc_bind_path::Bind for #ident #ty_generics #where_clause {
            fn shape() -> #info_::Shape {
                #info_::Shape::Bean(
                    #info_::BeanInfo::new::<Self>()
                        #(#builder)*
                )
            }

            #[inline]
            fn type_name() -> &'static str {
                #type_name
            }
        }
    })
}

fn prop_tokens(
    vc_bind_path: &syn::Path,
    name: &str,
    wire: &str,
    member: &Member,
    ty: &syn::Type,
    attrs: &FieldAttributes,
) -> TokenStream {
    let info_ = path::info_(vc_bind_path);

    let with_wire_name = (wire != name).then(|| quote! { .with_wire_name(#wire) });

    let with_getter = match &attrs.get {
        Some(method) => quote! {
            .with_getter(#info_::AccessorKind::Method, |this| {
                this.downcast_ref::<Self>().map(|this| Self::#method(this) as &dyn #vc_bind_path::Bindable)
            })
        },
        None => quote! {
            .with_getter(#info_::AccessorKind::Field, |this| {
                this.downcast_ref::<Self>().map(|this| &this.#member as &dyn #vc_bind_path::Bindable)
            })
        },
    };

    let with_setter = match (&attrs.set, attrs.read_only) {
        (_, Some(_)) => None,
        (Some(method), None) => Some(quote! {
            .with_setter(|this, value| {
                Self::#method(#info_::target_mut::<Self>(this)?, #info_::unbox::<#ty>(value)?);
                ::core::result::Result::Ok(())
            })
        }),
        (None, None) => Some(quote! {
            .with_setter(|this, value| {
                #info_::target_mut::<Self>(this)?.#member = #info_::unbox::<#ty>(value)?;
                ::core::result::Result::Ok(())
            })
        }),
    };

    let flags: Vec<TokenStream> = [
        (attrs.flatten, "FLATTEN"),
        (attrs.unwrapped, "UNWRAPPED"),
        (attrs.value, "VALUE"),
        (attrs.read_only, "READ_ONLY"),
    ]
    .into_iter()
    .filter(|(span, _)| span.is_some())
    .map(|(_, flag)| syn::Ident::new(flag, Span::call_site()).into_token_stream())
    .collect();
    let with_flags = (!flags.is_empty()).then(|| quote! { .with_flags(#(#info_::PropFlags::#flags)|*) });

    quote! {
        .with_prop(
            #info_::PropInfo::new::<#ty>(#name)
                #with_wire_name
                #with_getter
                #with_setter
                #with_flags
        )
    }
}
