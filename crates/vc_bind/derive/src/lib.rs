//! `#[derive(Bind)]` for the `vc_bind` data-binding engine.
//!
//! See [`Bind`] for the supported attributes.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::std_instead_of_core, reason = "proc-macro lib")]
#![allow(clippy::std_instead_of_alloc, reason = "proc-macro lib")]

use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, parse_macro_input};

static BIND_ATTRIBUTE_NAME: &str = "bind";

// -----------------------------------------------------------------------------
// Modules

mod attributes;
mod bean;
mod enums;
mod path;

// -----------------------------------------------------------------------------
// Macros

/// Implements `Bind` for a struct or a field-less enum.
///
/// ## Structs
///
/// Named structs become beans whose properties are their fields, in
/// declaration order. Newtype structs like `struct Id(String);` are value
/// types: they are written as their single field and read back from it.
/// Unit structs are beans without properties.
///
/// Type attributes:
///
/// - `default`: use `Default` to build instances when reading.
/// - `from_str`: use `FromStr` when the wire value is a string.
/// - `flatten`: treat every dotted wire name as a path into nested objects.
/// - `discriminator = "key"`, `discriminator_value = "value"`: write a
///   constant type tag first. The value defaults to the type name.
///
/// Field attributes:
///
/// - `rename = "wire.name"`
/// - `flatten`: this field's dotted wire name is a path.
/// - `unwrapped`: the field is a string map whose entries are written
///   into the owner's object, and which collects unknown fields on read.
/// - `skip`: not a property.
/// - `read_only`: written but never read.
/// - `base`: the field holds the "parent" part of the type, whose
///   properties come first.
/// - `value`: the type is written as this one property.
/// - `get = "method"`, `set = "method"`: go through accessor methods,
///   `fn(&self) -> &T` and `fn(&mut self, T)`.
///
/// ```rust, ignore
/// #[derive(Bind, Default)]
/// #[bind(default, discriminator = "kind", discriminator_value = "dog")]
/// struct Dog {
///     #[bind(base)]
///     animal: Animal,
///     #[bind(rename = "props.good", flatten)]
///     good: bool,
///     #[bind(skip)]
///     cache: Vec<u8>,
/// }
/// ```
///
/// ## Enums
///
/// Enums without fields are written as the variant name, or as its
/// ordinal when the binder is configured so. Variants take `rename`.
///
/// Enums with fields, unions, lifetimes and two properties sharing one wire
/// name are rejected.
#[proc_macro_derive(Bind, attributes(bind))]
pub fn derive_bind(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    let vc_bind_path = path::vc_bind();

    let impls = match &ast.data {
        Data::Struct(data) => bean::impl_struct(&ast, data, &vc_bind_path),
        Data::Enum(data) => enums::impl_enum(&ast, data, &vc_bind_path),
        Data::Union(data) => Err(syn::Error::new(
            data.union_token.span,
            "`Bind` cannot be derived for unions",
        )),
    };

    match impls {
        Ok(impls) => TokenStream::from(quote! {
            const _: () = {
                #impls
            };
        }),
        Err(err) => err.into_compile_error().into(),
    }
}
