//! Parsing of `#[bind(...)]` attributes.

use proc_macro2::Span;
use syn::meta::ParseNestedMeta;
use syn::spanned::Spanned;
use syn::{Attribute, Ident, LitStr};

use crate::BIND_ATTRIBUTE_NAME;

fn set_flag(slot: &mut Option<Span>, meta: &ParseNestedMeta) -> syn::Result<()> {
    if slot.is_some() {
        return Err(meta.error("duplicate attribute"));
    }
    *slot = Some(meta.path.span());
    Ok(())
}

fn set_str(slot: &mut Option<LitStr>, meta: &ParseNestedMeta) -> syn::Result<()> {
    if slot.is_some() {
        return Err(meta.error("duplicate attribute"));
    }
    *slot = Some(meta.value()?.parse()?);
    Ok(())
}

fn set_ident(slot: &mut Option<Ident>, meta: &ParseNestedMeta) -> syn::Result<()> {
    let mut text = None;
    set_str(&mut text, meta)?;
    if slot.is_some() {
        return Err(meta.error("duplicate attribute"));
    }
    *slot = text.map(|text| text.parse()).transpose()?;
    Ok(())
}

fn bind_attrs(attrs: &[Attribute]) -> impl Iterator<Item = &Attribute> {
    attrs.iter().filter(|attr| attr.path().is_ident(BIND_ATTRIBUTE_NAME))
}

// -----------------------------------------------------------------------------
// Type attributes

#[derive(Default)]
pub(crate) struct TypeAttributes {
    pub default: Option<Span>,
    pub from_str: Option<Span>,
    pub flatten: Option<Span>,
    pub discriminator: Option<LitStr>,
    pub discriminator_value: Option<LitStr>,
}

impl TypeAttributes {
    pub fn parse_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = Self::default();
        for attr in bind_attrs(attrs) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("default") {
                    set_flag(&mut out.default, &meta)
                } else if meta.path.is_ident("from_str") {
                    set_flag(&mut out.from_str, &meta)
                } else if meta.path.is_ident("flatten") {
                    set_flag(&mut out.flatten, &meta)
                } else if meta.path.is_ident("discriminator") {
                    set_str(&mut out.discriminator, &meta)
                } else if meta.path.is_ident("discriminator_value") {
                    set_str(&mut out.discriminator_value, &meta)
                } else {
                    Err(meta.error("unknown type attribute"))
                }
            })?;
        }

        if let (None, Some(value)) = (&out.discriminator, &out.discriminator_value) {
            return Err(syn::Error::new(
                value.span(),
                "`discriminator_value` needs a `discriminator` key",
            ));
        }
        Ok(out)
    }

    /// Enums only take `#[bind(...)]` on their variants.
    pub fn reject_all(&self, what: &str) -> syn::Result<()> {
        let first = [self.default, self.from_str, self.flatten]
            .into_iter()
            .flatten()
            .chain(self.discriminator.iter().map(LitStr::span))
            .next();
        match first {
            Some(span) => Err(syn::Error::new(span, format!("not supported on {what}"))),
            None => Ok(()),
        }
    }
}

// -----------------------------------------------------------------------------
// Field attributes

#[derive(Default)]
pub(crate) struct FieldAttributes {
    pub rename: Option<LitStr>,
    pub flatten: Option<Span>,
    pub unwrapped: Option<Span>,
    pub skip: Option<Span>,
    pub read_only: Option<Span>,
    pub base: Option<Span>,
    pub value: Option<Span>,
    pub get: Option<Ident>,
    pub set: Option<Ident>,
}

impl FieldAttributes {
    pub fn parse_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = Self::default();
        for attr in bind_attrs(attrs) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    set_str(&mut out.rename, &meta)
                } else if meta.path.is_ident("flatten") {
                    set_flag(&mut out.flatten, &meta)
                } else if meta.path.is_ident("unwrapped") {
                    set_flag(&mut out.unwrapped, &meta)
                } else if meta.path.is_ident("skip") {
                    set_flag(&mut out.skip, &meta)
                } else if meta.path.is_ident("read_only") {
                    set_flag(&mut out.read_only, &meta)
                } else if meta.path.is_ident("base") {
                    set_flag(&mut out.base, &meta)
                } else if meta.path.is_ident("value") {
                    set_flag(&mut out.value, &meta)
                } else if meta.path.is_ident("get") {
                    set_ident(&mut out.get, &meta)
                } else if meta.path.is_ident("set") {
                    set_ident(&mut out.set, &meta)
                } else {
                    Err(meta.error("unknown field attribute"))
                }
            })?;
        }
        out.validity()?;
        Ok(out)
    }

    fn others(&self) -> impl Iterator<Item = Span> + '_ {
        [self.flatten, self.unwrapped, self.read_only, self.value]
            .into_iter()
            .flatten()
            .chain(self.rename.iter().map(LitStr::span))
            .chain(self.get.iter().chain(self.set.iter()).map(Ident::span))
    }

    fn validity(&self) -> syn::Result<()> {
        if self.skip.is_some() || self.base.is_some() {
            if let Some(span) = self.others().next() {
                return Err(syn::Error::new(span, "`skip` and `base` fields take no other attributes"));
            }
            if let (Some(_), Some(base)) = (self.skip, self.base) {
                return Err(syn::Error::new(base, "a field cannot be both `skip` and `base`"));
            }
        }
        if let (Some(unwrapped), true) = (self.unwrapped, self.flatten.is_some() || self.value.is_some()) {
            return Err(syn::Error::new(unwrapped, "`unwrapped` cannot be combined with `flatten` or `value`"));
        }
        if let (Some(read_only), Some(_)) = (self.read_only, &self.set) {
            return Err(syn::Error::new(read_only, "a `read_only` field has no setter"));
        }
        Ok(())
    }

    /// Newtype fields take no attributes.
    pub fn reject_all(&self) -> syn::Result<()> {
        match self.others().chain(self.skip).chain(self.base).next() {
            Some(span) => Err(syn::Error::new(span, "newtype fields take no attributes")),
            None => Ok(()),
        }
    }
}

// -----------------------------------------------------------------------------
// Variant attributes

#[derive(Default)]
pub(crate) struct VariantAttributes {
    pub rename: Option<LitStr>,
}

impl VariantAttributes {
    pub fn parse_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = Self::default();
        for attr in bind_attrs(attrs) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    set_str(&mut out.rename, &meta)
                } else {
                    Err(meta.error("variants only take `rename`"))
                }
            })?;
        }
        Ok(out)
    }
}
