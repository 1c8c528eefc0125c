use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use core::any::Any;
use core::fmt;

use crate::info::PropFlags;
use crate::{BindError, Bindable, BoxedValue, TypeKey};

/// Reads a property from the most-derived owner.
pub type Getter = Arc<dyn for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Bindable> + Send + Sync>;
/// Stores a property into the most-derived owner.
pub type Setter = Arc<dyn Fn(&mut dyn Any, BoxedValue) -> Result<(), BindError> + Send + Sync>;

/// Where a property's value comes from. Exactly one source per property.
#[derive(Clone)]
pub enum Accessor {
    Field(Getter),
    Method(Getter),
    Constant(&'static str),
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(_) => f.write_str("Field"),
            Self::Method(_) => f.write_str("Method"),
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
        }
    }
}

/// A normalized property.
#[derive(Clone)]
pub struct Prop {
    pub(crate) name: &'static str,
    pub(crate) wire_name: &'static str,
    pub(crate) accessor: Accessor,
    pub(crate) setter: Option<Setter>,
    pub(crate) ty: TypeKey,
    pub(crate) flags: PropFlags,
    pub(crate) path: Option<Box<[String]>>,
}

impl Prop {
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub const fn wire_name(&self) -> &'static str {
        self.wire_name
    }

    #[inline]
    pub const fn accessor(&self) -> &Accessor {
        &self.accessor
    }

    /// The declared type of the value.
    #[inline]
    pub const fn ty(&self) -> TypeKey {
        self.ty
    }

    #[inline]
    pub const fn flags(&self) -> PropFlags {
        self.flags
    }

    #[inline]
    pub const fn is_settable(&self) -> bool {
        self.setter.is_some()
    }

    /// Unescaped segments of a flattened wire name.
    #[inline]
    pub fn flatten_path(&self) -> Option<&[String]> {
        self.path.as_deref()
    }

    /// Reads the value out of `owner`. Constants yield `None`.
    #[inline]
    pub fn get<'a>(&self, owner: &'a dyn Any) -> Option<&'a dyn Bindable> {
        match &self.accessor {
            Accessor::Field(getter) | Accessor::Method(getter) => getter(owner),
            Accessor::Constant(_) => None,
        }
    }

    #[inline]
    pub fn constant(&self) -> Option<&'static str> {
        match &self.accessor {
            Accessor::Constant(value) => Some(*value),
            _ => None,
        }
    }

    /// Stores `value` into `owner`.
    pub fn set(&self, owner: &mut dyn Any, value: BoxedValue) -> Result<(), BindError> {
        match &self.setter {
            Some(setter) => setter(owner, value),
            None => Err(BindError::Internal(format!("property `{}` is read-only", self.name))),
        }
    }
}

impl fmt::Debug for Prop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prop")
            .field("name", &self.name)
            .field("wire_name", &self.wire_name)
            .field("accessor", &self.accessor)
            .field("settable", &self.is_settable())
            .field("ty", &self.ty)
            .field("flags", &self.flags)
            .finish()
    }
}

/// The normalized description of one bean type, see [`introspect`].
///
/// [`introspect`]: crate::info::introspect
pub struct BeanDescriptor {
    pub(crate) ty: TypeKey,
    pub(crate) props: Box<[Prop]>,
    pub(crate) discriminator: Option<Prop>,
    pub(crate) value_prop: Option<usize>,
    pub(crate) default_ctor: Option<fn() -> BoxedValue>,
    pub(crate) string_ctor: Option<fn(&str) -> Result<BoxedValue, BindError>>,
    pub(crate) value_ctor: Option<fn(BoxedValue) -> Result<BoxedValue, BindError>>,
}

impl BeanDescriptor {
    #[inline]
    pub const fn ty(&self) -> TypeKey {
        self.ty
    }

    /// Properties in write order, without the discriminator.
    #[inline]
    pub fn props(&self) -> &[Prop] {
        &self.props
    }

    pub fn prop(&self, wire_name: &str) -> Option<&Prop> {
        self.props.iter().find(|prop| prop.wire_name == wire_name)
    }

    #[inline]
    pub const fn discriminator(&self) -> Option<&Prop> {
        self.discriminator.as_ref()
    }

    /// The single property of a value type.
    #[inline]
    pub fn value_prop(&self) -> Option<&Prop> {
        self.value_prop.map(|index| &self.props[index])
    }

    #[inline]
    pub const fn has_default_ctor(&self) -> bool {
        self.default_ctor.is_some()
    }

    #[inline]
    pub const fn has_string_ctor(&self) -> bool {
        self.string_ctor.is_some()
    }

    /// Builds an empty instance for the reader.
    pub fn construct(&self) -> Result<BoxedValue, BindError> {
        match self.default_ctor {
            Some(ctor) => Ok(ctor()),
            None => Err(BindError::construct(self.ty.name(), "no default constructor")),
        }
    }

    pub fn construct_from_str(&self, text: &str) -> Result<BoxedValue, BindError> {
        match self.string_ctor {
            Some(ctor) => ctor(text),
            None => Err(BindError::mismatch(self.ty.name(), "an object", "a string")),
        }
    }

    /// Builds a value type around its single value.
    pub fn construct_from_value(&self, value: BoxedValue) -> Result<BoxedValue, BindError> {
        if let Some(ctor) = self.value_ctor {
            return ctor(value);
        }
        let prop = self
            .value_prop()
            .ok_or_else(|| BindError::Internal(format!("`{}` is not a value type", self.ty.name())))?;
        let mut target = self.construct()?;
        prop.set(&mut *target, value)?;
        Ok(target)
    }
}

impl fmt::Debug for BeanDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDescriptor")
            .field("ty", &self.ty)
            .field("props", &self.props)
            .field("discriminator", &self.discriminator)
            .field("value_prop", &self.value_prop)
            .finish_non_exhaustive()
    }
}
