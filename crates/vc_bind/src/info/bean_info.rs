use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt::{self, Display};
use core::str::FromStr;

use bitflags::bitflags;

use crate::{Bind, BindError, Bindable, BoxedValue, TypeKey};

/// Reads one property out of its owner.
pub type RawGetter = for<'a> fn(&'a dyn Any) -> Option<&'a dyn Bindable>;
/// Stores one read value into its owner.
pub type RawSetter = fn(&mut dyn Any, BoxedValue) -> Result<(), BindError>;
/// Projects an owner onto its base part.
pub type RawBaseGetter = for<'a> fn(&'a dyn Any) -> Option<&'a dyn Any>;
pub type RawBaseGetterMut = for<'a> fn(&'a mut dyn Any) -> Option<&'a mut dyn Any>;

bitflags! {
    /// Property markers.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PropFlags: u8 {
        /// Dotted wire name segments map to nested wire objects.
        const FLATTEN = 1 << 0;
        /// A map whose entries are spliced into the owner's wire object.
        const UNWRAPPED = 1 << 1;
        /// The owner is written as this single value.
        const VALUE = 1 << 2;
        /// Written, never read.
        const READ_ONLY = 1 << 3;
        /// A constant type tag, written first.
        const DISCRIMINATOR = 1 << 4;
    }
}

/// How a property's value is obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessorKind {
    Field,
    Method,
}

// -----------------------------------------------------------------------------
// Derive helpers

/// Downcasts a setter's target.
#[inline]
pub fn target_mut<T: Bind>(target: &mut dyn Any) -> Result<&mut T, BindError> {
    target
        .downcast_mut::<T>()
        .ok_or_else(|| BindError::Internal(format!("setter target is not `{}`", T::type_name())))
}

/// Takes a read value as `T`.
#[inline]
pub fn unbox<T: Bind>(value: BoxedValue) -> Result<T, BindError> {
    value
        .downcast::<T>()
        .map(|value| *value)
        .map_err(|_| BindError::Internal(format!("read value is not `{}`", T::type_name())))
}

/// A default constructor backed by [`Default`].
pub fn construct_default<T: Bind + Default>() -> BoxedValue {
    Box::new(T::default())
}

/// A string constructor backed by [`FromStr`].
pub fn construct_from_str<T>(text: &str) -> Result<BoxedValue, BindError>
where
    T: Bind + FromStr,
    T::Err: Display,
{
    text.parse::<T>()
        .map(|value| Box::new(value) as BoxedValue)
        .map_err(|err| BindError::construct(T::type_name(), err))
}

// -----------------------------------------------------------------------------
// PropInfo

/// A property as declared on one type, before introspection.
#[derive(Clone)]
pub struct PropInfo {
    name: &'static str,
    wire_name: Option<&'static str>,
    ty: TypeKey,
    getter: Option<(AccessorKind, RawGetter)>,
    setter: Option<RawSetter>,
    flags: PropFlags,
}

impl PropInfo {
    /// A property named `name` holding a `T`.
    #[inline]
    pub fn new<T: Bind>(name: &'static str) -> Self {
        Self {
            name,
            wire_name: None,
            ty: TypeKey::of::<T>(),
            getter: None,
            setter: None,
            flags: PropFlags::empty(),
        }
    }

    /// Overrides the wire name, which otherwise equals the name.
    #[inline]
    pub fn with_wire_name(mut self, wire_name: &'static str) -> Self {
        self.wire_name = Some(wire_name);
        self
    }

    #[inline]
    pub fn with_getter(mut self, kind: AccessorKind, getter: RawGetter) -> Self {
        self.getter = Some((kind, getter));
        self
    }

    #[inline]
    pub fn with_setter(mut self, setter: RawSetter) -> Self {
        self.setter = Some(setter);
        self
    }

    #[inline]
    pub fn with_flags(mut self, flags: PropFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn wire_name(&self) -> &'static str {
        self.wire_name.unwrap_or(self.name)
    }

    #[inline]
    pub const fn ty(&self) -> TypeKey {
        self.ty
    }

    #[inline]
    pub const fn getter(&self) -> Option<(AccessorKind, RawGetter)> {
        self.getter
    }

    #[inline]
    pub const fn setter(&self) -> Option<RawSetter> {
        self.setter
    }

    #[inline]
    pub const fn flags(&self) -> PropFlags {
        self.flags
    }
}

impl fmt::Debug for PropInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropInfo")
            .field("name", &self.name)
            .field("wire_name", &self.wire_name())
            .field("ty", &self.ty)
            .field("flags", &self.flags)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// BaseInfo

/// The embedded base part of a bean, the stand-in for a superclass.
///
/// Its properties are inherited: they precede the owner's own properties,
/// and an own property with the same wire name replaces the inherited one.
#[derive(Clone, Copy)]
pub struct BaseInfo {
    ty: TypeKey,
    get: RawBaseGetter,
    get_mut: RawBaseGetterMut,
}

impl BaseInfo {
    #[inline]
    pub fn new<T: Bind>(get: RawBaseGetter, get_mut: RawBaseGetterMut) -> Self {
        Self {
            ty: TypeKey::of::<T>(),
            get,
            get_mut,
        }
    }

    #[inline]
    pub const fn ty(&self) -> TypeKey {
        self.ty
    }

    #[inline]
    pub const fn getter(&self) -> RawBaseGetter {
        self.get
    }

    #[inline]
    pub const fn getter_mut(&self) -> RawBaseGetterMut {
        self.get_mut
    }
}

// -----------------------------------------------------------------------------
// BeanInfo

/// The raw description of a bean type, as produced by `#[derive(Bind)]`.
///
/// Hand-written shapes use the same builder:
///
/// ```
/// use vc_bind::info::{AccessorKind, BeanInfo, PropInfo, Shape, construct_default};
/// use vc_bind::info::{target_mut, unbox};
/// use vc_bind::{Bind, Bindable};
///
/// #[derive(Default)]
/// struct Tag {
///     label: String,
/// }
///
/// impl Bind for Tag {
///     fn shape() -> Shape {
///         Shape::Bean(
///             BeanInfo::new::<Self>()
///                 .with_default_ctor(construct_default::<Self>)
///                 .with_prop(
///                     PropInfo::new::<String>("label")
///                         .with_getter(AccessorKind::Field, |this| {
///                             this.downcast_ref::<Self>().map(|t| &t.label as &dyn Bindable)
///                         })
///                         .with_setter(|this, value| {
///                             target_mut::<Self>(this)?.label = unbox(value)?;
///                             Ok(())
///                         }),
///                 ),
///         )
///     }
/// }
///
/// let text = vc_bind::json::to_string(&Tag { label: "x".into() }).unwrap();
/// assert_eq!(text, r#"{"label":"x"}"#);
/// ```
pub struct BeanInfo {
    ty: TypeKey,
    props: Vec<PropInfo>,
    base: Option<BaseInfo>,
    default_ctor: Option<fn() -> BoxedValue>,
    string_ctor: Option<fn(&str) -> Result<BoxedValue, BindError>>,
    value_ctor: Option<fn(BoxedValue) -> Result<BoxedValue, BindError>>,
    discriminator: Option<(&'static str, &'static str)>,
    flatten: bool,
}

impl BeanInfo {
    #[inline]
    pub fn new<T: Bind>() -> Self {
        Self {
            ty: TypeKey::of::<T>(),
            props: Vec::new(),
            base: None,
            default_ctor: None,
            string_ctor: None,
            value_ctor: None,
            discriminator: None,
            flatten: false,
        }
    }

    #[inline]
    pub fn with_prop(mut self, prop: PropInfo) -> Self {
        self.props.push(prop);
        self
    }

    #[inline]
    pub fn with_base(mut self, base: BaseInfo) -> Self {
        self.base = Some(base);
        self
    }

    #[inline]
    pub fn with_default_ctor(mut self, ctor: fn() -> BoxedValue) -> Self {
        self.default_ctor = Some(ctor);
        self
    }

    /// The constructor used when the wire value is a string.
    #[inline]
    pub fn with_string_ctor(mut self, ctor: fn(&str) -> Result<BoxedValue, BindError>) -> Self {
        self.string_ctor = Some(ctor);
        self
    }

    /// Builds a value type directly from its single value.
    #[inline]
    pub fn with_value_ctor(mut self, ctor: fn(BoxedValue) -> Result<BoxedValue, BindError>) -> Self {
        self.value_ctor = Some(ctor);
        self
    }

    /// A constant `key: value` pair written before all properties.
    #[inline]
    pub fn with_discriminator(mut self, key: &'static str, value: &'static str) -> Self {
        self.discriminator = Some((key, value));
        self
    }

    /// Flattens every dotted wire name of this type.
    #[inline]
    pub fn with_flatten(mut self, flatten: bool) -> Self {
        self.flatten = flatten;
        self
    }

    #[inline]
    pub const fn ty(&self) -> TypeKey {
        self.ty
    }

    #[inline]
    pub fn props(&self) -> &[PropInfo] {
        &self.props
    }

    #[inline]
    pub const fn base(&self) -> Option<&BaseInfo> {
        self.base.as_ref()
    }

    #[inline]
    pub const fn default_ctor(&self) -> Option<fn() -> BoxedValue> {
        self.default_ctor
    }

    #[inline]
    pub const fn string_ctor(&self) -> Option<fn(&str) -> Result<BoxedValue, BindError>> {
        self.string_ctor
    }

    #[inline]
    pub const fn value_ctor(&self) -> Option<fn(BoxedValue) -> Result<BoxedValue, BindError>> {
        self.value_ctor
    }

    #[inline]
    pub const fn discriminator(&self) -> Option<(&'static str, &'static str)> {
        self.discriminator
    }

    #[inline]
    pub const fn is_flatten(&self) -> bool {
        self.flatten
    }
}

impl fmt::Debug for BeanInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanInfo")
            .field("ty", &self.ty)
            .field("props", &self.props)
            .field("base", &self.base.map(|base| base.ty))
            .field("discriminator", &self.discriminator)
            .finish_non_exhaustive()
    }
}
