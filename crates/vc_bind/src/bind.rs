use alloc::boxed::Box;
use core::any::{Any, TypeId};
use core::fmt;
use core::hash::{Hash, Hasher};

use crate::info::Shape;

/// A value produced by a reader, downcast by the consumer that asked for it.
pub type BoxedValue = Box<dyn Any + Send>;

/// How a value presents itself to the writers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NullState {
    Present,
    /// Ordinary absence like `Option::None`. Bean writers drop the property.
    Null,
    /// Explicitly set to null. Bean writers emit the property as `null`.
    ExplicitNull,
    /// Never initialized. Bean writers drop the property.
    Unset,
}

impl NullState {
    /// Returns `true` if a bean writer emits a property in this state.
    #[inline]
    pub const fn is_written(self) -> bool {
        matches!(self, Self::Present | Self::ExplicitNull)
    }
}

/// A type that knows its own binding shape.
///
/// Usually derived:
///
/// ```
/// use vc_bind::Bind;
/// use vc_bind::info::Shape;
///
/// #[derive(Bind)]
/// struct Celsius(f64);
///
/// assert!(matches!(Celsius::shape(), Shape::Bean(_)));
/// ```
pub trait Bind: Any + Send + Sync + Sized {
    /// Describes how values of this type are read and written.
    ///
    /// Only called when a cache misses, so it may allocate.
    fn shape() -> Shape;

    #[inline]
    fn type_name() -> &'static str {
        core::any::type_name::<Self>()
    }

    #[inline]
    fn null_state(&self) -> NullState {
        NullState::Present
    }
}

/// The dyn-compatible face of [`Bind`], implemented for every `T: Bind`.
pub trait Bindable: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    /// The key of the concrete runtime type.
    fn type_key(&self) -> TypeKey;

    fn presence(&self) -> NullState;
}

impl<T: Bind> Bindable for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn type_key(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    #[inline]
    fn presence(&self) -> NullState {
        Bind::null_state(self)
    }
}

impl dyn Bindable {
    /// Returns the value as `T` if that is its runtime type.
    #[inline]
    pub fn downcast_ref<T: Bind>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }
}

impl fmt::Debug for dyn Bindable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dyn Bindable<{}>", self.type_key().name())
    }
}

/// Identity of a bindable type, the key of every cache.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
    shape: fn() -> Shape,
}

impl TypeKey {
    #[inline]
    pub fn of<T: Bind>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: T::type_name(),
            shape: T::shape,
        }
    }

    #[inline]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Builds the type's [`Shape`].
    #[inline]
    pub fn shape(&self) -> Shape {
        (self.shape)()
    }
}

impl PartialEq for TypeKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeKey").field(&self.name).finish()
    }
}
