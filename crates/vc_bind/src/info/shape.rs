use core::any::Any;
use core::fmt;

use crate::BoxedValue;
use crate::info::{BeanInfo, MapInfo, SeqInfo, WrapperInfo};

/// The closed set of value shapes the engine understands.
pub enum Shape {
    /// Anything; read into and written from [`DynamicValue`](crate::DynamicValue).
    Any,
    /// A member of the [simple-type table](crate::simple).
    Scalar,
    /// Only handled by a registered codec.
    Opaque,
    Enum(EnumInfo),
    /// Fixed or boxed slices, built through an intermediate `Vec`.
    Array(SeqInfo),
    Collection(SeqInfo),
    /// String-keyed maps.
    Map(MapInfo),
    /// `Option`, `Box` and other single-value wrappers.
    Wrapper(WrapperInfo),
    Bean(BeanInfo),
}

impl Shape {
    /// A short description used in diagnostics.
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::Any => "any value",
            Self::Scalar => "a scalar",
            Self::Opaque => "an opaque type",
            Self::Enum(_) => "an enum",
            Self::Array(_) => "an array",
            Self::Collection(_) => "a collection",
            Self::Map(_) => "a map",
            Self::Wrapper(_) => "a wrapper",
            Self::Bean(_) => "a bean",
        }
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

// -----------------------------------------------------------------------------
// EnumInfo

/// Constants of a field-less enum.
///
/// The ordinal of a constant is its index in declaration order, which is
/// also its index in [`names`](Self::names).
#[derive(Clone, Copy)]
pub struct EnumInfo {
    names: &'static [&'static str],
    from_index: fn(usize) -> Option<BoxedValue>,
    index_of: fn(&dyn Any) -> Option<usize>,
}

impl EnumInfo {
    /// `from_index` builds the constant with the given ordinal and
    /// `index_of` maps a value back to it.
    #[inline]
    pub const fn new(
        names: &'static [&'static str],
        from_index: fn(usize) -> Option<BoxedValue>,
        index_of: fn(&dyn Any) -> Option<usize>,
    ) -> Self {
        Self {
            names,
            from_index,
            index_of,
        }
    }

    /// Wire names in declaration order.
    #[inline]
    pub const fn names(&self) -> &'static [&'static str] {
        self.names
    }

    #[inline]
    pub fn name_of(&self, index: usize) -> Option<&'static str> {
        self.names.get(index).copied()
    }

    #[inline]
    pub fn from_index(&self, index: usize) -> Option<BoxedValue> {
        (self.from_index)(index)
    }

    #[inline]
    pub fn index_of(&self, value: &dyn Any) -> Option<usize> {
        (self.index_of)(value)
    }
}

impl fmt::Debug for EnumInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumInfo").field("names", &self.names).finish()
    }
}
