use crate::info::{Shape, Wrap, WrapperInfo};
use crate::{Bind, NullState};

/// A property that tells "never set" apart from "set to null".
///
/// Bean writers leave out an [`Unset`](Self::Unset) property and write a
/// [`Null`](Self::Null) one as `null`. A wire `null` reads as `Null`, a
/// missing field leaves the property `Unset`.
///
/// ```
/// use vc_bind::codec::Tristate;
/// use vc_bind::{Bind, Binder};
///
/// #[derive(Bind, Default)]
/// #[bind(default)]
/// struct Patch {
///     name: Tristate<String>,
///     email: Tristate<String>,
///     phone: Tristate<String>,
/// }
///
/// let patch = Patch {
///     name: Tristate::Value("Ada".into()),
///     email: Tristate::Null,
///     phone: Tristate::Unset,
/// };
/// let binder = Binder::new();
/// assert_eq!(binder.write_val(&patch).unwrap(), r#"{"name":"Ada","email":null}"#);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Tristate<T> {
    #[default]
    Unset,
    Null,
    Value(T),
}

impl<T> Tristate<T> {
    /// Returns `true` unless the value is [`Unset`](Self::Unset).
    #[inline]
    pub const fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    #[inline]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    #[inline]
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// `None` becomes an explicit null.
impl<T> From<Option<T>> for Tristate<T> {
    #[inline]
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Value(value),
            None => Self::Null,
        }
    }
}

impl<T: Bind> Bind for Tristate<T> {
    #[inline]
    fn shape() -> Shape {
        Shape::Wrapper(WrapperInfo::of::<Self>())
    }

    fn null_state(&self) -> NullState {
        match self {
            Self::Unset => NullState::Unset,
            Self::Null => NullState::ExplicitNull,
            Self::Value(_) => NullState::Present,
        }
    }
}

impl<T: Bind> Wrap for Tristate<T> {
    type Inner = T;

    const ACCEPTS_EMPTY: bool = true;

    #[inline]
    fn wrap(inner: T) -> Self {
        Self::Value(inner)
    }

    #[inline]
    fn inner(&self) -> Option<&T> {
        self.value()
    }

    #[inline]
    fn null() -> Option<Self> {
        Some(Self::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::Tristate;
    use crate::{Bind, BindError, Binder};

    #[derive(Bind, Default, Debug, PartialEq)]
    #[bind(default)]
    struct Patch {
        name: Tristate<String>,
        age: Tristate<u32>,
        tags: Tristate<Vec<String>>,
    }

    #[test]
    fn missing_null_and_present_stay_distinct() {
        let binder = Binder::new();
        let read: Patch = binder.read_val(r#"{"name":"Ada","age":null}"#).unwrap().unwrap();
        assert_eq!(read.name, Tristate::Value(String::from("Ada")));
        assert_eq!(read.age, Tristate::Null);
        assert_eq!(read.tags, Tristate::Unset);
        assert_eq!(binder.write_val(&read).unwrap(), r#"{"name":"Ada","age":null}"#);
    }

    #[test]
    fn top_level_and_empty_input() {
        let binder = Binder::new();
        assert_eq!(binder.read_val::<Tristate<u32>>("").unwrap(), None);
        assert_eq!(binder.read_val::<Tristate<u32>>("null").unwrap(), Some(Tristate::Null));
        assert_eq!(binder.read_val::<Tristate<u32>>("7").unwrap(), Some(Tristate::Value(7)));
        assert_eq!(binder.write_val(&Tristate::<u32>::Unset).unwrap(), "");
        assert!(matches!(binder.read_val::<u32>(""), Err(BindError::NoContent)));
    }

    #[test]
    fn sequences_keep_explicit_nulls() {
        let binder = Binder::new();
        let list: Vec<Tristate<i8>> = binder.read_val("[1,null]").unwrap().unwrap();
        assert_eq!(list, [Tristate::Value(1), Tristate::Null]);
        assert_eq!(binder.write_val(&list).unwrap(), "[1,null]");
    }
}
