//! A process-wide [`Binder`] with default settings.
//!
//! ```
//! use vc_bind::json;
//!
//! let text = json::to_string(&vec![Some(1), None]).unwrap();
//! assert_eq!(text, "[1,null]");
//!
//! let read: Vec<Option<i32>> = json::from_str(&text).unwrap().unwrap();
//! assert_eq!(read, [Some(1), None]);
//! ```

use alloc::string::String;
use std::sync::LazyLock;

use crate::read::ValueReader;
use crate::write::ValueWriter;
use crate::{Bind, Bindable, Binder, Result};

static GLOBAL: LazyLock<Binder> = LazyLock::new(Binder::new);

/// The shared binder behind the functions of this module.
#[inline]
pub fn global() -> &'static Binder {
    &GLOBAL
}

/// See [`Binder::write_val`].
#[inline]
pub fn to_string(value: &dyn Bindable) -> Result<String> {
    GLOBAL.write_json(value, false)
}

/// Like [`to_string`], indented.
#[inline]
pub fn to_string_pretty(value: &dyn Bindable) -> Result<String> {
    GLOBAL.write_json(value, true)
}

/// See [`Binder::read_val`].
#[inline]
pub fn from_str<T: Bind>(text: &str) -> Result<Option<T>> {
    GLOBAL.read_val(text)
}

/// Installs `writer` for `T` in the shared binder.
#[inline]
pub fn register_serializer<T: Bind>(writer: impl ValueWriter) {
    GLOBAL.register_serializer::<T>(writer);
}

/// Installs `reader` for `T` in the shared binder.
#[inline]
pub fn register_deserializer<T: Bind>(reader: impl ValueReader) {
    GLOBAL.register_deserializer::<T>(reader);
}

#[cfg(test)]
mod tests {
    use super::{from_str, global, to_string, to_string_pretty};
    use std::collections::BTreeMap;

    #[test]
    fn pretty_output_is_indented() {
        let mut map = BTreeMap::new();
        map.insert(String::from("a"), vec![1u16]);
        assert_eq!(to_string(&map).unwrap(), r#"{"a":[1]}"#);
        assert_eq!(to_string_pretty(&map).unwrap(), "{\n  \"a\": [\n    1\n  ]\n}");
    }

    #[test]
    fn byte_vectors_are_base64() {
        let mut map = BTreeMap::new();
        map.insert(String::from("a"), vec![1u8]);
        assert_eq!(to_string(&map).unwrap(), r#"{"a":"AQ=="}"#);
    }

    #[test]
    fn shared_binder_is_reused() {
        assert!(core::ptr::eq(global(), global()));
        assert_eq!(from_str::<bool>("true").unwrap(), Some(true));
        assert_eq!(from_str::<String>("null").unwrap(), None);
    }
}
