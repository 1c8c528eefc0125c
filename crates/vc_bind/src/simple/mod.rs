//! The simple-type dispatch table.
//!
//! Scalars, strings, primitive arrays and a handful of well-known library
//! types are matched by exact [`TypeId`] before any shape-driven strategy
//! is built. [`classify`] is the single lookup; the table itself is fixed
//! at first use and never changes.
//!
//! | Rust type | Wire form |
//! |---|---|
//! | `String`, `Box<str>` | string |
//! | `char` | one-character string |
//! | `bool` | boolean |
//! | integers up to 128 bits, `f32`, `f64` | number |
//! | `()` | null |
//! | `Vec<u8>` | standard base64 string |
//! | `Vec<char>` | string |
//! | `Vec<bool>`, `Vec<i32>`, `Vec<i64>` | array |
//! | `SystemTime` | epoch milliseconds, or ISO-8601 without `WRITE_DATES_AS_TIMESTAMPS` |
//! | `PathBuf` | string |
//! | `Uuid` | hyphenated string |
//! | `Url` | string |
//!
//! Readers are lenient in the usual ways: numbers arrive as digit strings,
//! strings accept numbers and booleans, and integers accept integral floats.

use core::any::TypeId;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::SystemTime;

use vc_utils::TypeIdMap;

mod read;
mod write;

pub(crate) use read::read_simple;
pub(crate) use write::SimpleView;

/// One entry of the dispatch table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SimpleType {
    String,
    BoxStr,
    Char,
    Bool,
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
    F32,
    F64,
    Unit,
    Bytes,
    Chars,
    Bools,
    Ints,
    Longs,
    SystemTime,
    Path,
    Uuid,
    Url,
}

impl SimpleType {
    /// The Rust type this entry stands for.
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::BoxStr => "Box<str>",
            Self::Char => "char",
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::I128 => "i128",
            Self::Isize => "isize",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::U128 => "u128",
            Self::Usize => "usize",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Unit => "()",
            Self::Bytes => "Vec<u8>",
            Self::Chars => "Vec<char>",
            Self::Bools => "Vec<bool>",
            Self::Ints => "Vec<i32>",
            Self::Longs => "Vec<i64>",
            Self::SystemTime => "SystemTime",
            Self::Path => "PathBuf",
            Self::Uuid => "Uuid",
            Self::Url => "Url",
        }
    }

    /// What the reader expects, for error messages.
    pub const fn expecting(self) -> &'static str {
        match self {
            Self::String | Self::BoxStr | Self::Path => "a string",
            Self::Char => "a single character",
            Self::Bool => "a boolean",
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::I128 | Self::Isize => "an integer",
            Self::U8 | Self::U16 | Self::U32 | Self::U64 | Self::U128 | Self::Usize => {
                "a non-negative integer"
            }
            Self::F32 | Self::F64 => "a number",
            Self::Unit => "null",
            Self::Bytes => "a base64 string or an array of bytes",
            Self::Chars => "a string or an array of characters",
            Self::Bools => "an array of booleans",
            Self::Ints | Self::Longs => "an array of integers",
            Self::SystemTime => "epoch milliseconds or an ISO-8601 string",
            Self::Uuid => "a UUID string",
            Self::Url => "a URL string",
        }
    }
}

static TABLE: LazyLock<TypeIdMap<SimpleType>> = LazyLock::new(|| {
    let entries = [
        (TypeId::of::<String>(), SimpleType::String),
        (TypeId::of::<Box<str>>(), SimpleType::BoxStr),
        (TypeId::of::<char>(), SimpleType::Char),
        (TypeId::of::<bool>(), SimpleType::Bool),
        (TypeId::of::<i8>(), SimpleType::I8),
        (TypeId::of::<i16>(), SimpleType::I16),
        (TypeId::of::<i32>(), SimpleType::I32),
        (TypeId::of::<i64>(), SimpleType::I64),
        (TypeId::of::<i128>(), SimpleType::I128),
        (TypeId::of::<isize>(), SimpleType::Isize),
        (TypeId::of::<u8>(), SimpleType::U8),
        (TypeId::of::<u16>(), SimpleType::U16),
        (TypeId::of::<u32>(), SimpleType::U32),
        (TypeId::of::<u64>(), SimpleType::U64),
        (TypeId::of::<u128>(), SimpleType::U128),
        (TypeId::of::<usize>(), SimpleType::Usize),
        (TypeId::of::<f32>(), SimpleType::F32),
        (TypeId::of::<f64>(), SimpleType::F64),
        (TypeId::of::<()>(), SimpleType::Unit),
        (TypeId::of::<Vec<u8>>(), SimpleType::Bytes),
        (TypeId::of::<Vec<char>>(), SimpleType::Chars),
        (TypeId::of::<Vec<bool>>(), SimpleType::Bools),
        (TypeId::of::<Vec<i32>>(), SimpleType::Ints),
        (TypeId::of::<Vec<i64>>(), SimpleType::Longs),
        (TypeId::of::<SystemTime>(), SimpleType::SystemTime),
        (TypeId::of::<PathBuf>(), SimpleType::Path),
        (TypeId::of::<uuid::Uuid>(), SimpleType::Uuid),
        (TypeId::of::<url::Url>(), SimpleType::Url),
    ];

    let mut table = TypeIdMap::with_capacity(entries.len());
    for (id, ty) in entries {
        table.insert(id, ty);
    }
    table
});

/// Looks up the simple strategy for a type, if it has one.
///
/// ```
/// use core::any::TypeId;
/// use vc_bind::simple::{SimpleType, classify};
///
/// assert_eq!(classify(TypeId::of::<u16>()), Some(SimpleType::U16));
/// assert_eq!(classify(TypeId::of::<Vec<u8>>()), Some(SimpleType::Bytes));
/// assert_eq!(classify(TypeId::of::<Vec<u16>>()), None);
/// ```
#[inline]
pub fn classify(id: TypeId) -> Option<SimpleType> {
    TABLE.get(&id).copied()
}
