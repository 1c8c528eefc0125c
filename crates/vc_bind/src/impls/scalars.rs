use std::path::PathBuf;
use std::time::SystemTime;

use crate::Bind;
use crate::info::Shape;

macro_rules! impl_scalar {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Bind for $ty {
                #[inline]
                fn shape() -> Shape {
                    Shape::Scalar
                }

                #[inline]
                fn type_name() -> &'static str {
                    $name
                }
            }
        )*
    };
}

impl_scalar! {
    String => "String",
    Box<str> => "Box<str>",
    char => "char",
    bool => "bool",
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    i128 => "i128",
    isize => "isize",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    u128 => "u128",
    usize => "usize",
    f32 => "f32",
    f64 => "f64",
    () => "()",
    SystemTime => "SystemTime",
    PathBuf => "PathBuf",
    uuid::Uuid => "Uuid",
    url::Url => "Url",
}
