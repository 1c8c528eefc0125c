use alloc::string::String;
use core::any::Any;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_core::ser::{Error as _, Serialize, Serializer};

use super::SimpleType;
use crate::BindError;
use crate::error::ser_error;

/// A simple-typed value ready to be serialized.
pub(crate) struct SimpleView<'a> {
    pub ty: SimpleType,
    pub value: &'a dyn Any,
    pub dates_as_timestamps: bool,
}

impl Serialize for SimpleView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        macro_rules! get {
            ($ty:ty) => {
                self.value.downcast_ref::<$ty>().ok_or_else(|| {
                    ser_error::<S::Error>(BindError::Internal(format!(
                        "value is not `{}`",
                        self.ty.type_name()
                    )))
                })?
            };
        }

        match self.ty {
            SimpleType::String => serializer.serialize_str(get!(String)),
            SimpleType::BoxStr => serializer.serialize_str(get!(Box<str>)),
            SimpleType::Char => serializer.serialize_char(*get!(char)),
            SimpleType::Bool => serializer.serialize_bool(*get!(bool)),
            SimpleType::I8 => serializer.serialize_i8(*get!(i8)),
            SimpleType::I16 => serializer.serialize_i16(*get!(i16)),
            SimpleType::I32 => serializer.serialize_i32(*get!(i32)),
            SimpleType::I64 => serializer.serialize_i64(*get!(i64)),
            SimpleType::I128 => serializer.serialize_i128(*get!(i128)),
            SimpleType::Isize => serializer.serialize_i64(*get!(isize) as i64),
            SimpleType::U8 => serializer.serialize_u8(*get!(u8)),
            SimpleType::U16 => serializer.serialize_u16(*get!(u16)),
            SimpleType::U32 => serializer.serialize_u32(*get!(u32)),
            SimpleType::U64 => serializer.serialize_u64(*get!(u64)),
            SimpleType::U128 => serializer.serialize_u128(*get!(u128)),
            SimpleType::Usize => serializer.serialize_u64(*get!(usize) as u64),
            SimpleType::F32 => serializer.serialize_f32(*get!(f32)),
            SimpleType::F64 => serializer.serialize_f64(*get!(f64)),
            SimpleType::Unit => {
                get!(());
                serializer.serialize_unit()
            }
            SimpleType::Bytes => serializer.serialize_str(&STANDARD.encode(get!(Vec<u8>))),
            SimpleType::Chars => serializer.serialize_str(&get!(Vec<char>).iter().collect::<String>()),
            SimpleType::Bools => serializer.collect_seq(get!(Vec<bool>)),
            SimpleType::Ints => serializer.collect_seq(get!(Vec<i32>)),
            SimpleType::Longs => serializer.collect_seq(get!(Vec<i64>)),
            SimpleType::SystemTime => {
                let time = *get!(SystemTime);
                match self.dates_as_timestamps {
                    true => serializer.serialize_i64(epoch_millis(time)),
                    false => serializer.serialize_str(
                        &DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::AutoSi, true),
                    ),
                }
            }
            SimpleType::Path => match get!(PathBuf).to_str() {
                Some(path) => serializer.serialize_str(path),
                None => Err(S::Error::custom("path is not valid UTF-8")),
            },
            SimpleType::Uuid => serializer.collect_str(&get!(uuid::Uuid).hyphenated()),
            SimpleType::Url => serializer.serialize_str(get!(url::Url).as_str()),
        }
    }
}

fn epoch_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_millis()).unwrap_or(i64::MAX),
        Err(before) => i64::try_from(before.duration().as_millis()).map_or(i64::MIN, |ms| -ms),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::{Duration, UNIX_EPOCH};

    use super::{SimpleType, SimpleView};

    fn json(ty: SimpleType, value: &dyn core::any::Any, dates_as_timestamps: bool) -> String {
        serde_json::to_string(&SimpleView {
            ty,
            value,
            dates_as_timestamps,
        })
        .unwrap()
    }

    #[test]
    fn primitives() {
        assert_eq!(json(SimpleType::I128, &-5i128, true), "-5");
        assert_eq!(json(SimpleType::Char, &'q', true), "\"q\"");
        assert_eq!(json(SimpleType::Unit, &(), true), "null");
        assert_eq!(json(SimpleType::Usize, &9usize, true), "9");
    }

    #[test]
    fn arrays_and_bytes() {
        assert_eq!(json(SimpleType::Bytes, &vec![1u8, 2, 3], true), "\"AQID\"");
        assert_eq!(json(SimpleType::Chars, &vec!['h', 'i'], true), "\"hi\"");
        assert_eq!(json(SimpleType::Ints, &vec![1, 2], true), "[1,2]");
    }

    #[test]
    fn system_time_follows_the_timestamp_feature() {
        let time = UNIX_EPOCH + Duration::from_millis(1500);
        assert_eq!(json(SimpleType::SystemTime, &time, true), "1500");
        assert_eq!(
            json(SimpleType::SystemTime, &time, false),
            "\"1970-01-01T00:00:01.500Z\""
        );
    }

    #[test]
    fn library_types() {
        let path = PathBuf::from("a/b");
        assert_eq!(json(SimpleType::Path, &path, true), "\"a/b\"");
        let url = url::Url::parse("https://example.com/x").unwrap();
        assert_eq!(json(SimpleType::Url, &url, true), "\"https://example.com/x\"");
    }

    #[test]
    fn wrong_value_type_is_an_error() {
        let view = SimpleView {
            ty: SimpleType::String,
            value: &5u8,
            dates_as_timestamps: true,
        };
        assert!(serde_json::to_string(&view).is_err());
    }
}
