use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;
use core::time::Duration;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_core::de::{self, DeserializeSeed, Deserializer, SeqAccess, Unexpected, Visitor};

use super::SimpleType;
use crate::read::ReadContext;
use crate::{BindError, BoxedValue};

/// Reads one value of a simple type. Null reads as `None`, except for `()`.
pub(crate) fn read_simple<'de>(
    ty: SimpleType,
    ctx: &ReadContext<'_>,
    de: &mut dyn erased_serde::Deserializer<'de>,
) -> Result<Option<BoxedValue>, erased_serde::Error> {
    de.deserialize_any(SimpleVisitor(ty, ctx))
}

struct SimpleVisitor<'a, 'c>(SimpleType, &'a ReadContext<'c>);

impl SimpleVisitor<'_, '_> {
    fn accept<E: de::Error>(&self, token: Token<'_>) -> Result<Option<BoxedValue>, E> {
        convert(self.0, token).map(Some).map_err(|err| self.1.fail(err))
    }
}

impl<'de> Visitor<'de> for SimpleVisitor<'_, '_> {
    type Value = Option<BoxedValue>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.0.expecting())
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        self.accept(Token::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        self.accept(Token::Int(v.into()))
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<Self::Value, E> {
        self.accept(Token::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        self.accept(Token::Int(v.into()))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Self::Value, E> {
        match i128::try_from(v) {
            Ok(v) => self.accept(Token::Int(v)),
            Err(_) => self.accept(Token::Wide(v)),
        }
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        self.accept(Token::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        self.accept(Token::Str(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        self.accept(Token::Bytes(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok((self.0 == SimpleType::Unit).then(|| Box::new(()) as BoxedValue))
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        self.visit_unit()
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let ctx = self.1;
        let value: BoxedValue = match self.0 {
            SimpleType::Bytes => Box::new(collect::<u8, A>(&mut seq, SimpleType::U8, ctx)?),
            SimpleType::Chars => Box::new(collect::<char, A>(&mut seq, SimpleType::Char, ctx)?),
            SimpleType::Bools => Box::new(collect::<bool, A>(&mut seq, SimpleType::Bool, ctx)?),
            SimpleType::Ints => Box::new(collect::<i32, A>(&mut seq, SimpleType::I32, ctx)?),
            SimpleType::Longs => Box::new(collect::<i64, A>(&mut seq, SimpleType::I64, ctx)?),
            _ => return Err(de::Error::invalid_type(Unexpected::Seq, &self)),
        };
        Ok(Some(value))
    }
}

/// Reads one element with the scalar rules of its table entry.
struct ElementSeed<'a, 'c>(SimpleType, &'a ReadContext<'c>);

impl<'de> DeserializeSeed<'de> for ElementSeed<'_, '_> {
    type Value = Option<BoxedValue>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(SimpleVisitor(self.0, self.1))
    }
}

/// Null elements are dropped.
fn collect<'de, T: Any, A: SeqAccess<'de>>(
    seq: &mut A,
    element: SimpleType,
    ctx: &ReadContext<'_>,
) -> Result<Vec<T>, A::Error> {
    let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(4096));
    while let Some(item) = seq.next_element_seed(ElementSeed(element, ctx))? {
        let Some(item) = item else {
            continue;
        };
        match item.downcast::<T>() {
            Ok(item) => items.push(*item),
            Err(_) => {
                return Err(ctx.fail(BindError::Internal(format!(
                    "`{}` element reader produced another type",
                    element.type_name()
                ))));
            }
        }
    }
    Ok(items)
}

// -----------------------------------------------------------------------------
// Token conversion

#[derive(Clone, Copy)]
enum Token<'a> {
    Bool(bool),
    Int(i128),
    Wide(u128),
    Float(f64),
    Str(&'a str),
    Bytes(&'a [u8]),
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "boolean `{v}`"),
            Self::Int(v) => write!(f, "integer `{v}`"),
            Self::Wide(v) => write!(f, "integer `{v}`"),
            Self::Float(v) => write!(f, "number `{v}`"),
            Self::Str(v) => write!(f, "string {v:?}"),
            Self::Bytes(v) => write!(f, "{} bytes", v.len()),
        }
    }
}

#[inline]
fn boxed<T: Any + Send>(value: T) -> BoxedValue {
    Box::new(value)
}

fn convert(ty: SimpleType, token: Token<'_>) -> Result<BoxedValue, BindError> {
    let value = match ty {
        SimpleType::String => text(token).map(boxed),
        SimpleType::BoxStr => text(token).map(|text| boxed(text.into_boxed_str())),
        SimpleType::Char => character(token).map(boxed),
        SimpleType::Bool => boolean(token).map(boxed),
        SimpleType::I8 => int::<i8>(token).map(boxed),
        SimpleType::I16 => int::<i16>(token).map(boxed),
        SimpleType::I32 => int::<i32>(token).map(boxed),
        SimpleType::I64 => int::<i64>(token).map(boxed),
        SimpleType::I128 => int::<i128>(token).map(boxed),
        SimpleType::Isize => int::<isize>(token).map(boxed),
        SimpleType::U8 => int::<u8>(token).map(boxed),
        SimpleType::U16 => int::<u16>(token).map(boxed),
        SimpleType::U32 => int::<u32>(token).map(boxed),
        SimpleType::U64 => int::<u64>(token).map(boxed),
        SimpleType::U128 => int::<u128>(token).map(boxed),
        SimpleType::Usize => int::<usize>(token).map(boxed),
        SimpleType::F32 => float(token).map(|v| boxed(v as f32)),
        SimpleType::F64 => float(token).map(boxed),
        SimpleType::Bytes => bytes(token).map(boxed),
        SimpleType::Chars => match token {
            Token::Str(v) => Some(boxed(v.chars().collect::<Vec<char>>())),
            _ => None,
        },
        SimpleType::SystemTime => system_time(token)?.map(boxed),
        SimpleType::Path => match token {
            Token::Str(v) => Some(boxed(PathBuf::from(v))),
            _ => None,
        },
        SimpleType::Uuid => match token {
            Token::Str(v) => Some(boxed(
                uuid::Uuid::parse_str(v.trim()).map_err(|err| BindError::construct("Uuid", err))?,
            )),
            _ => None,
        },
        SimpleType::Url => match token {
            Token::Str(v) => Some(boxed(
                url::Url::parse(v.trim()).map_err(|err| BindError::construct("Url", err))?,
            )),
            _ => None,
        },
        SimpleType::Unit | SimpleType::Bools | SimpleType::Ints | SimpleType::Longs => None,
    };
    value.ok_or_else(|| BindError::mismatch(ty.type_name(), ty.expecting(), token))
}

fn text(token: Token<'_>) -> Option<String> {
    match token {
        Token::Str(v) => Some(v.to_owned()),
        Token::Bool(v) => Some(v.to_string()),
        Token::Int(v) => Some(v.to_string()),
        Token::Wide(v) => Some(v.to_string()),
        Token::Float(v) => Some(v.to_string()),
        Token::Bytes(v) => String::from_utf8(v.to_vec()).ok(),
    }
}

fn character(token: Token<'_>) -> Option<char> {
    match token {
        Token::Str(v) => {
            let mut chars = v.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c),
                _ => None,
            }
        }
        Token::Int(v) => u32::try_from(v).ok().and_then(char::from_u32),
        _ => None,
    }
}

fn boolean(token: Token<'_>) -> Option<bool> {
    match token {
        Token::Bool(v) => Some(v),
        Token::Int(0) => Some(false),
        Token::Int(1) => Some(true),
        Token::Str(v) if v.trim().eq_ignore_ascii_case("true") => Some(true),
        Token::Str(v) if v.trim().eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn int<T>(token: Token<'_>) -> Option<T>
where
    T: TryFrom<i128> + TryFrom<u128>,
{
    match token {
        Token::Int(v) => <T as TryFrom<i128>>::try_from(v).ok(),
        Token::Wide(v) => <T as TryFrom<u128>>::try_from(v).ok(),
        Token::Float(v) if v.is_finite() && v.fract() == 0.0 => {
            <T as TryFrom<i128>>::try_from(v as i128).ok()
        }
        Token::Str(v) => {
            let v = v.trim();
            match v.parse::<i128>() {
                Ok(v) => <T as TryFrom<i128>>::try_from(v).ok(),
                Err(_) => v
                    .parse::<u128>()
                    .ok()
                    .and_then(|v| <T as TryFrom<u128>>::try_from(v).ok()),
            }
        }
        _ => None,
    }
}

fn float(token: Token<'_>) -> Option<f64> {
    match token {
        Token::Float(v) => Some(v),
        Token::Int(v) => Some(v as f64),
        Token::Wide(v) => Some(v as f64),
        Token::Str(v) => v.trim().parse().ok(),
        _ => None,
    }
}

fn bytes(token: Token<'_>) -> Option<Vec<u8>> {
    match token {
        Token::Bytes(v) => Some(v.to_vec()),
        Token::Str(v) => STANDARD.decode(v.trim()).ok(),
        _ => None,
    }
}

fn system_time(token: Token<'_>) -> Result<Option<SystemTime>, BindError> {
    let millis = match token {
        Token::Int(v) => v,
        Token::Float(v) if v.is_finite() => v as i128,
        Token::Str(v) => match v.trim().parse::<i128>() {
            Ok(v) => v,
            Err(_) => {
                let parsed = chrono::DateTime::parse_from_rfc3339(v.trim())
                    .map_err(|err| BindError::construct("SystemTime", err))?;
                return Ok(Some(SystemTime::from(parsed)));
            }
        },
        _ => return Ok(None),
    };
    Ok(from_epoch_millis(millis))
}

fn from_epoch_millis(millis: i128) -> Option<SystemTime> {
    let millis = i64::try_from(millis).ok()?;
    let offset = Duration::from_millis(millis.unsigned_abs());
    match millis >= 0 {
        true => UNIX_EPOCH.checked_add(offset),
        false => UNIX_EPOCH.checked_sub(offset),
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use super::{SimpleType, read_simple};
    use crate::read::{ReadContext, ReaderCache};
    use crate::{BindConfig, BoxedValue};

    fn read(ty: SimpleType, json: &str) -> Option<BoxedValue> {
        let (cache, config) = (ReaderCache::new(8), BindConfig::default());
        let ctx = ReadContext::new(&cache, &config);
        let mut de = serde_json::Deserializer::from_str(json);
        let mut erased = <dyn erased_serde::Deserializer>::erase(&mut de);
        read_simple(ty, &ctx, &mut erased).unwrap()
    }

    fn read_err(ty: SimpleType, json: &str) -> String {
        let (cache, config) = (ReaderCache::new(8), BindConfig::default());
        let ctx = ReadContext::new(&cache, &config);
        let mut de = serde_json::Deserializer::from_str(json);
        let mut erased = <dyn erased_serde::Deserializer>::erase(&mut de);
        read_simple(ty, &ctx, &mut erased).err().unwrap();
        ctx.take_failure().unwrap().to_string()
    }

    #[test]
    fn integers_are_lenient_but_range_checked() {
        let v = read(SimpleType::U8, "\"200\"").unwrap();
        assert_eq!(*v.downcast::<u8>().unwrap(), 200);
        let v = read(SimpleType::I32, "7.0").unwrap();
        assert_eq!(*v.downcast::<i32>().unwrap(), 7);

        let err = read_err(SimpleType::U8, "300");
        assert!(err.contains("integer `300`"), "{err}");
        let err = read_err(SimpleType::I64, "1.5");
        assert!(err.contains("expected an integer"), "{err}");
    }

    #[test]
    fn strings_accept_numbers_and_booleans() {
        let v = read(SimpleType::String, "12").unwrap();
        assert_eq!(*v.downcast::<String>().unwrap(), "12");
        let v = read(SimpleType::BoxStr, "true").unwrap();
        assert_eq!(&**v.downcast::<Box<str>>().unwrap(), "true");
    }

    #[test]
    fn null_reads_as_absent() {
        assert!(read(SimpleType::I32, "null").is_none());
        assert!(read(SimpleType::String, "null").is_none());
        assert!(read(SimpleType::Unit, "null").is_some());
    }

    #[test]
    fn char_needs_exactly_one_character() {
        let v = read(SimpleType::Char, "\"x\"").unwrap();
        assert_eq!(*v.downcast::<char>().unwrap(), 'x');
        let v = read(SimpleType::Char, "65").unwrap();
        assert_eq!(*v.downcast::<char>().unwrap(), 'A');
        read_err(SimpleType::Char, "\"xy\"");
    }

    #[test]
    fn byte_arrays_read_base64_or_numbers() {
        let v = read(SimpleType::Bytes, "\"AQID\"").unwrap();
        assert_eq!(*v.downcast::<Vec<u8>>().unwrap(), [1, 2, 3]);
        let v = read(SimpleType::Bytes, "[4,5]").unwrap();
        assert_eq!(*v.downcast::<Vec<u8>>().unwrap(), [4, 5]);
        let v = read(SimpleType::Longs, "[1,-2]").unwrap();
        assert_eq!(*v.downcast::<Vec<i64>>().unwrap(), [1, -2]);
    }

    #[test]
    fn primitive_arrays_drop_nulls_and_stay_lenient() {
        let v = read(SimpleType::Ints, "[1,null,\"3\"]").unwrap();
        assert_eq!(*v.downcast::<Vec<i32>>().unwrap(), [1, 3]);
        let v = read(SimpleType::Longs, "[null,2.0]").unwrap();
        assert_eq!(*v.downcast::<Vec<i64>>().unwrap(), [2]);
        let v = read(SimpleType::Bools, "[true,null,\"false\"]").unwrap();
        assert_eq!(*v.downcast::<Vec<bool>>().unwrap(), [true, false]);
        let v = read(SimpleType::Chars, "[\"a\",null,98]").unwrap();
        assert_eq!(*v.downcast::<Vec<char>>().unwrap(), ['a', 'b']);
        let v = read(SimpleType::Bytes, "[7,null,\"8\"]").unwrap();
        assert_eq!(*v.downcast::<Vec<u8>>().unwrap(), [7, 8]);

        let err = read_err(SimpleType::Ints, "[1,\"x\"]");
        assert!(err.contains("string \"x\""), "{err}");
    }

    #[test]
    fn system_time_reads_millis_and_iso() {
        let v = read(SimpleType::SystemTime, "1500").unwrap();
        let expected = UNIX_EPOCH + Duration::from_millis(1500);
        assert_eq!(*v.downcast::<std::time::SystemTime>().unwrap(), expected);

        let v = read(SimpleType::SystemTime, "\"1970-01-01T00:00:01.5Z\"").unwrap();
        assert_eq!(*v.downcast::<std::time::SystemTime>().unwrap(), expected);
    }

    #[test]
    fn library_types_parse_strings() {
        let v = read(SimpleType::Uuid, "\"67e55044-10b1-426f-9247-bb680e5fe0c8\"").unwrap();
        assert_eq!(
            v.downcast::<uuid::Uuid>().unwrap().to_string(),
            "67e55044-10b1-426f-9247-bb680e5fe0c8"
        );
        let err = read_err(SimpleType::Url, "\"not a url\"");
        assert!(err.contains("cannot construct `Url`"), "{err}");
    }
}
