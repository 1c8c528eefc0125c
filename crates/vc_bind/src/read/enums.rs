use core::fmt;

use serde_core::Deserializer;
use serde_core::de::{self, Visitor};
use vc_utils::hash::HashMap;

use super::{ReadContext, ValueReader};
use crate::info::EnumInfo;
use crate::{BindError, BoxedValue, TypeKey};

/// Reads unit-only enums from a variant name or a variant index.
pub(crate) struct EnumReader {
    ty: TypeKey,
    info: EnumInfo,
    by_name: HashMap<&'static str, usize>,
}

impl EnumReader {
    pub fn new(ty: TypeKey, info: EnumInfo) -> Self {
        let by_name = info.names().iter().enumerate().map(|(index, name)| (*name, index)).collect();
        Self { ty, info, by_name }
    }
}

impl ValueReader for EnumReader {
    fn read<'de>(
        &self,
        ctx: &ReadContext<'_>,
        de: &mut dyn erased_serde::Deserializer<'de>,
    ) -> Result<Option<BoxedValue>, erased_serde::Error> {
        de.deserialize_any(EnumVisitor { reader: self, ctx })
    }
}

struct EnumVisitor<'a, 'c> {
    reader: &'a EnumReader,
    ctx: &'a ReadContext<'c>,
}

impl EnumVisitor<'_, '_> {
    fn variant<E: de::Error>(&self, index: Option<usize>, found: impl fmt::Display) -> Result<Option<BoxedValue>, E> {
        match index.and_then(|index| self.reader.info.from_index(index)) {
            Some(value) => Ok(Some(value)),
            None => Err(self.ctx.fail(BindError::mismatch(
                self.reader.ty.name(),
                "a variant name or index",
                found,
            ))),
        }
    }
}

impl<'de> Visitor<'de> for EnumVisitor<'_, '_> {
    type Value = Option<BoxedValue>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("one of ")?;
        formatter.write_str(&self.reader.info.names().join(", "))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        let index = self.reader.by_name.get(v).copied();
        self.variant(index, format_args!("{v:?}"))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        self.variant(usize::try_from(v).ok(), v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        self.variant(usize::try_from(v).ok(), v)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }
}
