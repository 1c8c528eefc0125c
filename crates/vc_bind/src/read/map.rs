use alloc::string::String;
use core::fmt;

use serde_core::Deserializer;
use serde_core::de::{self, MapAccess, Visitor};

use super::{ReadContext, ReaderRef, RefSeed, ValueReader};
use crate::BoxedValue;
use crate::info::MapInfo;

/// Reads string-keyed maps. Entries with a null value are dropped.
pub(crate) struct MapReader {
    pub info: MapInfo,
    pub value: ReaderRef,
}

impl ValueReader for MapReader {
    fn read<'de>(
        &self,
        ctx: &ReadContext<'_>,
        de: &mut dyn erased_serde::Deserializer<'de>,
    ) -> Result<Option<BoxedValue>, erased_serde::Error> {
        de.deserialize_any(MapVisitor { reader: self, ctx })
    }
}

struct MapVisitor<'a, 'c> {
    reader: &'a MapReader,
    ctx: &'a ReadContext<'c>,
}

impl<'de> Visitor<'de> for MapVisitor<'_, '_> {
    type Value = Option<BoxedValue>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an object")
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

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let info = &self.reader.info;
        let mut target = info.new_map(map.size_hint().unwrap_or(0).min(4096));

        while let Some(key) = map.next_key::<String>()? {
            let value = map.next_value_seed(RefSeed {
                reader: &self.reader.value,
                ctx: self.ctx,
            })?;
            if let Some(value) = value {
                info.insert(&mut *target, key, value)
                    .map_err(|err| self.ctx.fail(err))?;
            }
        }

        Ok(Some(target))
    }
}
