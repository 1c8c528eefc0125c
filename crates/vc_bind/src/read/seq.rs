use core::fmt;

use serde_core::Deserializer;
use serde_core::de::{self, SeqAccess, Visitor};

use super::{ReadContext, ReaderRef, RefSeed, ValueReader};
use crate::BoxedValue;
use crate::info::SeqInfo;

/// Reads arrays and collections element by element.
///
/// Null elements are dropped. Fixed-size arrays fail when the element
/// count does not match.
pub(crate) struct SeqReader {
    pub info: SeqInfo,
    pub item: ReaderRef,
}

impl ValueReader for SeqReader {
    fn read<'de>(
        &self,
        ctx: &ReadContext<'_>,
        de: &mut dyn erased_serde::Deserializer<'de>,
    ) -> Result<Option<BoxedValue>, erased_serde::Error> {
        de.deserialize_any(SeqVisitor { reader: self, ctx })
    }
}

struct SeqVisitor<'a, 'c> {
    reader: &'a SeqReader,
    ctx: &'a ReadContext<'c>,
}

impl<'de> Visitor<'de> for SeqVisitor<'_, '_> {
    type Value = Option<BoxedValue>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an array")
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

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let info = &self.reader.info;
        let mut buffer = info.new_buffer(seq.size_hint().unwrap_or(0).min(4096));

        while let Some(item) = seq.next_element_seed(RefSeed {
            reader: &self.reader.item,
            ctx: self.ctx,
        })? {
            if let Some(item) = item {
                info.push(&mut *buffer, item).map_err(|err| self.ctx.fail(err))?;
            }
        }

        info.finish(buffer).map(Some).map_err(|err| self.ctx.fail(err))
    }
}
