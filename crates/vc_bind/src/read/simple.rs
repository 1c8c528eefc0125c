use super::{ReadContext, ValueReader};
use crate::BoxedValue;
use crate::simple::{SimpleType, read_simple};

/// Reads a type from the simple-type table.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SimpleReader(pub SimpleType);

impl ValueReader for SimpleReader {
    #[inline]
    fn read<'de>(
        &self,
        ctx: &ReadContext<'_>,
        de: &mut dyn erased_serde::Deserializer<'de>,
    ) -> Result<Option<BoxedValue>, erased_serde::Error> {
        read_simple(self.0, ctx, de)
    }
}
