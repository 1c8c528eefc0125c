use alloc::boxed::Box;

use serde_core::Deserialize;

use super::{ReadContext, ValueReader};
use crate::{BoxedValue, DynamicValue};

/// Reads [`DynamicValue`]. Null is kept as [`DynamicValue::Null`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct AnyReader;

impl ValueReader for AnyReader {
    fn read<'de>(
        &self,
        _ctx: &ReadContext<'_>,
        de: &mut dyn erased_serde::Deserializer<'de>,
    ) -> Result<Option<BoxedValue>, erased_serde::Error> {
        let value = DynamicValue::deserialize(de)?;
        Ok(Some(Box::new(value)))
    }
}
