use super::{ReadContext, ReaderRef, ValueReader};
use crate::BoxedValue;
use crate::info::WrapperInfo;

/// Reads a wrapper by reading its inner type and wrapping the result.
///
/// Null becomes the wrapper's own null value when it has one (`Some(None)`
/// for `Option`), otherwise the property stays unset.
pub(crate) struct WrapperReader {
    pub info: WrapperInfo,
    pub inner: ReaderRef,
    pub accepts_empty: bool,
}

impl ValueReader for WrapperReader {
    fn read<'de>(
        &self,
        ctx: &ReadContext<'_>,
        de: &mut dyn erased_serde::Deserializer<'de>,
    ) -> Result<Option<BoxedValue>, erased_serde::Error> {
        let inner = self.inner.get(ctx).map_err(|err| ctx.fail::<erased_serde::Error>(err))?;
        match inner.read(ctx, de)? {
            Some(value) => self.info.wrap(value).map(Some).map_err(|err| ctx.fail(err)),
            None => Ok(self.info.null()),
        }
    }

    #[inline]
    fn accepts_empty(&self) -> bool {
        self.accepts_empty
    }
}
