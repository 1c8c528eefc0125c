use alloc::boxed::Box;
use alloc::format;

use chrono::{DateTime, Utc};

use super::iso8601::read_instant;
use crate::info::Shape;
use crate::read::{ReadContext, ValueReader};
use crate::write::{Emit, ValueWriter, WriteContext};
use crate::{Bind, BindError, Bindable, Binder, BoxedValue};

/// An instant carried on the wire as whole epoch seconds.
///
/// Reading also accepts fractional seconds and ISO-8601 text.
///
/// ```
/// use vc_bind::Binder;
/// use vc_bind::codec::UnixTime;
///
/// let binder = Binder::new();
/// let time: UnixTime = binder.read_val("\"2021-03-04T05:06:07Z\"").unwrap().unwrap();
/// assert_eq!(binder.write_val(&time).unwrap(), "1614834367");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnixTime(DateTime<Utc>);

impl UnixTime {
    #[inline]
    pub const fn new(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    /// Returns `None` when `seconds` is out of range.
    #[inline]
    pub fn from_seconds(seconds: i64) -> Option<Self> {
        DateTime::from_timestamp(seconds, 0).map(Self)
    }

    #[inline]
    pub const fn instant(&self) -> DateTime<Utc> {
        self.0
    }

    #[inline]
    pub fn seconds(&self) -> i64 {
        self.0.timestamp()
    }
}

impl From<DateTime<Utc>> for UnixTime {
    #[inline]
    fn from(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }
}

impl Bind for UnixTime {
    #[inline]
    fn shape() -> Shape {
        Shape::Opaque
    }

    #[inline]
    fn type_name() -> &'static str {
        "UnixTime"
    }
}

pub(super) fn install(binder: &Binder) {
    binder.register_serializer::<UnixTime>(UnixTimeCodec);
    binder.register_deserializer::<UnixTime>(UnixTimeCodec);
}

struct UnixTimeCodec;

impl ValueWriter for UnixTimeCodec {
    fn write(&self, value: &dyn Bindable, _ctx: &WriteContext<'_>, out: &mut dyn Emit) -> Result<(), BindError> {
        let value = value
            .downcast_ref::<UnixTime>()
            .ok_or_else(|| BindError::Internal(format!("expected `{}`", UnixTime::type_name())))?;
        out.emit(&value.seconds())
    }
}

impl ValueReader for UnixTimeCodec {
    fn read<'de>(
        &self,
        ctx: &ReadContext<'_>,
        de: &mut dyn erased_serde::Deserializer<'de>,
    ) -> Result<Option<BoxedValue>, erased_serde::Error> {
        let instant = read_instant(ctx, UnixTime::type_name(), de)?;
        Ok(instant.map(|instant| Box::new(UnixTime(instant.to_utc())) as BoxedValue))
    }
}

#[cfg(test)]
mod tests {
    use super::UnixTime;
    use crate::{Bind, Binder};

    #[derive(Bind, Default, Debug, PartialEq)]
    #[bind(default)]
    struct Token {
        expires: Option<UnixTime>,
    }

    #[test]
    fn round_trips_as_bare_seconds() {
        let binder = Binder::new();
        let token = Token {
            expires: UnixTime::from_seconds(1_700_000_000),
        };
        let text = binder.write_val(&token).unwrap();
        assert_eq!(text, r#"{"expires":1700000000}"#);
        assert_eq!(binder.read_val::<Token>(&text).unwrap().unwrap(), token);
    }

    #[test]
    fn fractional_seconds_are_truncated_on_write() {
        let binder = Binder::new();
        let time: UnixTime = binder.read_val("12.75").unwrap().unwrap();
        assert_eq!(binder.write_val(&time).unwrap(), "12");
        assert!(binder.read_val::<UnixTime>("true").is_err());
    }
}
