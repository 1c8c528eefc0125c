use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use core::fmt;
use core::marker::PhantomData;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_core::de::{self, Deserializer, Visitor};

use crate::info::Shape;
use crate::read::{ReadContext, ValueReader};
use crate::write::{Emit, ValueWriter, WriteContext};
use crate::{Bind, BindError, Bindable, Binder, BoxedValue};

impl Bind for DateTime<Utc> {
    #[inline]
    fn shape() -> Shape {
        Shape::Opaque
    }

    #[inline]
    fn type_name() -> &'static str {
        "DateTime<Utc>"
    }
}

impl Bind for DateTime<FixedOffset> {
    #[inline]
    fn shape() -> Shape {
        Shape::Opaque
    }

    #[inline]
    fn type_name() -> &'static str {
        "DateTime<FixedOffset>"
    }
}

pub(super) fn install(binder: &Binder) {
    binder.register_serializer::<DateTime<Utc>>(IsoWriter::<Utc>(PhantomData));
    binder.register_serializer::<DateTime<FixedOffset>>(IsoWriter::<FixedOffset>(PhantomData));
    binder.register_deserializer::<DateTime<Utc>>(IsoReader::<Utc>(PhantomData));
    binder.register_deserializer::<DateTime<FixedOffset>>(IsoReader::<FixedOffset>(PhantomData));
}

/// Formats `instant` as UTC text with as many fraction digits as needed.
///
/// Years past 9999 are written without a leading `+`.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use vc_bind::codec::format_instant;
///
/// let instant = Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap();
/// assert_eq!(format_instant(&instant), "2021-03-04T05:06:07Z");
/// ```
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    let text = instant.to_rfc3339_opts(SecondsFormat::AutoSi, true);
    match text.strip_prefix('+') {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

/// Parses ISO-8601 date-time text permissively.
///
/// A trailing `+00` or `+00:00` reads as `Z`. Text without an offset is
/// taken as UTC, and a bare date as midnight UTC.
pub fn parse_instant(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    let text: Cow<'_, str> = match text.strip_suffix("+00:00").or_else(|| text.strip_suffix("+00")) {
        Some(head) => Cow::Owned(format!("{head}Z")),
        None => Cow::Borrowed(text),
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&text) {
        return Some(parsed);
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&text, pattern) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

// -----------------------------------------------------------------------------
// Time zones

/// The time zones an ISO instant can be read into.
trait Zone: Send + Sync + 'static {
    type Value: Bind;

    fn from_instant(instant: DateTime<FixedOffset>) -> Self::Value;

    fn to_utc(value: &Self::Value) -> DateTime<Utc>;
}

impl Zone for Utc {
    type Value = DateTime<Utc>;

    #[inline]
    fn from_instant(instant: DateTime<FixedOffset>) -> DateTime<Utc> {
        instant.to_utc()
    }

    #[inline]
    fn to_utc(value: &DateTime<Utc>) -> DateTime<Utc> {
        *value
    }
}

impl Zone for FixedOffset {
    type Value = DateTime<FixedOffset>;

    #[inline]
    fn from_instant(instant: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        instant
    }

    #[inline]
    fn to_utc(value: &DateTime<FixedOffset>) -> DateTime<Utc> {
        value.to_utc()
    }
}

// -----------------------------------------------------------------------------
// Codec

struct IsoWriter<Z>(PhantomData<fn() -> Z>);

impl<Z: Zone> ValueWriter for IsoWriter<Z> {
    fn write(&self, value: &dyn Bindable, _ctx: &WriteContext<'_>, out: &mut dyn Emit) -> Result<(), BindError> {
        let value = value
            .downcast_ref::<Z::Value>()
            .ok_or_else(|| BindError::Internal(format!("expected `{}`", Z::Value::type_name())))?;
        out.emit(&format_instant(&Z::to_utc(value)))
    }
}

struct IsoReader<Z>(PhantomData<fn() -> Z>);

impl<Z: Zone> ValueReader for IsoReader<Z> {
    fn read<'de>(
        &self,
        ctx: &ReadContext<'_>,
        de: &mut dyn erased_serde::Deserializer<'de>,
    ) -> Result<Option<BoxedValue>, erased_serde::Error> {
        let instant = read_instant(ctx, Z::Value::type_name(), de)?;
        Ok(instant.map(|instant| Box::new(Z::from_instant(instant)) as BoxedValue))
    }
}

/// Reads epoch seconds, fractional epoch seconds or ISO text.
pub(super) fn read_instant<'de, D: Deserializer<'de>>(
    ctx: &ReadContext<'_>,
    ty: &'static str,
    deserializer: D,
) -> Result<Option<DateTime<FixedOffset>>, D::Error> {
    deserializer.deserialize_any(InstantVisitor { ctx, ty })
}

struct InstantVisitor<'a, 'c> {
    ctx: &'a ReadContext<'c>,
    ty: &'static str,
}

impl InstantVisitor<'_, '_> {
    fn found<E: de::Error>(
        &self,
        instant: Option<DateTime<Utc>>,
        raw: impl fmt::Display,
    ) -> Result<Option<DateTime<FixedOffset>>, E> {
        match instant {
            Some(instant) => Ok(Some(instant.fixed_offset())),
            None => Err(self.ctx.fail(BindError::mismatch(self.ty, "an instant in range", raw))),
        }
    }
}

impl<'de> Visitor<'de> for InstantVisitor<'_, '_> {
    type Value = Option<DateTime<FixedOffset>>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an ISO-8601 date-time or epoch seconds")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        self.found(DateTime::from_timestamp(v, 0), v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        let instant = i64::try_from(v).ok().and_then(|v| DateTime::from_timestamp(v, 0));
        self.found(instant, v)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        let seconds = v.floor();
        let nanos = ((v - seconds) * 1e9).round().min(999_999_999.0) as u32;
        let instant = match seconds.is_finite() && seconds.abs() < i64::MAX as f64 {
            true => DateTime::from_timestamp(seconds as i64, nanos),
            false => None,
        };
        self.found(instant, v)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        if v.is_empty() {
            return Ok(None);
        }
        parse_instant(v)
            .map(Some)
            .ok_or_else(|| self.ctx.fail(BindError::mismatch(self.ty, "an ISO-8601 date-time", v)))
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

#[cfg(test)]
mod tests {
    use chrono::{DateTime, FixedOffset, TimeZone, Timelike, Utc};

    use super::{format_instant, parse_instant};
    use crate::{BindError, Binder};

    #[test]
    fn writes_utc_with_needed_fraction_digits() {
        let binder = Binder::new();
        let instant = Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(binder.write_val(&instant).unwrap(), "\"2021-03-04T05:06:07Z\"");

        let millis = instant.with_nanosecond(123_000_000).unwrap();
        assert_eq!(format_instant(&millis), "2021-03-04T05:06:07.123Z");

        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let local = offset.with_ymd_and_hms(2021, 3, 4, 7, 6, 7).unwrap();
        assert_eq!(binder.write_val(&local).unwrap(), "\"2021-03-04T05:06:07Z\"");
    }

    #[test]
    fn far_future_years_lose_the_plus() {
        let instant = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(format_instant(&instant), "10000-01-01T00:00:00Z");
    }

    #[test]
    fn permissive_parsing() {
        let expected = Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap();
        for text in [
            "2021-03-04T05:06:07Z",
            "2021-03-04T05:06:07+00",
            "2021-03-04T05:06:07+00:00",
            "2021-03-04T07:06:07+02:00",
            "2021-03-04T05:06:07",
            "2021-03-04 05:06:07",
        ] {
            assert_eq!(parse_instant(text).map(|v| v.to_utc()), Some(expected), "{text}");
        }
        assert_eq!(
            parse_instant("2021-03-04").map(|v| v.to_utc()),
            Utc.with_ymd_and_hms(2021, 3, 4, 0, 0, 0).single()
        );
        assert_eq!(parse_instant("yesterday"), None);
    }

    #[test]
    fn reads_epoch_numbers_and_text() {
        let binder = Binder::new();
        let read: DateTime<Utc> = binder.read_val("1614834367").unwrap().unwrap();
        assert_eq!(format_instant(&read), "2021-03-04T05:06:07Z");

        let read: DateTime<Utc> = binder.read_val("1614834367.25").unwrap().unwrap();
        assert_eq!(read.nanosecond(), 250_000_000);

        let read: DateTime<FixedOffset> = binder.read_val("\"2021-03-04T07:06:07+02:00\"").unwrap().unwrap();
        assert_eq!(read.offset().local_minus_utc(), 7200);

        assert_eq!(binder.read_val::<DateTime<Utc>>("\"\"").unwrap(), None);
        let err = binder.read_val::<DateTime<Utc>>("\"soon\"").unwrap_err();
        assert!(matches!(err, BindError::Mismatch { ty: "DateTime<Utc>", .. }), "{err}");
    }
}
