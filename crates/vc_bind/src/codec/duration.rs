use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::fmt::Write;
use core::time::Duration;

use serde_core::de::{self, Deserializer, Visitor};

use crate::info::Shape;
use crate::read::{ReadContext, ValueReader};
use crate::write::{Emit, ValueWriter, WriteContext};
use crate::{Bind, BindError, Bindable, Binder, BoxedValue};

impl Bind for Duration {
    #[inline]
    fn shape() -> Shape {
        Shape::Opaque
    }

    #[inline]
    fn type_name() -> &'static str {
        "Duration"
    }
}

pub(super) fn install(binder: &Binder) {
    binder.register_serializer::<Duration>(DurationCodec);
    binder.register_deserializer::<Duration>(DurationCodec);
}

/// Formats `duration` as `P[nD][T[nH][nM][n[.f]S]]`.
///
/// Zero components are left out, as is the `T` part when it would be empty.
/// The fraction keeps only significant digits.
///
/// ```
/// use core::time::Duration;
/// use vc_bind::codec::format_duration;
///
/// assert_eq!(format_duration(Duration::ZERO), "PT0S");
/// assert_eq!(format_duration(Duration::from_millis(1)), "PT0.001S");
/// assert_eq!(format_duration(Duration::from_secs(86_400 + 3_600)), "P1DT1H");
/// ```
pub fn format_duration(duration: Duration) -> String {
    if duration.is_zero() {
        return String::from("PT0S");
    }

    let total = duration.as_secs();
    let days = total / 86_400;
    let hours = total / 3_600 % 24;
    let minutes = total / 60 % 60;
    let seconds = total % 60;
    let nanos = duration.subsec_nanos();

    let mut out = String::from("P");
    if days > 0 {
        let _ = write!(out, "{days}D");
    }
    if hours == 0 && minutes == 0 && seconds == 0 && nanos == 0 {
        return out;
    }

    out.push('T');
    if hours > 0 {
        let _ = write!(out, "{hours}H");
    }
    if minutes > 0 {
        let _ = write!(out, "{minutes}M");
    }
    if seconds > 0 || nanos > 0 {
        let _ = write!(out, "{seconds}");
        if nanos > 0 {
            let fraction = format!("{nanos:09}");
            out.push('.');
            out.push_str(fraction.trim_end_matches('0'));
        }
        out.push('S');
    }
    out
}

/// Parses an ISO-8601 duration made of weeks, days, hours, minutes and
/// seconds. Years and months have no fixed length and are rejected.
///
/// ```
/// use core::time::Duration;
/// use vc_bind::codec::parse_duration;
///
/// assert_eq!(parse_duration("PT1M30.5S"), Some(Duration::from_millis(90_500)));
/// assert_eq!(parse_duration("P1W"), Some(Duration::from_secs(604_800)));
/// assert_eq!(parse_duration("P1Y"), None);
/// ```
pub fn parse_duration(text: &str) -> Option<Duration> {
    let body = text.trim().strip_prefix('P')?;
    let (date, time) = match body.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (body, None),
    };
    if body.is_empty() || time.is_some_and(str::is_empty) {
        return None;
    }

    let mut secs = 0u64;
    let mut nanos = 0u32;
    for (number, unit) in components(date)? {
        let scale = match unit {
            'W' => 604_800,
            'D' => 86_400,
            _ => return None,
        };
        secs = secs.checked_add(number.parse::<u64>().ok()?.checked_mul(scale)?)?;
    }
    for (number, unit) in components(time.unwrap_or_default())? {
        let (whole, fraction) = match number.split_once('.') {
            Some((whole, fraction)) if unit == 'S' => (whole, Some(fraction)),
            Some(_) => return None,
            None => (number, None),
        };
        let scale = match unit {
            'H' => 3_600,
            'M' => 60,
            'S' => 1,
            _ => return None,
        };
        secs = secs.checked_add(whole.parse::<u64>().ok()?.checked_mul(scale)?)?;
        if let Some(fraction) = fraction {
            nanos = parse_fraction(fraction)?;
        }
    }
    Some(Duration::new(secs, nanos))
}

/// Splits `1D2H` into `[("1", 'D'), ("2", 'H')]`.
fn components(mut text: &str) -> Option<Vec<(&str, char)>> {
    let mut out = Vec::new();
    while !text.is_empty() {
        let end = text.find(|c: char| c.is_ascii_alphabetic())?;
        if end == 0 {
            return None;
        }
        let unit = text[end..].chars().next()?;
        out.push((&text[..end], unit));
        text = &text[end + 1..];
    }
    Some(out)
}

fn parse_fraction(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let kept = &digits[..digits.len().min(9)];
    format!("{kept:0<9}").parse().ok()
}

// -----------------------------------------------------------------------------
// Codec

struct DurationCodec;

impl ValueWriter for DurationCodec {
    fn write(&self, value: &dyn Bindable, _ctx: &WriteContext<'_>, out: &mut dyn Emit) -> Result<(), BindError> {
        let value = value
            .downcast_ref::<Duration>()
            .ok_or_else(|| BindError::Internal(format!("expected `{}`", Duration::type_name())))?;
        out.emit(&format_duration(*value))
    }
}

impl ValueReader for DurationCodec {
    fn read<'de>(
        &self,
        ctx: &ReadContext<'_>,
        de: &mut dyn erased_serde::Deserializer<'de>,
    ) -> Result<Option<BoxedValue>, erased_serde::Error> {
        let duration = de.deserialize_any(DurationVisitor(ctx))?;
        Ok(duration.map(|duration| Box::new(duration) as BoxedValue))
    }
}

struct DurationVisitor<'a, 'c>(&'a ReadContext<'c>);

impl DurationVisitor<'_, '_> {
    fn invalid<E: de::Error>(&self, expected: &'static str, raw: impl fmt::Display) -> E {
        self.0.fail(BindError::mismatch(Duration::type_name(), expected, raw))
    }
}

impl<'de> Visitor<'de> for DurationVisitor<'_, '_> {
    type Value = Option<Duration>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an ISO-8601 duration or seconds")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Some(Duration::from_secs(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        u64::try_from(v)
            .map(|v| Some(Duration::from_secs(v)))
            .map_err(|_| self.invalid("a non-negative duration", v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Duration::try_from_secs_f64(v)
            .map(Some)
            .map_err(|_| self.invalid("a non-negative duration", v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        if v.is_empty() {
            return Ok(None);
        }
        parse_duration(v)
            .map(Some)
            .ok_or_else(|| self.invalid("an ISO-8601 duration", v))
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
    use core::time::Duration;

    use super::{format_duration, parse_duration};
    use crate::{BindError, Binder};

    #[test]
    fn formatting_table() {
        let cases = [
            (Duration::ZERO, "PT0S"),
            (Duration::from_secs(1), "PT1S"),
            (Duration::from_millis(1_500), "PT1.5S"),
            (Duration::from_millis(1), "PT0.001S"),
            (Duration::from_millis(999), "PT0.999S"),
            (Duration::from_millis(1_000), "PT1S"),
            (Duration::from_secs(61), "PT1M1S"),
            (Duration::from_secs(3_661), "PT1H1M1S"),
            (Duration::from_secs(25 * 3_600), "P1DT1H"),
            (Duration::from_secs(100 * 86_400), "P100D"),
            (Duration::from_nanos(1), "PT0.000000001S"),
            (Duration::from_secs(60), "PT1M"),
            (Duration::from_secs(3_600 + 1), "PT1H1S"),
            (Duration::from_secs(86_400), "P1D"),
            (Duration::from_secs(2 * 86_400 + 3_600 + 120 + 3), "P2DT1H2M3S"),
        ];
        for (duration, text) in cases {
            assert_eq!(format_duration(duration), text);
            assert_eq!(parse_duration(text), Some(duration), "{text}");
        }
    }

    #[test]
    fn malformed_durations() {
        for text in ["", "P", "PT", "1D", "P1", "PT1.S", "PT1.5M", "P1M", "PTxS", "P-1D"] {
            assert_eq!(parse_duration(text), None, "{text}");
        }
    }

    #[test]
    fn reads_text_and_seconds() {
        let binder = Binder::new();
        let list: Vec<Duration> = binder.read_val(r#"["PT2M", 5, 0.25, null]"#).unwrap().unwrap();
        assert_eq!(
            list,
            [Duration::from_secs(120), Duration::from_secs(5), Duration::from_millis(250)]
        );
        assert_eq!(binder.write_val(&list).unwrap(), r#"["PT2M","PT5S","PT0.25S"]"#);
        let err = binder.read_val::<Duration>("\"soon\"").unwrap_err();
        assert!(matches!(err, BindError::Mismatch { ty: "Duration", .. }), "{err}");
    }
}
