use alloc::format;
use alloc::string::ToString;
use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};

use crate::info::{BeanInfo, Shape, construct_from_str};
use crate::write::{Emit, ValueWriter, WriteContext};
use crate::{Bind, BindError, Bindable, Binder};

/// An instant written in the HTTP date format of RFC 1123.
///
/// Reading goes through the [`FromStr`] impl, which accepts any RFC 2822
/// date.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use vc_bind::codec::DateTimeRfc1123;
///
/// let date = DateTimeRfc1123::new(Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap());
/// assert_eq!(date.to_string(), "Thu, 04 Mar 2021 05:06:07 GMT");
/// assert_eq!("Thu, 04 Mar 2021 05:06:07 GMT".parse::<DateTimeRfc1123>().unwrap(), date);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTimeRfc1123(DateTime<Utc>);

impl DateTimeRfc1123 {
    #[inline]
    pub const fn new(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    #[inline]
    pub const fn instant(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for DateTimeRfc1123 {
    #[inline]
    fn from(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }
}

impl fmt::Display for DateTimeRfc1123 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%a, %d %b %Y %H:%M:%S GMT"))
    }
}

impl FromStr for DateTimeRfc1123 {
    type Err = chrono::ParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        DateTime::parse_from_rfc2822(text.trim()).map(|parsed| Self(parsed.to_utc()))
    }
}

impl Bind for DateTimeRfc1123 {
    fn shape() -> Shape {
        Shape::Bean(BeanInfo::new::<Self>().with_string_ctor(construct_from_str::<Self>))
    }

    #[inline]
    fn type_name() -> &'static str {
        "DateTimeRfc1123"
    }
}

pub(super) fn install(binder: &Binder) {
    binder.register_serializer::<DateTimeRfc1123>(Rfc1123Writer);
}

struct Rfc1123Writer;

impl ValueWriter for Rfc1123Writer {
    fn write(&self, value: &dyn Bindable, _ctx: &WriteContext<'_>, out: &mut dyn Emit) -> Result<(), BindError> {
        let value = value
            .downcast_ref::<DateTimeRfc1123>()
            .ok_or_else(|| BindError::Internal(format!("expected `{}`", DateTimeRfc1123::type_name())))?;
        out.emit(&value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::DateTimeRfc1123;
    use crate::{Bind, BindError, Binder};

    #[derive(Bind, Default, Debug, PartialEq)]
    #[bind(default)]
    struct Response {
        #[bind(rename = "Last-Modified")]
        last_modified: Option<DateTimeRfc1123>,
    }

    #[test]
    fn round_trips_as_a_property() {
        let binder = Binder::new();
        let instant = Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap();
        let response = Response {
            last_modified: Some(instant.into()),
        };
        let text = binder.write_val(&response).unwrap();
        assert_eq!(text, r#"{"Last-Modified":"Sun, 06 Nov 1994 08:49:37 GMT"}"#);
        assert_eq!(binder.read_val::<Response>(&text).unwrap().unwrap(), response);
    }

    #[test]
    fn bad_text_fails_construction() {
        let binder = Binder::new();
        let err = binder.read_val::<DateTimeRfc1123>("\"someday\"").unwrap_err();
        assert!(matches!(err, BindError::Construct { ty: "DateTimeRfc1123", .. }), "{err}");
    }
}
