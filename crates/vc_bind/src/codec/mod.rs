//! Codecs for types with a fixed wire form.
//!
//! A codec is a [`ValueReader`](crate::read::ValueReader) and/or a
//! [`ValueWriter`](crate::write::ValueWriter) bound to one type. Every new
//! [`Binder`] gets the codecs of this module through [`install_defaults`].
//!
//! | Type | Wire form |
//! |---|---|
//! | `DateTime<Utc>`, `DateTime<FixedOffset>` | ISO-8601 instant, `2021-03-04T05:06:07.123Z` |
//! | [`DateTimeRfc1123`] | `Thu, 04 Mar 2021 05:06:07 GMT` |
//! | `Duration` | ISO-8601 duration, `P1DT2H0.5S` |
//! | [`Base64Url`] | unpadded URL-safe base64 |
//! | [`UnixTime`] | epoch seconds |
//! | [`GeoObject`] | GeoJSON geometry object |
//! | [`Tristate`] | the inner value, or `null` when explicitly set so |

use crate::Binder;

// -----------------------------------------------------------------------------
// Modules

mod base64_url;
mod duration;
mod geo;
mod iso8601;
mod rfc1123;
mod tristate;
mod unix_time;

// -----------------------------------------------------------------------------
// Exports

pub use base64_url::Base64Url;
pub use duration::{format_duration, parse_duration};
pub use geo::{GeoBoundingBox, GeoGeometry, GeoObject, GeoPosition};
pub use iso8601::{format_instant, parse_instant};
pub use rfc1123::DateTimeRfc1123;
pub use tristate::Tristate;
pub use unix_time::UnixTime;

// -----------------------------------------------------------------------------
// Installation

/// Registers the built-in codecs, then every codec submitted with
/// [`submit_codec!`](crate::submit_codec).
pub fn install_defaults(binder: &Binder) {
    iso8601::install(binder);
    rfc1123::install(binder);
    duration::install(binder);
    base64_url::install(binder);
    unix_time::install(binder);
    geo::install(binder);

    #[cfg(feature = "auto_register")]
    for registration in inventory::iter::<CodecRegistration> {
        (registration.install)(binder);
    }
}

/// A codec installer collected by [`submit_codec!`](crate::submit_codec).
#[cfg(feature = "auto_register")]
pub struct CodecRegistration {
    pub install: fn(&Binder),
}

#[cfg(feature = "auto_register")]
inventory::collect!(CodecRegistration);

/// Installs a codec into every [`Binder`] created afterwards.
///
/// ```
/// use vc_bind::info::Shape;
/// use vc_bind::write::{Emit, ValueWriter, WriteContext};
/// use vc_bind::{Bind, BindError, Bindable, Binder, submit_codec};
///
/// struct Flag;
///
/// impl Bind for Flag {
///     fn shape() -> Shape {
///         Shape::Opaque
///     }
/// }
///
/// struct FlagWriter;
///
/// impl ValueWriter for FlagWriter {
///     fn write(&self, _: &dyn Bindable, _: &WriteContext<'_>, out: &mut dyn Emit) -> Result<(), BindError> {
///         out.emit(&"raised")
///     }
/// }
///
/// fn install(binder: &Binder) {
///     binder.register_serializer::<Flag>(FlagWriter);
/// }
///
/// submit_codec!(install);
///
/// assert_eq!(Binder::new().write_val(&Flag).unwrap(), "\"raised\"");
/// ```
#[cfg(feature = "auto_register")]
#[macro_export]
macro_rules! submit_codec {
    ($install:path) => {
        $crate::__macro_exports::inventory::submit! {
            $crate::codec::CodecRegistration { install: $install }
        }
    };
}
