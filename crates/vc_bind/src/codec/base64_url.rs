use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use base64::Engine;
use base64::alphabet::URL_SAFE;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;

use crate::info::{BeanInfo, Shape, construct_from_str};
use crate::write::{Emit, ValueWriter, WriteContext};
use crate::{Bind, BindError, Bindable, Binder};

/// Writes without padding and reads with or without it.
const ENGINE: GeneralPurpose = GeneralPurpose::new(
    &URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Bytes carried on the wire as URL-safe base64 text.
///
/// ```
/// use vc_bind::codec::Base64Url;
///
/// let value = Base64Url::encode(b"\xfb\xff");
/// assert_eq!(value.as_str(), "-_8");
/// assert_eq!(value.decoded_bytes().unwrap(), b"\xfb\xff");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Base64Url(String);

impl Base64Url {
    pub fn encode(bytes: impl AsRef<[u8]>) -> Self {
        Self(ENGINE.encode(bytes))
    }

    /// The encoded text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn decoded_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        ENGINE.decode(&self.0)
    }
}

impl fmt::Display for Base64Url {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Base64Url {
    type Err = base64::DecodeError;

    /// Accepts only valid encodings; the text is kept as given.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        ENGINE.decode(text)?;
        Ok(Self(text.to_string()))
    }
}

impl Bind for Base64Url {
    fn shape() -> Shape {
        Shape::Bean(BeanInfo::new::<Self>().with_string_ctor(construct_from_str::<Self>))
    }

    #[inline]
    fn type_name() -> &'static str {
        "Base64Url"
    }
}

pub(super) fn install(binder: &Binder) {
    binder.register_serializer::<Base64Url>(Base64UrlWriter);
}

struct Base64UrlWriter;

impl ValueWriter for Base64UrlWriter {
    fn write(&self, value: &dyn Bindable, _ctx: &WriteContext<'_>, out: &mut dyn Emit) -> Result<(), BindError> {
        let value = value
            .downcast_ref::<Base64Url>()
            .ok_or_else(|| BindError::Internal(format!("expected `{}`", Base64Url::type_name())))?;
        out.emit(&value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Base64Url;
    use crate::{BindError, Binder};

    #[test]
    fn writes_its_own_text() {
        let binder = Binder::new();
        let value = Base64Url::encode("hello?");
        assert_eq!(binder.write_val(&value).unwrap(), "\"aGVsbG8_\"");
        assert_eq!(binder.read_val::<Base64Url>("\"aGVsbG8_\"").unwrap().unwrap(), value);
    }

    #[test]
    fn padded_input_is_accepted() {
        let binder = Binder::new();
        let read: Base64Url = binder.read_val("\"aGk=\"").unwrap().unwrap();
        assert_eq!(read.decoded_bytes().unwrap(), b"hi");
        assert!(matches!(
            binder.read_val::<Base64Url>("\"a*b\""),
            Err(BindError::Construct { .. })
        ));
    }
}
