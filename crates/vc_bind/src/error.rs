use alloc::boxed::Box;
use alloc::string::{String, ToString};
use core::fmt::Display;

use thiserror::Error;

/// Convenience alias for results of binding operations.
pub type Result<T, E = BindError> = core::result::Result<T, E>;

/// Errors raised while resolving strategies, reading or writing values.
///
/// Errors raised inside a reader or writer travel through the serde format
/// as messages. The [`Binder`](crate::Binder) entry points hand back the
/// original error; only failures of the format itself surface as
/// [`BindError::Json`] or [`BindError::Custom`].
#[derive(Debug, Error)]
pub enum BindError {
    /// The wire value does not have the shape the target expects.
    #[error("cannot read `{ty}`: expected {expected}, found {found}")]
    Mismatch {
        ty: &'static str,
        expected: &'static str,
        found: String,
    },
    /// No usable constructor, or a constructor rejected its input.
    #[error("cannot construct `{ty}`: {reason}")]
    Construct { ty: &'static str, reason: String },
    /// A property setter failed.
    #[error("cannot assign property `{property}` of `{owner}`: {source}")]
    Assign {
        property: &'static str,
        owner: &'static str,
        #[source]
        source: Box<BindError>,
    },
    /// Only raised with [`Features::FAIL_ON_UNKNOWN_PROPERTIES`](crate::Features).
    #[error("unknown property `{name}` for `{ty}`")]
    UnknownProperty { name: String, ty: &'static str },
    /// The type resolves to no reader or writer.
    #[error("no strategy for `{ty}`: {reason}")]
    Unsupported {
        ty: &'static str,
        reason: &'static str,
    },
    #[error("cannot introspect `{ty}`: {reason}")]
    Introspect { ty: &'static str, reason: String },
    /// The input document is empty and the target does not accept that.
    #[error("no content to map")]
    NoContent,
    /// A broken invariant inside the engine or a custom codec.
    #[error("internal binding error: {0}")]
    Internal(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Custom(String),
}

impl BindError {
    #[inline]
    pub(crate) fn mismatch(ty: &'static str, expected: &'static str, found: impl Display) -> Self {
        Self::Mismatch {
            ty,
            expected,
            found: found.to_string(),
        }
    }

    #[inline]
    pub(crate) fn construct(ty: &'static str, reason: impl Display) -> Self {
        Self::Construct {
            ty,
            reason: reason.to_string(),
        }
    }

    #[inline]
    pub(crate) fn introspect(ty: &'static str, reason: impl Display) -> Self {
        Self::Introspect {
            ty,
            reason: reason.to_string(),
        }
    }
}

impl serde_core::de::Error for BindError {
    #[cold]
    fn custom<T: Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }
}

impl serde_core::ser::Error for BindError {
    #[cold]
    fn custom<T: Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }
}

/// Converts a [`BindError`] into the error type of a serializer.
#[inline]
pub(crate) fn ser_error<E: serde_core::ser::Error>(err: BindError) -> E {
    E::custom(err)
}

#[cfg(test)]
mod tests {
    use super::BindError;
    use std::error::Error;

    #[test]
    fn assign_chains_its_cause() {
        let err = BindError::Assign {
            property: "age",
            owner: "Pet",
            source: Box::new(BindError::mismatch("u32", "a number", "\"old\"")),
        };
        assert_eq!(
            err.to_string(),
            "cannot assign property `age` of `Pet`: cannot read `u32`: expected a number, found \"old\""
        );
        assert!(err.source().is_some());
    }
}
