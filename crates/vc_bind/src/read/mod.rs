//! Reader strategies and the [`ReaderCache`].
//!
//! A reader turns one wire value into a boxed Rust value. Readers are built
//! once per type from its [`Shape`](crate::info::Shape) and shared through
//! the cache; custom readers registered for a type replace the built-in
//! strategy.
//!
//! Every reader follows the same null convention: a wire `null` reads as
//! `Ok(None)` and leaves the target property untouched. Wrapper readers are
//! the exception, they map null to their own null value when they have one.

use alloc::sync::{Arc, Weak};
use core::cell::RefCell;
use core::fmt;

use serde_core::Deserializer;
use serde_core::de::{self, DeserializeSeed};

use crate::{BindConfig, BindError, BoxedValue, TypeKey};

// -----------------------------------------------------------------------------
// Modules

mod any;
mod bean;
mod cache;
mod enums;
mod map;
mod seq;
mod simple;
mod wrapper;

// -----------------------------------------------------------------------------
// Exports

pub use cache::ReaderCache;

pub(crate) use any::AnyReader;
pub(crate) use bean::BeanReader;
pub(crate) use enums::EnumReader;
pub(crate) use map::MapReader;
pub(crate) use seq::SeqReader;
pub(crate) use simple::SimpleReader;
pub(crate) use wrapper::WrapperReader;

// -----------------------------------------------------------------------------
// ValueReader

/// Reads one value of a fixed type from an erased deserializer.
///
/// The returned box must hold exactly the type the reader was registered
/// for. `Ok(None)` means the wire value was null.
///
/// # Examples
///
/// ```
/// use vc_bind::read::{ReadContext, ValueReader};
/// use vc_bind::{Binder, BoxedValue};
/// use serde_core::Deserialize;
///
/// struct Shouting;
///
/// impl ValueReader for Shouting {
///     fn read<'de>(
///         &self,
///         _ctx: &ReadContext<'_>,
///         de: &mut dyn erased_serde::Deserializer<'de>,
///     ) -> Result<Option<BoxedValue>, erased_serde::Error> {
///         let text = Option::<String>::deserialize(de)?;
///         Ok(text.map(|text| Box::new(text.to_uppercase()) as BoxedValue))
///     }
/// }
///
/// let binder = Binder::new();
/// binder.register_deserializer::<String>(Shouting);
/// let read: String = binder.read_val("\"hey\"").unwrap().unwrap();
/// assert_eq!(read, "HEY");
/// ```
pub trait ValueReader: Send + Sync + 'static {
    fn read<'de>(
        &self,
        ctx: &ReadContext<'_>,
        de: &mut dyn erased_serde::Deserializer<'de>,
    ) -> Result<Option<BoxedValue>, erased_serde::Error>;

    /// Whether empty input reads as an absent value instead of failing.
    #[inline]
    fn accepts_empty(&self) -> bool {
        false
    }
}

// -----------------------------------------------------------------------------
// ReadContext

/// Per-call state shared by all readers of one `read` call.
///
/// The context remembers the first [`BindError`] raised through
/// [`fail`](Self::fail), so the caller gets the typed error back instead of
/// the format's stringified copy.
pub struct ReadContext<'a> {
    cache: &'a ReaderCache,
    config: &'a BindConfig,
    failure: RefCell<Option<BindError>>,
}

impl<'a> ReadContext<'a> {
    #[inline]
    pub fn new(cache: &'a ReaderCache, config: &'a BindConfig) -> Self {
        Self {
            cache,
            config,
            failure: RefCell::new(None),
        }
    }

    #[inline]
    pub fn cache(&self) -> &'a ReaderCache {
        self.cache
    }

    #[inline]
    pub fn config(&self) -> &'a BindConfig {
        self.config
    }

    /// Converts `err` into the format's error type, keeping the first one.
    pub fn fail<E: de::Error>(&self, err: BindError) -> E {
        let converted = E::custom(&err);
        self.failure.borrow_mut().get_or_insert(err);
        converted
    }

    /// Takes the error recorded by [`fail`](Self::fail), if any.
    #[inline]
    pub fn take_failure(&self) -> Option<BindError> {
        self.failure.borrow_mut().take()
    }
}

impl fmt::Debug for ReadContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// ReadSeed

/// Drives a [`ValueReader`] from any serde deserializer.
pub struct ReadSeed<'r, 'c> {
    pub reader: &'r dyn ValueReader,
    pub ctx: &'r ReadContext<'c>,
}

impl<'de> DeserializeSeed<'de> for ReadSeed<'_, '_> {
    type Value = Option<BoxedValue>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        let mut erased = <dyn erased_serde::Deserializer>::erase(deserializer);
        self.reader
            .read(self.ctx, &mut erased)
            .map_err(de::Error::custom)
    }
}

// -----------------------------------------------------------------------------
// ReaderRef

/// A reader's edge to the reader of a child type.
///
/// Bean edges are weak so that recursive types do not keep their readers
/// alive in a cycle. When the target was evicted from the cache the edge
/// resolves the type again.
#[derive(Clone)]
pub(crate) enum ReaderRef {
    Shared(Arc<dyn ValueReader>),
    Bean { reader: Weak<BeanReader>, ty: TypeKey },
}

impl ReaderRef {
    pub(crate) fn get(&self, ctx: &ReadContext<'_>) -> Result<Arc<dyn ValueReader>, BindError> {
        match self {
            Self::Shared(reader) => Ok(reader.clone()),
            Self::Bean { reader, ty } => match reader.upgrade() {
                Some(reader) => Ok(reader),
                None => ctx.cache.reader_for(*ty),
            },
        }
    }

    pub(crate) fn accepts_empty(&self) -> bool {
        match self {
            Self::Shared(reader) => reader.accepts_empty(),
            Self::Bean { .. } => false,
        }
    }

    /// Reads through this edge and records resolution failures in `ctx`.
    pub(crate) fn read_with<'de, D: Deserializer<'de>>(
        &self,
        ctx: &ReadContext<'_>,
        deserializer: D,
    ) -> Result<Option<BoxedValue>, D::Error> {
        let reader = self.get(ctx).map_err(|err| ctx.fail(err))?;
        ReadSeed {
            reader: &*reader,
            ctx,
        }
        .deserialize(deserializer)
    }
}

impl fmt::Debug for ReaderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared(_) => f.write_str("Shared"),
            Self::Bean { ty, .. } => f.debug_tuple("Bean").field(ty).finish(),
        }
    }
}

/// A seed that reads through a [`ReaderRef`].
pub(crate) struct RefSeed<'r, 'c> {
    pub reader: &'r ReaderRef,
    pub ctx: &'r ReadContext<'c>,
}

impl<'de> DeserializeSeed<'de> for RefSeed<'_, '_> {
    type Value = Option<BoxedValue>;

    #[inline]
    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        self.reader.read_with(self.ctx, deserializer)
    }
}
