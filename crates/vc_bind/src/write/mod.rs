//! Writer strategies and the [`WriterCache`].
//!
//! Writers turn a value into serde events. The strategy is picked from the
//! value's runtime type, so a property declared as one bean type but
//! holding another is written with the other's properties.

use alloc::format;
use alloc::sync::Arc;
use core::any::TypeId;
use core::cell::RefCell;
use core::fmt;

use serde_core::ser::{self, Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::info::{EnumInfo, MapInfo, SeqInfo, WrapperInfo};
use crate::simple::{SimpleType, SimpleView};
use crate::{BindConfig, BindError, Bindable, DynamicValue, Features, NullState};

// -----------------------------------------------------------------------------
// Modules

mod bean;
mod cache;

// -----------------------------------------------------------------------------
// Exports

pub use cache::WriterCache;

pub(crate) use bean::BeanWriter;

// -----------------------------------------------------------------------------
// ValueWriter

/// Writes values of one type by emitting a serializable view of them.
///
/// A writer must call [`Emit::emit`] exactly once.
///
/// # Examples
///
/// ```
/// use vc_bind::write::{Emit, ValueWriter, WriteContext};
/// use vc_bind::{BindError, Bindable, Binder};
///
/// struct Upper;
///
/// impl ValueWriter for Upper {
///     fn write(
///         &self,
///         value: &dyn Bindable,
///         _ctx: &WriteContext<'_>,
///         out: &mut dyn Emit,
///     ) -> Result<(), BindError> {
///         let text = value.downcast_ref::<String>().unwrap();
///         out.emit(&text.to_uppercase())
///     }
/// }
///
/// let binder = Binder::new();
/// binder.register_serializer::<String>(Upper);
/// assert_eq!(binder.write_val(&vec![String::from("a")]).unwrap(), r#"["A"]"#);
/// ```
pub trait ValueWriter: Send + Sync + 'static {
    fn write(&self, value: &dyn Bindable, ctx: &WriteContext<'_>, out: &mut dyn Emit) -> Result<(), BindError>;
}

/// The sink a [`ValueWriter`] hands its single value to.
pub trait Emit {
    fn emit(&mut self, view: &dyn erased_serde::Serialize) -> Result<(), BindError>;
}

struct EmitSlot<S: Serializer> {
    serializer: Option<S>,
    result: Option<Result<S::Ok, S::Error>>,
}

impl<S: Serializer> Emit for EmitSlot<S> {
    fn emit(&mut self, view: &dyn erased_serde::Serialize) -> Result<(), BindError> {
        let Some(serializer) = self.serializer.take() else {
            return Err(BindError::Internal("a writer emitted more than one value".into()));
        };
        let result = Serialize::serialize(view, serializer);
        let failed = result.is_err();
        self.result = Some(result);
        match failed {
            true => Err(BindError::Custom("emitted value failed to serialize".into())),
            false => Ok(()),
        }
    }
}

// -----------------------------------------------------------------------------
// WriteContext

/// Per-call state shared by all writers of one `write` call.
///
/// Besides the first [`BindError`] raised through [`fail`](Self::fail), the
/// context remembers the last type it looked up, so runs of same-typed
/// values skip the cache.
pub struct WriteContext<'a> {
    cache: &'a WriterCache,
    config: &'a BindConfig,
    last: RefCell<Option<(TypeId, Writer)>>,
    failure: RefCell<Option<BindError>>,
}

impl<'a> WriteContext<'a> {
    #[inline]
    pub fn new(cache: &'a WriterCache, config: &'a BindConfig) -> Self {
        Self {
            cache,
            config,
            last: RefCell::new(None),
            failure: RefCell::new(None),
        }
    }

    #[inline]
    pub fn cache(&self) -> &'a WriterCache {
        self.cache
    }

    #[inline]
    pub fn config(&self) -> &'a BindConfig {
        self.config
    }

    /// Converts `err` into the format's error type, keeping the first one.
    pub fn fail<E: ser::Error>(&self, err: BindError) -> E {
        let converted = E::custom(&err);
        self.failure.borrow_mut().get_or_insert(err);
        converted
    }

    /// Takes the error recorded by [`fail`](Self::fail), if any.
    #[inline]
    pub fn take_failure(&self) -> Option<BindError> {
        self.failure.borrow_mut().take()
    }

    pub(crate) fn writer_for(&self, value: &dyn Bindable) -> Result<Writer, BindError> {
        let key = value.type_key();
        if let Some((id, writer)) = &*self.last.borrow()
            && *id == key.id()
        {
            return Ok(writer.clone());
        }
        let writer = self.cache.writer(key)?;
        *self.last.borrow_mut() = Some((key.id(), writer.clone()));
        Ok(writer)
    }
}

impl fmt::Debug for WriteContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// ValueProxy

/// Makes any [`Bindable`] serializable through the writer cache.
///
/// Values that are not [`Present`](NullState::Present) serialize as none.
pub struct ValueProxy<'a, 'c> {
    value: &'a dyn Bindable,
    ctx: &'a WriteContext<'c>,
}

impl<'a, 'c> ValueProxy<'a, 'c> {
    #[inline]
    pub fn new(value: &'a dyn Bindable, ctx: &'a WriteContext<'c>) -> Self {
        Self { value, ctx }
    }
}

impl Serialize for ValueProxy<'_, '_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.value.presence() != NullState::Present {
            return serializer.serialize_none();
        }
        let writer = self.ctx.writer_for(self.value).map_err(|err| self.ctx.fail(err))?;
        writer.write(self.value, self.ctx, serializer)
    }
}

// -----------------------------------------------------------------------------
// Writer

#[derive(Clone)]
pub(crate) enum Writer {
    Custom(Arc<dyn ValueWriter>),
    Simple(SimpleType),
    Any,
    Enum(EnumInfo),
    Seq(SeqInfo),
    Map(MapInfo),
    Wrapper(WrapperInfo),
    Bean(Arc<BeanWriter>),
}

impl Writer {
    pub(crate) fn write<S: Serializer>(
        &self,
        value: &dyn Bindable,
        ctx: &WriteContext<'_>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let ty = value.type_key();
        let owner = value.as_any();

        match self {
            Self::Custom(writer) => {
                let mut slot = EmitSlot {
                    serializer: Some(serializer),
                    result: None,
                };
                let outcome = writer.write(value, ctx, &mut slot);
                match (slot.result, outcome) {
                    (Some(Err(err)), _) => Err(err),
                    (_, Err(err)) => Err(ctx.fail(err)),
                    (Some(Ok(ok)), Ok(())) => Ok(ok),
                    (None, Ok(())) => Err(ctx.fail(BindError::Internal(format!(
                        "custom writer for `{}` emitted no value",
                        ty.name()
                    )))),
                }
            }
            Self::Simple(simple) => SimpleView {
                ty: *simple,
                value: owner,
                dates_as_timestamps: ctx.config.has(Features::WRITE_DATES_AS_TIMESTAMPS),
            }
            .serialize(serializer),
            Self::Any => match owner.downcast_ref::<DynamicValue>() {
                Some(dynamic) => dynamic.serialize(serializer),
                None => Err(ctx.fail(BindError::Internal(format!("`{}` is not a DynamicValue", ty.name())))),
            },
            Self::Enum(info) => {
                let Some(index) = info.index_of(owner) else {
                    return Err(ctx.fail(BindError::Internal(format!("no variant index for `{}`", ty.name()))));
                };
                match (ctx.config.has(Features::WRITE_ENUMS_USING_INDEX), info.name_of(index)) {
                    (false, Some(name)) => serializer.serialize_str(name),
                    _ => serializer.serialize_u64(index as u64),
                }
            }
            Self::Seq(info) => {
                let mut seq = serializer.serialize_seq(Some(info.len(owner)))?;
                for item in info.iter(owner) {
                    seq.serialize_element(&ValueProxy::new(item, ctx))?;
                }
                seq.end()
            }
            Self::Map(info) => {
                let mut map = serializer.serialize_map(Some(info.len(owner)))?;
                for (key, item) in info.iter(owner) {
                    map.serialize_entry(key, &ValueProxy::new(item, ctx))?;
                }
                map.end()
            }
            Self::Wrapper(info) => match info.get(owner) {
                Some(inner) => ValueProxy::new(inner, ctx).serialize(serializer),
                None => serializer.serialize_none(),
            },
            Self::Bean(writer) => writer.write(value, ctx, serializer),
        }
    }
}

impl fmt::Debug for Writer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(_) => f.write_str("Custom"),
            Self::Simple(simple) => f.debug_tuple("Simple").field(simple).finish(),
            Self::Any => f.write_str("Any"),
            Self::Enum(info) => f.debug_tuple("Enum").field(info).finish(),
            Self::Seq(info) => f.debug_tuple("Seq").field(info).finish(),
            Self::Map(info) => f.debug_tuple("Map").field(info).finish(),
            Self::Wrapper(info) => f.debug_tuple("Wrapper").field(info).finish(),
            Self::Bean(writer) => f.debug_tuple("Bean").field(&writer.ty()).finish(),
        }
    }
}
