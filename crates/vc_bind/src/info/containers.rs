use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use crate::info::{target_mut, unbox};
use crate::{Bind, BindError, Bindable, BoxedValue, TypeKey};

/// Borrowed elements of a sequence.
pub type SeqIter<'a> = Box<dyn Iterator<Item = &'a dyn Bindable> + 'a>;

/// Borrowed entries of a string-keyed map.
pub type MapIter<'a> = Box<dyn Iterator<Item = (&'a str, &'a dyn Bindable)> + 'a>;

// -----------------------------------------------------------------------------
// Sequences

/// The container family a sequence belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeqKind {
    /// Insertion-ordered, e.g. `Vec`.
    List,
    Deque,
    /// Hash-based set.
    Set,
    /// Ordered tree set.
    SortedSet,
    /// A `Box<[T]>`.
    Array,
    /// A `[T; N]`.
    FixedArray(usize),
}

/// A growable collection of one bindable element type.
///
/// Implemented for the standard collections. Implement it for a custom
/// collection and return [`SeqInfo::collect`] from its [`Bind::shape`].
pub trait Collect: Bind {
    type Item: Bind;

    const KIND: SeqKind;

    /// Creates an empty collection; `len` is a size hint.
    fn with_len(len: usize) -> Self;

    fn push_item(&mut self, item: Self::Item);

    fn item_len(&self) -> usize;

    fn items(&self) -> SeqIter<'_>;
}

/// Builds and walks sequences of one element type.
#[derive(Clone, Copy)]
pub struct SeqInfo {
    kind: SeqKind,
    item: TypeKey,
    new: fn(usize) -> BoxedValue,
    push: fn(&mut dyn Any, BoxedValue) -> Result<(), BindError>,
    finish: fn(BoxedValue) -> Result<BoxedValue, BindError>,
    len: fn(&dyn Any) -> usize,
    iter: for<'a> fn(&'a dyn Any) -> SeqIter<'a>,
}

impl SeqInfo {
    /// Describes a [`Collect`] implementation.
    pub fn collect<C: Collect>() -> Self {
        Self {
            kind: C::KIND,
            item: TypeKey::of::<C::Item>(),
            new: collect_new::<C>,
            push: collect_push::<C>,
            finish: Ok,
            len: collect_len::<C>,
            iter: collect_iter::<C>,
        }
    }

    /// Describes a slice-like `A` built from a `Vec<T>`.
    pub fn array<A, T>(kind: SeqKind) -> Self
    where
        A: Bind + AsRef<[T]> + TryFrom<Vec<T>>,
        T: Bind,
    {
        Self {
            kind,
            item: TypeKey::of::<T>(),
            new: collect_new::<Vec<T>>,
            push: collect_push::<Vec<T>>,
            finish: array_finish::<A, T>,
            len: array_len::<A, T>,
            iter: array_iter::<A, T>,
        }
    }

    #[inline]
    pub const fn kind(&self) -> SeqKind {
        self.kind
    }

    #[inline]
    pub const fn item(&self) -> TypeKey {
        self.item
    }

    /// Starts a new buffer, to be filled with [`push`](Self::push).
    #[inline]
    pub fn new_buffer(&self, len_hint: usize) -> BoxedValue {
        (self.new)(len_hint)
    }

    #[inline]
    pub fn push(&self, buffer: &mut dyn Any, item: BoxedValue) -> Result<(), BindError> {
        (self.push)(buffer, item)
    }

    /// Turns a filled buffer into the final value.
    #[inline]
    pub fn finish(&self, buffer: BoxedValue) -> Result<BoxedValue, BindError> {
        (self.finish)(buffer)
    }

    #[inline]
    pub fn len(&self, value: &dyn Any) -> usize {
        (self.len)(value)
    }

    #[inline]
    pub fn iter<'a>(&self, value: &'a dyn Any) -> SeqIter<'a> {
        (self.iter)(value)
    }
}

impl fmt::Debug for SeqInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeqInfo")
            .field("kind", &self.kind)
            .field("item", &self.item)
            .finish()
    }
}

fn collect_new<C: Collect>(len: usize) -> BoxedValue {
    Box::new(C::with_len(len))
}

fn collect_push<C: Collect>(buffer: &mut dyn Any, item: BoxedValue) -> Result<(), BindError> {
    target_mut::<C>(buffer)?.push_item(unbox(item)?);
    Ok(())
}

fn collect_len<C: Collect>(value: &dyn Any) -> usize {
    value.downcast_ref::<C>().map_or(0, C::item_len)
}

fn collect_iter<C: Collect>(value: &dyn Any) -> SeqIter<'_> {
    match value.downcast_ref::<C>() {
        Some(collection) => collection.items(),
        None => Box::new(core::iter::empty()),
    }
}

fn array_finish<A, T>(buffer: BoxedValue) -> Result<BoxedValue, BindError>
where
    A: Bind + AsRef<[T]> + TryFrom<Vec<T>>,
    T: Bind,
{
    let items: Vec<T> = unbox(buffer)?;
    let len = items.len();
    match A::try_from(items) {
        Ok(array) => Ok(Box::new(array)),
        Err(_) => Err(BindError::mismatch(
            A::type_name(),
            "an array of matching length",
            format_args!("{len} elements"),
        )),
    }
}

fn array_len<A: Bind + AsRef<[T]>, T: Bind>(value: &dyn Any) -> usize {
    value.downcast_ref::<A>().map_or(0, |array| array.as_ref().len())
}

fn array_iter<A: Bind + AsRef<[T]>, T: Bind>(value: &dyn Any) -> SeqIter<'_> {
    match value.downcast_ref::<A>() {
        Some(array) => Box::new(array.as_ref().iter().map(|item| item as &dyn Bindable)),
        None => Box::new(core::iter::empty()),
    }
}

// -----------------------------------------------------------------------------
// Maps

/// A map from `String` keys to one bindable value type.
pub trait StringMap: Bind {
    type Value: Bind;

    fn with_len(len: usize) -> Self;

    fn put(&mut self, key: String, value: Self::Value);

    fn entry_len(&self) -> usize;

    fn entries(&self) -> MapIter<'_>;
}

/// Builds and walks string-keyed maps.
#[derive(Clone, Copy)]
pub struct MapInfo {
    value: TypeKey,
    new: fn(usize) -> BoxedValue,
    insert: fn(&mut dyn Any, String, BoxedValue) -> Result<(), BindError>,
    len: fn(&dyn Any) -> usize,
    iter: for<'a> fn(&'a dyn Any) -> MapIter<'a>,
}

impl MapInfo {
    pub fn of<M: StringMap>() -> Self {
        Self {
            value: TypeKey::of::<M::Value>(),
            new: map_new::<M>,
            insert: map_insert::<M>,
            len: map_len::<M>,
            iter: map_iter::<M>,
        }
    }

    #[inline]
    pub const fn value(&self) -> TypeKey {
        self.value
    }

    #[inline]
    pub fn new_map(&self, len_hint: usize) -> BoxedValue {
        (self.new)(len_hint)
    }

    #[inline]
    pub fn insert(&self, map: &mut dyn Any, key: String, value: BoxedValue) -> Result<(), BindError> {
        (self.insert)(map, key, value)
    }

    #[inline]
    pub fn len(&self, map: &dyn Any) -> usize {
        (self.len)(map)
    }

    #[inline]
    pub fn iter<'a>(&self, map: &'a dyn Any) -> MapIter<'a> {
        (self.iter)(map)
    }
}

impl fmt::Debug for MapInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapInfo").field("value", &self.value).finish()
    }
}

fn map_new<M: StringMap>(len: usize) -> BoxedValue {
    Box::new(M::with_len(len))
}

fn map_insert<M: StringMap>(map: &mut dyn Any, key: String, value: BoxedValue) -> Result<(), BindError> {
    target_mut::<M>(map)?.put(key, unbox(value)?);
    Ok(())
}

fn map_len<M: StringMap>(map: &dyn Any) -> usize {
    map.downcast_ref::<M>().map_or(0, M::entry_len)
}

fn map_iter<M: StringMap>(map: &dyn Any) -> MapIter<'_> {
    match map.downcast_ref::<M>() {
        Some(map) => map.entries(),
        None => Box::new(core::iter::empty()),
    }
}

// -----------------------------------------------------------------------------
// Wrappers

/// A type holding zero or one value of another bindable type.
pub trait Wrap: Bind {
    type Inner: Bind;

    /// Whether an empty document reads as "no value" instead of an error.
    const ACCEPTS_EMPTY: bool = false;

    fn wrap(inner: Self::Inner) -> Self;

    fn inner(&self) -> Option<&Self::Inner>;

    /// The value a wire `null` reads as, or `None` to leave the target untouched.
    #[inline]
    fn null() -> Option<Self> {
        None
    }
}

/// Reads through and writes through a [`Wrap`] type.
#[derive(Clone, Copy)]
pub struct WrapperInfo {
    inner: TypeKey,
    accepts_empty: bool,
    wrap: fn(BoxedValue) -> Result<BoxedValue, BindError>,
    get: for<'a> fn(&'a dyn Any) -> Option<&'a dyn Bindable>,
    null: fn() -> Option<BoxedValue>,
}

impl WrapperInfo {
    pub fn of<W: Wrap>() -> Self {
        Self {
            inner: TypeKey::of::<W::Inner>(),
            accepts_empty: W::ACCEPTS_EMPTY,
            wrap: wrapper_wrap::<W>,
            get: wrapper_get::<W>,
            null: wrapper_null::<W>,
        }
    }

    #[inline]
    pub const fn inner(&self) -> TypeKey {
        self.inner
    }

    #[inline]
    pub const fn accepts_empty(&self) -> bool {
        self.accepts_empty
    }

    #[inline]
    pub fn wrap(&self, inner: BoxedValue) -> Result<BoxedValue, BindError> {
        (self.wrap)(inner)
    }

    /// The wrapped value, if any.
    #[inline]
    pub fn get<'a>(&self, value: &'a dyn Any) -> Option<&'a dyn Bindable> {
        (self.get)(value)
    }

    #[inline]
    pub fn null(&self) -> Option<BoxedValue> {
        (self.null)()
    }
}

impl fmt::Debug for WrapperInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapperInfo").field("inner", &self.inner).finish()
    }
}

fn wrapper_wrap<W: Wrap>(inner: BoxedValue) -> Result<BoxedValue, BindError> {
    Ok(Box::new(W::wrap(unbox(inner)?)))
}

fn wrapper_get<W: Wrap>(value: &dyn Any) -> Option<&dyn Bindable> {
    value
        .downcast_ref::<W>()
        .and_then(W::inner)
        .map(|inner| inner as &dyn Bindable)
}

fn wrapper_null<W: Wrap>() -> Option<BoxedValue> {
    W::null().map(|value| Box::new(value) as BoxedValue)
}
