use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;
use std::sync::OnceLock;

use serde_core::Deserializer;
use serde_core::de::{self, DeserializeSeed, IgnoredAny, MapAccess, Visitor};
use vc_utils::hash::HashMap;

use super::{ReadContext, ReaderCache, ReaderRef, RefSeed, ValueReader};
use crate::info::{BeanDescriptor, MapInfo, PropFlags, WrapperInfo, introspect, peel_map};
use crate::{BindError, BoxedValue, Features, TypeKey};

// -----------------------------------------------------------------------------
// BeanReader

/// Reads a bean from an object, a string (string constructor) or, for value
/// types, from the single value property's wire form.
///
/// The reader is published before its table is built so that recursive
/// types can refer to it; [`table`](Self::table) blocks until the build is
/// finished.
pub(crate) struct BeanReader {
    ty: TypeKey,
    table: OnceLock<Result<BeanTable, String>>,
}

impl BeanReader {
    #[inline]
    pub fn placeholder(ty: TypeKey) -> Self {
        Self {
            ty,
            table: OnceLock::new(),
        }
    }

    /// Completes a placeholder. Later calls have no effect.
    pub fn complete(&self, table: Result<BeanTable, String>) {
        if self.table.set(table).is_err() {
            log::warn!("reader for `{}` was completed twice", self.ty.name());
        }
    }

    pub fn table(&self) -> Result<&BeanTable, BindError> {
        match self.table.wait() {
            Ok(table) => Ok(table),
            Err(reason) => Err(BindError::introspect(self.ty.name(), reason)),
        }
    }
}

impl ValueReader for BeanReader {
    fn read<'de>(
        &self,
        ctx: &ReadContext<'_>,
        de: &mut dyn erased_serde::Deserializer<'de>,
    ) -> Result<Option<BoxedValue>, erased_serde::Error> {
        let table = self.table().map_err(|err| ctx.fail::<erased_serde::Error>(err))?;

        if let Some(index) = table.value {
            let value = table.props[index].read_with(ctx, de)?;
            return value
                .map(|value| table.desc.construct_from_value(value))
                .transpose()
                .map_err(|err| ctx.fail(err));
        }

        de.deserialize_any(BeanVisitor { table, ctx })
    }
}

impl fmt::Debug for BeanReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanReader")
            .field("ty", &self.ty)
            .field("ready", &self.table.get().is_some())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// BeanTable

/// Where a wire key leads.
enum Slot {
    Prop(usize),
    Branch(HashMap<Box<str>, Slot>),
    Ignore,
}

struct UnwrapSink {
    prop: usize,
    wrappers: Vec<WrapperInfo>,
    map: MapInfo,
    value: ReaderRef,
}

/// The resolved read plan of one bean type.
pub(crate) struct BeanTable {
    desc: BeanDescriptor,
    props: Box<[ReaderRef]>,
    lookup: HashMap<Box<str>, Slot>,
    unwrapped: Option<UnwrapSink>,
    value: Option<usize>,
}

impl BeanTable {
    /// Introspects `ty` and resolves the reader of every property.
    pub fn build(ty: TypeKey, cache: &ReaderCache) -> Result<Self, BindError> {
        let desc = introspect(ty)?;
        let value = desc.value_prop;

        let mut props = Vec::with_capacity(desc.props().len());
        let mut lookup: HashMap<Box<str>, Slot> = HashMap::default();
        let mut unwrapped = None;

        for (index, prop) in desc.props().iter().enumerate() {
            props.push(cache.resolve(prop.ty())?);
            if value.is_some() {
                continue;
            }

            if prop.flags().contains(PropFlags::UNWRAPPED) {
                let Some((wrappers, map)) = peel_map(prop.ty()) else {
                    return Err(BindError::introspect(ty.name(), "unwrapped property is not a map"));
                };
                if unwrapped.is_some() {
                    log::warn!("`{}` has several unwrapped properties, `{}` wins", ty.name(), prop.name());
                }
                unwrapped = Some(UnwrapSink {
                    prop: index,
                    wrappers,
                    value: cache.resolve(map.value())?,
                    map,
                });
                continue;
            }

            let slot = match prop.is_settable() {
                true => Slot::Prop(index),
                false => Slot::Ignore,
            };
            match prop.flatten_path() {
                Some(path) => insert_path(&mut lookup, path, slot, ty),
                None => insert_key(&mut lookup, prop.wire_name(), slot, ty),
            }
        }

        if let Some(tag) = desc.discriminator() {
            lookup.entry(Box::from(tag.wire_name())).or_insert(Slot::Ignore);
        }

        Ok(Self {
            desc,
            props: props.into_boxed_slice(),
            lookup,
            unwrapped,
            value,
        })
    }

    fn assign(&self, index: usize, target: &mut dyn Any, value: BoxedValue) -> Result<(), BindError> {
        let prop = &self.desc.props()[index];
        prop.set(target, value).map_err(|source| BindError::Assign {
            property: prop.name(),
            owner: self.desc.ty().name(),
            source: Box::new(source),
        })
    }
}

fn insert_key(lookup: &mut HashMap<Box<str>, Slot>, key: &str, slot: Slot, ty: TypeKey) {
    if lookup.contains_key(key) {
        log::warn!("`{}` maps wire key `{key}` twice, keeping the first", ty.name());
        return;
    }
    lookup.insert(Box::from(key), slot);
}

fn insert_path(lookup: &mut HashMap<Box<str>, Slot>, path: &[String], slot: Slot, ty: TypeKey) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut level = lookup;
    for segment in parents {
        let next = level
            .entry(Box::from(segment.as_str()))
            .or_insert_with(|| Slot::Branch(HashMap::default()));
        match next {
            Slot::Branch(children) => level = children,
            _ => {
                log::warn!("`{}`: flattened path `{}` collides with a property", ty.name(), path.join("."));
                return;
            }
        }
    }
    insert_key(level, last, slot, ty);
}

// -----------------------------------------------------------------------------
// Visitors

struct BeanVisitor<'a, 'c> {
    table: &'a BeanTable,
    ctx: &'a ReadContext<'c>,
}

impl<'de> Visitor<'de> for BeanVisitor<'_, '_> {
    type Value = Option<BoxedValue>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "an object for `{}`", self.table.desc.ty().name())
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

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        self.table
            .desc
            .construct_from_str(v)
            .map(Some)
            .map_err(|err| self.ctx.fail(err))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let (table, ctx) = (self.table, self.ctx);
        let mut target = table.desc.construct().map_err(|err| ctx.fail(err))?;
        let mut extra: Option<BoxedValue> = None;

        while let Some(key) = map.next_key::<String>()? {
            match table.lookup.get(key.as_str()) {
                Some(Slot::Prop(index)) => {
                    let value = map.next_value_seed(RefSeed {
                        reader: &table.props[*index],
                        ctx,
                    })?;
                    if let Some(value) = value {
                        table
                            .assign(*index, &mut *target, value)
                            .map_err(|err| ctx.fail(err))?;
                    }
                }
                Some(Slot::Branch(children)) => map.next_value_seed(BranchSeed {
                    table,
                    children,
                    target: &mut *target,
                    ctx,
                })?,
                Some(Slot::Ignore) => {
                    map.next_value::<IgnoredAny>()?;
                }
                None => match &table.unwrapped {
                    Some(sink) => {
                        let value = map.next_value_seed(RefSeed {
                            reader: &sink.value,
                            ctx,
                        })?;
                        if let Some(value) = value {
                            let bag = extra.get_or_insert_with(|| sink.map.new_map(0));
                            sink.map
                                .insert(&mut **bag, key, value)
                                .map_err(|err| ctx.fail(err))?;
                        }
                    }
                    None if ctx.config().has(Features::FAIL_ON_UNKNOWN_PROPERTIES) => {
                        return Err(ctx.fail(BindError::UnknownProperty {
                            name: key,
                            ty: table.desc.ty().name(),
                        }));
                    }
                    None => {
                        log::trace!("skipping unknown property `{key}` of `{}`", table.desc.ty().name());
                        map.next_value::<IgnoredAny>()?;
                    }
                },
            }
        }

        if let (Some(sink), Some(bag)) = (&table.unwrapped, extra) {
            let mut value = bag;
            for wrapper in sink.wrappers.iter().rev() {
                value = wrapper.wrap(value).map_err(|err| ctx.fail(err))?;
            }
            table
                .assign(sink.prop, &mut *target, value)
                .map_err(|err| ctx.fail(err))?;
        }

        Ok(Some(target))
    }
}

/// Reads a nested object whose keys belong to flattened properties.
struct BranchSeed<'a, 'c> {
    table: &'a BeanTable,
    children: &'a HashMap<Box<str>, Slot>,
    target: &'a mut dyn Any,
    ctx: &'a ReadContext<'c>,
}

impl<'de> DeserializeSeed<'de> for BranchSeed<'_, '_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for BranchSeed<'_, '_> {
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a nested object of flattened properties")
    }

    fn visit_unit<E: de::Error>(self) -> Result<(), E> {
        Ok(())
    }

    fn visit_none<E: de::Error>(self) -> Result<(), E> {
        Ok(())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        let (table, ctx) = (self.table, self.ctx);
        while let Some(key) = map.next_key::<String>()? {
            match self.children.get(key.as_str()) {
                Some(Slot::Prop(index)) => {
                    let value = map.next_value_seed(RefSeed {
                        reader: &table.props[*index],
                        ctx,
                    })?;
                    if let Some(value) = value {
                        table
                            .assign(*index, &mut *self.target, value)
                            .map_err(|err| ctx.fail(err))?;
                    }
                }
                Some(Slot::Branch(children)) => map.next_value_seed(BranchSeed {
                    table,
                    children,
                    target: &mut *self.target,
                    ctx,
                })?,
                Some(Slot::Ignore) | None => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(())
    }
}
