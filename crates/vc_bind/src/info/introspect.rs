use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;

use indexmap::IndexMap;
use vc_utils::hash::HashSet;

use crate::info::{Accessor, AccessorKind, BeanDescriptor, BeanInfo, Getter, Prop, PropFlags, Setter};
use crate::info::{MapInfo, RawBaseGetter, RawBaseGetterMut, RawGetter, RawSetter, Shape, WrapperInfo};
use crate::{BindError, Bindable, BoxedValue, TypeKey};

type Lens = Arc<dyn for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync>;
type LensMut = Arc<dyn for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync>;

struct Level {
    info: BeanInfo,
    lens: Option<(Lens, LensMut)>,
}

/// Normalizes the bean shape of `key` into a [`BeanDescriptor`].
///
/// The base chain is walked from the most-base type down, so a property of
/// a derived type replaces an inherited property with the same wire name
/// (keeping the inherited position). Within one type a repeated wire name
/// also resolves to the last declaration, with a warning. The derive macro
/// rejects that case at compile time.
///
/// A discriminator comes from the most-derived type that declares one. A
/// single property marked [`VALUE`](PropFlags::VALUE) makes the type a
/// value type with an empty wire name.
///
/// Nothing is cached here; the reader and writer caches own the results.
pub fn introspect(key: TypeKey) -> Result<BeanDescriptor, BindError> {
    let root = match key.shape() {
        Shape::Bean(info) => info,
        other => {
            return Err(BindError::introspect(
                key.name(),
                format_args!("expected a bean, found {}", other.describe()),
            ));
        }
    };

    let default_ctor = root.default_ctor();
    let string_ctor = root.string_ctor();
    let value_ctor = root.value_ctor();
    let flatten_all = root.is_flatten();

    let levels = base_chain(key, root)?;

    let mut props: IndexMap<&'static str, Prop> = IndexMap::new();
    for level in levels.iter().rev() {
        let owner = level.info.ty().name();
        let flatten_level = flatten_all || level.info.is_flatten();
        let mut declared: HashSet<&'static str> = HashSet::default();

        for info in level.info.props() {
            let wire = info.wire_name();
            let Some((kind, raw)) = info.getter() else {
                return Err(BindError::introspect(
                    owner,
                    format_args!("property `{}` has no accessor", info.name()),
                ));
            };
            let get = through(level.lens.as_ref(), raw);
            let accessor = match kind {
                AccessorKind::Field => Accessor::Field(get),
                AccessorKind::Method => Accessor::Method(get),
            };

            let mut flags = info.flags();
            let setter = match flags.contains(PropFlags::READ_ONLY) {
                true => None,
                false => info.setter().map(|raw| through_mut(level.lens.as_ref(), raw)),
            };
            let path = match flatten_level || flags.contains(PropFlags::FLATTEN) {
                true => split_wire_path(wire),
                false => None,
            };
            flags.set(PropFlags::FLATTEN, path.is_some());
            if flags.contains(PropFlags::UNWRAPPED) && peel_map(info.ty()).is_none() {
                return Err(BindError::introspect(
                    owner,
                    format_args!("unwrapped property `{}` is not a string-keyed map", info.name()),
                ));
            }

            if !declared.insert(wire) {
                log::warn!("`{owner}` declares wire name `{wire}` twice, the last declaration wins");
            } else if props.contains_key(wire) {
                log::debug!("`{owner}` overrides inherited property `{wire}`");
            }
            props.insert(
                wire,
                Prop {
                    name: info.name(),
                    wire_name: wire,
                    accessor,
                    setter,
                    ty: info.ty(),
                    flags,
                    path,
                },
            );
        }
    }

    let discriminator = levels
        .iter()
        .find_map(|level| level.info.discriminator())
        .map(|(wire, value)| {
            if props.shift_remove(wire).is_some() {
                log::debug!("discriminator `{wire}` of `{}` hides a property", key.name());
            }
            Prop {
                name: wire,
                wire_name: wire,
                accessor: Accessor::Constant(value),
                setter: None,
                ty: TypeKey::of::<String>(),
                flags: PropFlags::DISCRIMINATOR,
                path: None,
            }
        });

    let mut props: Vec<Prop> = props.into_values().collect();
    let value_prop = match props.iter().position(|prop| prop.flags.contains(PropFlags::VALUE)) {
        Some(index) if props.len() == 1 => {
            let prop = &mut props[index];
            prop.wire_name = "";
            prop.path = None;
            prop.flags.remove(PropFlags::FLATTEN | PropFlags::UNWRAPPED);
            Some(index)
        }
        Some(index) => {
            log::warn!(
                "`{}` marks `{}` as its value but has other properties, the marker is ignored",
                key.name(),
                props[index].name
            );
            props[index].flags.remove(PropFlags::VALUE);
            None
        }
        None => None,
    };

    Ok(BeanDescriptor {
        ty: key,
        props: props.into_boxed_slice(),
        discriminator,
        value_prop,
        default_ctor,
        string_ctor,
        value_ctor,
    })
}

/// The type itself followed by its bases, most-derived first.
fn base_chain(key: TypeKey, root: BeanInfo) -> Result<Vec<Level>, BindError> {
    let mut seen = Vec::from([key.id()]);
    let mut levels = Vec::from([Level { info: root, lens: None }]);

    while let Some(base) = levels.last().and_then(|level| level.info.base().copied()) {
        let base_ty = base.ty();
        if seen.contains(&base_ty.id()) {
            return Err(BindError::introspect(
                key.name(),
                format_args!("base `{}` appears twice in the base chain", base_ty.name()),
            ));
        }
        seen.push(base_ty.id());

        let info = match base_ty.shape() {
            Shape::Bean(info) => info,
            other => {
                return Err(BindError::introspect(
                    key.name(),
                    format_args!("base `{}` is {}, not a bean", base_ty.name(), other.describe()),
                ));
            }
        };
        let parent = levels.last().and_then(|level| level.lens.clone());
        let lens = extend(parent, base.getter(), base.getter_mut());
        levels.push(Level {
            info,
            lens: Some(lens),
        });
    }

    Ok(levels)
}

/// Splits a wire name on unescaped dots; `\.` stands for a literal dot.
///
/// Returns `None` for names with neither separators nor escapes. Empty
/// segments from malformed names are kept.
///
/// ```
/// use vc_bind::info::split_wire_path;
///
/// let path = split_wire_path(r"properties.odata\.type").unwrap();
/// assert_eq!(&*path, ["properties", "odata.type"]);
/// assert!(split_wire_path("plain").is_none());
/// ```
pub fn split_wire_path(name: &str) -> Option<Box<[String]>> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut special = false;
    let mut chars = name.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'.') => {
                chars.next();
                current.push('.');
                special = true;
            }
            '.' => {
                segments.push(core::mem::take(&mut current));
                special = true;
            }
            _ => current.push(c),
        }
    }
    segments.push(current);

    special.then(|| segments.into_boxed_slice())
}

/// Wrappers around a string-keyed map, outermost first, and the map itself.
pub(crate) fn peel_map(ty: TypeKey) -> Option<(Vec<WrapperInfo>, MapInfo)> {
    let mut wrappers = Vec::new();
    let mut shape = ty.shape();
    loop {
        match shape {
            Shape::Map(map) => return Some((wrappers, map)),
            Shape::Wrapper(wrapper) => {
                shape = wrapper.inner().shape();
                wrappers.push(wrapper);
            }
            _ => return None,
        }
    }
}

// -----------------------------------------------------------------------------
// Accessor composition

fn lens<F>(f: F) -> Lens
where
    F: for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn lens_mut<F>(f: F) -> LensMut
where
    F: for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn getter<F>(f: F) -> Getter
where
    F: for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Bindable> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn setter<F>(f: F) -> Setter
where
    F: Fn(&mut dyn Any, BoxedValue) -> Result<(), BindError> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn extend(parent: Option<(Lens, LensMut)>, step: RawBaseGetter, step_mut: RawBaseGetterMut) -> (Lens, LensMut) {
    match parent {
        None => (lens(step), lens_mut(step_mut)),
        Some((up, up_mut)) => (
            lens(move |owner| up(owner).and_then(step)),
            lens_mut(move |owner| up_mut(owner).and_then(step_mut)),
        ),
    }
}

fn through(lens: Option<&(Lens, LensMut)>, raw: RawGetter) -> Getter {
    match lens {
        None => getter(raw),
        Some((up, _)) => {
            let up = up.clone();
            getter(move |owner| up(owner).and_then(raw))
        }
    }
}

fn through_mut(lens: Option<&(Lens, LensMut)>, raw: RawSetter) -> Setter {
    match lens {
        None => setter(raw),
        Some((_, up)) => {
            let up = up.clone();
            setter(move |owner, value| match up(owner) {
                Some(base) => raw(base, value),
                None => Err(BindError::Internal(String::from("base part is unavailable"))),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::introspect;
    use crate::info::{Accessor, PropFlags};
    use crate::{Bind, BindError, TypeKey};

    #[derive(Bind, Default)]
    #[bind(default, discriminator = "kind", discriminator_value = "animal")]
    struct Animal {
        name: String,
        #[bind(rename = "legs")]
        leg_count: u8,
    }

    #[derive(Bind, Default)]
    #[bind(default, discriminator = "kind", discriminator_value = "dog")]
    struct Dog {
        #[bind(base)]
        animal: Animal,
        good: bool,
        #[bind(rename = "legs")]
        legs: i32,
    }

    #[derive(Bind, Default)]
    #[bind(default, flatten)]
    struct Flat {
        #[bind(rename = "properties.a")]
        a: i32,
        #[bind(rename = r"odata\.id")]
        id: String,
        plain: bool,
    }

    #[derive(Bind)]
    struct Id(String);

    #[derive(Bind, Default)]
    struct Bag {
        #[bind(unwrapped)]
        extra: Option<HashMap<String, i32>>,
    }

    #[derive(Bind, Default)]
    struct NotAMap {
        #[bind(unwrapped)]
        extra: i32,
    }

    #[test]
    fn base_properties_come_first_and_can_be_overridden() {
        let desc = introspect(TypeKey::of::<Dog>()).unwrap();
        let names: Vec<_> = desc.props().iter().map(|prop| prop.wire_name()).collect();
        assert_eq!(names, ["name", "legs", "good"]);
        assert_eq!(desc.prop("legs").unwrap().ty(), TypeKey::of::<i32>());

        let dog = Dog {
            animal: Animal {
                name: "Rex".into(),
                leg_count: 3,
            },
            good: true,
            legs: 4,
        };
        let name = desc.prop("name").unwrap().get(&dog).unwrap();
        assert_eq!(name.downcast_ref::<String>().unwrap(), "Rex");
    }

    #[test]
    fn inherited_setters_reach_the_base_part() {
        let desc = introspect(TypeKey::of::<Dog>()).unwrap();
        let mut target = desc.construct().unwrap();
        desc.prop("name")
            .unwrap()
            .set(&mut *target, Box::new(String::from("Fido")))
            .unwrap();
        let dog = target.downcast::<Dog>().unwrap();
        assert_eq!(dog.animal.name, "Fido");
    }

    #[test]
    fn most_derived_discriminator_wins() {
        let desc = introspect(TypeKey::of::<Dog>()).unwrap();
        let tag = desc.discriminator().unwrap();
        assert_eq!(tag.wire_name(), "kind");
        assert!(matches!(tag.accessor(), Accessor::Constant("dog")));
        assert!(tag.flags().contains(PropFlags::DISCRIMINATOR));
    }

    #[test]
    fn flatten_paths_are_split_and_unescaped() {
        let desc = introspect(TypeKey::of::<Flat>()).unwrap();
        let a = desc.prop("properties.a").unwrap();
        assert!(a.flags().contains(PropFlags::FLATTEN));
        assert_eq!(a.flatten_path().unwrap(), ["properties", "a"]);

        let id = desc.prop(r"odata\.id").unwrap();
        assert_eq!(id.flatten_path().unwrap(), ["odata.id"]);

        let plain = desc.prop("plain").unwrap();
        assert!(plain.flatten_path().is_none());
        assert!(!plain.flags().contains(PropFlags::FLATTEN));
    }

    #[test]
    fn newtype_is_a_value_type() {
        let desc = introspect(TypeKey::of::<Id>()).unwrap();
        let value = desc.value_prop().unwrap();
        assert_eq!(value.wire_name(), "");
        let built = desc.construct_from_value(Box::new(String::from("abc"))).unwrap();
        assert_eq!(built.downcast::<Id>().unwrap().0, "abc");
    }

    #[test]
    fn unwrapped_must_be_a_map() {
        let desc = introspect(TypeKey::of::<Bag>()).unwrap();
        assert!(desc.prop("extra").unwrap().flags().contains(PropFlags::UNWRAPPED));

        let err = introspect(TypeKey::of::<NotAMap>()).unwrap_err();
        assert!(matches!(err, BindError::Introspect { .. }), "{err}");
    }

    #[test]
    fn non_beans_are_rejected() {
        let err = introspect(TypeKey::of::<u32>()).unwrap_err();
        assert!(err.to_string().contains("expected a bean"), "{err}");
    }
}
