use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet, VecDeque};
use alloc::string::String;
use alloc::vec::Vec;
use core::hash::{BuildHasher, Hash};
use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::info::{Collect, MapInfo, MapIter, SeqInfo, SeqIter, SeqKind, Shape, StringMap, Wrap, WrapperInfo};
use crate::{Bind, Bindable, NullState};

// -----------------------------------------------------------------------------
// Sequences

macro_rules! impl_collect {
    ($kind:expr, $ty:ident<T $(, $hasher:ident)?> where [$($bound:tt)*], $push:ident) => {
        impl<T: Bind $($bound)* $(, $hasher: BuildHasher + Default + Send + Sync + 'static)?> Bind for $ty<T $(, $hasher)?> {
            #[inline]
            fn shape() -> Shape {
                Shape::Collection(SeqInfo::collect::<Self>())
            }
        }

        impl<T: Bind $($bound)* $(, $hasher: BuildHasher + Default + Send + Sync + 'static)?> Collect for $ty<T $(, $hasher)?> {
            type Item = T;

            const KIND: SeqKind = $kind;

            fn with_len(_len: usize) -> Self {
                Self::default()
            }

            fn push_item(&mut self, item: T) {
                self.$push(item);
            }

            fn item_len(&self) -> usize {
                self.len()
            }

            fn items(&self) -> SeqIter<'_> {
                Box::new(self.iter().map(|item| item as &dyn Bindable))
            }
        }
    };
}

impl_collect!(SeqKind::List, Vec<T> where [], push);
impl_collect!(SeqKind::Deque, VecDeque<T> where [], push_back);
impl_collect!(SeqKind::Set, HashSet<T, S> where [+ Eq + Hash], insert);
impl_collect!(SeqKind::SortedSet, BTreeSet<T> where [+ Ord], insert);

impl<T: Bind, const N: usize> Bind for [T; N] {
    #[inline]
    fn shape() -> Shape {
        Shape::Array(SeqInfo::array::<Self, T>(SeqKind::FixedArray(N)))
    }
}

impl<T: Bind> Bind for Box<[T]> {
    #[inline]
    fn shape() -> Shape {
        Shape::Array(SeqInfo::array::<Self, T>(SeqKind::Array))
    }
}

// -----------------------------------------------------------------------------
// Maps

macro_rules! impl_string_map {
    ($ty:ident<V $(, $hasher:ident)?>, $with_len:expr) => {
        impl<V: Bind $(, $hasher: BuildHasher + Default + Send + Sync + 'static)?> Bind for $ty<String, V $(, $hasher)?> {
            #[inline]
            fn shape() -> Shape {
                Shape::Map(MapInfo::of::<Self>())
            }
        }

        impl<V: Bind $(, $hasher: BuildHasher + Default + Send + Sync + 'static)?> StringMap for $ty<String, V $(, $hasher)?> {
            type Value = V;

            fn with_len(len: usize) -> Self {
                let with_len: fn(usize) -> Self = $with_len;
                with_len(len)
            }

            fn put(&mut self, key: String, value: V) {
                self.insert(key, value);
            }

            fn entry_len(&self) -> usize {
                self.len()
            }

            fn entries(&self) -> MapIter<'_> {
                Box::new(self.iter().map(|(key, value)| (key.as_str(), value as &dyn Bindable)))
            }
        }
    };
}

impl_string_map!(HashMap<V, S>, |len| HashMap::with_capacity_and_hasher(len, S::default()));
impl_string_map!(BTreeMap<V>, |_| BTreeMap::new());
impl_string_map!(IndexMap<V, S>, |len| IndexMap::with_capacity_and_hasher(len, S::default()));

// -----------------------------------------------------------------------------
// Wrappers

impl<T: Bind> Bind for Option<T> {
    #[inline]
    fn shape() -> Shape {
        Shape::Wrapper(WrapperInfo::of::<Self>())
    }

    #[inline]
    fn null_state(&self) -> NullState {
        match self {
            Some(_) => NullState::Present,
            None => NullState::Null,
        }
    }
}

impl<T: Bind> Wrap for Option<T> {
    type Inner = T;

    fn wrap(inner: T) -> Self {
        Some(inner)
    }

    fn inner(&self) -> Option<&T> {
        self.as_ref()
    }

    fn null() -> Option<Self> {
        Some(None)
    }
}

impl<T: Bind> Bind for Box<T> {
    #[inline]
    fn shape() -> Shape {
        Shape::Wrapper(WrapperInfo::of::<Self>())
    }

    #[inline]
    fn null_state(&self) -> NullState {
        (**self).null_state()
    }
}

impl<T: Bind> Wrap for Box<T> {
    type Inner = T;

    fn wrap(inner: T) -> Self {
        Box::new(inner)
    }

    fn inner(&self) -> Option<&T> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};

    use crate::info::{SeqKind, Shape};
    use crate::{Bind, Bindable, NullState};

    #[test]
    fn sequence_shapes() {
        let Shape::Collection(seq) = <HashSet<u8>>::shape() else {
            panic!("expected a collection");
        };
        assert_eq!(seq.kind(), SeqKind::Set);

        let Shape::Array(seq) = <[u16; 3]>::shape() else {
            panic!("expected an array");
        };
        assert_eq!(seq.kind(), SeqKind::FixedArray(3));

        let mut buffer = seq.new_buffer(3);
        for item in [1u16, 2] {
            seq.push(&mut *buffer, Box::new(item)).unwrap();
        }
        assert!(seq.finish(buffer).is_err());
    }

    #[test]
    fn map_entries_are_visible_through_the_info() {
        let Shape::Map(map) = <BTreeMap<String, i32>>::shape() else {
            panic!("expected a map");
        };
        let mut value = map.new_map(0);
        map.insert(&mut *value, "b".into(), Box::new(2)).unwrap();
        map.insert(&mut *value, "a".into(), Box::new(1)).unwrap();
        let keys: Vec<_> = map.iter(&*value).map(|(key, _)| key).collect();
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn option_presence() {
        assert_eq!(Some(1).presence(), NullState::Present);
        assert_eq!(None::<i32>.presence(), NullState::Null);
        assert_eq!(Box::new(None::<i32>).presence(), NullState::Null);
    }
}
