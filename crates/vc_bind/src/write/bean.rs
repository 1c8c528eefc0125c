use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;

use indexmap::IndexMap;
use serde_core::ser::{Serialize, SerializeMap, Serializer};
use vc_utils::hash::HashSet;
use vc_utils::vec::FastVec;

use super::{ValueProxy, WriteContext};
use crate::info::{BeanDescriptor, MapInfo, PropFlags, WrapperInfo, peel_map};
use crate::{Bindable, NullState, TypeKey};

/// Nested objects produced by flattened properties.
type FlatTree = IndexMap<String, FlatNode>;

enum FlatNode {
    Leaf(usize),
    Branch(FlatTree),
}

struct Unwrapped {
    prop: usize,
    wrappers: Vec<WrapperInfo>,
    map: MapInfo,
}

/// Writes a bean as an object, or as its value property for value types.
///
/// Entry order: the discriminator, then direct properties in descriptor
/// order, then entries of the unwrapped map, then flattened objects.
/// Properties whose value is null or unset are left out; tri-state values
/// set to explicit null are written as null.
pub(crate) struct BeanWriter {
    desc: BeanDescriptor,
    direct: Vec<usize>,
    tree: FlatTree,
    unwrapped: Option<Unwrapped>,
    reserved: HashSet<String>,
}

impl BeanWriter {
    pub fn new(desc: BeanDescriptor) -> Self {
        let owner = desc.ty().name();
        let mut direct = Vec::new();
        let mut tree = FlatTree::new();
        let mut unwrapped = None;

        for (index, prop) in desc.props().iter().enumerate() {
            if prop.flags().contains(PropFlags::UNWRAPPED) {
                if let Some((wrappers, map)) = peel_map(prop.ty()) {
                    unwrapped = Some(Unwrapped {
                        prop: index,
                        wrappers,
                        map,
                    });
                }
                continue;
            }
            match prop.flatten_path() {
                Some(path) => insert_path(&mut tree, path, index, owner),
                None => direct.push(index),
            }
        }

        let mut reserved: HashSet<String> = direct
            .iter()
            .map(|index| String::from(desc.props()[*index].wire_name()))
            .chain(tree.keys().cloned())
            .collect();
        if let Some(tag) = desc.discriminator() {
            reserved.insert(String::from(tag.wire_name()));
        }
        for key in tree.keys() {
            if direct.iter().any(|index| desc.props()[*index].wire_name() == key) {
                log::warn!("`{owner}`: flattened object `{key}` collides with a property");
            }
        }

        Self {
            desc,
            direct,
            tree,
            unwrapped,
            reserved,
        }
    }

    #[inline]
    pub fn ty(&self) -> TypeKey {
        self.desc.ty()
    }

    pub fn write<S: Serializer>(
        &self,
        value: &dyn Bindable,
        ctx: &WriteContext<'_>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let owner = value.as_any();

        if let Some(prop) = self.desc.value_prop() {
            return match prop.get(owner) {
                Some(inner) => ValueProxy::new(inner, ctx).serialize(serializer),
                None => serializer.serialize_none(),
            };
        }

        let mut entries: FastVec<Entry<'_>, 16> = FastVec::new();
        let data = entries.data();

        if let Some(tag) = self.desc.discriminator()
            && let Some(text) = tag.constant()
        {
            data.push(Entry::Text(tag.wire_name(), text));
        }

        for &index in &self.direct {
            let prop = &self.desc.props()[index];
            let Some(current) = prop.get(owner) else {
                continue;
            };
            match current.presence() {
                NullState::Present => data.push(Entry::Value(prop.wire_name(), current)),
                NullState::ExplicitNull => data.push(Entry::Null(prop.wire_name())),
                NullState::Null | NullState::Unset => {}
            }
        }

        if let Some(unwrapped) = &self.unwrapped
            && let Some(map) = self.unwrapped_map(unwrapped, owner)
        {
            for (key, item) in unwrapped.map.iter(map) {
                if self.reserved.contains(key) {
                    log::debug!(
                        "`{}`: unwrapped key `{key}` shadows a property, skipped",
                        self.desc.ty().name()
                    );
                    continue;
                }
                match item.presence() {
                    NullState::Present => data.push(Entry::Value(key, item)),
                    NullState::ExplicitNull => data.push(Entry::Null(key)),
                    NullState::Null | NullState::Unset => {}
                }
            }
        }

        for (key, node) in &self.tree {
            match node {
                FlatNode::Leaf(index) => {
                    let Some(current) = self.desc.props()[*index].get(owner) else {
                        continue;
                    };
                    match current.presence() {
                        NullState::Present => data.push(Entry::Value(key, current)),
                        NullState::ExplicitNull => data.push(Entry::Null(key)),
                        NullState::Null | NullState::Unset => {}
                    }
                }
                FlatNode::Branch(children) => {
                    if self.has_content(children, owner) {
                        data.push(Entry::Branch(key, children));
                    }
                }
            }
        }

        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for entry in entries.as_slice() {
            match *entry {
                Entry::Text(key, text) => map.serialize_entry(key, text)?,
                Entry::Value(key, current) => map.serialize_entry(key, &ValueProxy::new(current, ctx))?,
                Entry::Null(key) => map.serialize_entry(key, &None::<()>)?,
                Entry::Branch(key, children) => map.serialize_entry(
                    key,
                    &BranchView {
                        writer: self,
                        tree: children,
                        owner,
                        ctx,
                    },
                )?,
            }
        }
        map.end()
    }

    fn unwrapped_map<'a>(&self, unwrapped: &Unwrapped, owner: &'a dyn Any) -> Option<&'a dyn Any> {
        let mut current = self.desc.props()[unwrapped.prop].get(owner)?;
        for wrapper in &unwrapped.wrappers {
            current = wrapper.get(current.as_any())?;
        }
        Some(current.as_any())
    }

    fn has_content(&self, tree: &FlatTree, owner: &dyn Any) -> bool {
        tree.values().any(|node| match node {
            FlatNode::Leaf(index) => self.desc.props()[*index]
                .get(owner)
                .is_some_and(|current| current.presence().is_written()),
            FlatNode::Branch(children) => self.has_content(children, owner),
        })
    }
}

#[derive(Clone, Copy)]
enum Entry<'a> {
    Text(&'a str, &'static str),
    Value(&'a str, &'a dyn Bindable),
    Null(&'a str),
    Branch(&'a str, &'a FlatTree),
}

struct BranchView<'a, 'c> {
    writer: &'a BeanWriter,
    tree: &'a FlatTree,
    owner: &'a dyn Any,
    ctx: &'a WriteContext<'c>,
}

impl Serialize for BranchView<'_, '_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (key, node) in self.tree {
            match node {
                FlatNode::Leaf(index) => {
                    let Some(current) = self.writer.desc.props()[*index].get(self.owner) else {
                        continue;
                    };
                    match current.presence() {
                        NullState::Present => map.serialize_entry(key, &ValueProxy::new(current, self.ctx))?,
                        NullState::ExplicitNull => map.serialize_entry(key, &None::<()>)?,
                        NullState::Null | NullState::Unset => {}
                    }
                }
                FlatNode::Branch(children) => {
                    if self.writer.has_content(children, self.owner) {
                        map.serialize_entry(
                            key,
                            &BranchView {
                                tree: children,
                                ..*self
                            },
                        )?;
                    }
                }
            }
        }
        map.end()
    }
}

fn insert_path(tree: &mut FlatTree, path: &[String], index: usize, owner: &str) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut level = tree;
    for segment in parents {
        let next = level
            .entry(segment.clone())
            .or_insert_with(|| FlatNode::Branch(FlatTree::new()));
        match next {
            FlatNode::Branch(children) => level = children,
            FlatNode::Leaf(_) => {
                log::warn!("`{owner}`: flattened path `{}` collides with a property", path.join("."));
                return;
            }
        }
    }

    if level.contains_key(last) {
        log::warn!("`{owner}`: flattened path `{}` is declared twice, keeping the first", path.join("."));
        return;
    }
    level.insert(last.clone(), FlatNode::Leaf(index));
}

impl core::fmt::Debug for BeanWriter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BeanWriter")
            .field("ty", &self.desc.ty())
            .field("direct", &self.direct.len())
            .field("flattened", &self.tree.len())
            .finish_non_exhaustive()
    }
}

