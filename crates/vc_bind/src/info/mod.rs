//! Static type descriptions and their normalized bean descriptors.
//!
//! A [`Shape`] is what a type says about itself (usually derived). Bean
//! shapes are raw: properties of the type itself plus an optional base.
//! The [`introspect`] pass flattens the base chain into a
//! [`BeanDescriptor`], the form the readers and writers work with.
//!
//! ## Menu
//!
//! - [`Shape`], [`EnumInfo`]
//! - [`SeqInfo`], [`MapInfo`], [`WrapperInfo`] and their helper traits
//! - [`BeanInfo`], [`PropInfo`], [`BaseInfo`], [`PropFlags`]
//! - [`BeanDescriptor`], [`Prop`], [`Accessor`]
//! - [`introspect`]

// -----------------------------------------------------------------------------
// Modules

mod bean_info;
mod containers;
mod descriptor;
mod introspect;
mod shape;

// -----------------------------------------------------------------------------
// Exports

pub use bean_info::{AccessorKind, BaseInfo, BeanInfo, PropFlags, PropInfo};
pub use bean_info::{RawBaseGetter, RawBaseGetterMut, RawGetter, RawSetter};
pub use bean_info::{construct_default, construct_from_str, target_mut, unbox};
pub use containers::{Collect, MapInfo, MapIter, SeqInfo, SeqIter, SeqKind};
pub use containers::{StringMap, Wrap, WrapperInfo};
pub use descriptor::{Accessor, BeanDescriptor, Getter, Prop, Setter};
pub use introspect::{introspect, split_wire_path};
pub(crate) use introspect::peel_map;
pub use shape::{EnumInfo, Shape};
