//! Containers shared by the binding crates.
//!
//! ## Menu
//!
//! - [`hash`]: `hashbrown` maps with `foldhash` and pass-through hashers.
//! - [`TypeIdMap`]: a map keyed by [`TypeId`](core::any::TypeId).
//! - [`vec`]: small-buffer vectors from `fastvec`.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod typeid_map;

pub mod hash;
pub mod vec;

// -----------------------------------------------------------------------------
// Top-level exports

pub use typeid_map::TypeIdMap;
