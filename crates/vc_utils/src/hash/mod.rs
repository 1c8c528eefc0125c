//! Hash containers for the binding caches and lookup tables.
//!
//! [`HashMap`] and [`HashSet`] default to [`FixedHashState`]; [`TypeIdMap`]
//! uses [`NoOpHashState`] because its keys are hashes already.
//!
//! [`TypeIdMap`]: crate::TypeIdMap

mod hasher;

pub mod hash_map;

pub use hash_map::{HashMap, HashSet};
pub use hasher::{FixedHashState, FixedHasher, NoOpHashState, NoOpHasher};

pub use foldhash;
pub use hashbrown;
