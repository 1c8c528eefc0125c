//! `hashbrown` containers defaulting to [`FixedHashState`].
//!
//! String-keyed lookup tables (wire names, enum constants) are built once
//! and read many times, so a fixed seed keeps their iteration order stable
//! between runs.

use super::FixedHashState;

pub use hashbrown::hash_map::{Entry, Iter, Keys, Values};

/// A [`hashbrown::HashMap`] using [`FixedHashState`] by default.
///
/// # Examples
///
/// ```
/// use vc_utils::hash::HashMap;
///
/// let mut map: HashMap<&str, u32> = HashMap::default();
/// map.insert("id", 1);
/// assert_eq!(map.get("id"), Some(&1));
/// ```
pub type HashMap<K, V, S = FixedHashState> = hashbrown::HashMap<K, V, S>;

/// A [`hashbrown::HashSet`] using [`FixedHashState`] by default.
pub type HashSet<T, S = FixedHashState> = hashbrown::HashSet<T, S>;
