//! Re-exports [`fastvec`]'s containers.
//!
//! Used for short-lived buffers whose length is usually known to be small,
//! such as the entries of one wire object before it is emitted.

pub use fastvec::{FastVec, fast_vec};
