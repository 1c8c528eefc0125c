//! Items used by exported macros. Not part of the public API.

pub use alloc::boxed::Box;

#[cfg(feature = "auto_register")]
pub use inventory;
