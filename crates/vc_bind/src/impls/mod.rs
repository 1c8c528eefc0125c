//! `Bind` for std and library types.

mod collections;
mod scalars;
