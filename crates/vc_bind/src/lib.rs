//! Data binding between Rust values and serde event streams.
//!
//! Types describe themselves once through [`Bind::shape`], normally derived
//! with `#[derive(Bind)]`. The engine turns that description into cached
//! reader and writer strategies and drives any serde format with them.
//!
//! ## Menu
//!
//! - [`info`]: shapes, bean descriptors and the introspector.
//! - [`simple`]: the scalar dispatch table.
//! - [`read`]: [`ReaderCache`](read::ReaderCache) and the value readers.
//! - [`write`]: [`WriterCache`](write::WriterCache) and the value writers.
//! - [`codec`]: date/time, duration, base64, GeoJSON and tri-state codecs.
//! - [`Binder`] and [`json`]: the entry points.
//!
//! ## Example
//!
//! ```
//! use vc_bind::{Bind, Binder};
//!
//! #[derive(Bind, Default, Debug, PartialEq)]
//! #[bind(default)]
//! struct Pet {
//!     name: String,
//!     #[bind(rename = "ageInYears")]
//!     age: Option<u32>,
//! }
//!
//! let binder = Binder::new();
//! let pet = Pet { name: "Rex".into(), age: None };
//! assert_eq!(binder.write_val(&pet).unwrap(), r#"{"name":"Rex"}"#);
//!
//! let read: Pet = binder
//!     .read_val(r#"{"name":"Rex","ageInYears":3,"owner":{"id":7}}"#)
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(read.age, Some(3));
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Extern Self

// Generated code names `vc_bind`, which must also work inside this crate.
extern crate self as vc_bind;

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod bind;
mod binder;
mod config;
mod error;
mod impls;

pub mod codec;
pub mod info;
pub mod json;
pub mod read;
pub mod simple;
pub mod value;
pub mod write;

// -----------------------------------------------------------------------------
// Top-Level exports

pub mod __macro_exports;

pub use bind::{Bind, Bindable, BoxedValue, NullState, TypeKey};
pub use binder::Binder;
pub use config::{BindConfig, DEFAULT_CACHE_CAPACITY, Features};
pub use error::{BindError, Result};
pub use value::DynamicValue;

pub use vc_bind_derive as derive;
pub use vc_bind_derive::Bind;
