//! Lightweight data binding between Rust values and serde event streams.
//!
//! This umbrella crate re-exports the workspace members:
//!
//! - [`bind`]: descriptors, reader and writer caches, codecs and the JSON facade.
//! - [`utils`]: hash containers and the [`TypeIdMap`](utils::TypeIdMap).
//!
//! ```
//! use vc_databind::bind::{Bind, json};
//!
//! #[derive(Bind, Default, Debug, PartialEq)]
//! #[bind(default)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! let text = json::to_string(&Point { x: 1, y: 2 }).unwrap();
//! assert_eq!(text, r#"{"x":1,"y":2}"#);
//!
//! let back: Option<Point> = json::from_str(&text).unwrap();
//! assert_eq!(back, Some(Point { x: 1, y: 2 }));
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use vc_bind as bind;
pub use vc_utils as utils;
