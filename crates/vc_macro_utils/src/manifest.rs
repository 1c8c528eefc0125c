use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

use toml_edit::{Document, Item, Table};

/// The invoking crate's `Cargo.toml`, used to spell paths to workspace crates
/// from generated code.
///
/// ```rust
/// # use vc_macro_utils::Manifest;
/// let path: syn::Path = Manifest::shared(|m| m.get_crate_path("vc_bind"));
/// ```
///
/// # Resolution rules
///
/// For `dependencies`, then `dev-dependencies`:
///
/// 1. A direct dependency on `name` yields `::name`.
/// 2. For a `vc_`-prefixed `name`, a dependency on one of the umbrella crates
///    (`vc_databind`, then `vc`) yields `::umbrella::short_name`, e.g.
///    `vc_bind` resolves to `::vc_databind::bind`.
///
/// When nothing matches the result is `::name`. A crate that derives its own
/// traits declares `extern crate self as name;` so that path stays valid.
#[derive(Debug)]
pub struct Manifest {
    pub manifest: Document<Box<str>>,
    pub modified_time: SystemTime,
}

const UMBRELLA_CRATES: [&str; 2] = ["vc_databind", "vc"];
const WORKSPACE_PREFIX: &str = "vc_";

impl Manifest {
    #[inline(never)]
    fn manifest_path() -> PathBuf {
        let dir = env::var_os("CARGO_MANIFEST_DIR")
            .expect("CARGO_MANIFEST_DIR is set by cargo for proc-macro expansion");
        let path = PathBuf::from(dir).join("Cargo.toml");
        assert!(path.exists(), "no Cargo.toml at {}", path.display());
        path
    }

    #[inline(never)]
    fn read(path: &Path) -> Document<Box<str>> {
        let text = std::fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
        Document::parse(text.into_boxed_str())
            .unwrap_or_else(|e| panic!("cannot parse {}: {e}", path.display()))
    }

    fn path_of(text: &str) -> syn::Path {
        syn::parse_str(text).unwrap_or_else(|e| panic!("`{text}` is not a path: {e}"))
    }

    fn lookup(deps: &Table, name: &str) -> Option<syn::Path> {
        if deps.contains_key(name) {
            return Some(Self::path_of(&format!("::{name}")));
        }
        let module = name.strip_prefix(WORKSPACE_PREFIX)?;
        UMBRELLA_CRATES
            .iter()
            .find(|umbrella| deps.contains_key(umbrella))
            .map(|umbrella| Self::path_of(&format!("::{umbrella}::{module}")))
    }

    /// Returns the path under which crate `name` is reachable from the
    /// invoking crate. See the type-level documentation for the rules.
    #[inline(never)]
    pub fn get_crate_path(&self, name: &str) -> syn::Path {
        ["dependencies", "dev-dependencies"]
            .into_iter()
            .filter_map(|section| match self.manifest.get(section) {
                Some(Item::Table(deps)) => Self::lookup(deps, name),
                _ => None,
            })
            .next()
            .unwrap_or_else(|| Self::path_of(&format!("::{name}")))
    }

    /// Runs `func` against the invoking crate's manifest.
    ///
    /// Parsed manifests are cached per path and reparsed when the file's
    /// modification time changes.
    pub fn shared<R>(func: impl FnOnce(&Self) -> R) -> R {
        static MANIFESTS: RwLock<BTreeMap<PathBuf, Manifest>> = RwLock::new(BTreeMap::new());

        let path = Self::manifest_path();
        let modified_time = std::fs::metadata(&path)
            .and_then(|meta| meta.modified())
            .expect("Cargo.toml has a modification time");

        {
            let cache = MANIFESTS.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(manifest) = cache.get(&path)
                && manifest.modified_time == modified_time
            {
                return func(manifest);
            }
        }

        let manifest = Manifest {
            manifest: Self::read(&path),
            modified_time,
        };
        let result = func(&manifest);
        MANIFESTS
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, manifest);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::Manifest;
    use quote::ToTokens;

    fn manifest(text: &str) -> Manifest {
        Manifest {
            manifest: toml_edit::Document::parse(text.to_owned().into_boxed_str()).unwrap(),
            modified_time: std::time::SystemTime::UNIX_EPOCH,
        }
    }

    fn resolve(text: &str, name: &str) -> String {
        manifest(text)
            .get_crate_path(name)
            .to_token_stream()
            .to_string()
            .replace(' ', "")
    }

    #[test]
    fn direct_dependency_wins() {
        let text = "[dependencies]\nvc_bind = \"0.0.1\"\nvc_databind = \"0.0.1\"\n";
        assert_eq!(resolve(text, "vc_bind"), "::vc_bind");
    }

    #[test]
    fn umbrella_crate_is_used() {
        let text = "[dependencies]\nvc_databind = \"0.0.1\"\n";
        assert_eq!(resolve(text, "vc_bind"), "::vc_databind::bind");
    }

    #[test]
    fn dev_dependencies_are_searched() {
        let text = "[dev-dependencies]\nvc = { package = \"vc_databind\" }\n";
        assert_eq!(resolve(text, "vc_bind"), "::vc::bind");
    }

    #[test]
    fn falls_back_to_absolute_path() {
        assert_eq!(resolve("[package]\nname = \"x\"\n", "vc_bind"), "::vc_bind");
    }
}
