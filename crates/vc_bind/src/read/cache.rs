use alloc::sync::Arc;
use core::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use vc_utils::TypeIdMap;

use super::bean::BeanTable;
use super::{AnyReader, BeanReader, EnumReader, MapReader, ReaderRef, SeqReader, SimpleReader};
use super::{ValueReader, WrapperReader};
use crate::info::Shape;
use crate::simple::classify;
use crate::{BindError, TypeKey};

#[derive(Clone)]
enum Resolved {
    Bean(Arc<BeanReader>),
    Shared(Arc<dyn ValueReader>),
}

impl Resolved {
    fn strong(self) -> Arc<dyn ValueReader> {
        match self {
            Self::Bean(reader) => reader,
            Self::Shared(reader) => reader,
        }
    }

    fn edge(self, ty: TypeKey) -> ReaderRef {
        match self {
            Self::Bean(reader) => ReaderRef::Bean {
                reader: Arc::downgrade(&reader),
                ty,
            },
            Self::Shared(reader) => ReaderRef::Shared(reader),
        }
    }
}

/// Resolves and caches one reader per type.
///
/// # Resolution order
///
/// 1. A reader registered with [`register`](Self::register).
/// 2. A previously resolved reader.
/// 3. The [simple-type table](crate::simple).
/// 4. A strategy built from the type's [`Shape`].
///
/// # Eviction
///
/// The cache holds at most `capacity` resolved readers. Inserting into a
/// full cache first drops every resolved entry (registered readers stay).
/// Readers already handed out keep working: their edges to evicted bean
/// readers resolve the type again on next use.
///
/// # Recursive types
///
/// A bean reader is published in a building state before its properties
/// are resolved, so a property that refers back to the bean (directly or
/// through other beans) receives the same reader. Reading through a reader
/// that is still being built waits for the build to finish. Concurrent
/// resolutions of one bean type share a single build.
pub struct ReaderCache {
    capacity: usize,
    custom: RwLock<TypeIdMap<Arc<dyn ValueReader>>>,
    resolved: RwLock<TypeIdMap<Resolved>>,
    building: Mutex<TypeIdMap<Arc<BeanReader>>>,
}

#[inline]
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

#[inline]
fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[inline]
fn lock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ReaderCache {
    /// Creates an empty cache; `capacity` is at least one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            custom: RwLock::new(TypeIdMap::new()),
            resolved: RwLock::new(TypeIdMap::new()),
            building: Mutex::new(TypeIdMap::new()),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of resolved readers currently cached.
    pub fn len(&self) -> usize {
        read(&self.resolved).len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every resolved reader. Registered readers are kept.
    pub fn clear(&self) {
        write(&self.resolved).clear();
    }

    /// Uses `reader` for `ty` from now on.
    ///
    /// Resolved readers are dropped so that types containing `ty` pick up
    /// the new reader.
    pub fn register(&self, ty: TypeKey, reader: Arc<dyn ValueReader>) {
        log::debug!("registering reader for `{}`", ty.name());
        write(&self.custom).insert(ty.id(), reader);
        self.clear();
    }

    /// Returns the reader for `ty`, building it on first use.
    pub fn reader_for(&self, ty: TypeKey) -> Result<Arc<dyn ValueReader>, BindError> {
        self.lookup(ty).map(Resolved::strong)
    }

    pub(crate) fn resolve(&self, ty: TypeKey) -> Result<ReaderRef, BindError> {
        self.lookup(ty).map(|resolved| resolved.edge(ty))
    }

    fn lookup(&self, ty: TypeKey) -> Result<Resolved, BindError> {
        if let Some(custom) = read(&self.custom).get(&ty.id()) {
            return Ok(Resolved::Shared(custom.clone()));
        }
        if let Some(found) = read(&self.resolved).get(&ty.id()) {
            return Ok(found.clone());
        }
        if let Some(simple) = classify(ty.id()) {
            return Ok(self.store(ty, Resolved::Shared(Arc::new(SimpleReader(simple)))));
        }

        let reader: Arc<dyn ValueReader> = match ty.shape() {
            Shape::Any => Arc::new(AnyReader),
            Shape::Scalar => {
                return Err(BindError::Unsupported {
                    ty: ty.name(),
                    reason: "scalar type outside the simple-type table",
                });
            }
            Shape::Opaque => {
                return Err(BindError::Unsupported {
                    ty: ty.name(),
                    reason: "requires a registered reader",
                });
            }
            Shape::Array(info) | Shape::Collection(info) => Arc::new(SeqReader {
                item: self.resolve(info.item())?,
                info,
            }),
            Shape::Enum(info) => Arc::new(EnumReader::new(ty, info)),
            Shape::Map(info) => Arc::new(MapReader {
                value: self.resolve(info.value())?,
                info,
            }),
            Shape::Wrapper(info) => {
                let inner = self.resolve(info.inner())?;
                Arc::new(WrapperReader {
                    accepts_empty: info.accepts_empty() || inner.accepts_empty(),
                    inner,
                    info,
                })
            }
            Shape::Bean(_) => return self.build_bean(ty),
        };

        Ok(self.store(ty, Resolved::Shared(reader)))
    }

    fn build_bean(&self, ty: TypeKey) -> Result<Resolved, BindError> {
        let placeholder = {
            let mut building = lock(&self.building);
            if let Some(pending) = building.get(&ty.id()) {
                return Ok(Resolved::Bean(pending.clone()));
            }
            if let Some(found) = read(&self.resolved).get(&ty.id()) {
                return Ok(found.clone());
            }
            let placeholder = Arc::new(BeanReader::placeholder(ty));
            building.insert(ty.id(), placeholder.clone());
            placeholder
        };

        log::trace!("building reader for `{}`", ty.name());
        let outcome = match BeanTable::build(ty, self) {
            Ok(table) => {
                placeholder.complete(Ok(table));
                Ok(self.store(ty, Resolved::Bean(placeholder)))
            }
            Err(err) => {
                placeholder.complete(Err(err.to_string()));
                Err(err)
            }
        };
        lock(&self.building).remove(&ty.id());
        outcome
    }

    fn store(&self, ty: TypeKey, resolved: Resolved) -> Resolved {
        let mut map = write(&self.resolved);
        if map.len() >= self.capacity && !map.contains(&ty.id()) {
            log::debug!("reader cache reached {} entries, clearing", map.len());
            map.clear();
        }
        map.insert(ty.id(), resolved.clone());
        resolved
    }
}

impl Default for ReaderCache {
    fn default() -> Self {
        Self::new(crate::DEFAULT_CACHE_CAPACITY)
    }
}

impl fmt::Debug for ReaderCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderCache")
            .field("capacity", &self.capacity)
            .field("resolved", &self.len())
            .field("custom", &read(&self.custom).len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::ReaderCache;
    use crate::read::ValueReader;
    use crate::{Bind, BindError, TypeKey};

    fn same(a: &Arc<dyn ValueReader>, b: &Arc<dyn ValueReader>) -> bool {
        core::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
    }

    #[derive(Bind, Default)]
    #[bind(default)]
    struct Node {
        value: i32,
        next: Option<Box<Node>>,
    }

    #[derive(Bind, Default)]
    #[bind(default)]
    struct Parent {
        children: Vec<Child>,
    }

    #[derive(Bind, Default)]
    #[bind(default)]
    struct Child {
        parent: Option<Box<Parent>>,
    }

    #[derive(Bind, Default)]
    #[bind(default)]
    struct Broken {
        #[bind(unwrapped)]
        extra: i32,
    }

    #[derive(Bind)]
    struct Token;

    #[test]
    fn resolved_readers_are_shared() {
        let cache = ReaderCache::new(16);
        let a = cache.reader_for(TypeKey::of::<Vec<String>>()).unwrap();
        let b = cache.reader_for(TypeKey::of::<Vec<String>>()).unwrap();
        assert!(same(&a, &b));
    }

    #[test]
    fn full_cache_is_cleared_before_insert() {
        let cache = ReaderCache::new(2);
        cache.reader_for(TypeKey::of::<u8>()).unwrap();
        cache.reader_for(TypeKey::of::<u16>()).unwrap();
        assert_eq!(cache.len(), 2);
        cache.reader_for(TypeKey::of::<u32>()).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn recursive_beans_share_their_reader() {
        let cache = ReaderCache::new(16);
        let node = cache.reader_for(TypeKey::of::<Node>()).unwrap();
        assert!(same(&node, &cache.reader_for(TypeKey::of::<Node>()).unwrap()));

        cache.reader_for(TypeKey::of::<Parent>()).unwrap();
        cache.reader_for(TypeKey::of::<Child>()).unwrap();
    }

    #[test]
    fn concurrent_resolution_builds_once() {
        let cache = ReaderCache::new(64);
        let readers: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| cache.reader_for(TypeKey::of::<Parent>()).unwrap()))
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });
        assert!(readers.iter().all(|reader| same(reader, &readers[0])));
    }

    #[test]
    fn failed_builds_are_not_cached() {
        let cache = ReaderCache::new(16);
        for _ in 0..2 {
            let Err(err) = cache.reader_for(TypeKey::of::<Broken>()) else {
                panic!("a bean without a constructor resolved");
            };
            assert!(matches!(err, BindError::Introspect { .. }), "{err}");
        }
        assert!(cache.is_empty());
    }

    #[test]
    fn registered_readers_win_and_reset_the_cache() {
        let cache = ReaderCache::new(16);
        cache.reader_for(TypeKey::of::<Vec<i8>>()).unwrap();
        let custom: Arc<dyn ValueReader> = cache.reader_for(TypeKey::of::<String>()).unwrap();
        cache.register(TypeKey::of::<Vec<i8>>(), custom.clone());
        assert!(cache.is_empty());
        assert!(same(&cache.reader_for(TypeKey::of::<Vec<i8>>()).unwrap(), &custom));
    }

    #[test]
    fn opaque_types_need_a_registered_reader() {
        impl Bind for Opaque {
            fn shape() -> crate::info::Shape {
                crate::info::Shape::Opaque
            }
        }
        struct Opaque;

        let cache = ReaderCache::new(16);
        let Err(err) = cache.reader_for(TypeKey::of::<Opaque>()) else {
            panic!("an opaque type resolved without a registered reader");
        };
        assert!(matches!(err, BindError::Unsupported { .. }), "{err}");
        assert!(cache.reader_for(TypeKey::of::<Token>()).is_ok());
    }
}
