use alloc::sync::Arc;
use core::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use vc_utils::TypeIdMap;

use super::{BeanWriter, ValueWriter, Writer};
use crate::info::{Shape, introspect};
use crate::simple::classify;
use crate::{BindError, TypeKey};

/// Resolves and caches one writer per runtime type.
///
/// Resolution and eviction follow [`ReaderCache`](crate::read::ReaderCache):
/// registered writers first, then cached ones, the simple-type table and
/// finally the type's shape. A full cache is cleared before the next insert.
///
/// Bean writers look their property writers up at write time, so building
/// one never recurses and recursive types need no special handling.
pub struct WriterCache {
    capacity: usize,
    custom: RwLock<TypeIdMap<Arc<dyn ValueWriter>>>,
    resolved: RwLock<TypeIdMap<Writer>>,
}

#[inline]
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

#[inline]
fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl WriterCache {
    /// Creates an empty cache; `capacity` is at least one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            custom: RwLock::new(TypeIdMap::new()),
            resolved: RwLock::new(TypeIdMap::new()),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of resolved writers currently cached.
    pub fn len(&self) -> usize {
        read(&self.resolved).len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a writer for `ty` is cached or registered.
    pub fn contains(&self, ty: TypeKey) -> bool {
        read(&self.custom).contains(&ty.id()) || read(&self.resolved).contains(&ty.id())
    }

    /// Drops every resolved writer. Registered writers are kept.
    pub fn clear(&self) {
        write(&self.resolved).clear();
    }

    /// Uses `writer` for values of type `ty` from now on.
    pub fn register(&self, ty: TypeKey, writer: Arc<dyn ValueWriter>) {
        log::debug!("registering writer for `{}`", ty.name());
        write(&self.custom).insert(ty.id(), writer);
        write(&self.resolved).remove(&ty.id());
    }

    pub(crate) fn writer(&self, ty: TypeKey) -> Result<Writer, BindError> {
        if let Some(custom) = read(&self.custom).get(&ty.id()) {
            return Ok(Writer::Custom(custom.clone()));
        }
        if let Some(found) = read(&self.resolved).get(&ty.id()) {
            return Ok(found.clone());
        }

        let writer = match classify(ty.id()) {
            Some(simple) => Writer::Simple(simple),
            None => match ty.shape() {
                Shape::Any => Writer::Any,
                Shape::Scalar => {
                    return Err(BindError::Unsupported {
                        ty: ty.name(),
                        reason: "scalar type outside the simple-type table",
                    });
                }
                Shape::Opaque => {
                    return Err(BindError::Unsupported {
                        ty: ty.name(),
                        reason: "requires a registered writer",
                    });
                }
                Shape::Enum(info) => Writer::Enum(info),
                Shape::Array(info) | Shape::Collection(info) => Writer::Seq(info),
                Shape::Map(info) => Writer::Map(info),
                Shape::Wrapper(info) => Writer::Wrapper(info),
                Shape::Bean(_) => {
                    log::trace!("building writer for `{}`", ty.name());
                    Writer::Bean(Arc::new(BeanWriter::new(introspect(ty)?)))
                }
            },
        };

        let mut map = write(&self.resolved);
        if map.len() >= self.capacity && !map.contains(&ty.id()) {
            log::debug!("writer cache reached {} entries, clearing", map.len());
            map.clear();
        }
        map.insert(ty.id(), writer.clone());
        Ok(writer)
    }
}

impl Default for WriterCache {
    fn default() -> Self {
        Self::new(crate::DEFAULT_CACHE_CAPACITY)
    }
}

impl fmt::Debug for WriterCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterCache")
            .field("capacity", &self.capacity)
            .field("resolved", &self.len())
            .field("custom", &read(&self.custom).len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::WriterCache;
    use crate::write::Writer;
    use crate::{Bind, TypeKey};

    #[derive(Bind, Default)]
    #[bind(default)]
    struct Leaf {
        id: u32,
    }

    #[test]
    fn writers_are_cached_per_type() {
        let cache = WriterCache::new(8);
        assert!(!cache.contains(TypeKey::of::<Leaf>()));
        assert!(matches!(cache.writer(TypeKey::of::<Leaf>()).unwrap(), Writer::Bean(_)));
        assert!(matches!(cache.writer(TypeKey::of::<u64>()).unwrap(), Writer::Simple(_)));
        assert!(cache.contains(TypeKey::of::<Leaf>()));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn overflow_clears_everything() {
        let cache = WriterCache::new(2);
        cache.writer(TypeKey::of::<Leaf>()).unwrap();
        cache.writer(TypeKey::of::<Vec<Leaf>>()).unwrap();
        cache.writer(TypeKey::of::<Option<Leaf>>()).unwrap();
        assert_eq!(cache.len(), 1);
        assert!(!cache.contains(TypeKey::of::<Leaf>()));
    }
}
