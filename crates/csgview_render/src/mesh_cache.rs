//! Per-mesh GPU resources keyed by mesh identity
//!
//! Chains share solids through `Arc<TriangleMesh>`, so the cache keys on the
//! allocation address and keeps a weak reference to tell a live mesh from a
//! new one reusing a freed address.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use csgview_core::TriangleMesh;

struct CacheEntry<T> {
    mesh: Weak<TriangleMesh>,
    value: Arc<T>,
}

/// Cache of values built from meshes
pub struct MeshCache<T> {
    entries: HashMap<usize, CacheEntry<T>>,
}

impl<T> Default for MeshCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MeshCache<T> {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    fn key(mesh: &Arc<TriangleMesh>) -> usize {
        Arc::as_ptr(mesh) as usize
    }

    /// Value for `mesh`, building it on first use
    pub fn get_or_insert_with(&mut self, mesh: &Arc<TriangleMesh>, build: impl FnOnce(&TriangleMesh) -> T) -> Arc<T> {
        let key = Self::key(mesh);
        if let Some(entry) = self.entries.get(&key) {
            if entry.mesh.upgrade().is_some_and(|live| Arc::ptr_eq(&live, mesh)) {
                return Arc::clone(&entry.value);
            }
        }
        let value = Arc::new(build(mesh));
        self.entries.insert(
            key,
            CacheEntry {
                mesh: Arc::downgrade(mesh),
                value: Arc::clone(&value),
            },
        );
        value
    }

    /// Drop entries whose mesh is gone
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.mesh.strong_count() > 0);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csgview_core::{shapes, Vec3};

    #[test]
    fn test_shared_mesh_builds_once() {
        let mesh = Arc::new(shapes::cube(Vec3::ONE));
        let mut cache = MeshCache::new();
        let mut builds = 0;
        for _ in 0..3 {
            cache.get_or_insert_with(&mesh, |m| {
                builds += 1;
                m.triangle_count()
            });
        }
        assert_eq!(builds, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_meshes_build_separately() {
        let a = Arc::new(shapes::cube(Vec3::ONE));
        let b = Arc::new(shapes::cube(Vec3::ONE));
        let mut cache = MeshCache::new();
        cache.get_or_insert_with(&a, |_| 1);
        let v = cache.get_or_insert_with(&b, |_| 2);
        assert_eq!(*v, 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_prune_drops_dead_meshes() {
        let keep = Arc::new(shapes::cube(Vec3::ONE));
        let mut cache = MeshCache::new();
        cache.get_or_insert_with(&keep, |_| ());
        {
            let temp = Arc::new(shapes::sphere(1.0, 8, 4));
            cache.get_or_insert_with(&temp, |_| ());
        }
        assert_eq!(cache.prune(), 1);
        assert_eq!(cache.len(), 1);
    }
}
