//! Traversal-scoped lookup cache
//!
//! Wraps a [`ClusterClient`] and remembers get/list results for the lifetime
//! of one query. Both caches are bounded LRUs; errors are never cached.

use super::{ClusterClient, ClusterError};
use async_trait::async_trait;
use lru::LruCache;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

type GetKey = (String, String, String);
type ListKey = (String, String);

/// Bounded, per-query cache in front of a cluster client
pub struct CachedCluster {
    inner: Arc<dyn ClusterClient>,
    objects: Mutex<LruCache<GetKey, Option<Value>>>,
    lists: Mutex<LruCache<ListKey, Vec<Value>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl CachedCluster {
    /// Create a cache holding at most `capacity` entries per lookup type
    pub fn new(inner: Arc<dyn ClusterClient>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            objects: Mutex::new(LruCache::new(capacity)),
            lists: Mutex::new(LruCache::new(capacity)),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Drop every cached entry
    pub async fn clear(&self) {
        self.objects.lock().await.clear();
        self.lists.lock().await.clear();
    }

    /// (hits, misses) since creation
    pub fn stats(&self) -> (usize, usize) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

#[async_trait]
impl ClusterClient for CachedCluster {
    async fn get_object(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Value>, ClusterError> {
        let key = (kind.to_string(), name.to_string(), namespace.to_string());
        if let Some(cached) = self.objects.lock().await.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let fetched = self.inner.get_object(kind, name, namespace).await?;
        self.objects.lock().await.put(key, fetched.clone());
        Ok(fetched)
    }

    async fn list_objects(&self, kind: &str, namespace: &str) -> Result<Vec<Value>, ClusterError> {
        let key = (kind.to_string(), namespace.to_string());
        if let Some(cached) = self.lists.lock().await.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let fetched = self.inner.list_objects(kind, namespace).await?;
        self.lists.lock().await.put(key, fetched.clone());
        Ok(fetched)
    }
}
