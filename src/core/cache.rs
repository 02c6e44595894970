use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Session-scoped in-memory cache. Cheap to clone; clones share storage.
#[derive(Clone)]
pub struct Cache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Mutex<HashMap<K, V>>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let cache = self.inner.lock().await;
        let value = cache.get(key).cloned();
        if value.is_some() {
            debug!("Cache HIT");
        } else {
            debug!("Cache MISS");
        }
        value
    }

    pub async fn put(&self, key: K, value: V) {
        let mut cache = self.inner.lock().await;
        debug!("Cache PUT");
        cache.insert(key, value);
    }

    /// Inserts many entries under one lock.
    pub async fn extend(&self, entries: impl IntoIterator<Item = (K, V)>) {
        let mut cache = self.inner.lock().await;
        cache.extend(entries);
        debug!(size = cache.len(), "Cache EXTEND");
    }

    pub async fn contains(&self, key: &K) -> bool {
        self.inner.lock().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Drops every entry. There is no partial invalidation.
    pub async fn clear(&self) {
        let mut cache = self.inner.lock().await;
        cache.clear();
        debug!("Cache CLEAR");
    }

    /// Point-in-time copy of all entries.
    pub async fn snapshot(&self) -> HashMap<K, V> {
        self.inner.lock().await.clone()
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_get_put() {
        let cache = Cache::<String, i32>::new();

        // Initially, cache is empty
        assert!(cache.get(&"key1".to_string()).await.is_none());
        assert!(cache.is_empty().await);

        cache.put("key1".to_string(), 123).await;

        assert_eq!(cache.get(&"key1".to_string()).await, Some(123));
        assert!(cache.get(&"key2".to_string()).await.is_none());
    }

    #[tokio::test]
    async fn test_cache_clear_drops_everything() {
        let cache = Cache::<String, Vec<i32>>::new();
        cache
            .extend([("a".to_string(), vec![1]), ("b".to_string(), vec![])])
            .await;
        assert_eq!(cache.len().await, 2);
        assert!(cache.contains(&"b".to_string()).await);

        let clone = cache.clone();
        clone.clear().await;

        assert!(cache.is_empty().await);
        assert!(cache.snapshot().await.is_empty());
    }
}
