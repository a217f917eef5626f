use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use crate::wiki::Article;

/// Thread-safe LRU cache of title lookups
///
/// Caches both hits and misses (`None`) so repeated candidates and dead ends
/// cost one request per run. Uses LRU eviction to keep memory bounded.
pub struct ArticleCache {
    cache: Mutex<LruCache<String, Option<Article>>>,
}

impl ArticleCache {
    /// Create a new article cache holding at most `capacity` lookups (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);

        Self {
            cache: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Cached lookup for `title`
    ///
    /// Outer `None` is a cache miss; `Some(None)` is a cached "no such article".
    pub fn get(&self, title: &str) -> Option<Option<Article>> {
        self.cache.lock().ok()?.get(title).cloned()
    }

    /// Store the outcome of looking up `title`
    pub fn put(&self, title: String, article: Option<Article>) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(title, article);
        }
    }

    /// Get the current number of cached entries
    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all entries from the cache
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str) -> Article {
        Article {
            title: title.to_string(),
            body: format!("{} body", title),
        }
    }

    #[test]
    fn test_cache_put_and_get() {
        let cache = ArticleCache::new(10);
        cache.put("Lennon".to_string(), Some(article("John Lennon")));

        let retrieved = cache.get("Lennon");
        assert_eq!(retrieved, Some(Some(article("John Lennon"))));
    }

    #[test]
    fn test_cache_miss_and_negative_entry() {
        let cache = ArticleCache::new(10);
        assert!(cache.get("Nobody").is_none());

        cache.put("Nobody".to_string(), None);
        assert_eq!(cache.get("Nobody"), Some(None));
    }

    #[test]
    fn test_cache_eviction() {
        let cache = ArticleCache::new(2);
        cache.put("a".to_string(), Some(article("A")));
        cache.put("b".to_string(), Some(article("B")));
        cache.put("c".to_string(), Some(article("C")));

        assert!(cache.get("a").is_none()); // Evicted
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_cache_get_updates_lru() {
        let cache = ArticleCache::new(2);
        cache.put("a".to_string(), Some(article("A")));
        cache.put("b".to_string(), Some(article("B")));

        // Touch "a" so "b" becomes least recently used
        let _ = cache.get("a");
        cache.put("c".to_string(), Some(article("C")));

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn test_cache_len_and_clear() {
        let cache = ArticleCache::new(0);
        assert!(cache.is_empty());

        cache.put("a".to_string(), None);
        assert_eq!(cache.len(), 1);
        cache.put("b".to_string(), None);
        assert_eq!(cache.len(), 1); // Capacity clamps to 1

        cache.clear();
        assert!(cache.is_empty());
    }
}
