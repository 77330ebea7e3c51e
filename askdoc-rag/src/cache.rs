//! Answer cache keyed by normalized question and document scope.

use std::fmt;

use moka::sync::Cache;

use crate::config::QueryConfig;
use crate::document::Answer;

/// Canonical cache key: `"{lowercased trimmed question}|{document or global}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build the key for a question asked with an optional active document.
    pub fn new(question: &str, active_document: Option<&str>) -> Self {
        Self(format!("{}|{}", question.trim().to_lowercase(), active_document.unwrap_or("global")))
    }

    /// The canonical key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A shared store of finished answers.
///
/// Implementations must tolerate concurrent `get`/`put` from many requests.
pub trait AnswerCache: Send + Sync {
    /// Look up a previously stored answer.
    fn get(&self, key: &CacheKey) -> Option<Answer>;

    /// Store an answer, replacing any previous one.
    fn put(&self, key: CacheKey, answer: Answer);

    /// Drop every stored answer.
    fn clear(&self);
}

/// A bounded [`AnswerCache`] backed by `moka`.
///
/// Eviction is size-based (TinyLFU), with an optional time-to-live.
pub struct MokaAnswerCache {
    cache: Cache<CacheKey, Answer>,
}

impl MokaAnswerCache {
    /// Create a cache holding at most `capacity` answers.
    pub fn new(capacity: u64) -> Self {
        Self { cache: Cache::new(capacity) }
    }

    /// Create a cache from the pipeline configuration.
    pub fn from_config(config: &QueryConfig) -> Self {
        let mut builder = Cache::builder().max_capacity(config.cache_capacity);
        if let Some(ttl) = config.cache_ttl {
            builder = builder.time_to_live(ttl);
        }
        Self { cache: builder.build() }
    }

    /// Approximate number of stored answers.
    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AnswerCache for MokaAnswerCache {
    fn get(&self, key: &CacheKey) -> Option<Answer> {
        self.cache.get(key)
    }

    fn put(&self, key: CacheKey, answer: Answer) {
        self.cache.insert(key, answer);
    }

    fn clear(&self) {
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn key_is_case_and_whitespace_insensitive() {
        assert_eq!(CacheKey::new("  What is X? ", None), CacheKey::new("what is x?", None));
        assert_eq!(CacheKey::new("Q", None).as_str(), "q|global");
        assert_eq!(CacheKey::new("Q", Some("report.pdf")).as_str(), "q|report.pdf");
        assert_ne!(CacheKey::new("Q", Some("a.pdf")), CacheKey::new("Q", None));
    }

    #[test]
    fn put_then_get() {
        let cache = MokaAnswerCache::new(10);
        let key = CacheKey::new("q", None);
        let answer = Answer { text: "a".into(), sources: vec!["x.pdf".into()] };

        assert_eq!(cache.get(&key), None);
        cache.put(key.clone(), answer.clone());
        assert_eq!(cache.get(&key), Some(answer));
    }

    #[test]
    fn clear_removes_entries() {
        let cache = MokaAnswerCache::new(10);
        cache.put(CacheKey::new("a", None), Answer::unsourced("1"));
        cache.put(CacheKey::new("b", None), Answer::unsourced("2"));
        cache.clear();
        assert_eq!(cache.get(&CacheKey::new("a", None)), None);
        assert_eq!(cache.get(&CacheKey::new("b", None)), None);
    }

    #[test]
    fn capacity_is_bounded() {
        let cache = MokaAnswerCache::new(8);
        for i in 0..100 {
            cache.put(CacheKey::new(&format!("question {i}"), None), Answer::unsourced("x"));
        }
        assert!(cache.len() <= 8);
    }

    #[test]
    fn ttl_is_applied_from_config() {
        let config = QueryConfig::builder().cache_ttl(Duration::from_millis(20)).build().unwrap();
        let cache = MokaAnswerCache::from_config(&config);
        let key = CacheKey::new("q", None);
        cache.put(key.clone(), Answer::unsourced("a"));
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(cache.get(&key), None);
    }

    #[test]
    fn concurrent_writers_do_not_corrupt_entries() {
        let cache = Arc::new(MokaAnswerCache::new(100));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    let answer = Answer::unsourced(format!("writer {i}"));
                    cache.put(CacheKey::new("same question", None), answer);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stored = cache.get(&CacheKey::new("same question", None)).unwrap();
        assert!(stored.text.starts_with("writer "));
    }
}
