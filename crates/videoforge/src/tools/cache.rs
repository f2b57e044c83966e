//! TTL cache in front of the rate-limited search tool.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;

use super::{MediaSearch, ToolError};
use crate::models::{ClipQuery, MediaClip};

const MAX_CACHED_QUERIES: u64 = 1_000;

/// Wraps a [`MediaSearch`] and reuses results for identical queries.
/// Failures are not cached.
pub struct CachedSearch {
    inner: Arc<dyn MediaSearch>,
    cache: Cache<String, Arc<Vec<MediaClip>>>,
}

impl CachedSearch {
    pub fn new(inner: Arc<dyn MediaSearch>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_CACHED_QUERIES)
            .time_to_live(ttl)
            .build();
        Self { inner, cache }
    }
}

#[async_trait]
impl MediaSearch for CachedSearch {
    async fn search(&self, query: &ClipQuery) -> Result<Vec<MediaClip>, ToolError> {
        let key = query.cache_key();
        if let Some(hit) = self.cache.get(&key) {
            log::debug!("Search cache hit for '{}'", query.query);
            return Ok(hit.as_ref().clone());
        }

        let clips = self.inner.search(query).await?;
        self.cache.insert(key, Arc::new(clips.clone()));
        Ok(clips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSearch {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl MediaSearch for CountingSearch {
        async fn search(&self, _query: &ClipQuery) -> Result<Vec<MediaClip>, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ToolError::Status {
                    tool: "media search",
                    status: 429,
                });
            }
            Ok(Vec::new())
        }
    }

    fn query(text: &str) -> ClipQuery {
        ClipQuery {
            query: text.to_string(),
            per_page: 5,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_identical_queries_hit_cache() {
        let inner = Arc::new(CountingSearch {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let cached = CachedSearch::new(inner.clone(), Duration::from_secs(60));

        cached.search(&query("reef")).await.unwrap();
        cached.search(&query("Reef")).await.unwrap();
        cached.search(&query("kelp")).await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let inner = Arc::new(CountingSearch {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let cached = CachedSearch::new(inner.clone(), Duration::from_secs(60));

        assert!(cached.search(&query("reef")).await.is_err());
        assert!(cached.search(&query("reef")).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
