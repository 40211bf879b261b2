//! Cache-backed fallback wrapper (spec §4.3 `with_fallback`).

use crate::breaker::BoxFuture;
use crate::registry::BreakerRegistry;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use stellarops_types::Error;

/// 15 minute TTL per spec §4.3.
pub const CACHE_TTL: Duration = Duration::from_secs(15 * 60);

struct CacheEntry {
    value: serde_json::Value,
    stored_at: Instant,
}

/// In-process TTL cache keyed by caller-supplied `cache_key`.
#[derive(Default)]
pub struct TtlCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let entries = self.entries.lock().expect("cache mutex poisoned");
        entries.get(key).and_then(|entry| {
            if entry.stored_at.elapsed() <= CACHE_TTL {
                Some(entry.value.clone())
            } else {
                None
            }
        })
    }

    pub fn put(&self, key: String, value: serde_json::Value) {
        self.entries.lock().expect("cache mutex poisoned").insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }
}

/// Options for [`with_fallback`].
pub struct FallbackOptions<T> {
    pub fallback: Option<Box<dyn FnOnce() -> BoxFuture<'static, Result<T, Error>> + Send>>,
    pub cache_key: Option<String>,
}

impl<T> Default for FallbackOptions<T> {
    fn default() -> Self {
        Self {
            fallback: None,
            cache_key: None,
        }
    }
}

/// Runs `primary` through the named breaker in `registry`. On success,
/// caches the JSON-serialized result under `cache_key` if one was supplied.
/// On `CircuitOpen`/`Timeout`, tries the cache first, then the fallback;
/// any other error is returned as-is.
pub async fn with_fallback<T>(
    registry: &BreakerRegistry,
    cache: &TtlCache,
    breaker_name: &str,
    primary: impl FnOnce() -> BoxFuture<'static, Result<T, Error>>,
    mut options: FallbackOptions<T>,
) -> Result<T, Error>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    let breaker = registry
        .by_name(breaker_name)
        .ok_or_else(|| Error::Fatal(format!("unknown breaker '{breaker_name}'")))?;

    let result = breaker.call(primary, None).await;

    match result {
        Ok(value) => {
            if let Some(key) = options.cache_key.take() {
                if let Ok(json) = serde_json::to_value(&value) {
                    cache.put(key, json);
                }
            }
            Ok(value)
        }
        Err(err @ (Error::CircuitOpen(_) | Error::Timeout { .. })) => {
            if let Some(key) = &options.cache_key {
                if let Some(cached) = cache.get(key) {
                    if let Ok(value) = serde_json::from_value(cached) {
                        return Ok(value);
                    }
                }
            }
            if let Some(fallback) = options.fallback.take() {
                return fallback().await;
            }
            Err(err)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::BreakerRegistry;

    fn ok(v: u32) -> BoxFuture<'static, Result<u32, Error>> {
        Box::pin(async move { Ok(v) })
    }

    fn failing() -> BoxFuture<'static, Result<u32, Error>> {
        Box::pin(async { Err(Error::Transient("boom".into())) })
    }

    #[tokio::test(start_paused = true)]
    async fn caches_successful_result_and_serves_it_when_circuit_opens() {
        let registry = BreakerRegistry::default();
        let cache = TtlCache::new();

        let v = with_fallback(
            &registry,
            &cache,
            "orbital",
            || ok(7),
            FallbackOptions {
                cache_key: Some("sat-1".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(v, 7);

        for _ in 0..registry.orbital.config.failure_threshold {
            let _ = with_fallback::<u32>(
                &registry,
                &cache,
                "orbital",
                failing,
                FallbackOptions::default(),
            )
            .await;
        }

        let v = with_fallback(
            &registry,
            &cache,
            "orbital",
            failing,
            FallbackOptions {
                cache_key: Some("sat-1".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(v, 7);
    }
}
