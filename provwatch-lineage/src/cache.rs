//! Memoization of analyzer results.
//!
//! Results are stored as serialized JSON keyed by the batch fingerprint,
//! the analyzer name and its parameters, so a cache shared between batches
//! never serves one batch's answers for another. The cache is an ordinary
//! value owned by whoever runs the analyses; there is no global instance.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Identity of one analyzer invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub fingerprint: u64,
    pub analyzer: &'static str,
    /// Parameters rendered to a stable string, e.g. `format!("{:?}", query)`.
    pub params: String,
}

impl CacheKey {
    pub fn new(fingerprint: u64, analyzer: &'static str, params: impl Into<String>) -> Self {
        Self {
            fingerprint,
            analyzer,
            params: params.into(),
        }
    }
}

/// Thread-safe JSON result cache.
#[derive(Debug, Default)]
pub struct AnalysisCache {
    entries: RwLock<HashMap<CacheKey, Arc<str>>>,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, or compute, store and return it.
    ///
    /// Errors from `compute` are returned as-is and nothing is stored.
    pub fn get_or_compute<T, E, F>(&self, key: CacheKey, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, E>,
    {
        let cached = self.entries.read().get(&key).cloned();
        if let Some(json) = cached {
            match serde_json::from_str(&json) {
                Ok(value) => {
                    debug!(analyzer = key.analyzer, params = %key.params, "cache hit");
                    return Ok(value);
                }
                Err(e) => {
                    warn!(
                        analyzer = key.analyzer,
                        error = %e,
                        "failed to deserialize cached result"
                    );
                }
            }
        }

        debug!(analyzer = key.analyzer, params = %key.params, "cache miss, computing");
        let value = compute()?;

        match serde_json::to_string(&value) {
            Ok(json) => {
                self.entries.write().insert(key, Arc::from(json));
            }
            Err(e) => {
                warn!(analyzer = key.analyzer, error = %e, "failed to serialize result for cache");
            }
        }
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
