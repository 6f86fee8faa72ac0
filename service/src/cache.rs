//! Result cache
//!
//! Caches successful validation results keyed by a digest of everything
//! that determines the verdict. Failing results are never stored, so a
//! corrected record is always re-validated. The cache is bounded; once full,
//! the oldest entry is evicted to make room.

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, warn};
use validation_core::report::ValidationResult;
use validation_core::types::ValidationRequest;

/// Cache statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Total number of cache hits
    pub hits: u64,
    /// Total number of cache misses
    pub misses: u64,
    /// Total number of evictions
    pub evictions: u64,
    /// Writes refused because the result was not cacheable
    pub rejected: u64,
    /// Current number of entries
    pub entries: usize,
}

impl CacheStats {
    /// Fraction of lookups that hit, 0.0 before the first lookup
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

#[derive(Debug, Default)]
struct CacheState {
    /// Entries in insertion order; the front is the oldest
    entries: IndexMap<String, ValidationResult>,
    stats: CacheStats,
}

/// Bounded cache of successful validation results
///
/// Shared by concurrent requests. Two requests that compute the same key
/// concurrently both write; the second write replaces the first in place,
/// so the entry count never grows past the bound.
#[derive(Debug)]
pub struct ValidationCache {
    state: RwLock<CacheState>,
    max_entries: usize,
}

impl ValidationCache {
    /// Create a cache holding at most `max_entries` results
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            max_entries: max_entries.max(1),
        }
    }

    /// Look up a cached result
    #[must_use]
    pub fn get(&self, key: &str) -> Option<ValidationResult> {
        let mut state = self.state.write();
        if let Some(result) = state.entries.get(key).cloned() {
            state.stats.hits += 1;
            Some(result)
        } else {
            state.stats.misses += 1;
            None
        }
    }

    /// Store a result if it is cacheable
    ///
    /// A non-cacheable result also drops any entry already held under
    /// `key`, so a failing verdict is never served from the cache. Returns
    /// whether the result was stored.
    pub fn put(&self, key: String, result: &ValidationResult) -> bool {
        let mut state = self.state.write();

        if !result.is_cacheable() {
            state.stats.rejected += 1;
            if state.entries.shift_remove(&key).is_some() {
                debug!(key = %key, "Dropped cached result superseded by a failing verdict");
                state.stats.entries = state.entries.len();
            }
            return false;
        }

        if !state.entries.contains_key(&key) {
            while state.entries.len() >= self.max_entries {
                if let Some((evicted, _)) = state.entries.shift_remove_index(0) {
                    debug!(key = %evicted, "Evicted oldest cached result");
                    state.stats.evictions += 1;
                } else {
                    break;
                }
            }
        }

        state.entries.insert(key, result.clone());
        state.stats.entries = state.entries.len();
        true
    }

    /// Whether a key is cached, without touching the statistics
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.state.read().entries.contains_key(key)
    }

    /// Number of cached results
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Whether the cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Remove every entry and reset the statistics
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.entries.clear();
        state.stats = CacheStats::default();
    }

    /// Current statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.state.read().stats
    }
}

/// Cache key for a request
///
/// Digests the context type, operation, environment, record category, the
/// verdict-affecting configuration, the rule set and the payload. Request
/// id, timestamps and actor are excluded. Object keys are hashed in sorted
/// order, so key order in the payload does not matter.
///
/// Returns `None` when the rule set cannot be serialized; such a request
/// is validated without the cache.
#[must_use]
pub fn cache_key(request: &ValidationRequest) -> Option<String> {
    let mut hasher = blake3::Hasher::new();

    let context = &request.context;
    for part in [
        context.context_type.to_string(),
        format!("{:?}", context.operation),
        context.environment.clone(),
        request.category.to_string(),
        request.config.strict_mode.to_string(),
        format!("{:?}", request.config.max_errors),
        format!("{:?}", request.config.strict_cross_validation),
    ] {
        hasher.update(part.as_bytes());
        hasher.update(&[0]);
    }

    let rules = match serde_json::to_value(&request.rules) {
        Ok(rules) => rules,
        Err(err) => {
            warn!(error = %err, "Rule set not serializable; bypassing cache");
            return None;
        }
    };
    hash_canonical(&mut hasher, &rules);
    hash_canonical(&mut hasher, &request.data.payload);

    Some(hasher.finalize().to_hex().to_string())
}

/// Feed a JSON value into the hasher with object keys in sorted order
fn hash_canonical(hasher: &mut blake3::Hasher, value: &Value) {
    match value {
        Value::Null => {
            hasher.update(b"n");
        }
        Value::Bool(flag) => {
            hasher.update(if *flag { b"t" } else { b"f" });
        }
        Value::Number(number) => {
            hasher.update(b"#");
            hasher.update(number.to_string().as_bytes());
            hasher.update(&[0]);
        }
        Value::String(text) => {
            hasher.update(b"s");
            hasher.update(&(text.len() as u64).to_le_bytes());
            hasher.update(text.as_bytes());
        }
        Value::Array(items) => {
            hasher.update(b"[");
            hasher.update(&(items.len() as u64).to_le_bytes());
            for item in items {
                hash_canonical(hasher, item);
            }
        }
        Value::Object(map) => {
            hasher.update(b"{");
            hasher.update(&(map.len() as u64).to_le_bytes());
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                hasher.update(&(key.len() as u64).to_le_bytes());
                hasher.update(key.as_bytes());
                hash_canonical(hasher, &map[key.as_str()]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use validation_core::report::ResultStatus;
    use validation_core::types::{ContextType, RecordCategory, ValidationContext};

    fn request(payload: Value) -> ValidationRequest {
        ValidationRequest::new(
            ValidationContext::new(ContextType::UserInput),
            RecordCategory::EquipmentSpec,
            payload,
        )
        .with_schema("solar_panel")
    }

    #[test]
    fn test_key_ignores_request_identity_and_key_order() {
        let a = request(json!({ "wattage": 400, "model": "SP-400" }));
        let b = request(json!({ "model": "SP-400", "wattage": 400 }));
        assert_ne!(a.id, b.id);
        assert_eq!(cache_key(&a), cache_key(&b));

        let c = request(json!({ "wattage": 410, "model": "SP-400" }));
        assert_ne!(cache_key(&a), cache_key(&c));

        let mut strict = a.clone();
        strict.config.strict_mode = true;
        assert_ne!(cache_key(&a), cache_key(&strict));

        let mut budgeted = a.clone();
        budgeted.config.max_errors = Some(1);
        assert_ne!(cache_key(&a), cache_key(&budgeted));
        assert!(cache_key(&a).is_some_and(|key| key.len() == 64));
    }

    #[test]
    fn test_bound_holds_under_concurrent_writers() {
        let cache = ValidationCache::new(8);
        let ok = ValidationResult::empty("req");

        std::thread::scope(|scope| {
            for writer in 0..4 {
                let (cache, ok) = (&cache, &ok);
                scope.spawn(move || {
                    for i in 0..50 {
                        cache.put(format!("w{writer}-{i}"), ok);
                        // every writer also races on one shared key
                        cache.put("shared".to_string(), ok);
                    }
                });
            }
        });

        assert_eq!(cache.len(), 8);
        let stats = cache.stats();
        assert_eq!(stats.entries, 8);
        assert!(stats.evictions >= 200 - 8);
    }

    #[test]
    fn test_failing_results_are_rejected() {
        let cache = ValidationCache::new(4);
        let mut failing = ValidationResult::empty("req");
        failing.overall_valid = false;
        failing.status = ResultStatus::Error;

        assert!(!cache.put("k".to_string(), &failing));
        assert!(cache.get("k").is_none());
        let stats = cache.stats();
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.misses, 1);

        assert!(cache.put("k".to_string(), &ValidationResult::empty("earlier")));
        assert!(!cache.put("k".to_string(), &failing));
        assert!(!cache.contains("k"));
    }

    #[test]
    fn test_oldest_entry_evicted() {
        let cache = ValidationCache::new(2);
        let ok = ValidationResult::empty("req");
        cache.put("a".to_string(), &ok);
        cache.put("b".to_string(), &ok);
        // rewriting an existing key doesn't evict
        cache.put("a".to_string(), &ok);
        assert_eq!(cache.stats().evictions, 0);

        cache.put("c".to_string(), &ok);
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_clear_resets() {
        let cache = ValidationCache::new(2);
        cache.put("a".to_string(), &ValidationResult::empty("req"));
        assert!(cache.get("a").is_some());
        assert!((cache.stats().hit_rate() - 1.0).abs() < f64::EPSILON);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
