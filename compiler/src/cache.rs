//! Compile-result caches
//!
//! Lookups and inserts each take the lock briefly; compiling happens outside
//! it. Two threads missing on the same key both compile and both insert, and
//! the later insert wins. The pipeline is pure, so both values are equal.
//! Entries live as long as the cache and failures are never stored.

use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fxhash::FxHashMap;
use parking_lot::Mutex;

use crate::factory::CompiledShaderSet;
use crate::pipeline::StageOutput;

pub struct CompileCache<K, V> {
    entries: Mutex<FxHashMap<K, Arc<V>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

/// Hit and miss counters of a cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

impl<K: Eq + Hash, V> CompileCache<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(FxHashMap::default()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn search(&self, key: &K) -> Option<Arc<V>> {
        let found = self.entries.lock().get(key).cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store `value`, replacing any entry a racing compile inserted first
    pub fn insert(&self, key: K, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.entries.lock().insert(key, Arc::clone(&value));
        value
    }

    /// Return the cached value or compile, store and return a new one
    pub fn get_or_compile<E>(&self, key: K, compile: impl FnOnce() -> Result<V, E>) -> Result<Arc<V>, E> {
        if let Some(value) = self.search(&key) {
            log::debug!("compile cache hit");
            return Ok(value);
        }
        log::debug!("compile cache miss");
        let value = compile()?;
        Ok(self.insert(key, value))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl<K: Eq + Hash, V> Default for CompileCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Single stage results keyed on the fully assembled source
pub type ShaderCache = CompileCache<String, StageOutput>;

/// Whole-pipeline key for targets that link all stages together
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub code: u32,
    /// Assembled source per stage slot, empty for absent stages
    pub sources: [String; 6],
}

pub type PipelineCache = CompileCache<PipelineKey, CompiledShaderSet>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_hit_after_insert() {
        let cache: CompileCache<String, u32> = CompileCache::new();
        assert!(cache.search(&"a".to_string()).is_none());
        cache.insert("a".to_string(), 7);
        assert_eq!(*cache.search(&"a".to_string()).unwrap(), 7);
        let stats = cache.stats();
        assert_eq!((stats.entries, stats.hits, stats.misses), (1, 1, 1));
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let cache: CompileCache<&str, u32> = CompileCache::new();
        let failed: Result<_, &str> = cache.get_or_compile("k", || Err("broken"));
        assert!(failed.is_err());
        assert!(cache.is_empty());

        let compiled = cache.get_or_compile("k", || Ok::<_, ()>(3)).unwrap();
        assert_eq!(*compiled, 3);
        let again = cache.get_or_compile("k", || Err::<u32, ()>(())).unwrap();
        assert!(Arc::ptr_eq(&compiled, &again));
    }

    #[test]
    fn test_concurrent_compiles_converge() {
        let cache: Arc<CompileCache<u32, String>> = Arc::new(CompileCache::new());
        let compiles = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let compiles = Arc::clone(&compiles);
                thread::spawn(move || {
                    for key in 0..16u32 {
                        let value = cache
                            .get_or_compile(key, || {
                                compiles.fetch_add(1, Ordering::Relaxed);
                                Ok::<_, ()>(format!("shader {}", key))
                            })
                            .unwrap();
                        assert_eq!(*value, format!("shader {}", key));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 16);
        assert!(compiles.load(Ordering::Relaxed) >= 16);
    }
}
