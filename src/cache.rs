//! Compiled path-template caching.
//!
//! Resolved paths are recomputed for every matched segment on every
//! navigation (once for the outgoing route, once for the incoming one). The
//! set of templates in an application is small and fixed, so their
//! tokenization is memoised in an LRU cache built on the [`lru`] crate. Gated
//! behind the `cache` feature.
//!
//! [`CacheStats`] tracks hits, misses, and invalidations.
//!
//! # Examples
//!
//! ```
//! use shell_navigator::cache::TemplateCache;
//! use shell_navigator::path::CompiledPath;
//! use std::sync::Arc;
//!
//! let mut cache = TemplateCache::new();
//! cache.insert("/users/:id".to_string(), Arc::new(CompiledPath::parse("/users/:id")));
//!
//! assert!(cache.get("/users/:id").is_some());
//! assert_eq!(cache.stats().hits, 1);
//! ```

use crate::path::CompiledPath;
use crate::{debug_log, trace_log};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Counters tracking cache effectiveness.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: usize,
    /// Lookups that had to tokenize the template.
    pub misses: usize,
    /// Number of full invalidations (via [`TemplateCache::clear`]).
    pub invalidations: usize,
}

impl CacheStats {
    /// Hit rate in `0.0..=1.0`; `0.0` before any lookup.
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// LRU cache from template string to its tokenized form.
#[derive(Debug)]
pub struct TemplateCache {
    entries: LruCache<String, Arc<CompiledPath>>,
    stats: CacheStats,
}

impl TemplateCache {
    const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(256) {
        Some(cap) => cap,
        None => NonZeroUsize::MIN,
    };

    /// Create a cache holding up to 256 templates.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a cache with a custom capacity.
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
            stats: CacheStats::default(),
        }
    }

    /// Look up a template. Updates hit/miss stats.
    pub fn get(&mut self, template: &str) -> Option<Arc<CompiledPath>> {
        if let Some(entry) = self.entries.get(template) {
            self.stats.hits += 1;
            trace_log!("Template cache hit: '{}'", template);
            Some(Arc::clone(entry))
        } else {
            self.stats.misses += 1;
            trace_log!("Template cache miss: '{}'", template);
            None
        }
    }

    /// Store a tokenized template.
    pub fn insert(&mut self, template: String, compiled: Arc<CompiledPath>) {
        self.entries.push(template, compiled);
    }

    /// Drop every entry and count an invalidation.
    pub fn clear(&mut self) {
        let removed = self.entries.len();
        self.entries.clear();
        self.stats.invalidations += 1;
        debug_log!(
            "Template cache cleared: {} entries removed (hit rate: {:.1}%)",
            removed,
            self.stats.hit_rate() * 100.0
        );
    }

    /// Current statistics.
    pub const fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Number of cached templates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new()
    }
}
