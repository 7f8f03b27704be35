//! Kernel cache implementation
//!
//! LRU cache of kernel matrix rows for the SMO inner loop. The capacity is
//! derived from a byte budget; rows are stored as `f64`, so a cached row is
//! bit-identical to a recomputed one and results never depend on cache size.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::rc::Rc;

/// Minimum number of rows kept, so the two rows of a working pair both fit
const MIN_ROWS: usize = 2;

/// LRU cache of kernel rows keyed by sample position
pub struct KernelCache {
    rows: LruCache<usize, Rc<[f64]>>,
    hits: u64,
    misses: u64,
}

impl KernelCache {
    /// Create a cache that holds at most `capacity` rows
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(MIN_ROWS)).unwrap_or(NonZeroUsize::MIN);
        Self {
            rows: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Create a cache for a square matrix of `row_len` columns within `memory_bytes`
    ///
    /// A square matrix has `row_len` distinct rows, so the capacity never
    /// exceeds that.
    pub fn with_memory_limit(row_len: usize, memory_bytes: usize) -> Self {
        let row_bytes = row_len.max(1) * std::mem::size_of::<f64>();
        Self::new((memory_bytes / row_bytes).min(row_len))
    }

    /// Return row `i`, computing and inserting it on a miss
    pub fn get_or_insert_with<F>(&mut self, i: usize, compute: F) -> Rc<[f64]>
    where
        F: FnOnce() -> Vec<f64>,
    {
        if let Some(row) = self.rows.get(&i) {
            self.hits += 1;
            return Rc::clone(row);
        }

        self.misses += 1;
        let row: Rc<[f64]> = Rc::from(compute());
        self.rows.put(i, Rc::clone(&row));
        row
    }

    /// Get cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            capacity: self.rows.cap().get(),
            size: self.rows.len(),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub capacity: usize,
    pub size: usize,
}
