//! Size-class byte buffer recycler.
//!
//! Real-time capture delivers tens to hundreds of buffers per second.  The
//! [`BufferPool`] keeps a bounded free list for each of four size classes so
//! that steady-state processing stops allocating:
//!
//! | Class  | Typical use                |
//! |--------|----------------------------|
//! | 4 KiB  | small audio chunks         |
//! | 8 KiB  | standard capture packets   |
//! | 16 KiB | large packets              |
//! | 32 KiB | batch buffers              |
//!
//! A buffer's class is its allocation size ([`Vec::capacity`]), so callers may
//! shrink the length of an acquired buffer and still hand it back.  Buffers
//! are zeroed when released, never when acquired.
//!
//! The pool is purely an optimisation: [`acquire`](BufferPool::acquire)
//! always succeeds and [`release`](BufferPool::release) merely reports whether
//! the buffer was kept.  It is not synchronised; share one instance between
//! owners only if access is serialised.
//!
//! ```rust
//! use asr_prep::audio::BufferPool;
//!
//! let mut pool = BufferPool::default();
//! let buf = pool.acquire(3_840);
//! assert_eq!(buf.len(), 4_096);
//! assert!(pool.release(buf));
//! assert_eq!(pool.stats().current_pooled, 1);
//! ```

use std::fmt;

use super::error::AudioError;

/// Pooled allocation sizes in bytes, ascending.
pub const SIZE_CLASSES: [usize; 4] = [4_096, 8_192, 16_384, 32_768];

/// Default bound on each class's free list.
pub const DEFAULT_MAX_BUFFERS_PER_SIZE: usize = 50;

// ---------------------------------------------------------------------------
// PoolStats
// ---------------------------------------------------------------------------

/// Allocation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total `acquire` calls.
    pub allocated: u64,
    /// Acquires served from a free list.
    pub reused: u64,
    /// Buffers freshly allocated (misses and warmup).
    pub created: u64,
    /// Total `release` calls.
    pub released: u64,
    pub hits: u64,
    pub misses: u64,
    /// Buffers currently sitting in free lists.
    pub current_pooled: u64,
}

impl PoolStats {
    /// Fraction of acquires served from the pool, `0.0` before any acquire.
    pub fn hit_rate(&self) -> f64 {
        ratio(self.hits, self.allocated)
    }

    /// Fraction of acquires that reused a buffer, `0.0` before any acquire.
    pub fn reuse_rate(&self) -> f64 {
        ratio(self.reused, self.allocated)
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "acquired {} (hit rate {:.2}%, reuse rate {:.2}%), created {}, released {}, pooled {}",
            self.allocated,
            self.hit_rate() * 100.0,
            self.reuse_rate() * 100.0,
            self.created,
            self.released,
            self.current_pooled,
        )
    }
}

// ---------------------------------------------------------------------------
// BufferPool
// ---------------------------------------------------------------------------

/// Bounded free lists of zeroed byte buffers, one per [`SIZE_CLASSES`] entry.
#[derive(Debug)]
pub struct BufferPool {
    max_buffers_per_size: usize,
    free: [Vec<Vec<u8>>; SIZE_CLASSES.len()],
    stats: PoolStats,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::with_capacity_bound(DEFAULT_MAX_BUFFERS_PER_SIZE)
    }
}

impl BufferPool {
    /// Create a pool keeping at most `max_buffers_per_size` buffers per class.
    ///
    /// # Errors
    ///
    /// [`AudioError::InvalidParameter`] when `max_buffers_per_size` is zero.
    pub fn new(max_buffers_per_size: usize) -> Result<Self, AudioError> {
        if max_buffers_per_size == 0 {
            return Err(AudioError::invalid(
                "max buffers per size",
                "must be at least 1",
            ));
        }
        Ok(Self::with_capacity_bound(max_buffers_per_size))
    }

    fn with_capacity_bound(max_buffers_per_size: usize) -> Self {
        Self {
            max_buffers_per_size,
            free: Default::default(),
            stats: PoolStats::default(),
        }
    }

    fn class_for_request(size: usize) -> Option<usize> {
        SIZE_CLASSES.iter().position(|&class| class >= size)
    }

    fn class_of(capacity: usize) -> Option<usize> {
        SIZE_CLASSES.iter().position(|&class| class == capacity)
    }

    /// Return a zero-filled buffer of at least `size` bytes.
    ///
    /// Requests up to 32 KiB get a buffer whose length is the smallest class
    /// that fits; larger requests get an exact-size, never-pooled allocation.
    pub fn acquire(&mut self, size: usize) -> Vec<u8> {
        self.stats.allocated += 1;

        let Some(idx) = Self::class_for_request(size) else {
            self.stats.misses += 1;
            self.stats.created += 1;
            return vec![0; size];
        };

        if let Some(buffer) = self.free[idx].pop() {
            self.stats.hits += 1;
            self.stats.reused += 1;
            self.stats.current_pooled -= 1;
            return buffer;
        }

        self.stats.misses += 1;
        self.stats.created += 1;
        vec![0; SIZE_CLASSES[idx]]
    }

    /// Hand `buffer` back to the pool.
    ///
    /// Returns `false` (and drops the buffer) when its allocation size is not
    /// a size class or that class's free list is already full.  A kept buffer
    /// is zeroed and restored to its full class length.
    pub fn release(&mut self, mut buffer: Vec<u8>) -> bool {
        self.stats.released += 1;

        let Some(idx) = Self::class_of(buffer.capacity()) else {
            return false;
        };
        if self.free[idx].len() >= self.max_buffers_per_size {
            return false;
        }

        buffer.clear();
        buffer.resize(SIZE_CLASSES[idx], 0);
        self.free[idx].push(buffer);
        self.stats.current_pooled += 1;
        true
    }

    /// Pre-populate every class with up to `count` buffers, never exceeding
    /// the per-class bound.
    pub fn warmup(&mut self, count: usize) {
        for (idx, &class) in SIZE_CLASSES.iter().enumerate() {
            let room = self.max_buffers_per_size - self.free[idx].len();
            let n = count.min(room);
            self.free[idx].extend((0..n).map(|_| vec![0u8; class]));
            self.stats.created += n as u64;
            self.stats.current_pooled += n as u64;
        }
        log::debug!("buffer pool warmed up with {count} buffers per size class");
    }

    /// Drop every pooled buffer.
    pub fn clear(&mut self) {
        for list in &mut self.free {
            list.clear();
        }
        self.stats.current_pooled = 0;
    }

    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    /// Zero the counters, keeping `current_pooled`.
    pub fn reset_stats(&mut self) {
        self.stats = PoolStats {
            current_pooled: self.stats.current_pooled,
            ..PoolStats::default()
        };
    }

    pub fn max_buffers_per_size(&self) -> usize {
        self.max_buffers_per_size
    }

    pub fn size_classes(&self) -> &'static [usize] {
        &SIZE_CLASSES
    }

    /// Free buffers held for the class of exactly `size` bytes (0 for
    /// non-class sizes).
    pub fn pooled_count(&self, size: usize) -> usize {
        Self::class_of(size).map_or(0, |idx| self.free[idx].len())
    }

    /// Maximum number of buffers the pool can hold across all classes.
    pub fn total_capacity(&self) -> usize {
        SIZE_CLASSES.len() * self.max_buffers_per_size
    }

    /// Upper bound on pooled bytes, `Σ class × max_buffers_per_size`.
    pub fn max_pooled_bytes(&self) -> usize {
        SIZE_CLASSES.iter().sum::<usize>() * self.max_buffers_per_size
    }

    /// Bytes currently held in free lists.
    pub fn memory_usage_bytes(&self) -> usize {
        SIZE_CLASSES
            .iter()
            .zip(&self.free)
            .map(|(&class, list)| class * list.len())
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // ---- acquire -----------------------------------------------------------

    #[test]
    fn acquire_rounds_up_to_class() {
        let mut pool = BufferPool::default();
        assert_eq!(pool.acquire(1).len(), 4_096);
        assert_eq!(pool.acquire(4_096).len(), 4_096);
        assert_eq!(pool.acquire(4_097).len(), 8_192);
        assert_eq!(pool.acquire(20_000).len(), 32_768);
        assert_eq!(pool.stats().misses, 4);
        assert_eq!(pool.stats().allocated, 4);
    }

    #[test]
    fn oversize_requests_are_exact_and_unpooled() {
        let mut pool = BufferPool::default();
        let big = pool.acquire(40_000);
        assert_eq!(big.len(), 40_000);
        assert!(!pool.release(big));
        assert_eq!(pool.stats().current_pooled, 0);
        assert_eq!(pool.stats().released, 1);
    }

    // ---- release -----------------------------------------------------------

    #[test]
    fn release_then_acquire_reuses_zeroed_buffer() {
        let mut pool = BufferPool::default();
        let mut buf = pool.acquire(8_192);
        buf.iter_mut().for_each(|b| *b = 0xAB);
        let ptr = buf.as_ptr();

        assert!(pool.release(buf));
        let again = pool.acquire(8_192);
        assert_eq!(again.as_ptr(), ptr);
        assert_eq!(again.len(), 8_192);
        assert!(again.iter().all(|&b| b == 0));
        assert_eq!(pool.stats().hits, 1);
        assert_eq!(pool.stats().reused, 1);
    }

    #[test]
    fn truncated_buffer_restored_on_release() {
        let mut pool = BufferPool::default();
        let mut buf = pool.acquire(4_096);
        buf.truncate(100);
        assert!(pool.release(buf));
        let again = pool.acquire(10);
        assert_eq!(again.len(), 4_096);
    }

    #[test]
    fn non_class_sizes_are_dropped() {
        let mut pool = BufferPool::default();
        assert!(!pool.release(vec![0u8; 5_000]));
        assert!(!pool.release(Vec::new()));
        assert_eq!(pool.memory_usage_bytes(), 0);
    }

    #[test]
    fn full_class_rejects_release() {
        let mut pool = BufferPool::new(2).unwrap();
        assert!(pool.release(vec![0u8; 4_096]));
        assert!(pool.release(vec![0u8; 4_096]));
        assert!(!pool.release(vec![0u8; 4_096]));
        assert_eq!(pool.pooled_count(4_096), 2);
        // other classes unaffected
        assert!(pool.release(vec![0u8; 8_192]));
    }

    #[test]
    fn zero_bound_is_rejected() {
        assert!(matches!(BufferPool::new(0), Err(AudioError::InvalidParameter { .. })));
    }

    // ---- warmup / clear ----------------------------------------------------

    #[test]
    fn warmup_populates_every_class_within_bound() {
        let mut pool = BufferPool::new(3).unwrap();
        pool.warmup(5);
        for &class in &SIZE_CLASSES {
            assert_eq!(pool.pooled_count(class), 3);
        }
        assert_eq!(pool.stats().current_pooled, 12);
        assert_eq!(pool.memory_usage_bytes(), pool.max_pooled_bytes());

        let buf = pool.acquire(16_000);
        assert_eq!(buf.len(), 16_384);
        assert_eq!(pool.stats().hits, 1);
    }

    #[test]
    fn clear_and_reset_stats() {
        let mut pool = BufferPool::default();
        pool.warmup(2);
        let _ = pool.acquire(100);
        pool.reset_stats();
        assert_eq!(pool.stats().allocated, 0);
        assert_eq!(pool.stats().current_pooled, 7);

        pool.clear();
        assert_eq!(pool.stats().current_pooled, 0);
        assert_eq!(pool.memory_usage_bytes(), 0);
    }

    #[test]
    fn hit_and_reuse_rates() {
        let mut pool = BufferPool::default();
        assert_eq!(pool.stats().hit_rate(), 0.0);
        for _ in 0..100 {
            let buf = pool.acquire(8_192);
            pool.release(buf);
        }
        assert!((pool.stats().hit_rate() - 0.99).abs() < 1e-12);
        assert!((pool.stats().reuse_rate() - 0.99).abs() < 1e-12);
        assert!(pool.stats().to_string().contains("hit rate 99.00%"));
    }

    #[test]
    fn capacity_figures() {
        let pool = BufferPool::new(10).unwrap();
        assert_eq!(pool.total_capacity(), 40);
        assert_eq!(pool.max_pooled_bytes(), (4_096 + 8_192 + 16_384 + 32_768) * 10);
    }

    // ---- capacity invariant ------------------------------------------------

    #[derive(Debug, Clone)]
    enum Op {
        Acquire(usize),
        ReleaseHeld(usize),
        ReleaseFresh(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..40_000).prop_map(Op::Acquire),
            (0usize..64).prop_map(Op::ReleaseHeld),
            prop::sample::select(vec![4_096usize, 8_192, 16_384, 32_768, 1_000, 50_000])
                .prop_map(Op::ReleaseFresh),
        ]
    }

    proptest! {
        #[test]
        fn free_lists_never_exceed_bound(max in 1usize..6, ops in prop::collection::vec(op(), 0..200)) {
            let mut pool = BufferPool::new(max).unwrap();
            let mut held: Vec<Vec<u8>> = Vec::new();

            for op in ops {
                match op {
                    Op::Acquire(size) => held.push(pool.acquire(size)),
                    Op::ReleaseHeld(i) if !held.is_empty() => {
                        let buf = held.swap_remove(i % held.len());
                        pool.release(buf);
                    }
                    Op::ReleaseHeld(_) => {}
                    Op::ReleaseFresh(size) => {
                        pool.release(vec![0u8; size]);
                    }
                }
                for &class in &SIZE_CLASSES {
                    prop_assert!(pool.pooled_count(class) <= max);
                }
                prop_assert!(pool.memory_usage_bytes() <= pool.max_pooled_bytes());
                prop_assert_eq!(
                    pool.stats().current_pooled as usize,
                    SIZE_CLASSES.iter().map(|&c| pool.pooled_count(c)).sum::<usize>()
                );
            }
        }
    }
}
