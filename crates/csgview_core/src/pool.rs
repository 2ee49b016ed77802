//! Reusable per-run slots
//!
//! Compositing a run needs one transient slot per solid (uniform buffer, bind
//! group). Slots are created lazily, kept for later runs, and the pool only
//! grows when a run is longer than any seen before.

use std::ops::{Deref, DerefMut};

/// Pool of slots sized to the largest run observed
#[derive(Debug)]
pub struct SlotPool<T> {
    slots: Vec<T>,
    in_use: usize,
    high_water: usize,
}

impl<T> Default for SlotPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SlotPool<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            in_use: 0,
            high_water: 0,
        }
    }

    /// Mark `count` slots as in use, creating missing ones with `make(index)`
    ///
    /// Returns the reserved slots. Any earlier reservation is replaced.
    pub fn reserve(&mut self, count: usize, mut make: impl FnMut(usize) -> T) -> &mut [T] {
        while self.slots.len() < count {
            let index = self.slots.len();
            self.slots.push(make(index));
        }
        self.in_use = count;
        self.high_water = self.high_water.max(count);
        &mut self.slots[..count]
    }

    /// Release every reserved slot; the slots stay allocated for reuse
    pub fn release(&mut self) {
        self.in_use = 0;
    }

    /// Reserve slots for the lifetime of the returned lease
    pub fn acquire(&mut self, count: usize, make: impl FnMut(usize) -> T) -> Lease<'_, T> {
        self.reserve(count, make);
        Lease { pool: self }
    }

    /// Reserved slot by index
    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots[..self.in_use].get(index)
    }

    /// Reserved slots
    pub fn reserved(&self) -> &[T] {
        &self.slots[..self.in_use]
    }

    /// Largest reservation so far
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Number of allocated slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of currently reserved slots
    pub fn in_use(&self) -> usize {
        self.in_use
    }
}

/// Scoped reservation that releases its slots when dropped
pub struct Lease<'a, T> {
    pool: &'a mut SlotPool<T>,
}

impl<T> Deref for Lease<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        let n = self.pool.in_use;
        &self.pool.slots[..n]
    }
}

impl<T> DerefMut for Lease<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        let n = self.pool.in_use;
        &mut self.pool.slots[..n]
    }
}

impl<T> Drop for Lease<'_, T> {
    fn drop(&mut self) {
        self.pool.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_created_on_demand() {
        let mut pool = SlotPool::new();
        let mut made = 0;
        pool.reserve(3, |i| {
            made += 1;
            i
        });
        assert_eq!(made, 3);
        assert_eq!(pool.reserved(), &[0, 1, 2]);
        pool.release();

        pool.reserve(2, |_| unreachable!("slots should be reused"));
        assert_eq!(pool.in_use(), 2);
        assert_eq!(pool.capacity(), 3);
    }

    #[test]
    fn test_high_water_tracks_longest_run() {
        let mut pool = SlotPool::new();
        for len in [2, 5, 1, 3] {
            pool.reserve(len, |i| i);
            pool.release();
        }
        assert_eq!(pool.high_water(), 5);
        assert_eq!(pool.capacity(), 5);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn test_lease_releases_on_drop() {
        let mut pool = SlotPool::new();
        {
            let mut lease = pool.acquire(4, |i| i * 10);
            assert_eq!(lease.len(), 4);
            lease[1] = 7;
        }
        assert_eq!(pool.in_use(), 0);
        let lease = pool.acquire(2, |_| 0);
        assert_eq!(&*lease, &[0, 7]);
    }

    #[test]
    fn test_lease_released_on_early_return() {
        fn fails(pool: &mut SlotPool<u32>) -> Result<(), ()> {
            let _lease = pool.acquire(3, |_| 0);
            Err(())
        }
        let mut pool = SlotPool::new();
        assert!(fails(&mut pool).is_err());
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn test_get_only_sees_reserved() {
        let mut pool = SlotPool::new();
        pool.reserve(3, |i| i);
        pool.release();
        pool.reserve(1, |i| i);
        assert_eq!(pool.get(0), Some(&0));
        assert_eq!(pool.get(1), None);
    }
}
