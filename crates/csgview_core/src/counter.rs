//! Rendering context ids
//!
//! Every context that passes the compositing capability probe receives a
//! distinct id from a monotonically increasing counter. Production code uses
//! the process-wide [`ContextCounter::global`]; tests inject their own.

use std::sync::atomic::{AtomicU32, Ordering};

static GLOBAL: ContextCounter = ContextCounter::new();

/// Monotonic id source, starting at zero
#[derive(Debug, Default)]
pub struct ContextCounter {
    next: AtomicU32,
}

impl ContextCounter {
    /// Create a counter whose first id is 0
    pub const fn new() -> Self {
        Self { next: AtomicU32::new(0) }
    }

    /// The process-wide counter
    pub fn global() -> &'static ContextCounter {
        &GLOBAL
    }

    /// Hand out the next id
    pub fn next_id(&self) -> u32 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Number of ids handed out so far
    pub fn issued(&self) -> u32 {
        self.next.load(Ordering::Relaxed)
    }

    /// Start over from zero (tests only; production never resets)
    pub fn reset(&self) {
        self.next.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential_from_zero() {
        let counter = ContextCounter::new();
        assert_eq!(counter.next_id(), 0);
        assert_eq!(counter.next_id(), 1);
        assert_eq!(counter.issued(), 2);
    }

    #[test]
    fn test_reset() {
        let counter = ContextCounter::new();
        counter.next_id();
        counter.reset();
        assert_eq!(counter.next_id(), 0);
    }

    #[test]
    fn test_global_is_shared() {
        assert!(std::ptr::eq(ContextCounter::global(), ContextCounter::global()));
    }
}
