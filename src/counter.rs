//! Atomic counter primitive for job bookkeeping.
//!
//! All per-job accounting (pending dependency counts, live-job capacity
//! tracking) goes through this counter rather than raw atomics so that
//! callers always get the post-operation value back. Returning the value
//! after the increment/decrement lets exactly one thread observe "I drove
//! this to zero" without a separate read, which would race.

use std::sync::atomic::{AtomicUsize, Ordering};

/// A lock-free counter whose mutating operations return the
/// post-operation value.
#[derive(Debug)]
pub struct AtomicCounter {
    value: AtomicUsize,
}

impl AtomicCounter {
    /// Creates a new counter with the specified initial value.
    pub fn new(initial: usize) -> Self {
        AtomicCounter {
            value: AtomicUsize::new(initial),
        }
    }

    /// Adds `delta` and returns the value after the addition.
    pub fn add(&self, delta: usize) -> usize {
        self.value.fetch_add(delta, Ordering::SeqCst) + delta
    }

    /// Increments by one and returns the value after the increment.
    pub fn increment(&self) -> usize {
        self.add(1)
    }

    /// Decrements by one and returns the value after the decrement.
    ///
    /// # Panics
    ///
    /// Panics if the counter is already zero. An underflow here always
    /// means a caller decremented more times than it held.
    pub fn decrement(&self) -> usize {
        let previous = self.value.fetch_sub(1, Ordering::SeqCst);
        assert!(previous > 0, "AtomicCounter underflow");
        previous - 1
    }

    /// Atomically replaces `current` with `new`.
    ///
    /// Returns true if the counter held `current` and the swap happened.
    pub fn compare_and_set(&self, current: usize, new: usize) -> bool {
        self.value
            .compare_exchange(current, new, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Returns the current value of the counter.
    pub fn get(&self) -> usize {
        self.value.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_post_operation_values() {
        let counter = AtomicCounter::new(1);
        assert_eq!(counter.increment(), 2);
        assert_eq!(counter.add(3), 5);
        assert_eq!(counter.decrement(), 4);
        assert_eq!(counter.get(), 4);
    }

    #[test]
    fn test_counter_drive_to_zero() {
        let counter = AtomicCounter::new(2);
        assert_eq!(counter.decrement(), 1);
        assert_eq!(counter.decrement(), 0);
    }

    #[test]
    #[should_panic(expected = "underflow")]
    fn test_counter_underflow_asserts() {
        let counter = AtomicCounter::new(0);
        counter.decrement();
    }

    #[test]
    fn test_compare_and_set() {
        let counter = AtomicCounter::new(7);
        assert!(!counter.compare_and_set(3, 9));
        assert_eq!(counter.get(), 7);
        assert!(counter.compare_and_set(7, 9));
        assert_eq!(counter.get(), 9);
    }

    #[test]
    fn test_concurrent_decrement_single_zero_observer() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let counter = Arc::new(AtomicCounter::new(8));
        let zero_observers = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = counter.clone();
                let zero_observers = zero_observers.clone();
                std::thread::spawn(move || {
                    if counter.decrement() == 0 {
                        zero_observers.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.get(), 0);
        assert_eq!(zero_observers.load(Ordering::SeqCst), 1);
    }
}
