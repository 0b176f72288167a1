//! Countdown latch signalled once by every logical process on termination.

use std::sync::{Condvar, Mutex};

use crate::lock;

/// Blocks [`wait`][Self::wait] callers until `count_down` has been called
/// `count` times.
pub struct CompletionLatch {
    remaining: Mutex<usize>,
    done:      Condvar,
}

impl CompletionLatch {
    pub fn new(count: usize) -> Self {
        Self { remaining: Mutex::new(count), done: Condvar::new() }
    }

    /// Decrement the count, waking all waiters when it reaches zero.
    /// Extra calls past zero are ignored.
    pub fn count_down(&self) {
        let mut remaining = lock(&self.remaining);
        if *remaining > 0 {
            *remaining -= 1;
            if *remaining == 0 {
                self.done.notify_all();
            }
        }
    }

    pub fn remaining(&self) -> usize {
        *lock(&self.remaining)
    }

    /// Block until the count reaches zero.
    pub fn wait(&self) {
        let mut remaining = lock(&self.remaining);
        while *remaining > 0 {
            remaining = self
                .done
                .wait(remaining)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }
}

/// Counts a latch down when dropped, so a logical process unwinding from a
/// panic still releases its waiters.
pub struct LatchGuard<'a>(Option<&'a CompletionLatch>);

impl<'a> LatchGuard<'a> {
    pub fn new(latch: Option<&'a CompletionLatch>) -> Self {
        Self(latch)
    }
}

impl Drop for LatchGuard<'_> {
    fn drop(&mut self) {
        if let Some(latch) = self.0 {
            latch.count_down();
        }
    }
}
