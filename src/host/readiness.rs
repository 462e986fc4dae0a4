//! One-shot readiness event
//!
//! A value that is set exactly once and can be waited for from any number of
//! threads. Used as the catalog load barrier and as the "player entity
//! available" signal.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

pub struct Readiness<T> {
    value: Mutex<Option<T>>,
    ready: Condvar,
}

impl<T> Default for Readiness<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Readiness<T> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    /// Set the value and wake every waiter.
    ///
    /// Only the first call has an effect; returns whether this call set it.
    pub fn set(&self, value: T) -> bool {
        let mut slot = self.value.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(value);
        drop(slot);
        self.ready.notify_all();
        true
    }

    pub fn is_set(&self) -> bool {
        self.value.lock().is_some()
    }
}

impl<T: Clone> Readiness<T> {
    /// Current value, without waiting
    pub fn get(&self) -> Option<T> {
        self.value.lock().as_ref().cloned()
    }

    /// Wait until the value is set
    pub fn wait(&self) -> T {
        let mut slot = self.value.lock();
        loop {
            if let Some(value) = slot.as_ref() {
                return value.clone();
            }
            self.ready.wait(&mut slot);
        }
    }

    /// Wait until the value is set or `timeout` elapses.
    ///
    /// A timeout too large to represent as a deadline waits indefinitely.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<T> {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.wait_until(deadline),
            None => Some(self.wait()),
        }
    }

    /// Wait until the value is set or `deadline` passes
    pub fn wait_until(&self, deadline: Instant) -> Option<T> {
        let mut slot = self.value.lock();
        loop {
            if let Some(value) = slot.as_ref() {
                return Some(value.clone());
            }
            if self.ready.wait_until(&mut slot, deadline).timed_out() {
                return slot.as_ref().cloned();
            }
        }
    }
}
