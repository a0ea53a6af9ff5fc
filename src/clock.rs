//! Monotonic time supplied by the embedding environment, used for fix
//! freshness only.

use core::cell::Cell;

pub trait Clock {
    /// Milliseconds since an arbitrary fixed point. Must never go backwards.
    fn now_ms(&self) -> u64;

    fn elapsed_since(&self, reference_ms: u64) -> u64 {
        self.now_ms().saturating_sub(reference_ms)
    }
}

impl<F: Fn() -> u64> Clock for F {
    fn now_ms(&self) -> u64 {
        self()
    }
}

/// Hand-driven clock for tests and replay.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    current_ms: Cell<u64>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ms: u64) {
        self.current_ms.set(ms);
    }

    pub fn advance(&self, ms: u64) {
        self.current_ms.set(self.current_ms.get() + ms);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.current_ms.get()
    }
}
