//! Monotonic cooperative-cancellation flag shared by the lister, every scan
//! worker, and the aggregator.
//!
//! Modelled as a process-wide atomic rather than a module-scoped singleton so
//! that a whole run can be constructed, driven, and dropped independently of
//! any other run in the same process (useful for tests and for embedding).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct EarlyStop(Arc<AtomicBool>);

impl EarlyStop {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Sets the flag. Idempotent; never resets to false.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_clear_and_is_monotonic() {
        let flag = EarlyStop::new();
        assert!(!flag.is_set());
        flag.trigger();
        assert!(flag.is_set());
        flag.trigger();
        assert!(flag.is_set());
    }

    #[test]
    fn clones_share_state() {
        let flag = EarlyStop::new();
        let clone = flag.clone();
        clone.trigger();
        assert!(flag.is_set());
    }
}
