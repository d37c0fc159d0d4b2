//! Plan usage counter.
//!
//! Tracks how many leads the account holds against its plan limit so the
//! client can refuse a create before calling the backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Default)]
pub struct UsageCounter {
    used: Arc<AtomicUsize>,
    limit: Option<usize>,
}

impl UsageCounter {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            used: Arc::new(AtomicUsize::new(0)),
            limit,
        }
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::SeqCst)
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn set(&self, used: usize) {
        self.used.store(used, Ordering::SeqCst);
    }

    pub fn increment(&self) {
        self.used.fetch_add(1, Ordering::SeqCst);
    }

    /// Saturates at zero.
    pub fn decrement(&self, n: usize) {
        let _ = self
            .used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                Some(used.saturating_sub(n))
            });
    }

    /// `None` when the plan is unlimited.
    pub fn remaining(&self) -> Option<usize> {
        self.limit.map(|limit| limit.saturating_sub(self.used()))
    }

    pub fn at_limit(&self) -> bool {
        self.remaining() == Some(0)
    }
}
