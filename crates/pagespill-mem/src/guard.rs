//! MemoryBudget + RAII guard implementations.
//!
//! Spill buffers are reserved through a guard before they are allocated.
//! Dropping the guard returns the bytes to the budget (panic-safe).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pagespill_core::budget::{BudgetGuard, MemoryBudget};

struct BudgetInner {
    capacity: usize,
    used: AtomicUsize,
}

impl BudgetInner {
    fn try_acquire(&self, bytes: usize) -> bool {
        let mut cur = self.used.load(Ordering::Relaxed);
        loop {
            let next = cur.saturating_add(bytes);
            if next > self.capacity {
                return false;
            }
            match self
                .used
                .compare_exchange(cur, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return true,
                Err(observed) => cur = observed,
            }
        }
    }

    fn release(&self, bytes: usize) {
        self.used.fetch_sub(bytes, Ordering::AcqRel);
    }
}

/// Budget shared by every spiller created from one factory.
#[derive(Clone)]
pub struct MemoryBudgetImpl {
    inner: Arc<BudgetInner>,
}

impl MemoryBudgetImpl {
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            inner: Arc::new(BudgetInner {
                capacity: capacity_bytes,
                used: AtomicUsize::new(0),
            }),
        }
    }

    /// A guard holding nothing, to be grown with `try_resize`.
    pub(crate) fn empty_guard(&self, tag: &'static str) -> BudgetGuardImpl {
        BudgetGuardImpl {
            inner: Arc::clone(&self.inner),
            bytes: 0,
            tag,
        }
    }
}

/// RAII guard for bytes held against a [`MemoryBudgetImpl`].
pub struct BudgetGuardImpl {
    inner: Arc<BudgetInner>,
    bytes: usize,
    tag: &'static str,
}

impl BudgetGuardImpl {
    /// Resize the reservation in place.
    ///
    /// Shrinking always succeeds. Growing fails (leaving the guard untouched)
    /// when the extra bytes would exceed capacity.
    pub fn try_resize(&mut self, new_bytes: usize) -> bool {
        if new_bytes <= self.bytes {
            self.inner.release(self.bytes - new_bytes);
            self.bytes = new_bytes;
            return true;
        }
        if self.inner.try_acquire(new_bytes - self.bytes) {
            self.bytes = new_bytes;
            true
        } else {
            false
        }
    }
}

impl Drop for BudgetGuardImpl {
    fn drop(&mut self) {
        if self.bytes > 0 {
            self.inner.release(self.bytes);
            self.bytes = 0;
        }
    }
}

impl BudgetGuard for BudgetGuardImpl {
    fn bytes(&self) -> usize {
        self.bytes
    }

    fn tag(&self) -> &'static str {
        self.tag
    }
}

impl MemoryBudget for MemoryBudgetImpl {
    type Guard = BudgetGuardImpl;

    fn try_acquire(&self, bytes: usize, tag: &'static str) -> Option<Self::Guard> {
        if bytes > 0 && !self.inner.try_acquire(bytes) {
            return None;
        }
        let mut guard = self.empty_guard(tag);
        guard.bytes = bytes;
        Some(guard)
    }

    fn capacity_bytes(&self) -> usize {
        self.inner.capacity
    }

    fn used_bytes(&self) -> usize {
        self.inner.used.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_grows_and_shrinks() {
        let budget = MemoryBudgetImpl::new(100);
        let mut guard = budget.try_acquire(0, "test").unwrap();
        assert!(guard.try_resize(60));
        assert_eq!(budget.used_bytes(), 60);
        assert!(!guard.try_resize(120));
        assert_eq!(guard.bytes(), 60);
        assert!(guard.try_resize(10));
        assert_eq!(budget.used_bytes(), 10);
        drop(guard);
        assert_eq!(budget.used_bytes(), 0);
    }

    #[test]
    fn acquire_beyond_capacity_fails() {
        let budget = MemoryBudgetImpl::new(10);
        let _held = budget.try_acquire(8, "test").unwrap();
        assert!(budget.try_acquire(4, "test").is_none());
        assert_eq!(budget.used_bytes(), 8);
    }
}
