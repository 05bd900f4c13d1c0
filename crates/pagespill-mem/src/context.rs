//! Per-spiller memory reservation.
//!
//! A spiller reports the bytes its I/O buffer occupies through a
//! [`MemoryContext`]. The buffer exists only while a write or read is active,
//! so the reservation is taken through a [`ReservationGuard`] and handed back
//! when the guard drops, whichever way the I/O body exits.

use std::sync::{Arc, Mutex, PoisonError};

use pagespill_core::budget::{BudgetGuard, MemoryBudget};

use crate::error::{Error, Result};
use crate::guard::{BudgetGuardImpl, MemoryBudgetImpl};

/// Reservation handle reporting one owner's bytes to a quota tracker.
///
/// `set_bytes` replaces (does not add to) the current reservation and must
/// never block. `set_bytes(0)` always succeeds and is idempotent.
pub trait MemoryContext: Send + Sync {
    fn set_bytes(&self, bytes: usize) -> Result<()>;

    fn bytes(&self) -> usize;
}

/// [`MemoryContext`] backed by a shared [`MemoryBudgetImpl`].
pub struct LocalMemoryContext {
    budget: MemoryBudgetImpl,
    guard: Mutex<BudgetGuardImpl>,
}

impl LocalMemoryContext {
    pub fn new(budget: &MemoryBudgetImpl, tag: &'static str) -> Self {
        Self {
            budget: budget.clone(),
            guard: Mutex::new(budget.empty_guard(tag)),
        }
    }
}

impl MemoryContext for LocalMemoryContext {
    fn set_bytes(&self, bytes: usize) -> Result<()> {
        let mut guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.try_resize(bytes) {
            return Ok(());
        }
        Err(Error::BudgetExceeded {
            tag: guard.tag(),
            requested: bytes,
            capacity: self.budget.capacity_bytes(),
            used: self.budget.used_bytes(),
        })
    }

    fn bytes(&self) -> usize {
        self.guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .bytes()
    }
}

/// Scoped reservation: sets the context to `bytes` now and back to zero on drop.
pub struct ReservationGuard {
    context: Arc<dyn MemoryContext>,
    released: bool,
}

impl ReservationGuard {
    pub fn acquire(context: Arc<dyn MemoryContext>, bytes: usize) -> Result<Self> {
        context.set_bytes(bytes)?;
        Ok(Self {
            context,
            released: false,
        })
    }

    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            // Shrinking to zero cannot exceed the budget.
            let _ = self.context.set_bytes(0);
        }
    }
}

impl Drop for ReservationGuard {
    fn drop(&mut self) {
        self.release();
    }
}
