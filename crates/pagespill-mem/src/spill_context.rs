//! Bytes currently spilled, per operator.
//!
//! An operator owns one [`OperatorSpillContext`]; each of its spillers reports
//! through a [`LocalSpillContext`] child, which gives back everything it
//! reported when closed (the spill file is gone by then).

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

pub trait SpillContext: Send + Sync {
    /// Add `delta` (possibly negative) to the bytes spilled.
    fn update_bytes(&self, delta: i64) -> Result<()>;

    fn spilled_bytes(&self) -> i64;
}

/// Root context for one operator.
#[derive(Debug, Default)]
pub struct OperatorSpillContext {
    spilled: AtomicI64,
}

impl OperatorSpillContext {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpillContext for OperatorSpillContext {
    fn update_bytes(&self, delta: i64) -> Result<()> {
        let now = self.spilled.fetch_add(delta, Ordering::AcqRel) + delta;
        tracing::trace!(delta, spilled = now, "operator spill bytes");
        Ok(())
    }

    fn spilled_bytes(&self) -> i64 {
        self.spilled.load(Ordering::Acquire)
    }
}

/// Child context owned by exactly one spiller.
pub struct LocalSpillContext {
    parent: Arc<dyn SpillContext>,
    spilled: AtomicI64,
    closed: AtomicBool,
}

impl LocalSpillContext {
    pub fn new(parent: Arc<dyn SpillContext>) -> Self {
        Self {
            parent,
            spilled: AtomicI64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Subtract everything reported so far from the parent. Idempotent.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let spilled = self.spilled.swap(0, Ordering::AcqRel);
        self.parent.update_bytes(-spilled)
    }
}

impl SpillContext for LocalSpillContext {
    fn update_bytes(&self, delta: i64) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::ContextClosed);
        }
        self.spilled.fetch_add(delta, Ordering::AcqRel);
        self.parent.update_bytes(delta)
    }

    fn spilled_bytes(&self) -> i64 {
        self.spilled.load(Ordering::Acquire)
    }
}
