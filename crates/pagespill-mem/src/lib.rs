#![forbid(unsafe_code)]
//! pagespill-mem: memory budget and the accounting sinks a spiller reports to.
//!
//! - [`MemoryBudgetImpl`] is the hard cap shared by every spiller.
//! - [`MemoryContext`] is one spiller's buffer reservation against that cap.
//! - [`SpillContext`] tracks bytes currently on disk for one operator.
//! - [`SpillerStats`] counts bytes ever spilled, process wide.

pub mod context;
pub mod error;
pub mod guard;
pub mod spill_context;
pub mod stats;

pub use context::{LocalMemoryContext, MemoryContext, ReservationGuard};
pub use error::{Error, Result};
pub use guard::{BudgetGuardImpl, MemoryBudgetImpl};
pub use spill_context::{LocalSpillContext, OperatorSpillContext, SpillContext};
pub use stats::SpillerStats;
