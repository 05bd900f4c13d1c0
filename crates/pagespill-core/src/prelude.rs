//! Convenient re-exports for downstream crates.

pub use crate::budget::{BudgetGuard, MemoryBudget};
pub use crate::config::SpillerConfig;
pub use crate::error::{Error, Result};
pub use crate::types::{Column, Page, Scalar};
