#![forbid(unsafe_code)]
//! pagespill: spill pages to a private temp file and replay them once.
//!
//! Re-exports the workspace crates under one roof:
//! - `pagespill_core`: pages, config, budget traits
//! - `pagespill_mem`: memory budget and accounting sinks
//! - `pagespill_io`: spill file handle, buffered streams, page codec
//! - `pagespill_exec`: the spiller, worker pool, and factory

pub use pagespill_core;
pub use pagespill_exec;
pub use pagespill_io;
pub use pagespill_mem;

pub use pagespill_core::config::SpillerConfig;
pub use pagespill_core::types::{Column, Page, Scalar};
pub use pagespill_exec::{
    FileSingleStreamSpiller, FileSingleStreamSpillerFactory, OperationHandle, SingleStreamSpiller,
    SpillError, SpilledPages, TaskRunner,
};
