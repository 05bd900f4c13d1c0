#![forbid(unsafe_code)]
//! pagespill-exec: the single-stream spiller and what runs it.
//!
//! - `spiller`: [`FileSingleStreamSpiller`], write-then-read-once over a temp file.
//! - `runner`: the shared worker pool and [`OperationHandle`].
//! - `factory`: directory selection and spiller construction.
//! - `closer`: ordered, failure-aggregating teardown.

pub mod closer;
pub mod error;
pub mod factory;
pub mod runner;
pub mod spiller;

pub use error::{Result, SpillError};
pub use factory::FileSingleStreamSpillerFactory;
pub use runner::{OperationHandle, TaskRunner};
pub use spiller::{
    FileSingleStreamSpiller, PageStream, SingleStreamSpiller, SpilledPages, DEFAULT_BUFFER_SIZE,
};
