use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SpillError>;

#[derive(Debug, Error)]
pub enum SpillError {
    /// The write-then-read state machine was broken by the caller.
    #[error("inconsistent spiller use: {0}")]
    Consistency(String),

    /// An operation was issued while another is still in flight.
    #[error("concurrent spiller use: {0}")]
    Concurrency(String),

    #[error("{context}: {source}")]
    StorageIo {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("spill memory: {0}")]
    Memory(#[from] pagespill_mem::Error),

    #[error("spill task failed: {0}")]
    TaskFailed(String),

    #[error("failed to close spiller: {}", join_errors(.0))]
    Close(Vec<SpillError>),

    #[error("spiller config: {0}")]
    Config(#[from] pagespill_core::Error),
}

impl SpillError {
    pub fn storage(context: &'static str, source: io::Error) -> Self {
        SpillError::StorageIo { context, source }
    }
}

fn join_errors(errors: &[SpillError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
