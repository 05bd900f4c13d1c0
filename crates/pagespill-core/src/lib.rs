#![forbid(unsafe_code)]
//! pagespill-core: page types, configuration, and the memory budget traits.
//!
//! Everything here is plain data. File handling lives in `pagespill-io`,
//! accounting in `pagespill-mem`, and the spiller itself in `pagespill-exec`.

pub mod budget;
pub mod config;
pub mod error;
pub mod prelude;
pub mod types;

pub use error::{Error, Result};
