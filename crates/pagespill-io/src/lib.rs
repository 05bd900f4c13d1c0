#![forbid(unsafe_code)]
//! pagespill-io: everything that touches the spill file.
//!
//! - `file`: the exclusively owned temp file and orphan cleanup.
//! - `buf`: fixed-capacity buffered reader/writer around the file streams.
//! - `serde`: the page codec and its length-prefixed frame format.
//!
//! Functions here return `std::io::Result`; the spiller decides how to
//! surface them.

pub mod buf;
pub mod file;
pub mod serde;

pub use buf::{BoundedBufReader, BoundedBufWriter};
pub use file::{FileHolder, SPILL_FILE_PREFIX, SPILL_FILE_SUFFIX};
pub use self::serde::{read_pages, JsonPagesSerde, PageCodec, PageReader, SerializedPage};
