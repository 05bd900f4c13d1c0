//! Ordered teardown of a spiller's resources.

use crate::error::{Result, SpillError};

type Release = Box<dyn FnOnce() -> Result<()> + Send>;

/// Releases registered resources last-in first-out.
///
/// Every resource is attempted even when an earlier one fails; all failures
/// come back as one [`SpillError::Close`]. Released resources are forgotten,
/// so closing twice only releases what was registered in between.
#[derive(Default)]
pub struct Closer {
    resources: Vec<(&'static str, Release)>,
}

impl Closer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &'static str, release: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.resources.push((name, Box::new(release)));
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn close(&mut self) -> Result<()> {
        let mut errors = Vec::new();
        while let Some((name, release)) = self.resources.pop() {
            if let Err(e) = release() {
                tracing::warn!(resource = name, error = %e, "failed to release spill resource");
                errors.push(e);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(SpillError::Close(errors))
        }
    }
}
