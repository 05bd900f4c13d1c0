//! The spill file owned by one spiller.
//!
//! Names follow `spill<random>.bin` so files leaked by a crashed process can
//! be found and removed by [`remove_orphaned_spill_files`].

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tempfile::TempPath;

pub const SPILL_FILE_PREFIX: &str = "spill";
pub const SPILL_FILE_SUFFIX: &str = ".bin";

/// Exclusive handle on one temp file; deletes it on release.
pub struct FileHolder {
    path: PathBuf,
    temp: Mutex<Option<TempPath>>,
}

impl FileHolder {
    /// Create a new, empty, uniquely named file in `dir`.
    pub fn create_in(dir: &Path) -> io::Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix(SPILL_FILE_PREFIX)
            .suffix(SPILL_FILE_SUFFIX)
            .tempfile_in(dir)?
            .into_temp_path();
        let path = temp.to_path_buf();
        tracing::debug!(path = %path.display(), "created spill file");
        Ok(Self {
            path,
            temp: Mutex::new(Some(temp)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_released(&self) -> bool {
        self.temp
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Open the file for appending.
    pub fn new_output_stream(&self) -> io::Result<File> {
        self.check_not_released()?;
        OpenOptions::new().append(true).open(&self.path)
    }

    /// Open the file for reading from the start.
    pub fn new_input_stream(&self) -> io::Result<File> {
        self.check_not_released()?;
        File::open(&self.path)
    }

    /// Delete the file. Later calls are no-ops.
    pub fn release(&self) -> io::Result<()> {
        let temp = self
            .temp
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match temp {
            Some(temp) => temp.close(),
            None => Ok(()),
        }
    }

    fn check_not_released(&self) -> io::Result<()> {
        if self.is_released() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("spill file {} already released", self.path.display()),
            ));
        }
        Ok(())
    }
}

pub fn is_spill_file_name(name: &str) -> bool {
    name.len() > SPILL_FILE_PREFIX.len() + SPILL_FILE_SUFFIX.len()
        && name.starts_with(SPILL_FILE_PREFIX)
        && name.ends_with(SPILL_FILE_SUFFIX)
}

/// Delete every spill file directly under `dir`; returns how many were removed.
///
/// Only regular files matching the spill naming scheme are touched. A file
/// that cannot be removed is logged and skipped.
pub fn remove_orphaned_spill_files(dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !is_spill_file_name(name) || !entry.file_type()?.is_file() {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "failed to remove orphaned spill file")
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn appends_accumulate_and_release_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let holder = FileHolder::create_in(dir.path()).unwrap();
        let name = holder.path().file_name().unwrap().to_str().unwrap().to_string();
        assert!(is_spill_file_name(&name), "unexpected name {name}");

        holder.new_output_stream().unwrap().write_all(b"ab").unwrap();
        holder.new_output_stream().unwrap().write_all(b"cd").unwrap();

        let mut text = String::new();
        holder
            .new_input_stream()
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "abcd");

        holder.release().unwrap();
        assert!(!holder.path().exists());
        assert!(holder.is_released());
        holder.release().unwrap();
        assert!(holder.new_input_stream().is_err());
    }

    #[test]
    fn create_in_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(FileHolder::create_in(&missing).is_err());
    }

    #[test]
    fn orphan_cleanup_only_touches_spill_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("spill123.bin"), b"x").unwrap();
        fs::write(dir.path().join("spillabc.bin"), b"x").unwrap();
        fs::write(dir.path().join("keep.bin"), b"x").unwrap();
        fs::write(dir.path().join("spill.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("spilldir.bin")).unwrap();

        assert_eq!(remove_orphaned_spill_files(dir.path()).unwrap(), 2);
        assert!(dir.path().join("keep.bin").exists());
        assert!(dir.path().join("spill.txt").exists());
        assert!(dir.path().join("spilldir.bin").exists());
    }
}
