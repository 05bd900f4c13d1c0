//! Spiller configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpillerConfig {
    /// Directories spill files are created in, used round-robin.
    pub spill_paths: Vec<String>,

    /// Size of the write/read buffer; also the bytes reserved per active spill.
    pub buffer_size: usize,

    /// Hard memory cap (in bytes) for spill buffers across all spillers.
    pub mem_cap_bytes: usize,

    /// Threads in the shared spill worker pool.
    pub worker_threads: usize,

    /// Remove leftover spill files from earlier runs when the factory starts.
    pub cleanup_orphans_on_start: bool,
}

impl Default for SpillerConfig {
    fn default() -> Self {
        Self {
            spill_paths: vec!["/tmp/pagespill".to_string()],
            buffer_size: 4 * 1024,
            mem_cap_bytes: 512 * 1024 * 1024, // 512 MiB default
            worker_threads: 4,
            cleanup_orphans_on_start: true,
        }
    }
}

impl SpillerConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `PAGESPILL_SPILL_PATHS`: comma separated spill directories
    /// - `PAGESPILL_BUFFER_SIZE`: I/O buffer size in bytes
    /// - `PAGESPILL_MEM_CAP_BYTES`: memory cap in bytes
    /// - `PAGESPILL_WORKER_THREADS`: worker pool size
    /// - `PAGESPILL_CLEANUP_ORPHANS`: `true`/`false`
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("PAGESPILL_SPILL_PATHS") {
            let paths: Vec<String> = s
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            if !paths.is_empty() {
                cfg.spill_paths = paths;
            }
        }

        if let Ok(s) = std::env::var("PAGESPILL_BUFFER_SIZE") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.buffer_size = v;
            }
        }

        if let Ok(s) = std::env::var("PAGESPILL_MEM_CAP_BYTES") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.mem_cap_bytes = v;
            }
        }

        if let Ok(s) = std::env::var("PAGESPILL_WORKER_THREADS") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.worker_threads = v;
            }
        }

        if let Ok(s) = std::env::var("PAGESPILL_CLEANUP_ORPHANS") {
            if let Ok(v) = s.parse::<bool>() {
                cfg.cleanup_orphans_on_start = v;
            }
        }

        cfg
    }

    /// Reject configurations the factory cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.spill_paths.is_empty() {
            return Err(Error::Config("at least one spill path is required".into()));
        }
        if self.buffer_size == 0 {
            return Err(Error::Config("buffer_size must be positive".into()));
        }
        if self.buffer_size > self.mem_cap_bytes {
            return Err(Error::Config(format!(
                "buffer_size {} exceeds mem_cap_bytes {}",
                self.buffer_size, self.mem_cap_bytes
            )));
        }
        if self.worker_threads == 0 {
            return Err(Error::Config("worker_threads must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let cfg = SpillerConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.buffer_size, 4096);
    }

    #[test]
    fn rejects_empty_paths_and_zero_sizes() {
        let mut cfg = SpillerConfig::default();
        cfg.spill_paths.clear();
        assert!(cfg.validate().is_err());

        let mut cfg = SpillerConfig::default();
        cfg.buffer_size = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = SpillerConfig::default();
        cfg.worker_threads = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = SpillerConfig::default();
        cfg.mem_cap_bytes = 10;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn json_round_trip() {
        let cfg = SpillerConfig {
            spill_paths: vec!["/a".into(), "/b".into()],
            ..SpillerConfig::default()
        };
        let text = serde_json::to_string(&cfg).unwrap();
        let back: SpillerConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }
}
