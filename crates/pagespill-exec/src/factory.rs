//! Builds spillers that share one worker pool, codec, budget, and stats sink.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pagespill_core::config::SpillerConfig;
use pagespill_io::file::remove_orphaned_spill_files;
use pagespill_io::serde::{JsonPagesSerde, PageCodec};
use pagespill_mem::{LocalMemoryContext, MemoryBudgetImpl, SpillContext, SpillerStats};

use crate::error::{Result, SpillError};
use crate::runner::TaskRunner;
use crate::spiller::FileSingleStreamSpiller;

pub struct FileSingleStreamSpillerFactory {
    runner: TaskRunner,
    codec: Arc<dyn PageCodec>,
    stats: Arc<SpillerStats>,
    budget: MemoryBudgetImpl,
    spill_paths: Vec<PathBuf>,
    buffer_size: usize,
    next_path: AtomicUsize,
}

impl FileSingleStreamSpillerFactory {
    /// Factory with its own worker pool and the JSON page codec.
    pub fn from_config(config: &SpillerConfig) -> Result<Self> {
        let runner = TaskRunner::new(config.worker_threads)
            .map_err(|e| SpillError::storage("Failed to start spill worker pool", e))?;
        Self::new(
            config,
            runner,
            Arc::new(JsonPagesSerde),
            Arc::new(SpillerStats::new()),
        )
    }

    /// Prepare every spill directory: create it and, if configured, remove
    /// spill files left behind by earlier processes.
    pub fn new(
        config: &SpillerConfig,
        runner: TaskRunner,
        codec: Arc<dyn PageCodec>,
        stats: Arc<SpillerStats>,
    ) -> Result<Self> {
        config.validate()?;

        let spill_paths: Vec<PathBuf> = config.spill_paths.iter().map(PathBuf::from).collect();
        for path in &spill_paths {
            fs::create_dir_all(path)
                .map_err(|e| SpillError::storage("Failed to create spill directory", e))?;
            if config.cleanup_orphans_on_start {
                match remove_orphaned_spill_files(path) {
                    Ok(0) => {}
                    Ok(removed) => {
                        tracing::info!(path = %path.display(), removed, "removed orphaned spill files")
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "could not clean spill directory")
                    }
                }
            }
        }

        Ok(Self {
            runner,
            codec,
            stats,
            budget: MemoryBudgetImpl::new(config.mem_cap_bytes),
            spill_paths,
            buffer_size: config.buffer_size,
            next_path: AtomicUsize::new(0),
        })
    }

    /// New spiller in the next spill directory (round-robin).
    pub fn create(&self, spill_context: Arc<dyn SpillContext>) -> Result<FileSingleStreamSpiller> {
        let index = self.next_path.fetch_add(1, Ordering::Relaxed) % self.spill_paths.len();
        let memory_context = Arc::new(LocalMemoryContext::new(&self.budget, "spill_buffer"));
        FileSingleStreamSpiller::new(
            Arc::clone(&self.codec),
            self.runner.clone(),
            &self.spill_paths[index],
            Arc::clone(&self.stats),
            spill_context,
            memory_context,
            self.buffer_size,
        )
    }

    pub fn stats(&self) -> &Arc<SpillerStats> {
        &self.stats
    }

    pub fn budget(&self) -> &MemoryBudgetImpl {
        &self.budget
    }

    pub fn spill_paths(&self) -> &[PathBuf] {
        &self.spill_paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagespill_mem::OperatorSpillContext;

    #[test]
    fn invalid_config_rejected() {
        let config = SpillerConfig {
            spill_paths: vec![],
            ..SpillerConfig::default()
        };
        let err = FileSingleStreamSpillerFactory::from_config(&config)
            .err()
            .expect("empty path list must fail");
        assert!(matches!(err, SpillError::Config(_)));
    }

    #[test]
    fn creates_missing_directories() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        let config = SpillerConfig {
            spill_paths: vec![nested.to_string_lossy().into_owned()],
            worker_threads: 1,
            ..SpillerConfig::default()
        };
        let factory = FileSingleStreamSpillerFactory::from_config(&config).unwrap();
        assert!(nested.is_dir());
        let spiller = factory
            .create(Arc::new(OperatorSpillContext::new()))
            .unwrap();
        assert!(spiller.file_path().starts_with(&nested));
    }
}
