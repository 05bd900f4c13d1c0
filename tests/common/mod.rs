//! Shared fixtures for the spiller integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pagespill::{Column, FileSingleStreamSpiller, Page, Scalar, TaskRunner};
use pagespill_core::budget::MemoryBudget;
use pagespill_exec::DEFAULT_BUFFER_SIZE;
use pagespill_io::{JsonPagesSerde, PageCodec};
use pagespill_mem::{
    LocalMemoryContext, MemoryBudgetImpl, MemoryContext, OperatorSpillContext, SpillerStats,
};

/// A page whose single `payload` column holds `rows` blobs of `width` bytes.
pub fn blob_page(rows: usize, width: usize, fill: u8) -> Page {
    Page::try_new(vec![Column::new(
        "payload",
        (0..rows).map(|_| Scalar::Bin(vec![fill; width])).collect(),
    )])
    .expect("valid page")
}

pub fn int_page(values: &[i64]) -> Page {
    Page::try_new(vec![
        Column::new("id", values.iter().copied().map(Scalar::I64).collect()),
        Column::new(
            "label",
            values.iter().map(|v| Scalar::Str(format!("row-{v}"))).collect(),
        ),
    ])
    .expect("valid page")
}

pub struct Harness {
    pub spiller: FileSingleStreamSpiller,
    pub memory: Arc<dyn MemoryContext>,
    pub operator: Arc<OperatorSpillContext>,
    pub stats: Arc<SpillerStats>,
    pub budget: MemoryBudgetImpl,
}

impl Harness {
    pub fn new(dir: &Path) -> Self {
        Self::with_codec(dir, Arc::new(JsonPagesSerde))
    }

    pub fn with_codec(dir: &Path, codec: Arc<dyn PageCodec>) -> Self {
        let budget = MemoryBudgetImpl::new(1024 * 1024);
        let memory: Arc<dyn MemoryContext> =
            Arc::new(LocalMemoryContext::new(&budget, "spill_buffer"));
        let operator = Arc::new(OperatorSpillContext::new());
        let stats = Arc::new(SpillerStats::new());
        let spiller = FileSingleStreamSpiller::new(
            codec,
            TaskRunner::new(2).expect("worker pool"),
            dir,
            Arc::clone(&stats),
            operator.clone(),
            Arc::clone(&memory),
            DEFAULT_BUFFER_SIZE,
        )
        .expect("spiller");
        Self {
            spiller,
            memory,
            operator,
            stats,
            budget,
        }
    }

    pub fn budget_used(&self) -> usize {
        self.budget.used_bytes()
    }
}

/// Spin until `cond` holds; panics after five seconds.
pub fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(2));
    }
}

pub fn spill_files_in(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .expect("read dir")
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .filter(|name| pagespill_io::file::is_spill_file_name(name))
        .collect()
}
