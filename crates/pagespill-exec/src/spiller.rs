//! Single-stream file spiller.
//!
//! One spiller owns one temp file. Pages are appended by write tasks on the
//! shared [`TaskRunner`] and replayed once, in order, after which the spiller
//! is read-only. At most one write or read-materialization task may be in
//! flight; a second request fails fast instead of queuing.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pagespill_core::types::Page;
use pagespill_io::buf::{BoundedBufReader, BoundedBufWriter};
use pagespill_io::file::FileHolder;
use pagespill_io::serde::{read_pages, write_serialized_page, PageCodec, PageReader};
use pagespill_mem::{LocalSpillContext, MemoryContext, ReservationGuard, SpillContext, SpillerStats};

use crate::closer::Closer;
use crate::error::{Result, SpillError};
use crate::runner::{OperationHandle, TaskRunner};

pub const DEFAULT_BUFFER_SIZE: usize = 4 * 1024;

const SPILL_IN_PROGRESS: &str = "spill in progress";
const WRITE_FAILED: &str = "Failed to spill pages";
const READ_FAILED: &str = "Failed to read spilled pages";

/// Pages handed to [`SingleStreamSpiller::spill`], consumed on a worker thread.
pub type PageStream = Box<dyn Iterator<Item = Page> + Send + 'static>;

pub trait SingleStreamSpiller: Send {
    /// Schedule `pages` to be appended to the spill file.
    fn spill(&mut self, pages: PageStream) -> Result<OperationHandle<()>>;

    fn spill_all(&mut self, pages: Vec<Page>) -> Result<OperationHandle<()>> {
        self.spill(Box::new(pages.into_iter()))
    }

    /// Logical size of every page consumed by a write task so far.
    fn spilled_pages_in_memory_size(&self) -> u64;

    /// Switch to read-only and return the spilled pages, decoded lazily.
    fn spilled_pages(&mut self) -> Result<SpilledPages>;

    /// Like [`spilled_pages`](Self::spilled_pages), decoded eagerly on the pool.
    fn all_spilled_pages(&mut self) -> Result<OperationHandle<Vec<Page>>>;

    fn close(&mut self) -> Result<()>;
}

/// State touched by worker tasks.
struct SpillTarget {
    file: FileHolder,
    codec: Arc<dyn PageCodec>,
    stats: Arc<SpillerStats>,
    spill_context: LocalSpillContext,
    memory_context: Arc<dyn MemoryContext>,
    buffer_size: usize,
    spilled_pages_in_memory_size: AtomicU64,
}

impl SpillTarget {
    fn write_pages(&self, pages: PageStream) -> Result<()> {
        let output = self
            .file
            .new_output_stream()
            .map_err(|e| SpillError::storage(WRITE_FAILED, e))?;
        self.append_pages(pages, output)
    }

    /// Frame `pages` onto `output` while holding the buffer reservation.
    fn append_pages<W: Write>(&self, pages: PageStream, output: W) -> Result<()> {
        let _reservation =
            ReservationGuard::acquire(Arc::clone(&self.memory_context), self.buffer_size)?;
        let mut output = BoundedBufWriter::with_capacity(self.buffer_size, output);

        let mut written = 0usize;
        for page in pages {
            let serialized = self
                .codec
                .serialize(&page)
                .map_err(|e| SpillError::storage(WRITE_FAILED, e))?;

            let size = serialized.size_in_bytes();
            self.spill_context.update_bytes(size as i64)?;
            // Relaxed: readers may see a partial sum while a write runs.
            self.spilled_pages_in_memory_size
                .fetch_add(page.size_in_bytes(), Ordering::Relaxed);
            self.stats.add_to_total_spilled_bytes(size);
            write_serialized_page(&mut output, &serialized)
                .map_err(|e| SpillError::storage(WRITE_FAILED, e))?;
            written += 1;
        }
        output
            .finish()
            .map_err(|e| SpillError::storage(WRITE_FAILED, e))?;

        tracing::debug!(
            pages = written,
            path = %self.file.path().display(),
            "spilled pages"
        );
        Ok(())
    }
}

/// Set while a task is in flight; the guard clears it when dropped.
struct InFlightGuard(Arc<AtomicBool>);

impl InFlightGuard {
    fn try_begin(flag: &Arc<AtomicBool>) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SpillError::Concurrency(SPILL_IN_PROGRESS.into()))?;
        Ok(Self(Arc::clone(flag)))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct ReadState {
    reader: Option<PageReader<BoundedBufReader<File>>>,
    reservation: Option<ReservationGuard>,
}

impl ReadState {
    fn close(&mut self) {
        self.reader = None;
        self.reservation = None;
    }
}

fn lock(state: &Mutex<ReadState>) -> MutexGuard<'_, ReadState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Single-pass iterator over spilled pages.
///
/// The input stream and buffer reservation are released when the pages run
/// out, on the first error, on [`close`](Self::close), on drop, or when the
/// owning spiller is closed, whichever comes first.
pub struct SpilledPages {
    state: Arc<Mutex<ReadState>>,
}

impl std::fmt::Debug for SpilledPages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpilledPages").finish_non_exhaustive()
    }
}

impl SpilledPages {
    pub fn close(&mut self) {
        lock(&self.state).close();
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).reader.is_none()
    }
}

impl Iterator for SpilledPages {
    type Item = Result<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut state = lock(&self.state);
        let next = state.reader.as_mut()?.next();
        match next {
            Some(Ok(page)) => Some(Ok(page)),
            Some(Err(e)) => {
                state.close();
                Some(Err(SpillError::storage(READ_FAILED, e)))
            }
            None => {
                state.close();
                None
            }
        }
    }
}

impl Drop for SpilledPages {
    fn drop(&mut self) {
        self.close();
    }
}

pub struct FileSingleStreamSpiller {
    target: Arc<SpillTarget>,
    runner: TaskRunner,
    closer: Closer,
    in_flight: Arc<AtomicBool>,
    writable: bool,
    spill_context_registered: bool,
}

impl FileSingleStreamSpiller {
    /// Create the spill file in `spill_path` right away.
    pub fn new(
        codec: Arc<dyn PageCodec>,
        runner: TaskRunner,
        spill_path: &Path,
        stats: Arc<SpillerStats>,
        spill_context: Arc<dyn SpillContext>,
        memory_context: Arc<dyn MemoryContext>,
        buffer_size: usize,
    ) -> Result<Self> {
        let file = FileHolder::create_in(spill_path)
            .map_err(|e| SpillError::storage("Failed to create spill file", e))?;
        let target = Arc::new(SpillTarget {
            file,
            codec,
            stats,
            spill_context: LocalSpillContext::new(spill_context),
            memory_context,
            buffer_size,
            spilled_pages_in_memory_size: AtomicU64::new(0),
        });

        let mut closer = Closer::new();
        let file_target = Arc::clone(&target);
        closer.register("spill file", move || {
            file_target
                .file
                .release()
                .map_err(|e| SpillError::storage("Failed to delete spill file", e))
        });

        Ok(Self {
            target,
            runner,
            closer,
            in_flight: Arc::new(AtomicBool::new(false)),
            writable: true,
            spill_context_registered: false,
        })
    }

    pub fn file_path(&self) -> &Path {
        self.target.file.path()
    }

    fn check_no_spill_in_progress(&self) -> Result<()> {
        if self.in_flight.load(Ordering::Acquire) {
            return Err(SpillError::Concurrency(SPILL_IN_PROGRESS.into()));
        }
        Ok(())
    }

    fn read_pages(&mut self) -> Result<SpilledPages> {
        if !self.writable {
            return Err(SpillError::Consistency(
                "repeated reads disallowed to prevent potential resource leaks".into(),
            ));
        }
        self.writable = false;

        let input = self
            .target
            .file
            .new_input_stream()
            .map_err(|e| SpillError::storage(READ_FAILED, e))?;
        let reservation = ReservationGuard::acquire(
            Arc::clone(&self.target.memory_context),
            self.target.buffer_size,
        )?;
        let reader = read_pages(
            Arc::clone(&self.target.codec),
            BoundedBufReader::with_capacity(self.target.buffer_size, input),
        );
        let state = Arc::new(Mutex::new(ReadState {
            reader: Some(reader),
            reservation: Some(reservation),
        }));

        let close_state = Arc::clone(&state);
        self.closer.register("spilled page reader", move || {
            lock(&close_state).close();
            Ok(())
        });

        tracing::debug!(path = %self.target.file.path().display(), "reading spilled pages");
        Ok(SpilledPages { state })
    }
}

impl SingleStreamSpiller for FileSingleStreamSpiller {
    fn spill(&mut self, pages: PageStream) -> Result<OperationHandle<()>> {
        let in_flight = InFlightGuard::try_begin(&self.in_flight)?;
        if !self.writable {
            return Err(SpillError::Consistency(
                "spilling no longer allowed after a read has started".into(),
            ));
        }

        let target = Arc::clone(&self.target);
        Ok(self.runner.submit(move || {
            let _in_flight = in_flight;
            let result = target.write_pages(pages);
            if let Err(e) = &result {
                tracing::warn!(path = %target.file.path().display(), error = %e, "spill write failed");
            }
            result
        }))
    }

    fn spilled_pages_in_memory_size(&self) -> u64 {
        self.target
            .spilled_pages_in_memory_size
            .load(Ordering::Relaxed)
    }

    fn spilled_pages(&mut self) -> Result<SpilledPages> {
        self.check_no_spill_in_progress()?;
        self.read_pages()
    }

    fn all_spilled_pages(&mut self) -> Result<OperationHandle<Vec<Page>>> {
        let in_flight = InFlightGuard::try_begin(&self.in_flight)?;
        let pages = self.read_pages()?;
        Ok(self.runner.submit(move || {
            let _in_flight = in_flight;
            pages.collect()
        }))
    }

    fn close(&mut self) -> Result<()> {
        if !self.spill_context_registered {
            self.spill_context_registered = true;
            let target = Arc::clone(&self.target);
            self.closer.register("local spill context", move || {
                target.spill_context.close().map_err(SpillError::from)
            });
        }
        self.closer.close()
    }
}

impl Drop for FileSingleStreamSpiller {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "failed to close spiller on drop");
        }
    }
}
