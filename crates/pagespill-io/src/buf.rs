//! Bounded buffered reader and writer with a fixed cap.
//!
//! The spiller reserves exactly `capacity` bytes against its memory context
//! while one of these is alive, so neither wrapper may grow its buffer.

use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};

/// A thin wrapper over `BufReader` with a fixed capacity to bound in-flight bytes.
pub struct BoundedBufReader<R: Read> {
    inner: BufReader<R>,
}

impl<R: Read> BoundedBufReader<R> {
    pub fn with_capacity(capacity: usize, reader: R) -> Self {
        Self {
            inner: BufReader::with_capacity(capacity, reader),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Bytes currently buffered and not yet consumed.
    pub fn buffer_len(&self) -> usize {
        self.inner.buffer().len()
    }
}

impl<R: Read> Read for BoundedBufReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read> BufRead for BoundedBufReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt)
    }
}

/// Write-side counterpart of [`BoundedBufReader`].
///
/// Call [`finish`](Self::finish) to surface flush errors; dropping the writer
/// flushes on a best-effort basis and swallows failures.
pub struct BoundedBufWriter<W: Write> {
    inner: BufWriter<W>,
}

impl<W: Write> BoundedBufWriter<W> {
    pub fn with_capacity(capacity: usize, writer: W) -> Self {
        Self {
            inner: BufWriter::with_capacity(capacity, writer),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Flush buffered bytes and return the underlying stream.
    pub fn finish(self) -> io::Result<W> {
        self.inner.into_inner().map_err(|e| e.into_error())
    }
}

impl<W: Write> Write for BoundedBufWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
