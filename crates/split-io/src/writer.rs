use futures_util::StreamExt;
use splitdl_core::{ByteRange, ByteStream, SplitError};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

pub const DEFAULT_BUFFER_SIZE: usize = 256 * 1024;

/// The local file every range is assembled into.
///
/// Creation happens once, before any [`RangeWriter`] opens it; afterwards the
/// file is only ever touched through positioned writes.
#[derive(Debug, Clone)]
pub struct OutputFile {
    path: PathBuf,
    size: u64,
}

impl OutputFile {
    /// Creates (or truncates) the file and sizes it to `size` bytes.
    pub async fn create(path: impl Into<PathBuf>, size: u64) -> Result<Self, SplitError> {
        let path = path.into();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .await?;

        file.set_len(size).await?;
        tracing::debug!(path = %path.display(), size, "created output file");

        Ok(Self { path, size })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn range_writer(
        &self,
        range: ByteRange,
        buffer_size: usize,
    ) -> Result<RangeWriter, SplitError> {
        if range.end >= self.size {
            return Err(SplitError::InvalidArgument(format!(
                "range {}-{} lies outside a {} byte file",
                range.start, range.end, self.size
            )));
        }
        RangeWriter::open(&self.path, range, buffer_size).await
    }
}

/// Writes exactly one range of the output file through its own handle.
///
/// Small network pieces are held in `pending` until `buffer_size` bytes have
/// collected, so the file sees fewer, larger writes. `remaining` counts the
/// bytes the range can still accept, buffered or not.
pub struct RangeWriter {
    file: File,
    range: ByteRange,
    pending: Vec<u8>,
    buffer_size: usize,
    remaining: u64,
    written: u64,
}

impl RangeWriter {
    pub async fn open(
        path: &Path,
        range: ByteRange,
        buffer_size: usize,
    ) -> Result<Self, SplitError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .open(path)
            .await?;

        file.seek(SeekFrom::Start(range.start)).await?;

        let buffer_size = buffer_size.max(1);
        Ok(Self {
            file,
            range,
            pending: Vec::with_capacity(buffer_size),
            buffer_size,
            remaining: range.len(),
            written: 0,
        })
    }

    /// Queues `data` for writing. Returns the number of bytes that reached
    /// the file during this call (zero while they are still buffered).
    ///
    /// Nothing is written once `data` would run past the end of the range.
    pub async fn write(&mut self, data: &[u8]) -> Result<u64, SplitError> {
        let len = data.len() as u64;
        if len > self.remaining {
            return Err(SplitError::Overflow {
                expected: self.range.len(),
            });
        }
        self.remaining -= len;

        let mut flushed = 0;
        if self.pending.len() + data.len() > self.buffer_size {
            flushed += self.flush().await?;
        }

        if data.len() > self.buffer_size {
            self.file.write_all(data).await?;
            self.written += len;
            flushed += len;
        } else {
            self.pending.extend_from_slice(data);
        }

        Ok(flushed)
    }

    /// Pushes buffered bytes to the file; returns how many were written.
    pub async fn flush(&mut self) -> Result<u64, SplitError> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        let len = self.pending.len() as u64;
        self.file.write_all(&self.pending).await?;
        self.pending.clear();
        self.written += len;
        Ok(len)
    }

    /// Drains `stream` into the range, calling `on_written` each time bytes
    /// land in the file. Fails unless exactly `range.len()` bytes arrive.
    pub async fn copy_from<F>(
        mut self,
        mut stream: ByteStream,
        mut on_written: F,
    ) -> Result<u64, SplitError>
    where
        F: FnMut(u64),
    {
        while let Some(piece) = stream.next().await {
            let piece = piece?;
            let n = self.write(&piece).await?;
            if n > 0 {
                on_written(n);
            }
        }
        drop(stream);

        self.finish(on_written).await
    }

    async fn finish<F>(mut self, mut on_written: F) -> Result<u64, SplitError>
    where
        F: FnMut(u64),
    {
        let n = self.flush().await?;
        if n > 0 {
            on_written(n);
        }
        self.file.flush().await?;

        let expected = self.range.len();
        if self.written != expected {
            return Err(SplitError::ShortWrite {
                expected,
                actual: self.written,
            });
        }

        tracing::debug!(
            start = self.range.start,
            end = self.range.end,
            bytes = self.written,
            "range written"
        );
        Ok(self.written)
    }
}
