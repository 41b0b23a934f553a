//! Byte source over any async reader

use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, trace};

use crate::provider::{ByteSource, Chunk};
use crate::{Result, TimingError};

const READ_BUFFER_SIZE: usize = 4096;

/// Reads raw bytes from an [`AsyncRead`]: a device node opened as a file, a
/// pipe, stdin. Every successful read becomes one chunk, stamped on arrival.
///
/// Port settings (baud rate, flow control) are the caller's concern; configure
/// the device before handing it over.
pub struct ReaderSource<R> {
    reader: R,
    name: String,
    buf: Box<[u8]>,
    bytes_read: u64,
}

impl<R> ReaderSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self { reader, name: name.into(), buf: vec![0; READ_BUFFER_SIZE].into(), bytes_read: 0 }
    }

    /// Total bytes delivered so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

impl ReaderSource<tokio::fs::File> {
    /// Open a device node or file for reading.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| TimingError::file_error(path.to_path_buf(), e))?;
        info!("Reading timing bytes from {}", path.display());
        Ok(Self::new(file, path.display().to_string()))
    }
}

impl ReaderSource<tokio::io::Stdin> {
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin(), "stdin")
    }
}

#[async_trait::async_trait]
impl<R> ByteSource for ReaderSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        let n = self.reader.read(&mut self.buf).await.map_err(|e| {
            TimingError::source_failed_with(format!("read from {} failed", self.name), Box::new(e))
        })?;

        if n == 0 {
            debug!(source = %self.name, bytes = self.bytes_read, "reader reached end of stream");
            return Ok(None);
        }

        self.bytes_read += n as u64;
        trace!(source = %self.name, bytes = n, "chunk read");
        Ok(Some(Chunk::now(self.buf[..n].to_vec())))
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}
