use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, warn};

use crate::constants::{SINK_BUFFER_SIZE, STREAMING_BUFFER_SIZE};
use crate::error::{Result, TransferError};

type SinkWriter = BufWriter<GzEncoder<File>>;

/// Lifecycle of a [`GzipSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    /// Created, nothing written yet
    Open,
    /// Holds data that may still sit in the compressor
    Writable,
    /// Every buffering layer was flushed by [`GzipSink::flush`]
    Flushed,
    /// Gzip trailer written and file released; terminal
    Closed,
}

/// Gzip-compressing write target backed by a local file.
///
/// Bytes pass through three layers: an application buffer, the gzip encoder
/// and the file. [`GzipSink::close`] drains them in that order and releases
/// the file handle. A sink dropped without `close` is finished best-effort,
/// so every exit path releases the file.
pub struct GzipSink {
    path: PathBuf,
    writer: Option<SinkWriter>,
    state: SinkState,
    bytes_in: u64,
}

impl GzipSink {
    /// Create `path` and wrap it in a gzip sink.
    ///
    /// `path` must not exist yet. An existing file is never opened, so a
    /// caller that only cleans up sinks it created cannot destroy it.
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| TransferError::local_io(path, e))?;

        let encoder = GzEncoder::new(file, Compression::default());
        debug!("Created gzip sink at {}", path.display());

        Ok(GzipSink {
            path: path.to_path_buf(),
            writer: Some(BufWriter::with_capacity(SINK_BUFFER_SIZE, encoder)),
            state: SinkState::Open,
            bytes_in: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> SinkState {
        self.state
    }

    /// Uncompressed bytes accepted so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_in
    }

    /// Write `buf` and flush the buffering layers behind it.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let writer = self.writer
            .as_mut()
            .ok_or_else(|| TransferError::SinkClosed { path: self.path.clone() })?;

        writer.write_all(buf)
            .and_then(|_| writer.flush())
            .map_err(|e| TransferError::local_io(self.path.clone(), e))?;

        self.bytes_in += buf.len() as u64;
        self.state = SinkState::Writable;
        Ok(buf.len())
    }

    pub fn write_str(&mut self, text: &str) -> Result<usize> {
        self.write(text.as_bytes())
    }

    /// Stream everything from `source` into the sink.
    ///
    /// Memory use is bounded by one read buffer regardless of the input size.
    /// `source_name` labels read failures.
    pub fn copy_from<R: Read + ?Sized>(&mut self, source: &mut R, source_name: &str) -> Result<u64> {
        let writer = self.writer
            .as_mut()
            .ok_or_else(|| TransferError::SinkClosed { path: self.path.clone() })?;

        let start = Instant::now();
        let mut buffer = vec![0u8; STREAMING_BUFFER_SIZE];
        let mut copied = 0u64;

        loop {
            let bytes_read = match source.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransferError::remote_read(source_name, e)),
            };

            writer.write_all(&buffer[..bytes_read])
                .map_err(|e| TransferError::local_io(self.path.clone(), e))?;
            copied += bytes_read as u64;
        }

        self.bytes_in += copied;
        self.state = SinkState::Writable;
        debug!("Copied {} bytes from {} into {} in {:?}",
               copied, source_name, self.path.display(), start.elapsed());
        Ok(copied)
    }

    /// Push buffered data through the compressor into the file.
    pub fn flush(&mut self) -> Result<()> {
        let writer = self.writer
            .as_mut()
            .ok_or_else(|| TransferError::SinkClosed { path: self.path.clone() })?;

        writer.flush().map_err(|e| TransferError::local_io(self.path.clone(), e))?;
        self.state = SinkState::Flushed;
        Ok(())
    }

    /// Flush the buffer, finish the gzip stream, sync and release the file.
    ///
    /// Closing an already closed sink is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };
        self.state = SinkState::Closed;

        finish_layers(writer).map_err(|e| TransferError::local_io(self.path.clone(), e))?;
        debug!("Closed gzip sink {} ({} bytes in)", self.path.display(), self.bytes_in);
        Ok(())
    }
}

impl Drop for GzipSink {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = finish_layers(writer) {
                warn!("Failed to finish gzip sink {}: {}", self.path.display(), e);
            }
        }
    }
}

fn finish_layers(writer: SinkWriter) -> io::Result<()> {
    let encoder = writer.into_inner().map_err(|e| e.into_error())?;
    let file = encoder.finish()?;
    file.sync_all()
}

/// Gzip a small in-memory payload.
pub fn compress_to_memory(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    let compressed = encoder.finish()?;
    debug!("Compressed {} bytes to {} bytes", data.len(), compressed.len());
    Ok(compressed)
}

/// Inflate a complete gzip stream.
pub fn decompress_to_vec(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use proptest::prelude::*;
    use tempfile::TempDir;

    /// Reader that fails after handing out `ok_bytes` bytes.
    struct BrokenReader {
        ok_bytes: usize,
    }

    impl Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.ok_bytes == 0 {
                return Err(io::Error::new(ErrorKind::ConnectionReset, "datanode went away"));
            }
            let n = buf.len().min(self.ok_bytes);
            buf[..n].fill(b'x');
            self.ok_bytes -= n;
            Ok(n)
        }
    }

    #[test]
    fn test_write_close_and_recover() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.gz");

        let mut sink = GzipSink::create(&path).unwrap();
        assert_eq!(sink.state(), SinkState::Open);

        assert_eq!(sink.write_str("hello ").unwrap(), 6);
        assert_eq!(sink.write(b"world").unwrap(), 5);
        assert_eq!(sink.state(), SinkState::Writable);
        sink.close().unwrap();
        assert_eq!(sink.state(), SinkState::Closed);

        let content = decompress_to_vec(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(content, b"hello world");
        assert_eq!(sink.bytes_written(), 11);
    }

    #[test]
    fn test_write_after_close_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("closed.gz");

        let mut sink = GzipSink::create(&path).unwrap();
        sink.write(b"before").unwrap();
        sink.close().unwrap();

        let err = sink.write(b"after").unwrap_err();
        assert!(matches!(err, TransferError::SinkClosed { .. }));
        assert!(matches!(sink.flush(), Err(TransferError::SinkClosed { .. })));
        assert!(sink.close().is_ok());

        let content = decompress_to_vec(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(content, b"before");
    }

    #[test]
    fn test_flush_state() {
        let temp_dir = TempDir::new().unwrap();
        let mut sink = GzipSink::create(&temp_dir.path().join("f.gz")).unwrap();

        sink.write(b"data").unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.state(), SinkState::Flushed);

        sink.write(b"more").unwrap();
        assert_eq!(sink.state(), SinkState::Writable);
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing/dir/out.gz");

        match GzipSink::create(&path) {
            Err(TransferError::LocalIo { path: p, .. }) => assert_eq!(p, path),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("sink created in a missing directory"),
        }
    }

    #[test]
    fn test_create_refuses_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("taken.gz");
        fs::write(&path, b"someone else's data").unwrap();

        match GzipSink::create(&path) {
            Err(TransferError::LocalIo { source, .. }) => assert_eq!(source.kind(), ErrorKind::AlreadyExists),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("sink opened an existing file"),
        }
        assert_eq!(fs::read(&path).unwrap(), b"someone else's data");
    }

    #[test]
    fn test_copy_from_large_stream() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("large.gz");
        let data: Vec<u8> = (0..3 * 1024 * 1024).map(|i| (i % 251) as u8).collect();

        let mut sink = GzipSink::create(&path).unwrap();
        let copied = sink.copy_from(&mut data.as_slice(), "memory").unwrap();
        sink.close().unwrap();

        assert_eq!(copied, data.len() as u64);
        assert_eq!(decompress_to_vec(&fs::read(&path).unwrap()).unwrap(), data);
    }

    #[test]
    fn test_copy_from_read_failure_is_remote_read() {
        let temp_dir = TempDir::new().unwrap();
        let mut sink = GzipSink::create(&temp_dir.path().join("broken.gz")).unwrap();

        let err = sink.copy_from(&mut BrokenReader { ok_bytes: 100_000 }, "/data/part-3").unwrap_err();
        match err {
            TransferError::RemoteRead { path, .. } => assert_eq!(path, "/data/part-3"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_drop_without_close_finishes_stream() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dropped.gz");

        {
            let mut sink = GzipSink::create(&path).unwrap();
            sink.write(b"scoped").unwrap();
        }

        assert_eq!(decompress_to_vec(&fs::read(&path).unwrap()).unwrap(), b"scoped");
    }

    #[test]
    fn test_compress_to_memory_empty_string() {
        let compressed = compress_to_memory(b"").unwrap();
        assert!(!compressed.is_empty());
        assert!(decompress_to_vec(&compressed).unwrap().is_empty());
    }

    #[test]
    fn test_compress_to_memory_multi_megabyte_string() {
        let text = "2023-05-14T00:00:00Z GET /index.html 200\n".repeat(100_000);
        let compressed = compress_to_memory(text.as_bytes()).unwrap();

        assert!(compressed.len() < text.len());
        assert_eq!(String::from_utf8(decompress_to_vec(&compressed).unwrap()).unwrap(), text);
    }

    proptest! {
        #[test]
        fn prop_compress_to_memory_round_trips(text in ".{0,2048}") {
            let compressed = compress_to_memory(text.as_bytes()).unwrap();
            let restored = decompress_to_vec(&compressed).unwrap();
            prop_assert_eq!(String::from_utf8(restored).unwrap(), text);
        }
    }
}
