//! Streaming export.
//!
//! [`spawn_export`] runs the exporter on a worker thread that writes into a
//! bounded channel of byte chunks. The consumer reads the archive through
//! [`ExportStream`] as it is produced; at most `channel_depth` chunks are
//! buffered, so a slow consumer throttles blob fetches.
//!
//! Dropping the stream (or calling [`ExportStream::abort`]) closes the
//! channel. The worker sees a broken pipe on its next write, stops fetching
//! media, and ends with [`ExchangeError::Cancelled`].
//!
//! If the worker stops before the archive is complete, reading past the
//! last chunk fails with `UnexpectedEof` instead of reporting a clean end.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::blob::BlobStore;
use crate::config::ExchangeConfig;
use crate::storage::SqliteStorage;

use super::export::Exporter;
use super::types::{ExchangeError, ExchangeResult, ExportSelection, ExportStats};

/// `Write` half of the pipeline: buffers bytes and sends fixed-size chunks.
pub struct ChannelWriter {
    tx: SyncSender<Vec<u8>>,
    buffer: Vec<u8>,
    chunk_size: usize,
}

impl ChannelWriter {
    #[must_use]
    pub fn new(tx: SyncSender<Vec<u8>>, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            tx,
            buffer: Vec::with_capacity(chunk_size),
            chunk_size,
        }
    }

    fn send_buffer(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let chunk = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.chunk_size));
        self.tx
            .send(chunk)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "export consumer closed the stream"))
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let room = self.chunk_size - self.buffer.len();
        let n = room.min(buf.len());
        self.buffer.extend_from_slice(&buf[..n]);
        if self.buffer.len() >= self.chunk_size {
            self.send_buffer()?;
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffer()
    }
}

/// `Read` half of the pipeline, owned by the consumer.
pub struct ExportStream {
    rx: Option<Receiver<Vec<u8>>>,
    current: Vec<u8>,
    pos: usize,
    cancel: Arc<AtomicBool>,
    complete: Arc<AtomicBool>,
    handle: Option<JoinHandle<ExchangeResult<ExportStats>>>,
}

impl ExportStream {
    /// Close the stream and wait for the worker's outcome.
    ///
    /// After reading to EOF this returns the export statistics. Finishing
    /// early cancels the export.
    ///
    /// # Errors
    ///
    /// Returns the worker's error, `Cancelled` if the stream was not fully read.
    pub fn finish(mut self) -> ExchangeResult<ExportStats> {
        self.rx = None;
        self.join()
    }

    /// Cancel the export and wait for the worker to stop.
    pub fn abort(mut self) {
        self.cancel.store(true, Ordering::Release);
        self.rx = None;
        if let Err(e) = self.join() {
            debug!(error = %e, "Export aborted");
        }
    }

    fn join(&mut self) -> ExchangeResult<ExportStats> {
        let Some(handle) = self.handle.take() else {
            return Err(ExchangeError::Cancelled);
        };
        handle
            .join()
            .map_err(|_| ExchangeError::Io(io::Error::other("export worker panicked")))?
    }
}

impl Read for ExportStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.current.len() {
            let Some(rx) = &self.rx else {
                return Ok(0);
            };
            match rx.recv() {
                Ok(chunk) => {
                    self.current = chunk;
                    self.pos = 0;
                }
                Err(_) if self.complete.load(Ordering::Acquire) => return Ok(0),
                Err(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "export stopped before the archive was complete",
                    ))
                }
            }
        }

        let n = buf.len().min(self.current.len() - self.pos);
        buf[..n].copy_from_slice(&self.current[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Drop for ExportStream {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel.store(true, Ordering::Release);
        }
    }
}

/// Start an export on a worker thread and return the consumer side.
///
/// # Errors
///
/// Returns an error if the worker thread cannot be spawned.
pub fn spawn_export<B>(
    storage: SqliteStorage,
    blobs: B,
    config: &ExchangeConfig,
    selection: ExportSelection,
) -> ExchangeResult<ExportStream>
where
    B: BlobStore + 'static,
{
    let (tx, rx) = mpsc::sync_channel(config.channel_depth.max(1));
    let cancel = Arc::new(AtomicBool::new(false));
    let worker_cancel = Arc::clone(&cancel);
    let complete = Arc::new(AtomicBool::new(false));
    let worker_complete = Arc::clone(&complete);
    let config = config.clone();

    let handle = thread::Builder::new()
        .name("folio-export".to_string())
        .spawn(move || {
            let exporter = Exporter::new(&storage, &blobs, &config).with_cancel(worker_cancel);
            let mut sink = ChannelWriter::new(tx, config.chunk_size);
            let result = match exporter.export(&selection, &mut sink) {
                Err(e) if e.is_broken_pipe() => {
                    debug!("Export consumer went away");
                    Err(ExchangeError::Cancelled)
                }
                other => other,
            };
            if result.is_ok() {
                worker_complete.store(true, Ordering::Release);
            }
            // The sender must outlive the completion flag.
            drop(sink);
            result
        })?;

    Ok(ExportStream {
        rx: Some(rx),
        current: Vec::new(),
        pos: 0,
        cancel,
        complete,
        handle: Some(handle),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::AtomicUsize;

    use serde_json::json;

    use crate::blob::{BlobError, BlobPage, MemoryBlobStore};
    use crate::exchange::archive::ArchiveReader;
    use crate::exchange::test_support::{seed_chair, seed_project};
    use crate::model::Artifact;

    #[derive(Clone)]
    struct CountingStore {
        inner: MemoryBlobStore,
        gets: Arc<AtomicUsize>,
    }

    impl BlobStore for CountingStore {
        fn get(&self, key: &str) -> Result<Box<dyn Read + Send + '_>, BlobError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get(key)
        }
        fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), BlobError> {
            self.inner.put(key, bytes, content_type)
        }
        fn delete(&self, keys: &[String]) -> Result<(), BlobError> {
            self.inner.delete(keys)
        }
        fn list(&self, prefix: &str, after: Option<&str>, limit: usize) -> Result<BlobPage, BlobError> {
            self.inner.list(prefix, after, limit)
        }
    }

    const MEDIA_COUNT: usize = 40;

    fn large_store() -> (SqliteStorage, CountingStore) {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let store = CountingStore {
            inner: MemoryBlobStore::new(),
            gets: Arc::new(AtomicUsize::new(0)),
        };
        let project = seed_project(&mut storage, "archive");
        for i in 0..MEDIA_COUNT {
            let key = format!("artifacts/{i}.png");
            store.inner.put(&key, &vec![u8::try_from(i).unwrap(); 8192], "image/png").unwrap();
            storage
                .insert_artifact(
                    &Artifact::new(&project.id, "image-v1", json!({"imageUrl": format!("/{key}")})),
                    "seed",
                )
                .unwrap();
        }
        (storage, store)
    }

    fn tight_config() -> ExchangeConfig {
        ExchangeConfig {
            channel_depth: 1,
            chunk_size: 1024,
            ..ExchangeConfig::default()
        }
    }

    #[test]
    fn test_channel_writer_chunks_and_flushes() {
        let (tx, rx) = mpsc::sync_channel(8);
        let mut writer = ChannelWriter::new(tx, 4);
        writer.write_all(b"abcdefghij").unwrap();
        writer.flush().unwrap();
        drop(writer);

        let chunks: Vec<Vec<u8>> = rx.iter().collect();
        assert_eq!(chunks, vec![b"abcd".to_vec(), b"efgh".to_vec(), b"ij".to_vec()]);
    }

    #[test]
    fn test_channel_writer_reports_broken_pipe() {
        let (tx, rx) = mpsc::sync_channel(1);
        drop(rx);
        let mut writer = ChannelWriter::new(tx, 2);
        let err = writer.write_all(b"abcd").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_stream_yields_complete_archive() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let blobs = MemoryBlobStore::new();
        seed_chair(&mut storage, &blobs);

        let mut stream =
            spawn_export(storage, blobs, &tight_config(), ExportSelection::everything()).unwrap();
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes).unwrap();
        let stats = stream.finish().unwrap();
        assert_eq!(stats.projects, 1);
        assert_eq!(stats.media_written, 1);

        let mut reader = ArchiveReader::open(Cursor::new(bytes)).unwrap();
        let (manifest, hashed) = reader.manifest().unwrap();
        assert!(hashed);
        assert_eq!(manifest.projects[0].name, "chair");
        assert_eq!(reader.media_entries().len(), 1);
    }

    #[test]
    fn test_large_export_streams_fully() {
        let (storage, store) = large_store();
        let gets = Arc::clone(&store.gets);

        let mut stream =
            spawn_export(storage, store, &tight_config(), ExportSelection::everything()).unwrap();
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes).unwrap();
        let stats = stream.finish().unwrap();

        assert_eq!(stats.media_written, MEDIA_COUNT);
        assert_eq!(gets.load(Ordering::SeqCst), MEDIA_COUNT);
        let reader = ArchiveReader::open(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.media_entries().len(), MEDIA_COUNT);
    }

    #[test]
    fn test_early_close_stops_fetching() {
        let (storage, store) = large_store();
        let gets = Arc::clone(&store.gets);

        let mut stream =
            spawn_export(storage, store, &tight_config(), ExportSelection::everything()).unwrap();
        let mut head = [0u8; 512];
        stream.read_exact(&mut head).unwrap();
        assert_eq!(&head[..2], b"PK");

        let result = stream.finish();
        assert!(matches!(result, Err(ExchangeError::Cancelled)));
        assert!(gets.load(Ordering::SeqCst) < MEDIA_COUNT);
    }

    struct PanickingStore(MemoryBlobStore);

    impl BlobStore for PanickingStore {
        fn get(&self, _: &str) -> Result<Box<dyn Read + Send + '_>, BlobError> {
            panic!("blob backend crashed");
        }
        fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), BlobError> {
            self.0.put(key, bytes, content_type)
        }
        fn delete(&self, keys: &[String]) -> Result<(), BlobError> {
            self.0.delete(keys)
        }
        fn list(&self, prefix: &str, after: Option<&str>, limit: usize) -> Result<BlobPage, BlobError> {
            self.0.list(prefix, after, limit)
        }
    }

    #[test]
    fn test_worker_crash_is_not_a_clean_eof() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let blobs = MemoryBlobStore::new();
        seed_chair(&mut storage, &blobs);

        let mut stream = spawn_export(
            storage,
            PanickingStore(blobs),
            &tight_config(),
            ExportSelection::everything(),
        )
        .unwrap();
        let mut bytes = Vec::new();
        let err = stream.read_to_end(&mut bytes).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(matches!(stream.finish(), Err(ExchangeError::Io(_))));
    }

    #[test]
    fn test_abort_joins_worker() {
        let (storage, store) = large_store();
        let gets = Arc::clone(&store.gets);

        let stream =
            spawn_export(storage, store, &tight_config(), ExportSelection::everything()).unwrap();
        stream.abort();

        let after = gets.load(Ordering::SeqCst);
        assert!(after < MEDIA_COUNT);
        assert_eq!(gets.load(Ordering::SeqCst), after);
    }
}
