//! # WAL - Write-Ahead Log
//!
//! Append-only durable record log backing a memtable.
//!
//! Every mutation is serialized and appended to the WAL **before** the
//! corresponding in-memory update. After a crash the older WAL segments in a
//! directory are replayed to rebuild the memtable.
//!
//! ## Segments
//!
//! Each log lives in its own file, `<dir>/wal-<version>.log`. A [`Version`] is
//! a fixed-width timestamp token, so sorting file names sorts segments by
//! creation time.
//!
//! ## Binary Record Format
//!
//! ```text
//! [key_len: u32 BE][value_len: u32 BE][key][value][tombstone: u8]
//! ```
//!
//! Records are written back to back with no framing or padding and are read
//! until end-of-stream. A clean end after the last record is normal; any
//! partial record at the tail is reported as [`WalError::Corrupt`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use util::{BufferPool, Entry};
//! use wal::Wal;
//!
//! let pool = Arc::new(BufferPool::new());
//! let wal = Wal::create("data/wal", pool).unwrap();
//! wal.write(&[Entry::new(b"hello".to_vec(), b"world".to_vec())]).unwrap();
//! let entries = wal.read().unwrap();
//! assert_eq!(entries.len(), 1);
//! wal.close().unwrap();
//! ```

mod version;

pub use version::Version;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use util::{BufferPool, Entry};

/// The write buffer is flushed to the file once it grows past this size.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 5 * 1024 * 1024;

/// Fixed bytes per record besides key and value: two `u32` lengths + tombstone.
const RECORD_OVERHEAD: usize = 4 + 4 + 1;

/// Errors that can occur during WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The log was closed; no further operation is possible.
    #[error("wal is closed")]
    Closed,

    /// A batch was rejected before anything was written.
    #[error("entry at index {index} is invalid: {reason}")]
    InvalidEntry { index: usize, reason: &'static str },

    /// The record stream could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// A version token or segment file name is malformed.
    #[error("invalid wal version: {0:?}")]
    InvalidVersion(String),
}

/// Anything a WAL can live in: a real file, or an in-memory cursor in tests.
pub trait WalFile: Read + Write + Seek + Send {}

impl<T: Read + Write + Seek + Send> WalFile for T {}

/// A single write-ahead log segment.
///
/// All operations take `&self`; the handle sits behind its own mutex so
/// writes, reads and close never interleave.
pub struct Wal<F: WalFile = File> {
    /// `None` once closed.
    file: Mutex<Option<F>>,
    dir: PathBuf,
    path: PathBuf,
    version: Version,
    pool: Arc<BufferPool>,
    flush_threshold: usize,
}

impl Wal<File> {
    /// Creates `dir` if needed and opens a new segment with a fresh version.
    pub fn create<P: AsRef<Path>>(dir: P, pool: Arc<BufferPool>) -> Result<Self, WalError> {
        Self::create_with_version(dir, Version::now(), pool)
    }

    /// Creates `dir` if needed and opens (or creates) the segment for
    /// `version` in append mode.
    pub fn create_with_version<P: AsRef<Path>>(
        dir: P,
        version: Version,
        pool: Arc<BufferPool>,
    ) -> Result<Self, WalError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(version.file_name());
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)?;
        debug!(path = %path.display(), %version, "created wal segment");
        Ok(Self::new(file, dir.to_path_buf(), path, version, pool))
    }

    /// Opens an existing segment. Fails if the file does not exist.
    pub fn open<P: AsRef<Path>>(
        dir: P,
        version: Version,
        pool: Arc<BufferPool>,
    ) -> Result<Self, WalError> {
        let dir = dir.as_ref();
        let path = dir.join(version.file_name());
        let file = OpenOptions::new().append(true).read(true).open(&path)?;
        debug!(path = %path.display(), %version, "opened wal segment");
        Ok(Self::new(file, dir.to_path_buf(), path, version, pool))
    }

    /// Returns `true` if the segment for `version` exists in `dir`.
    pub fn exists<P: AsRef<Path>>(dir: P, version: &Version) -> bool {
        dir.as_ref().join(version.file_name()).is_file()
    }

    /// Closes the segment (if still open) and removes its file.
    pub fn delete(self) -> Result<(), WalError> {
        match self.close() {
            Ok(()) | Err(WalError::Closed) => {}
            Err(e) => return Err(e),
        }
        fs::remove_file(&self.path)?;
        debug!(path = %self.path.display(), "deleted wal segment");
        Ok(())
    }

    /// Forces written records to stable storage via `sync_all()`.
    pub fn sync_to_disk(&self) -> Result<(), WalError> {
        let mut guard = self.file.lock();
        let file = guard.as_mut().ok_or(WalError::Closed)?;
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }
}

impl<F: WalFile> Wal<F> {
    /// Wraps an already-open handle. The WAL has no directory of its own;
    /// `path()` and `dir()` are empty.
    pub fn from_file(file: F, version: Version, pool: Arc<BufferPool>) -> Self {
        Self::new(file, PathBuf::new(), PathBuf::new(), version, pool)
    }

    fn new(file: F, dir: PathBuf, path: PathBuf, version: Version, pool: Arc<BufferPool>) -> Self {
        Self {
            file: Mutex::new(Some(file)),
            dir,
            path,
            version,
            pool,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
        }
    }

    /// Overrides the size at which the write buffer is flushed mid-batch.
    #[must_use]
    pub fn with_flush_threshold(mut self, bytes: usize) -> Self {
        self.flush_threshold = bytes.max(1);
        self
    }

    /// Appends a batch of entries.
    ///
    /// Every entry is validated first; if any has an empty key or value the
    /// whole batch is rejected and nothing is written. Records accumulate in a
    /// pooled buffer that is written out whenever it exceeds the flush
    /// threshold, and once more at the end for the remainder.
    pub fn write(&self, entries: &[Entry]) -> Result<(), WalError> {
        let mut guard = self.file.lock();
        let file = guard.as_mut().ok_or(WalError::Closed)?;

        validate(entries)?;

        file.seek(SeekFrom::End(0))?;
        let mut buf = self.pool.acquire();
        for entry in entries {
            encode_record(&mut buf, entry)?;
            if buf.len() > self.flush_threshold {
                debug!(bytes = buf.len(), "flushing wal buffer");
                file.write_all(&buf)?;
                buf.clear();
            }
        }
        if !buf.is_empty() {
            file.write_all(&buf)?;
        }
        file.flush()?;
        Ok(())
    }

    /// Reads every record in the segment, from the start.
    pub fn read(&self) -> Result<Vec<Entry>, WalError> {
        let mut guard = self.file.lock();
        let file = guard.as_mut().ok_or(WalError::Closed)?;

        file.seek(SeekFrom::Start(0))?;
        let mut buf = self.pool.acquire();
        file.read_to_end(&mut buf)?;
        decode_records(&buf)
    }

    /// Flushes and releases the file handle. Any later operation fails with
    /// [`WalError::Closed`].
    pub fn close(&self) -> Result<(), WalError> {
        let mut guard = self.file.lock();
        let mut file = guard.take().ok_or(WalError::Closed)?;
        file.flush()?;
        debug!(version = %self.version, "closed wal segment");
        Ok(())
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.file.lock().is_none()
    }

    #[must_use]
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Orders this segment's version against `other`.
    #[must_use]
    pub fn compare_version(&self, other: &Version) -> Ordering {
        self.version.compare(other)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl<F: WalFile> std::fmt::Debug for Wal<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wal")
            .field("path", &self.path)
            .field("version", &self.version)
            .field("flush_threshold", &self.flush_threshold)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn validate(entries: &[Entry]) -> Result<(), WalError> {
    for (index, entry) in entries.iter().enumerate() {
        let reason = if entry.key.is_empty() {
            "empty key"
        } else if entry.value.is_empty() {
            "empty value"
        } else if entry.key.len() > u32::MAX as usize || entry.value.len() > u32::MAX as usize {
            "field exceeds u32::MAX bytes"
        } else {
            continue;
        };
        return Err(WalError::InvalidEntry { index, reason });
    }
    Ok(())
}

/// Serializes one record: `[key_len][value_len][key][value][tombstone]`.
fn encode_record(buf: &mut Vec<u8>, entry: &Entry) -> io::Result<()> {
    buf.reserve(RECORD_OVERHEAD + entry.key.len() + entry.value.len());
    buf.write_u32::<BigEndian>(entry.key.len() as u32)?;
    buf.write_u32::<BigEndian>(entry.value.len() as u32)?;
    buf.extend_from_slice(&entry.key);
    buf.extend_from_slice(&entry.value);
    buf.write_u8(entry.tombstone as u8)?;
    Ok(())
}

/// Decodes a complete record stream.
fn decode_records(data: &[u8]) -> Result<Vec<Entry>, WalError> {
    let mut rdr = data;
    let mut entries = Vec::new();

    while !rdr.is_empty() {
        let offset = data.len() - rdr.len();
        let truncated = |what: &str| WalError::Corrupt(format!("truncated {} at offset {}", what, offset));

        let key_len = rdr.read_u32::<BigEndian>().map_err(|_| truncated("header"))? as usize;
        let value_len = rdr.read_u32::<BigEndian>().map_err(|_| truncated("header"))? as usize;
        if key_len + value_len + 1 > rdr.len() {
            return Err(truncated("record body"));
        }

        let (key, rest) = rdr.split_at(key_len);
        let (value, rest) = rest.split_at(value_len);
        let tombstone = match rest[0] {
            0 => false,
            1 => true,
            other => {
                return Err(WalError::Corrupt(format!(
                    "invalid tombstone byte {:#04x} at offset {}",
                    other, offset
                )))
            }
        };
        rdr = &rest[1..];

        entries.push(Entry {
            key: key.to_vec(),
            value: value.to_vec(),
            tombstone,
        });
    }

    Ok(entries)
}
