//! # MemTable
//!
//! The mutable in-memory write buffer of the LSM tree: a [`SkipList`] for
//! ordered lookups, backed by a [`Wal`] segment for durability.
//!
//! ## Write path
//!
//! ```text
//! set(key, value)
//!   |
//!   v
//! WAL append  --(error)-->  return Err, nothing changed
//!   |
//!   v
//! SkipList upsert (now visible to get)
//! ```
//!
//! The skip list never holds an entry that was not logged first. Reads only
//! consult the skip list.
//!
//! ## Recovery
//!
//! Each memtable gets a fresh WAL segment in its directory. Segments left
//! behind by earlier runs (older versions) are replayed by
//! [`MemTable::recover`]: oldest first, each one is appended to the current
//! segment, applied to the skip list and then deleted.
//!
//! ## Locking
//!
//! One mutex guards the skip list, the WAL handle and the read-only flag, so
//! `set`, `get` and `recover` are fully serialized per instance.

pub mod skiplist;

use anyhow::{Context, Result};
use config::Config;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use util::{BufferPool, Entry};
use wal::{Version, Wal};

pub use skiplist::SkipList;

struct Inner {
    list: SkipList,
    wal: Wal,
    read_only: bool,
}

pub struct MemTable {
    inner: Mutex<Inner>,
    dir: PathBuf,
    pool: Arc<BufferPool>,
}

impl MemTable {
    /// Creates a memtable with a new WAL segment in `dir` (created if
    /// missing) and an empty skip list of `max_level` levels.
    pub fn new<P: AsRef<Path>>(dir: P, max_level: usize, pool: Arc<BufferPool>) -> Result<Self> {
        let wal = Wal::create(dir.as_ref(), Arc::clone(&pool))
            .with_context(|| format!("failed to create WAL in {}", dir.as_ref().display()))?;
        Ok(Self::with_wal(wal, max_level, pool))
    }

    /// Creates a memtable from `cfg.data_dir`, `cfg.skiplist_max_level` and
    /// `cfg.wal_flush_threshold`.
    pub fn from_config(cfg: &Config, pool: Arc<BufferPool>) -> Result<Self> {
        let wal = Wal::create(&cfg.data_dir, Arc::clone(&pool))
            .with_context(|| format!("failed to create WAL in {}", cfg.data_dir.display()))?
            .with_flush_threshold(cfg.wal_flush_threshold);
        Ok(Self::with_wal(wal, cfg.skiplist_max_level, pool))
    }

    fn with_wal(wal: Wal, max_level: usize, pool: Arc<BufferPool>) -> Self {
        let dir = wal.dir().to_path_buf();
        Self {
            inner: Mutex::new(Inner {
                list: SkipList::new(max_level, StdRng::from_os_rng()),
                wal,
                read_only: false,
            }),
            dir,
            pool,
        }
    }

    /// Logs `key -> value` to the WAL, then makes it visible.
    ///
    /// An existing key is overwritten. On a read-only memtable this returns
    /// `Ok(())` without doing anything.
    pub fn set(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.read_only {
            debug!(key_len = key.len(), "memtable is read-only, dropping write");
            return Ok(());
        }

        let entry = Entry::new(key, value);
        inner.wal.write(std::slice::from_ref(&entry))?;
        inner.list.upsert(entry.key, entry.value);
        Ok(())
    }

    /// Looks `key` up in the skip list.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner.lock().list.get(key).map(<[u8]>::to_vec)
    }

    /// Replays every WAL segment in the directory older than the current one.
    ///
    /// Segments are processed in version order. Each is read in full,
    /// appended to the current segment, applied to the skip list and deleted.
    /// Stops at the first error; segments not yet processed stay on disk and
    /// are picked up by the next call. Returns the number of entries replayed.
    pub fn recover(&self) -> Result<usize> {
        let mut guard = self.inner.lock();
        let Inner { list, wal, .. } = &mut *guard;

        let mut segments = Vec::new();
        let dirents = fs::read_dir(&self.dir)
            .with_context(|| format!("failed to list {}", self.dir.display()))?;
        for dirent in dirents {
            let dirent = dirent?;
            if !dirent.file_type()?.is_file() {
                continue;
            }
            let name = dirent.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Ok(version) = Version::from_file_name(name) {
                if wal.compare_version(&version).is_gt() {
                    segments.push(version);
                }
            }
        }
        segments.sort();

        let mut replayed = 0;
        for version in segments {
            let old = Wal::open(&self.dir, version.clone(), Arc::clone(&self.pool))
                .with_context(|| format!("failed to open WAL segment {}", version))?;
            let entries = old
                .read()
                .with_context(|| format!("failed to read WAL segment {}", version))?;

            wal.write(&entries)
                .with_context(|| format!("failed to fold WAL segment {} forward", version))?;
            let count = entries.len();
            for entry in entries {
                list.upsert(entry.key, entry.value);
            }

            old.delete()
                .with_context(|| format!("failed to delete WAL segment {}", version))?;
            info!(segment = %version, entries = count, "replayed wal segment");
            replayed += count;
        }

        Ok(replayed)
    }

    /// Stops accepting writes. Later `set` calls succeed without effect.
    pub fn set_read_only(&self) {
        self.inner.lock().read_only = true;
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.inner.lock().read_only
    }

    /// Sorted snapshot of the contents, ready to hand to the SSTable builder.
    #[must_use]
    pub fn entries(&self) -> Vec<Entry> {
        self.inner.lock().list.entries()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().list.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().list.is_empty()
    }

    /// Version of the WAL segment this memtable writes to.
    #[must_use]
    pub fn wal_version(&self) -> Version {
        self.inner.lock().wal.version().clone()
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Closes the WAL segment. Later writes fail.
    pub fn close(&self) -> Result<()> {
        self.inner.lock().wal.close()?;
        Ok(())
    }
}

impl std::fmt::Debug for MemTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MemTable")
            .field("dir", &self.dir)
            .field("wal_version", inner.wal.version())
            .field("entries", &inner.list.len())
            .field("read_only", &inner.read_only)
            .finish()
    }
}
