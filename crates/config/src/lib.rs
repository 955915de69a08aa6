//! # Config - storage core settings
//!
//! A single [`Config`] value carries every tunable used by the memtable, WAL
//! and SSTable builder. Defaults are usable as-is; [`Config::from_env`]
//! overlays environment variables:
//!
//! ```text
//! LSM_DATA_DIR            WAL directory                    (default: "data/wal")
//! LSM_SKIPLIST_MAX_LEVEL  skip list level cap              (default: 12)
//! LSM_BLOCK_SIZE          SSTable data block size, bytes   (default: 4096)
//! LSM_BLOOM_FPR           bloom false positive rate        (default: 0.01)
//! LSM_WAL_FLUSH_KB        WAL write buffer flush, KiB      (default: 5120 = 5 MiB)
//! LSM_SSTABLE_LEVEL       level stamped into new tables    (default: 0)
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_DATA_DIR: &str = "data/wal";
pub const DEFAULT_SKIPLIST_MAX_LEVEL: usize = 12;
pub const DEFAULT_BLOCK_SIZE: usize = 4096;
pub const DEFAULT_BLOOM_FPR: f64 = 0.01;
/// 5 MiB: the WAL flushes its write buffer to the file once it grows past this.
pub const DEFAULT_WAL_FLUSH_THRESHOLD: usize = 5 * 1024 * 1024;
pub const DEFAULT_SSTABLE_LEVEL: i32 = 0;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory holding the `wal-<version>.log` segments of a memtable.
    pub data_dir: PathBuf,
    pub skiplist_max_level: usize,
    /// Target upper bound for an encoded data block's payload.
    pub block_size: usize,
    pub bloom_false_positive_rate: f64,
    pub wal_flush_threshold: usize,
    pub sstable_level: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            skiplist_max_level: DEFAULT_SKIPLIST_MAX_LEVEL,
            block_size: DEFAULT_BLOCK_SIZE,
            bloom_false_positive_rate: DEFAULT_BLOOM_FPR,
            wal_flush_threshold: DEFAULT_WAL_FLUSH_THRESHOLD,
            sstable_level: DEFAULT_SSTABLE_LEVEL,
        }
    }
}

impl Config {
    /// Builds a config from `LSM_*` environment variables, falling back to
    /// the defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Config::from_env) but reads through `lookup`,
    /// which keeps tests independent of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let data_dir = lookup("LSM_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(d.data_dir);
        let flush_kb = parse_or(
            &lookup,
            "LSM_WAL_FLUSH_KB",
            d.wal_flush_threshold / 1024,
        );

        let cfg = Self {
            data_dir,
            skiplist_max_level: parse_or(&lookup, "LSM_SKIPLIST_MAX_LEVEL", d.skiplist_max_level),
            block_size: parse_or(&lookup, "LSM_BLOCK_SIZE", d.block_size),
            bloom_false_positive_rate: parse_or(
                &lookup,
                "LSM_BLOOM_FPR",
                d.bloom_false_positive_rate,
            ),
            wal_flush_threshold: flush_kb * 1024,
            sstable_level: parse_or(&lookup, "LSM_SSTABLE_LEVEL", d.sstable_level),
        };
        cfg.sanitized()
    }

    /// Replaces out-of-range settings with defaults.
    fn sanitized(mut self) -> Self {
        if self.skiplist_max_level == 0 {
            warn!("LSM_SKIPLIST_MAX_LEVEL must be >= 1, using default");
            self.skiplist_max_level = DEFAULT_SKIPLIST_MAX_LEVEL;
        }
        if self.block_size == 0 {
            warn!("LSM_BLOCK_SIZE must be >= 1, using default");
            self.block_size = DEFAULT_BLOCK_SIZE;
        }
        let p = self.bloom_false_positive_rate;
        if !(p > 0.0 && p < 1.0) {
            warn!(fpr = p, "LSM_BLOOM_FPR must be in (0, 1), using default");
            self.bloom_false_positive_rate = DEFAULT_BLOOM_FPR;
        }
        if self.wal_flush_threshold == 0 {
            warn!("LSM_WAL_FLUSH_KB must be >= 1, using default");
            self.wal_flush_threshold = DEFAULT_WAL_FLUSH_THRESHOLD;
        }
        self
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "ignoring unparsable setting");
            default
        }),
        None => default,
    }
}
