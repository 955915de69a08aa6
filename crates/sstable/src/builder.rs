use anyhow::{bail, Result};
use config::Config;
use std::sync::Arc;
use tracing::debug;
use util::{BufferPool, Entry};

use crate::block::{encode_entries, IndexBlock, IndexEntry};
use crate::format::{BlockHandle, Footer, MetaBlock};

/// Assembles sorted entries into an immutable table image.
///
/// The builder is stateless apart from its settings, so a single instance can
/// serve any number of flushes and compactions concurrently.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    pool: Arc<BufferPool>,
    block_size: usize,
    level: i32,
}

impl TableBuilder {
    pub fn new(pool: Arc<BufferPool>, block_size: usize, level: i32) -> Self {
        Self {
            pool,
            block_size,
            level,
        }
    }

    pub fn from_config(cfg: &Config, pool: Arc<BufferPool>) -> Self {
        Self::new(pool, cfg.block_size, cfg.sstable_level)
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    /// Builds the table bytes `[DataBlock]* MetaBlock IndexBlock Footer`.
    ///
    /// `entries` must be sorted ascending by key with no duplicates. A new
    /// data block starts whenever the next entry would push the current one
    /// past `block_size`, so an oversized entry sits in a block of its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the keys are not strictly ascending or if any
    /// field fails to encode. No partial output is returned.
    pub fn build(&self, entries: &[Entry]) -> Result<Vec<u8>> {
        if let Some(i) = entries.windows(2).position(|w| w[0].key >= w[1].key) {
            bail!("entries not strictly ascending at position {}", i + 1);
        }

        let mut out = self.pool.acquire();
        let mut index = IndexBlock::default();

        let mut start = 0;
        let mut size = 0;
        for (i, entry) in entries.iter().enumerate() {
            if size + entry.size() > self.block_size && size > 0 {
                push_block(&mut out, &mut index, &entries[start..i])?;
                start = i;
                size = 0;
            }
            size += entry.size();
        }
        if start < entries.len() {
            push_block(&mut out, &mut index, &entries[start..])?;
        }

        let meta_offset = out.len() as u64;
        MetaBlock::new(self.level).encode_into(&mut *out)?;
        let index_offset = out.len() as u64;
        index.encode_into(&mut *out)?;

        let footer = Footer {
            meta: BlockHandle::new(meta_offset, index_offset - meta_offset),
            index: BlockHandle::new(index_offset, out.len() as u64 - index_offset),
        };
        footer.encode_into(&mut *out)?;

        debug!(
            entries = entries.len(),
            blocks = index.len(),
            bytes = out.len(),
            level = self.level,
            "built table"
        );
        Ok(out.to_vec())
    }
}

/// Encodes one data block at the end of `out` and indexes it.
fn push_block(out: &mut Vec<u8>, index: &mut IndexBlock, block: &[Entry]) -> Result<()> {
    let (first, last) = match (block.first(), block.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => bail!("refusing to encode an empty data block"),
    };
    let offset = out.len() as u64;
    encode_entries(block, out)?;
    index.push(IndexEntry {
        start_key: first.key.clone(),
        end_key: last.key.clone(),
        handle: BlockHandle::new(offset, out.len() as u64 - offset),
    });
    Ok(())
}

/// Builds a table with a private buffer pool.
pub fn build(entries: &[Entry], block_size: usize, level: i32) -> Result<Vec<u8>> {
    TableBuilder::new(Arc::new(BufferPool::new()), block_size, level).build(entries)
}
