use anyhow::{bail, Context, Result};
use bloom::BloomFilter;
use config::DEFAULT_BLOOM_FPR;
use std::fs;
use std::path::Path;
use util::Entry;

use crate::block::{DataBlock, IndexBlock};
use crate::format::{Footer, MetaBlock, FOOTER_BYTES};

/// An assembled table held in memory for point lookups and merges.
///
/// On load the footer, meta block and index block are decoded once. Every
/// key is also added to a [`BloomFilter`] so that misses usually return
/// without touching a data block.
pub struct Table {
    data: Vec<u8>,
    footer: Footer,
    meta: MetaBlock,
    index: IndexBlock,
    bloom: BloomFilter,
    len: usize,
}

impl Table {
    /// Parses table bytes produced by the builder.
    ///
    /// # Cost
    ///
    /// Loading is O(table size): every data block is decoded once, both to
    /// check it against its index range and to fill the lookup filter. After
    /// that a miss usually costs only the filter probe, and a hit costs one
    /// index search plus one block decode. Tables are meant to be loaded once
    /// and queried many times.
    ///
    /// # Errors
    ///
    /// Returns an error if the footer is missing, a handle points outside
    /// the data region, or any block fails to decode.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_bytes_with_fpr(data, DEFAULT_BLOOM_FPR)
    }

    /// Like [`from_bytes`](Table::from_bytes) with an explicit false positive
    /// rate for the lookup filter.
    pub fn from_bytes_with_fpr(data: Vec<u8>, false_positive_rate: f64) -> Result<Self> {
        let footer = Footer::read_from_table(&data)?;
        let limit = data.len() - FOOTER_BYTES;

        let meta = MetaBlock::decode(footer.meta.slice(&data, limit).context("meta block")?)?;
        let index =
            IndexBlock::decode(footer.index.slice(&data, limit).context("index block")?)?;

        let mut keys = Vec::new();
        for ie in index.entries() {
            let block = DataBlock::decode(ie.handle.slice(&data, limit)?)?;
            match (block.entries().first(), block.entries().last()) {
                (Some(first), Some(last))
                    if first.key == ie.start_key && last.key == ie.end_key => {}
                _ => bail!(
                    "data block at offset {} does not match its index range",
                    ie.handle.offset
                ),
            }
            keys.extend(block.into_entries().into_iter().map(|e| e.key));
        }

        let mut bloom = BloomFilter::new(keys.len().max(1), false_positive_rate);
        for key in &keys {
            bloom.add(key);
        }

        Ok(Self {
            data,
            footer,
            meta,
            index,
            bloom,
            len: keys.len(),
        })
    }

    /// Reads a whole table file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_bytes(data).with_context(|| format!("parsing {}", path.display()))
    }

    /// Point lookup. Tombstones are returned as entries.
    pub fn get(&self, key: &[u8]) -> Result<Option<Entry>> {
        if !self.bloom.contains(key) {
            return Ok(None);
        }
        let handle = match self.index.search(key) {
            Some(h) => h,
            None => return Ok(None),
        };
        let block = DataBlock::decode(handle.slice(&self.data, self.data_limit())?)?;
        Ok(block.search(key).cloned())
    }

    /// All entries in key order.
    pub fn entries(&self) -> Result<Vec<Entry>> {
        let mut out = Vec::with_capacity(self.len);
        for ie in self.index.entries() {
            let block = DataBlock::decode(ie.handle.slice(&self.data, self.data_limit())?)?;
            out.extend(block.into_entries());
        }
        Ok(out)
    }

    pub fn meta(&self) -> &MetaBlock {
        &self.meta
    }

    pub fn footer(&self) -> &Footer {
        &self.footer
    }

    pub fn index(&self) -> &IndexBlock {
        &self.index
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Number of entries, tombstones included.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn data_limit(&self) -> usize {
        self.data.len() - FOOTER_BYTES
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("bytes", &self.data.len())
            .field("entries", &self.len)
            .field("blocks", &self.index.len())
            .field("meta", &self.meta)
            .finish()
    }
}
