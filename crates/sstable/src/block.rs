//! Variable-length blocks: data blocks and the index block.
//!
//! ## DataBlock record (repeated until end of block)
//!
//! ```text
//! [key_len: u32 BE][value_len: u32 BE][key][value][tombstone: u8]
//! ```
//!
//! ## IndexBlock record (repeated until end of block)
//!
//! ```text
//! [start_key_len: u32 BE][end_key_len: u32 BE][start_key][end_key][offset: u64 BE][length: u64 BE]
//! ```

use anyhow::{bail, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::cmp::Ordering;
use std::io::{self, Write};
use util::Entry;

use crate::format::BlockHandle;

/// Sorted, duplicate-free run of entries stored contiguously in a table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataBlock {
    entries: Vec<Entry>,
}

impl DataBlock {
    /// Wraps `entries`, which must already be sorted by key without
    /// duplicates.
    pub fn new(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn encode_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        encode_entries(&self.entries, w)
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut rdr = data;
        let mut entries = Vec::new();
        while !rdr.is_empty() {
            let key_len = rdr.read_u32::<BigEndian>()? as usize;
            let value_len = rdr.read_u32::<BigEndian>()? as usize;
            let key = take(&mut rdr, key_len, "key")?;
            let value = take(&mut rdr, value_len, "value")?;
            let tombstone = match rdr.read_u8()? {
                0 => false,
                1 => true,
                other => bail!("invalid tombstone byte {:#04x}", other),
            };
            entries.push(Entry {
                key: key.to_vec(),
                value: value.to_vec(),
                tombstone,
            });
        }
        Ok(Self { entries })
    }

    /// Binary search for an exact key.
    #[must_use]
    pub fn search(&self, key: &[u8]) -> Option<&Entry> {
        self.entries
            .binary_search_by(|e| e.key.as_slice().cmp(key))
            .ok()
            .map(|i| &self.entries[i])
    }
}

/// Writes `entries` in data block record format.
pub(crate) fn encode_entries<W: Write>(entries: &[Entry], w: &mut W) -> io::Result<()> {
    for entry in entries {
        w.write_u32::<BigEndian>(len_u32(entry.key.len())?)?;
        w.write_u32::<BigEndian>(len_u32(entry.value.len())?)?;
        w.write_all(&entry.key)?;
        w.write_all(&entry.value)?;
        w.write_u8(entry.tombstone as u8)?;
    }
    Ok(())
}

/// Maps an inclusive key range to the data block holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub start_key: Vec<u8>,
    pub end_key: Vec<u8>,
    pub handle: BlockHandle,
}

/// Sorted, non-overlapping key ranges, one per data block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexBlock {
    entries: Vec<IndexEntry>,
}

impl IndexBlock {
    pub fn new(entries: Vec<IndexEntry>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, entry: IndexEntry) {
        self.entries.push(entry);
    }

    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn encode_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for e in &self.entries {
            w.write_u32::<BigEndian>(len_u32(e.start_key.len())?)?;
            w.write_u32::<BigEndian>(len_u32(e.end_key.len())?)?;
            w.write_all(&e.start_key)?;
            w.write_all(&e.end_key)?;
            w.write_u64::<BigEndian>(e.handle.offset)?;
            w.write_u64::<BigEndian>(e.handle.length)?;
        }
        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut rdr = data;
        let mut entries = Vec::new();
        while !rdr.is_empty() {
            let start_len = rdr.read_u32::<BigEndian>()? as usize;
            let end_len = rdr.read_u32::<BigEndian>()? as usize;
            let start_key = take(&mut rdr, start_len, "start key")?.to_vec();
            let end_key = take(&mut rdr, end_len, "end key")?.to_vec();
            let offset = rdr.read_u64::<BigEndian>()?;
            let length = rdr.read_u64::<BigEndian>()?;
            entries.push(IndexEntry {
                start_key,
                end_key,
                handle: BlockHandle::new(offset, length),
            });
        }
        Ok(Self { entries })
    }

    /// Finds the block whose `[start_key, end_key]` range covers `key`.
    #[must_use]
    pub fn search(&self, key: &[u8]) -> Option<BlockHandle> {
        self.entries
            .binary_search_by(|e| {
                if e.end_key.as_slice() < key {
                    Ordering::Less
                } else if e.start_key.as_slice() > key {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                }
            })
            .ok()
            .map(|i| self.entries[i].handle)
    }
}

fn len_u32(len: usize) -> io::Result<u32> {
    u32::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("field of {} bytes exceeds u32::MAX", len),
        )
    })
}

/// Splits `n` bytes off the front of `rdr`.
fn take<'a>(rdr: &mut &'a [u8], n: usize, what: &str) -> Result<&'a [u8]> {
    if rdr.len() < n {
        bail!("truncated {}: need {} bytes, have {}", what, n, rdr.len());
    }
    let (head, tail) = rdr.split_at(n);
    *rdr = tail;
    Ok(head)
}
