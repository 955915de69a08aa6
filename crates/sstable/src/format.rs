//! Fixed-size table structures: block handles, the meta block and the footer.
//!
//! ## MetaBlock (12 bytes)
//!
//! ```text
//! [created_at: i64 BE][level: i32 BE]
//! ```
//!
//! ## Footer (32 bytes, always the last bytes of a table)
//!
//! ```text
//! [meta_offset: u64 BE][meta_length: u64 BE][index_offset: u64 BE][index_length: u64 BE]
//! ```
//!
//! Offsets are absolute from the start of the table.

use anyhow::{bail, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

/// Size of an encoded [`Footer`].
pub const FOOTER_BYTES: usize = 8 * 4;

/// Size of an encoded [`MetaBlock`].
pub const META_BYTES: usize = 8 + 4;

/// Locates a byte range inside an assembled table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockHandle {
    pub offset: u64,
    pub length: u64,
}

impl BlockHandle {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// Returns the bytes this handle points at, or an error if the range does
    /// not lie within the first `limit` bytes of `data`.
    pub fn slice<'a>(&self, data: &'a [u8], limit: usize) -> Result<&'a [u8]> {
        let limit = limit.min(data.len()) as u64;
        match self.offset.checked_add(self.length) {
            Some(end) if end <= limit => Ok(&data[self.offset as usize..end as usize]),
            _ => bail!(
                "block handle {}+{} out of bounds (limit {})",
                self.offset,
                self.length,
                limit
            ),
        }
    }
}

/// Provenance of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaBlock {
    /// Unix seconds.
    pub created_at: i64,
    pub level: i32,
}

impl MetaBlock {
    /// A meta block stamped with the current time.
    pub fn new(level: i32) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Self { created_at, level }
    }

    pub fn encode_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_i64::<BigEndian>(self.created_at)?;
        w.write_i32::<BigEndian>(self.level)?;
        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(META_BYTES);
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != META_BYTES {
            bail!("meta block must be {} bytes, got {}", META_BYTES, data.len());
        }
        let mut rdr = data;
        Ok(Self {
            created_at: rdr.read_i64::<BigEndian>()?,
            level: rdr.read_i32::<BigEndian>()?,
        })
    }
}

/// Trailer pointing at the meta and index blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Footer {
    pub meta: BlockHandle,
    pub index: BlockHandle,
}

impl Footer {
    pub fn encode_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u64::<BigEndian>(self.meta.offset)?;
        w.write_u64::<BigEndian>(self.meta.length)?;
        w.write_u64::<BigEndian>(self.index.offset)?;
        w.write_u64::<BigEndian>(self.index.length)?;
        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(FOOTER_BYTES);
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != FOOTER_BYTES {
            bail!("footer must be {} bytes, got {}", FOOTER_BYTES, data.len());
        }
        let mut rdr = data;
        let meta = BlockHandle::new(rdr.read_u64::<BigEndian>()?, rdr.read_u64::<BigEndian>()?);
        let index = BlockHandle::new(rdr.read_u64::<BigEndian>()?, rdr.read_u64::<BigEndian>()?);
        Ok(Self { meta, index })
    }

    /// Reads the footer from the last [`FOOTER_BYTES`] of an assembled table.
    pub fn read_from_table(table: &[u8]) -> Result<Self> {
        if table.len() < FOOTER_BYTES {
            bail!("table too small for footer: {} bytes", table.len());
        }
        Self::decode(&table[table.len() - FOOTER_BYTES..])
    }
}
