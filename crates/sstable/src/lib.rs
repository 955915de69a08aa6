//! # SSTable - Sorted String Table
//!
//! Immutable, block-structured tables produced when a memtable is flushed or
//! when existing tables are compacted with [`merge`].
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ DATA BLOCKS (sorted entries, split at the block size)        │
//! │                                                              │
//! │ key_len (u32) | value_len (u32) | key | value | tombstone (u8)│
//! │ ... repeated for each entry in the block ...                 │
//! ├──────────────────────────────────────────────────────────────┤
//! │ META BLOCK (12 bytes)                                        │
//! │                                                              │
//! │ created_at (i64) | level (i32)                               │
//! ├──────────────────────────────────────────────────────────────┤
//! │ INDEX BLOCK (one record per data block)                      │
//! │                                                              │
//! │ start_len (u32) | end_len (u32) | start_key | end_key        │
//! │ offset (u64) | length (u64)                                  │
//! ├──────────────────────────────────────────────────────────────┤
//! │ FOOTER (always the last 32 bytes)                            │
//! │                                                              │
//! │ meta_offset (u64) | meta_length (u64)                        │
//! │ index_offset (u64) | index_length (u64)                      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are big-endian and all offsets are absolute. Index ranges are
//! inclusive on both ends and never overlap, so a point lookup costs one
//! binary search over the index and one over a single data block.

mod block;
mod builder;
mod format;
mod merge;
mod reader;
mod writer;

pub use block::{DataBlock, IndexBlock, IndexEntry};
pub use builder::{build, TableBuilder};
pub use format::{BlockHandle, Footer, MetaBlock, FOOTER_BYTES, META_BYTES};
pub use merge::{merge, merge_tables};
pub use reader::Table;
pub use util::Entry;
pub use writer::write_table;

#[cfg(test)]
mod tests;
