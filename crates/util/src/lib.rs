//! # Util - shared building blocks
//!
//! Small types used by every other crate in the workspace:
//!
//! - [`Entry`] - the key/value/tombstone triple that flows through the WAL,
//!   the memtable, SSTable blocks and compaction.
//! - [`BufferPool`] - a recycling pool of byte buffers with scoped release.
//! - [`Heap`] - a binary heap ordered by a caller-supplied `less` function.

mod entry;
mod heap;
mod pool;

pub use entry::Entry;
pub use heap::Heap;
pub use pool::{BufferPool, PooledBuffer, DEFAULT_MAX_IDLE, DEFAULT_MAX_RETAINED_CAPACITY};

#[cfg(test)]
mod tests;
