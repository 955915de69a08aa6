use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};

/// Default number of idle buffers a pool keeps around.
pub const DEFAULT_MAX_IDLE: usize = 32;

/// Default largest capacity a returned buffer may have and still be kept: 1 MiB.
pub const DEFAULT_MAX_RETAINED_CAPACITY: usize = 1024 * 1024;

/// A pool of reusable `Vec<u8>` buffers.
///
/// The pool is an ordinary value: construct one, wrap it in an `Arc`, and hand
/// it to the components that should share it. Buffers are checked out with
/// [`acquire`](BufferPool::acquire) and go back automatically when the returned
/// [`PooledBuffer`] is dropped, so every exit path (including `?`) returns
/// them. Buffers that grew past the retained-capacity limit are freed
/// instead of pooled.
#[derive(Debug)]
pub struct BufferPool {
    idle: Mutex<Vec<Vec<u8>>>,
    max_idle: usize,
    max_capacity: usize,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::with_max_idle(DEFAULT_MAX_IDLE)
    }

    /// Creates a pool that retains at most `max_idle` returned buffers.
    pub fn with_max_idle(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
            max_capacity: DEFAULT_MAX_RETAINED_CAPACITY,
        }
    }

    /// Sets the largest capacity a returned buffer may have and still be
    /// kept for reuse.
    pub fn with_max_capacity(mut self, bytes: usize) -> Self {
        self.max_capacity = bytes;
        self
    }

    /// Checks out an empty buffer, reusing an idle allocation when possible.
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let buf = self.idle.lock().pop().unwrap_or_default();
        debug_assert!(buf.is_empty());
        PooledBuffer { buf, pool: self }
    }

    /// Number of buffers currently sitting idle in the pool.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    fn release(&self, mut buf: Vec<u8>) {
        if buf.capacity() > self.max_capacity {
            return;
        }
        buf.clear();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(buf);
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

/// A buffer on loan from a [`BufferPool`].
///
/// Derefs to `Vec<u8>`. Cleared and returned to the pool on drop.
pub struct PooledBuffer<'a> {
    buf: Vec<u8>,
    pool: &'a BufferPool,
}

impl Deref for PooledBuffer<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}

impl std::fmt::Debug for PooledBuffer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
