use super::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::thread;

// -------------------- Entry --------------------

#[test]
fn entry_size_counts_tombstone_byte() {
    let e = Entry::new(b"apple".to_vec(), b"fruit".to_vec());
    assert_eq!(e.size(), 5 + 5 + 1);
    assert!(!e.tombstone);
}

#[test]
fn tombstone_entry_has_empty_value() {
    let e = Entry::tombstone(b"gone".to_vec());
    assert!(e.tombstone);
    assert!(e.value.is_empty());
    assert_eq!(e.size(), 5);
}

// -------------------- BufferPool --------------------

#[test]
fn acquired_buffer_is_reset_before_reuse() {
    let pool = BufferPool::new();
    {
        let mut buf = pool.acquire();
        buf.extend_from_slice(b"Hello, World!");
    }
    assert_eq!(pool.idle(), 1);

    let buf = pool.acquire();
    assert!(buf.is_empty(), "recycled buffer must be empty");
    assert!(buf.capacity() >= 13, "allocation should be reused");
    assert_eq!(pool.idle(), 0);
}

#[test]
fn buffer_returns_on_error_path() {
    fn fails(pool: &BufferPool) -> Result<(), String> {
        let mut buf = pool.acquire();
        buf.push(1);
        let _: u8 = "boom".parse::<u8>().map_err(|e| e.to_string())?;
        Ok(())
    }

    let pool = BufferPool::new();
    assert!(fails(&pool).is_err());
    assert_eq!(pool.idle(), 1);
}

#[test]
fn pool_caps_idle_buffers() {
    let pool = BufferPool::with_max_idle(2);
    let bufs: Vec<_> = (0..5).map(|_| pool.acquire()).collect();
    drop(bufs);
    assert_eq!(pool.idle(), 2);
}

#[test]
fn pool_drops_oversized_buffers() {
    let pool = BufferPool::new().with_max_capacity(64);
    {
        let mut buf = pool.acquire();
        buf.extend_from_slice(&[0u8; 1024]);
    }
    assert_eq!(pool.idle(), 0);

    {
        let mut buf = pool.acquire();
        buf.extend_from_slice(&[0u8; 16]);
    }
    assert_eq!(pool.idle(), 1);
    assert!(pool.acquire().capacity() <= 64);
}

#[test]
fn default_pool_drops_multi_mib_buffers() {
    let pool = BufferPool::new();
    {
        let mut buf = pool.acquire();
        buf.resize(DEFAULT_MAX_RETAINED_CAPACITY + 1, 7);
    }
    assert_eq!(pool.idle(), 0);
}

#[test]
fn pool_concurrent_access() {
    let pool = Arc::new(BufferPool::new());
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for i in 0..1000u32 {
                    let mut buf = pool.acquire();
                    assert!(buf.is_empty());
                    buf.extend_from_slice(&(t * 1000 + i).to_be_bytes());
                    assert_eq!(buf.len(), 4);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert!(pool.idle() <= DEFAULT_MAX_IDLE);
}

// -------------------- Heap --------------------

#[test]
fn heap_pops_in_ascending_order() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut heap = Heap::new(|a: &u32, b: &u32| a < b);
    let mut expected: Vec<u32> = (0..500).map(|_| rng.random_range(0..1000)).collect();
    for &x in &expected {
        heap.push(x);
    }
    expected.sort_unstable();

    let mut popped = Vec::new();
    while let Some(x) = heap.pop() {
        popped.push(x);
    }
    assert_eq!(popped, expected);
}

#[test]
fn heap_peek_and_len() {
    let mut heap = Heap::with_capacity(4, |a: &i32, b: &i32| a > b);
    assert!(heap.is_empty());
    assert!(heap.peek().is_none());
    assert!(heap.pop().is_none());

    heap.push(3);
    heap.push(9);
    heap.push(1);
    assert_eq!(heap.len(), 3);
    assert_eq!(heap.peek(), Some(&9));
    assert_eq!(heap.pop(), Some(9));
    assert_eq!(heap.peek(), Some(&3));
    assert_eq!(heap.len(), 2);
}

#[test]
fn heap_orders_by_projection_with_tie_break() {
    // (key, source): smallest key first, higher source first on ties.
    let mut heap = Heap::new(|a: &(char, usize), b: &(char, usize)| {
        a.0 < b.0 || (a.0 == b.0 && a.1 > b.1)
    });
    heap.push(('b', 0));
    heap.push(('a', 0));
    heap.push(('a', 2));
    heap.push(('a', 1));

    assert_eq!(heap.pop(), Some(('a', 2)));
    assert_eq!(heap.pop(), Some(('a', 1)));
    assert_eq!(heap.pop(), Some(('a', 0)));
    assert_eq!(heap.pop(), Some(('b', 0)));
}
