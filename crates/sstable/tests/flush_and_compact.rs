//! End-to-end: memtable writes flushed into tables, then compacted.

use anyhow::Result;
use memtable::MemTable;
use sstable::{build, merge_tables, write_table, Entry, Table, TableBuilder};
use std::sync::Arc;
use tempfile::tempdir;
use util::BufferPool;

fn flush(mem: &MemTable, builder: &TableBuilder, path: &std::path::Path) -> Result<Table> {
    mem.set_read_only();
    let bytes = builder.build(&mem.entries())?;
    write_table(path, &bytes)?;
    Table::open(path)
}

#[test]
fn flush_memtable_to_table() -> Result<()> {
    let dir = tempdir()?;
    let pool = Arc::new(BufferPool::new());
    let mem = MemTable::new(dir.path().join("wal"), 8, Arc::clone(&pool))?;

    for i in (0..200).rev() {
        mem.set(format!("key{:04}", i).into_bytes(), format!("v{}", i).into_bytes())?;
    }

    let builder = TableBuilder::new(Arc::clone(&pool), 256, 0);
    let table = flush(&mem, &builder, &dir.path().join("000001.sst"))?;

    assert_eq!(table.len(), 200);
    assert!(table.index().len() > 1);
    for i in 0..200 {
        let key = format!("key{:04}", i).into_bytes();
        let got = table.get(&key)?.expect("flushed key present");
        assert_eq!(got.value, format!("v{}", i).into_bytes());
    }
    assert_eq!(table.get(b"key9999")?, None);
    Ok(())
}

#[test]
fn compaction_keeps_newest_values() -> Result<()> {
    let dir = tempdir()?;
    let pool = Arc::new(BufferPool::new());
    let builder = TableBuilder::new(Arc::clone(&pool), 64, 0);

    let first = MemTable::new(dir.path().join("wal-a"), 8, Arc::clone(&pool))?;
    first.set(b"apple".to_vec(), b"red".to_vec())?;
    first.set(b"banana".to_vec(), b"yellow".to_vec())?;
    let old = flush(&first, &builder, &dir.path().join("000001.sst"))?;

    let second = MemTable::new(dir.path().join("wal-b"), 8, Arc::clone(&pool))?;
    second.set(b"apple".to_vec(), b"green".to_vec())?;
    second.set(b"cherry".to_vec(), b"dark".to_vec())?;
    let new = flush(&second, &builder, &dir.path().join("000002.sst"))?;

    // A hand-built table carrying a deletion is the newest input.
    let deletes = Table::from_bytes(build(&[Entry::tombstone("banana")], 64, 0)?)?;

    let merged = merge_tables(&[old, new, deletes])?;
    assert_eq!(
        merged,
        vec![Entry::new("apple", "green"), Entry::new("cherry", "dark")]
    );

    let compacted_path = dir.path().join("000003.sst");
    write_table(&compacted_path, &TableBuilder::new(pool, 64, 1).build(&merged)?)?;
    let compacted = Table::open(&compacted_path)?;
    assert_eq!(compacted.meta().level, 1);
    assert_eq!(compacted.entries()?, merged);
    Ok(())
}

#[test]
fn recovered_memtable_flushes_replayed_entries() -> Result<()> {
    let dir = tempdir()?;
    let wal_dir = dir.path().join("wal");
    let pool = Arc::new(BufferPool::new());

    {
        let crashed = MemTable::new(&wal_dir, 8, Arc::clone(&pool))?;
        crashed.set(b"b".to_vec(), b"2".to_vec())?;
        crashed.set(b"a".to_vec(), b"1".to_vec())?;
        // Dropped without close.
    }

    let mem = MemTable::new(&wal_dir, 8, Arc::clone(&pool))?;
    assert_eq!(mem.recover()?, 2);

    let builder = TableBuilder::new(pool, 4096, 0);
    let table = flush(&mem, &builder, &dir.path().join("000001.sst"))?;
    assert_eq!(
        table.entries()?,
        vec![Entry::new("a", "1"), Entry::new("b", "2")]
    );
    Ok(())
}
