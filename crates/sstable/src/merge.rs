//! K-way merge of sorted entry lists, the core of compaction.
//!
//! Later lists hold more recent writes. For each key only the newest entry
//! survives, and a key whose newest entry is a tombstone is dropped along with
//! every older version of it.

use anyhow::Result;
use std::cmp::Ordering;
use util::{Entry, Heap};

use crate::Table;

/// Position of the next unread entry in one input list.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    list: usize,
    pos: usize,
}

/// Merges sorted lists into one sorted, duplicate-free, tombstone-free list.
///
/// Each input must be sorted ascending by key. On equal keys the entry from
/// the higher list index wins.
pub fn merge<L: AsRef<[Entry]>>(lists: &[L]) -> Vec<Entry> {
    let mut heap = Heap::with_capacity(lists.len(), |a: &Cursor, b: &Cursor| {
        match key_at(lists, a).cmp(key_at(lists, b)) {
            Ordering::Equal => a.list > b.list,
            ord => ord.is_lt(),
        }
    });
    for (list, entries) in lists.iter().enumerate() {
        if !entries.as_ref().is_empty() {
            heap.push(Cursor { list, pos: 0 });
        }
    }

    let mut out: Vec<Entry> = Vec::new();
    // Last key popped, live or not. Anything popped after it with the same
    // key is an older version.
    let mut last_key: Option<&[u8]> = None;
    while let Some(cur) = heap.pop() {
        let list = lists[cur.list].as_ref();
        if cur.pos + 1 < list.len() {
            heap.push(Cursor {
                list: cur.list,
                pos: cur.pos + 1,
            });
        }

        let entry = &list[cur.pos];
        if last_key == Some(entry.key.as_slice()) {
            continue;
        }
        last_key = Some(&entry.key);
        if !entry.tombstone {
            out.push(entry.clone());
        }
    }
    out
}

fn key_at<'a, L: AsRef<[Entry]>>(lists: &'a [L], c: &Cursor) -> &'a [u8] {
    &lists[c.list].as_ref()[c.pos].key
}

/// Merges whole tables, oldest first.
pub fn merge_tables(tables: &[Table]) -> Result<Vec<Entry>> {
    let lists = tables
        .iter()
        .map(Table::entries)
        .collect::<Result<Vec<_>>>()?;
    Ok(merge(&lists))
}
