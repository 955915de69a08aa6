//! Probabilistic ordered map used as the memtable's storage.
//!
//! Nodes live in an arena (`Vec<Node>`) and forward links are arena indices,
//! so the list owns every node outright and links carry no lifetimes. Slots
//! of nodes that have been unlinked from every level are recycled.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use util::Entry;

type Link = Option<usize>;

#[derive(Debug)]
struct Node {
    entry: Entry,
    /// `forward[i]` is the next node on level `i`; length is the node's
    /// level + 1.
    forward: Vec<Link>,
    /// Levels on which the node is still linked. Zero means the slot is free.
    linked: usize,
}

/// A skip list keyed by byte strings.
///
/// Not synchronized: callers serialize access (the memtable holds it behind
/// a mutex).
#[derive(Debug)]
pub struct SkipList {
    /// Forward links of the head sentinel, one per possible level.
    head: Vec<Link>,
    nodes: Vec<Node>,
    free: Vec<usize>,
    max_level: usize,
    /// Highest level currently in use (0-based).
    current_level: usize,
    len: usize,
    rng: StdRng,
}

impl SkipList {
    /// Creates an empty list whose nodes span at most `max_level` levels.
    ///
    /// # Panics
    ///
    /// Panics if `max_level` is 0.
    pub fn new(max_level: usize, rng: StdRng) -> Self {
        assert!(max_level > 0, "max_level must be > 0");
        Self {
            head: vec![None; max_level],
            nodes: Vec::new(),
            free: Vec::new(),
            max_level,
            current_level: 0,
            len: 0,
            rng,
        }
    }

    /// Same as [`new`](SkipList::new) with a deterministic generator.
    pub fn with_seed(max_level: usize, seed: u64) -> Self {
        Self::new(max_level, StdRng::seed_from_u64(seed))
    }

    /// Links a new node for `key`.
    ///
    /// Does not look for an existing node with the same key; inserting a key
    /// twice leaves two nodes and `get` may return either. Use
    /// [`upsert`](SkipList::upsert) for map semantics.
    pub fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        let level = self.random_level();
        if level > self.current_level {
            self.current_level = level;
        }

        let idx = self.alloc(Node {
            entry: Entry::new(key, value),
            forward: vec![None; level + 1],
            linked: level + 1,
        });

        let mut current: Link = None;
        for i in (0..=self.current_level).rev() {
            current = self.advance(current, i, &self.nodes[idx].entry.key);
            if i <= level {
                let next = self.forward(current, i);
                self.nodes[idx].forward[i] = next;
                self.set_forward(current, i, Some(idx));
            }
        }

        self.len += 1;
    }

    /// Looks up `key`, returning the value of the first matching node met
    /// while descending.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        let mut current: Link = None;
        for i in (0..=self.current_level).rev() {
            current = self.advance(current, i, key);
            if let Some(next) = self.matching_next(current, i, key) {
                return Some(&self.nodes[next].entry.value);
            }
        }
        None
    }

    /// Unlinks every level-wise reference to a node matching `key`.
    /// Returns whether anything matched.
    pub fn delete(&mut self, key: &[u8]) -> bool {
        let mut current: Link = None;
        let mut found = false;

        for i in (0..=self.current_level).rev() {
            current = self.advance(current, i, key);
            if let Some(next) = self.matching_next(current, i, key) {
                found = true;
                let after = self.nodes[next].forward[i];
                self.set_forward(current, i, after);
                self.unlinked(next, i);
            }
        }

        found
    }

    /// Overwrites the value of every matching node met while descending.
    /// Returns whether the key was found.
    pub fn update(&mut self, key: &[u8], value: &[u8]) -> bool {
        let mut current: Link = None;
        let mut found = false;

        for i in (0..=self.current_level).rev() {
            current = self.advance(current, i, key);
            if let Some(next) = self.matching_next(current, i, key) {
                let slot = &mut self.nodes[next].entry.value;
                slot.clear();
                slot.extend_from_slice(value);
                found = true;
            }
        }

        found
    }

    /// Updates `key` in place if present, otherwise inserts it.
    pub fn upsert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        if !self.update(&key, &value) {
            self.insert(key, value);
        }
    }

    /// Value of the smallest key `>= key`.
    #[must_use]
    pub fn lower_bound(&self, key: &[u8]) -> Option<&[u8]> {
        let mut current: Link = None;
        for i in (0..=self.current_level).rev() {
            current = self.advance(current, i, key);
        }
        self.forward(current, 0)
            .map(|idx| self.nodes[idx].entry.value.as_slice())
    }

    /// Every value in ascending key order.
    #[must_use]
    pub fn all(&self) -> Vec<Vec<u8>> {
        self.iter().map(|e| e.value.clone()).collect()
    }

    /// Every entry in ascending key order.
    #[must_use]
    pub fn entries(&self) -> Vec<Entry> {
        self.iter().cloned().collect()
    }

    /// Walks the level-0 chain.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            next: self.head[0],
        }
    }

    /// Removes every node.
    pub fn reset(&mut self) {
        self.head.iter_mut().for_each(|l| *l = None);
        self.nodes.clear();
        self.free.clear();
        self.current_level = 0;
        self.len = 0;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    // ---- Internal helpers ----

    /// Fair coin flips, capped at `max_level - 1`.
    fn random_level(&mut self) -> usize {
        let mut level = 0;
        while level < self.max_level - 1 && self.rng.random_bool(0.5) {
            level += 1;
        }
        level
    }

    fn alloc(&mut self, node: Node) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    /// Bookkeeping after a node lost its link on `level`.
    fn unlinked(&mut self, idx: usize, level: usize) {
        if level == 0 {
            self.len -= 1;
        }
        let node = &mut self.nodes[idx];
        node.linked -= 1;
        if node.linked == 0 {
            node.entry = Entry::default();
            self.free.push(idx);
        }
    }

    /// `None` addresses the head sentinel.
    fn forward(&self, at: Link, level: usize) -> Link {
        match at {
            None => self.head[level],
            Some(idx) => self.nodes[idx].forward[level],
        }
    }

    fn set_forward(&mut self, at: Link, level: usize, to: Link) {
        match at {
            None => self.head[level] = to,
            Some(idx) => self.nodes[idx].forward[level] = to,
        }
    }

    /// Moves right along `level` while the next key is below `key`.
    fn advance(&self, mut current: Link, level: usize, key: &[u8]) -> Link {
        while let Some(next) = self.forward(current, level) {
            if self.nodes[next].entry.key.as_slice().cmp(key) != Ordering::Less {
                break;
            }
            current = Some(next);
        }
        current
    }

    fn matching_next(&self, current: Link, level: usize, key: &[u8]) -> Link {
        self.forward(current, level)
            .filter(|&next| self.nodes[next].entry.key == key)
    }
}

/// Iterator over a [`SkipList`] in key order.
pub struct Iter<'a> {
    list: &'a SkipList,
    next: Link,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<&'a Entry> {
        let idx = self.next?;
        let node = &self.list.nodes[idx];
        self.next = node.forward[0];
        Some(&node.entry)
    }
}
