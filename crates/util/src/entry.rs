/// A single key/value pair, optionally marking a deletion.
///
/// Keys compare byte-lexicographically everywhere in the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    /// `true` marks a logical deletion of `key`.
    pub tombstone: bool,
}

impl Entry {
    /// Creates a live (non-deleted) entry.
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            tombstone: false,
        }
    }

    /// Creates a tombstone for `key` with an empty value.
    pub fn tombstone(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: Vec::new(),
            tombstone: true,
        }
    }

    /// Serialized payload size: key + value + 1 tombstone byte.
    ///
    /// Length prefixes are not counted; the SSTable builder uses this figure
    /// when packing entries into data blocks.
    #[must_use]
    pub fn size(&self) -> usize {
        self.key.len() + self.value.len() + 1
    }
}
