mod reader_tests;

use util::Entry;

/// Live entries from `(key, value)` pairs.
pub(crate) fn entries(pairs: &[(&str, &str)]) -> Vec<Entry> {
    pairs.iter().map(|(k, v)| Entry::new(*k, *v)).collect()
}

pub(crate) fn produce() -> Vec<Entry> {
    entries(&[
        ("apple", "fruit"),
        ("banana", "fruit"),
        ("carrot", "vegetable"),
        ("date", "fruit"),
        ("eggplant", "vegetable"),
    ])
}
