//! # Bloom Filter
//!
//! A space-efficient probabilistic data structure for set membership testing.
//!
//! A bloom filter can tell you with certainty that a key is **not** in the set
//! (no false negatives), but may occasionally report that a key **is** in the
//! set when it isn't (false positives). The false positive rate depends on the
//! number of bits and hash functions used.
//!
//! ## Sizing
//!
//! Given `n` expected elements and a target false-positive probability `p`:
//!
//! ```text
//! m = ceil(-n * ln(p) / ln(2)^2)     bits
//! k = ceil((m / n) * ln(2))          hash functions
//! ```
//!
//! Both are fixed at construction. The filter never resizes and elements
//! cannot be removed.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bloom::BloomFilter;
//!
//! let mut bf = BloomFilter::new(1000, 0.01);
//! bf.add(b"hello");
//! assert!(bf.contains(b"hello"));
//! ```

/// One member of the hash family: FNV-1a 64 started from a seed-derived basis
/// and finalized with a 64-bit mixer.
#[derive(Debug, Clone, Copy)]
struct SeededHash {
    seed: u64,
}

impl SeededHash {
    fn hash(&self, data: &[u8]) -> u64 {
        const FNV_OFFSET: u64 = 0xcbf29ce484222325;
        const FNV_PRIME: u64 = 0x00000100000001b3;
        let mut hash = FNV_OFFSET ^ fmix64(self.seed);
        for &byte in data {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        fmix64(hash ^ self.seed)
    }
}

/// A bloom filter backed by a bit vector with `k` independently seeded hash
/// functions.
pub struct BloomFilter {
    /// The bit vector storing the filter state.
    bits: Vec<u8>,
    /// Number of bits in the filter (`m`).
    num_bits: u64,
    /// Hash functions, seeded `0..k`.
    hashes: Vec<SeededHash>,
}

impl BloomFilter {
    /// Creates a new bloom filter sized for `expected_items` with the given
    /// target `false_positive_rate`.
    ///
    /// # Panics
    ///
    /// Panics if `expected_items` is 0 or `false_positive_rate` is not in `(0, 1)`.
    pub fn new(expected_items: usize, false_positive_rate: f64) -> Self {
        assert!(expected_items > 0, "expected_items must be > 0");
        assert!(
            false_positive_rate > 0.0 && false_positive_rate < 1.0,
            "false_positive_rate must be in (0, 1)"
        );

        let n = expected_items as f64;
        let m = (-n * false_positive_rate.ln() / std::f64::consts::LN_2.powi(2)).ceil() as u64;
        let m = m.max(1);

        let k = ((m as f64 / n) * std::f64::consts::LN_2).ceil() as u32;
        let k = k.max(1);

        Self {
            bits: vec![0u8; m.div_ceil(8) as usize],
            num_bits: m,
            hashes: (0..k as u64).map(|seed| SeededHash { seed }).collect(),
        }
    }

    /// Adds `data` to the set by setting bit `hash_i(data) mod m` for every
    /// hash function.
    pub fn add(&mut self, data: &[u8]) {
        for i in 0..self.hashes.len() {
            let idx = self.hashes[i].hash(data) % self.num_bits;
            self.set_bit(idx);
        }
    }

    /// Returns `true` if `data` **might** be in the set, `false` if it is
    /// **definitely not** in the set.
    #[must_use]
    pub fn contains(&self, data: &[u8]) -> bool {
        self.hashes
            .iter()
            .all(|h| self.get_bit(h.hash(data) % self.num_bits))
    }

    /// Returns the number of bits in the filter.
    #[must_use]
    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    /// Returns the number of hash functions.
    #[must_use]
    pub fn num_hashes(&self) -> u32 {
        self.hashes.len() as u32
    }

    fn set_bit(&mut self, idx: u64) {
        self.bits[(idx / 8) as usize] |= 1 << (idx % 8);
    }

    fn get_bit(&self, idx: u64) -> bool {
        (self.bits[(idx / 8) as usize] >> (idx % 8)) & 1 == 1
    }
}

impl std::fmt::Debug for BloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BloomFilter")
            .field("num_bits", &self.num_bits)
            .field("num_hashes", &self.hashes.len())
            .field("bytes", &self.bits.len())
            .finish()
    }
}

/// 64-bit finalizer from MurmurHash3.
fn fmix64(mut h: u64) -> u64 {
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51afd7ed558ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ceb9fe1a85ec53);
    h ^= h >> 33;
    h
}
