//! Hash family shared by the filter and the estimator.
//!
//! A [`HashFamily`] maps `(key, index)` to a 64-bit value. The mapping is a pure
//! function of the key, the index, the [`HashStrategy`] and the seed, so values
//! are reproducible across runs and processes.

use sha2::{Digest, Sha256};
use std::fmt::{Display, Formatter};
use xxhash_rust::xxh3::xxh3_64_with_seed;

const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

/// How a [`HashFamily`] derives its values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with_serde", serde(rename_all = "snake_case"))]
pub enum HashStrategy {
    /// SHA-256 of `key || decimal(index) || seed`, low-order 64 bits of the digest.
    #[default]
    Salted,
    /// wyhash and xxh3 with per-index seeds, combined by exclusive-or.
    Combined,
    /// Enhanced double hashing over two wyhash values computed once per key.
    DoubleHashing,
}

impl Display for HashStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HashStrategy::Salted => "salted",
            HashStrategy::Combined => "combined",
            HashStrategy::DoubleHashing => "double-hashing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HashFamily {
    strategy: HashStrategy,
    seed: u64,
}

impl HashFamily {
    pub fn new(strategy: HashStrategy) -> Self {
        Self::with_seed(strategy, 0)
    }

    pub fn with_seed(strategy: HashStrategy, seed: u64) -> Self {
        Self { strategy, seed }
    }

    pub fn strategy(&self) -> HashStrategy {
        self.strategy
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The `index`-th hash of `key`.
    pub fn hash(&self, key: &str, index: u32) -> u64 {
        match self.strategy {
            HashStrategy::Salted => salted(key.as_bytes(), index, self.seed),
            HashStrategy::Combined => combined(key.as_bytes(), index, self.seed),
            HashStrategy::DoubleHashing => {
                let (h1, h2) = double_hashing_base(key.as_bytes(), self.seed);
                double_hash(h1, h2, index)
            }
        }
    }

    /// The `index`-th hash of `key` reduced modulo `range`.
    pub fn hash_in_range(&self, key: &str, index: u32, range: u64) -> u64 {
        debug_assert!(range > 0, "range must be > 0");
        self.hash(key, index) % range
    }

    /// Positions for indices `0..count`, each in `0..range`.
    pub fn probes<'a>(&'a self, key: &'a str, count: usize, range: usize) -> Probes<'a> {
        debug_assert!(range > 0, "range must be > 0");
        let base = match self.strategy {
            HashStrategy::DoubleHashing => Some(double_hashing_base(key.as_bytes(), self.seed)),
            _ => None,
        };
        Probes {
            family: self,
            key,
            base,
            next: 0,
            count,
            range: range as u64,
        }
    }
}

pub struct Probes<'a> {
    family: &'a HashFamily,
    key: &'a str,
    base: Option<(u64, u64)>,
    next: usize,
    count: usize,
    range: u64,
}

impl Iterator for Probes<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.next >= self.count {
            return None;
        }
        let index = self.next as u32;
        self.next += 1;
        let hash = match self.base {
            Some((h1, h2)) => double_hash(h1, h2, index),
            None => self.family.hash(self.key, index),
        };
        Some((hash % self.range) as usize)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Probes<'_> {}

fn salted(key: &[u8], index: u32, seed: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(key);
    hasher.update(index.to_string().as_bytes());
    hasher.update(seed.to_le_bytes());
    let digest = hasher.finalize();

    let mut low = [0u8; 8];
    low.copy_from_slice(&digest[24..32]);
    u64::from_be_bytes(low)
}

fn combined(key: &[u8], index: u32, seed: u64) -> u64 {
    let spread = (u64::from(index) + 1).wrapping_mul(GOLDEN_GAMMA);
    let wy = wyhash::wyhash(key, seed ^ spread);
    let xx = xxh3_64_with_seed(key, seed.wrapping_add(spread.rotate_left(32)));
    wy ^ xx
}

fn double_hashing_base(key: &[u8], seed: u64) -> (u64, u64) {
    (
        wyhash::wyhash(key, seed),
        wyhash::wyhash(key, seed.wrapping_add(GOLDEN_GAMMA)),
    )
}

fn double_hash(h1: u64, h2: u64, index: u32) -> u64 {
    let i = u64::from(index);
    h1.wrapping_add(h2.wrapping_mul(i))
        .wrapping_add(i.wrapping_mul(i).wrapping_mul(i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const ALL: [HashStrategy; 3] = [
        HashStrategy::Salted,
        HashStrategy::Combined,
        HashStrategy::DoubleHashing,
    ];

    #[test]
    fn test_salted_known_values() {
        let family = HashFamily::new(HashStrategy::Salted);
        assert_eq!(family.hash("password123", 0), 0xb631_7a90_8aef_fc69);
        assert_eq!(family.hash("password123", 1), 0xb5e2_db1d_8798_8b64);

        let family = HashFamily::with_seed(HashStrategy::Salted, 7);
        assert_eq!(family.hash("192.168.0.1", 0), 0x86f2_6fba_9199_e919);
    }

    #[test]
    fn test_deterministic() {
        for strategy in ALL {
            let a = HashFamily::with_seed(strategy, 42);
            let b = HashFamily::with_seed(strategy, 42);
            for index in 0..8 {
                assert_eq!(a.hash("admin123", index), b.hash("admin123", index));
            }
        }
    }

    #[test]
    fn test_indices_differ() {
        for strategy in ALL {
            let family = HashFamily::new(strategy);
            let values: Vec<u64> = (0..8).map(|i| family.hash("qwerty123", i)).collect();
            for (i, a) in values.iter().enumerate() {
                for b in &values[i + 1..] {
                    assert_ne!(a, b, "{strategy} produced a repeated value");
                }
            }
        }
    }

    #[test]
    fn test_seeds_differ() {
        for strategy in ALL {
            let a = HashFamily::with_seed(strategy, 1);
            let b = HashFamily::with_seed(strategy, 2);
            assert_ne!(a.hash("guest", 0), b.hash("guest", 0));
        }
    }

    #[test]
    fn test_probes_match_hash_in_range() {
        for strategy in ALL {
            let family = HashFamily::with_seed(strategy, 3);
            let probes: Vec<usize> = family.probes("newpassword", 5, 1000).collect();
            let expected: Vec<usize> = (0..5)
                .map(|i| family.hash_in_range("newpassword", i, 1000) as usize)
                .collect();
            assert_eq!(probes, expected);
        }
    }

    #[test]
    fn test_probes_len() {
        let family = HashFamily::default();
        let probes = family.probes("x", 7, 10);
        assert_eq!(probes.len(), 7);
        assert!(probes.into_iter().all(|p| p < 10));
    }

    #[test_case(HashStrategy::Salted; "salted")]
    #[test_case(HashStrategy::Combined; "combined")]
    #[test_case(HashStrategy::DoubleHashing; "double hashing")]
    fn test_uniformity(strategy: HashStrategy) {
        const BINS: u64 = 16;
        const SAMPLES: usize = 32_000;

        let family = HashFamily::new(strategy);
        let mut bins = [0usize; BINS as usize];
        for i in 0..SAMPLES {
            let key = format!("10.0.{}.{}", i / 256, i % 256);
            bins[family.hash_in_range(&key, 0, BINS) as usize] += 1;
        }

        let expected = SAMPLES as f64 / BINS as f64;
        for (bin, &count) in bins.iter().enumerate() {
            let deviation = (count as f64 - expected).abs() / expected;
            assert!(deviation < 0.1, "{strategy}: bin {bin} holds {count}");
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(HashStrategy::Salted.to_string(), "salted");
        assert_eq!(HashStrategy::Combined.to_string(), "combined");
        assert_eq!(HashStrategy::DoubleHashing.to_string(), "double-hashing");
    }
}
