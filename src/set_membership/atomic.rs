use crate::error::Result;
use crate::hash::HashFamily;
use crate::set_membership::bloom::{BloomConfig, BloomFilter};
use fixedbitset::FixedBitSet;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

const WORD_BITS: usize = u64::BITS as usize;

/// Bloom filter whose bits can be set through a shared reference.
///
/// Each probe is an atomic `fetch_or`, so concurrent inserts never lose bits.
/// A `contains` racing with an `insert` of the same item can observe only part
/// of that item's bits and report it absent until the insert completes.
pub struct AtomicBloomFilter {
    words: Vec<AtomicU64>,
    size: usize,
    num_hashes: usize,
    family: HashFamily,
}

impl AtomicBloomFilter {
    pub fn new(size: usize, num_hashes: usize) -> Result<Self> {
        Self::from_config(BloomConfig::new(size, num_hashes))
    }

    pub fn from_config(config: BloomConfig) -> Result<Self> {
        config.validate()?;
        tracing::debug!(
            size = config.size,
            num_hashes = config.num_hashes,
            strategy = %config.strategy,
            "creating atomic bloom filter"
        );
        let num_words = config.size.div_ceil(WORD_BITS);
        Ok(Self {
            words: (0..num_words).map(|_| AtomicU64::new(0)).collect(),
            size: config.size,
            num_hashes: config.num_hashes,
            family: HashFamily::with_seed(config.strategy, config.seed),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn num_hashes(&self) -> usize {
        self.num_hashes
    }

    pub fn insert(&self, item: &str) -> bool {
        self.family
            .probes(item, self.num_hashes, self.size)
            .fold(false, |fresh, bit| {
                let mask = 1u64 << (bit % WORD_BITS);
                let previous = self.words[bit / WORD_BITS].fetch_or(mask, Ordering::Relaxed);
                fresh | (previous & mask == 0)
            })
    }

    pub fn contains(&self, item: &str) -> bool {
        self.family
            .probes(item, self.num_hashes, self.size)
            .all(|bit| {
                let mask = 1u64 << (bit % WORD_BITS);
                self.words[bit / WORD_BITS].load(Ordering::Relaxed) & mask != 0
            })
    }

    pub fn count_ones(&self) -> usize {
        self.words
            .iter()
            .map(|word| word.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }

    /// Copies the bits set so far into a sequential filter with the same configuration.
    pub fn snapshot(&self) -> BloomFilter {
        let mut bits = FixedBitSet::with_capacity(self.size);
        for (index, word) in self.words.iter().enumerate() {
            let mut word = word.load(Ordering::Relaxed);
            while word != 0 {
                let offset = word.trailing_zeros() as usize;
                bits.insert(index * WORD_BITS + offset);
                word &= word - 1;
            }
        }
        BloomFilter::from_parts(bits, self.num_hashes, self.family)
    }
}

impl Debug for AtomicBloomFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "AtomicBloomFilter {{ size: {}, num_hashes: {}, strategy: {} }}",
            self.size,
            self.num_hashes,
            self.family.strategy()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HashStrategy;
    use std::thread;

    #[test]
    fn test_rejects_zero_size() {
        assert!(AtomicBloomFilter::new(0, 3).is_err());
        assert!(AtomicBloomFilter::new(100, 0).is_err());
        assert!(AtomicBloomFilter::new(usize::MAX, 3).is_err());
    }

    #[test]
    fn test_insert_and_contains() {
        let filter = AtomicBloomFilter::new(1000, 3).unwrap();

        assert!(filter.insert("password123"));
        assert!(!filter.insert("password123"));
        assert!(filter.contains("password123"));
    }

    #[test]
    fn test_snapshot_matches_sequential() {
        let config = BloomConfig::new(777, 4).strategy(HashStrategy::Combined);
        let atomic = AtomicBloomFilter::from_config(config).unwrap();
        let mut sequential = BloomFilter::from_config(config).unwrap();

        for i in 0..100 {
            let item = format!("item_{i}");
            atomic.insert(&item);
            sequential.insert(&item);
        }

        assert_eq!(atomic.count_ones(), sequential.count_ones());
        assert_eq!(atomic.snapshot(), sequential);
    }

    #[test]
    fn test_concurrent_inserts() {
        let filter = AtomicBloomFilter::new(1 << 16, 4).unwrap();

        thread::scope(|s| {
            for t in 0..4 {
                let filter = &filter;
                s.spawn(move || {
                    for i in 0..1000 {
                        filter.insert(&format!("{t}-{i}"));
                    }
                });
            }
        });

        for t in 0..4 {
            for i in 0..1000 {
                assert!(filter.contains(&format!("{t}-{i}")));
            }
        }
    }
}
