use crate::error::{Error, Result};
use crate::hash::{HashFamily, HashStrategy};
use crate::set_membership::SetMembership;
use fixedbitset::FixedBitSet;
use std::f64::consts::LN_2;
use std::fmt::{Debug, Formatter};

/// Largest bit count a filter accepts (512 MiB of storage).
pub const MAX_SIZE: usize = u32::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BloomConfig {
    pub size: usize,
    pub num_hashes: usize,
    #[cfg_attr(feature = "with_serde", serde(default))]
    pub strategy: HashStrategy,
    #[cfg_attr(feature = "with_serde", serde(default))]
    pub seed: u64,
}

impl BloomConfig {
    pub fn new(size: usize, num_hashes: usize) -> Self {
        Self {
            size,
            num_hashes,
            strategy: HashStrategy::default(),
            seed: 0,
        }
    }

    pub fn strategy(mut self, strategy: HashStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::configuration("size", "must be > 0"));
        }
        if self.size > MAX_SIZE {
            return Err(Error::configuration(
                "size",
                format!("must be at most {MAX_SIZE}"),
            ));
        }
        if self.num_hashes == 0 {
            return Err(Error::configuration("num_hashes", "must be > 0"));
        }
        if u32::try_from(self.num_hashes).is_err() {
            return Err(Error::configuration("num_hashes", "must fit in 32 bits"));
        }
        Ok(())
    }
}

/// Bit-array set membership.
///
/// Each item sets `num_hashes` bits chosen by the [`HashFamily`]. Bits are never
/// cleared, so an inserted item is always reported present; an item that was
/// never inserted may be reported present when all of its bits were set by
/// others.
#[derive(Clone, PartialEq, Eq)]
pub struct BloomFilter {
    bits: FixedBitSet,
    num_hashes: usize,
    family: HashFamily,
}

impl BloomFilter {
    pub fn new(size: usize, num_hashes: usize) -> Result<Self> {
        Self::from_config(BloomConfig::new(size, num_hashes))
    }

    pub fn from_config(config: BloomConfig) -> Result<Self> {
        config.validate()?;
        tracing::debug!(
            size = config.size,
            num_hashes = config.num_hashes,
            strategy = %config.strategy,
            "creating bloom filter"
        );
        Ok(Self {
            bits: FixedBitSet::with_capacity(config.size),
            num_hashes: config.num_hashes,
            family: HashFamily::with_seed(config.strategy, config.seed),
        })
    }

    /// Sizes the filter for `num_items` insertions at the given false-positive rate.
    pub fn with_probability(num_items: usize, probability: f64) -> Result<Self> {
        let (size, num_hashes) = optimal_params(num_items, probability)?;
        Self::new(size, num_hashes)
    }

    pub fn config(&self) -> BloomConfig {
        BloomConfig {
            size: self.bits.len(),
            num_hashes: self.num_hashes,
            strategy: self.family.strategy(),
            seed: self.family.seed(),
        }
    }

    pub fn size(&self) -> usize {
        self.bits.len()
    }

    pub fn num_hashes(&self) -> usize {
        self.num_hashes
    }

    pub fn hash_family(&self) -> &HashFamily {
        &self.family
    }

    pub fn count_ones(&self) -> usize {
        self.bits.count_ones(..)
    }

    /// Sets the item's bits. Returns `true` if at least one of them was unset.
    pub fn insert(&mut self, item: &str) -> bool {
        let range = self.bits.len();
        !self
            .family
            .probes(item, self.num_hashes, range)
            .fold(true, |acc, bit| acc & self.bits.put(bit))
    }

    pub fn contains(&self, item: &str) -> bool {
        self.family
            .probes(item, self.num_hashes, self.bits.len())
            .all(|bit| self.bits.contains(bit))
    }

    /// Inserts the item and returns whether it was reported present beforehand.
    pub fn check_and_insert(&mut self, item: &str) -> bool {
        !self.insert(item)
    }

    /// Number of distinct insertions implied by the fill ratio.
    pub fn estimated_len(&self) -> f64 {
        let m = self.bits.len() as f64;
        let k = self.num_hashes as f64;
        let ones = self.count_ones() as f64;
        if ones >= m {
            return f64::INFINITY;
        }
        -m / k * (1. - ones / m).ln()
    }

    /// Theoretical false-positive rate `(1 - e^(-kn/m))^k` after `num_items` insertions.
    pub fn false_positive_rate(&self, num_items: usize) -> f64 {
        theoretical_false_positive_rate(self.bits.len(), self.num_hashes, num_items)
    }

    /// False-positive rate implied by the bits currently set.
    pub fn current_false_positive_rate(&self) -> f64 {
        let fill = self.count_ones() as f64 / self.bits.len() as f64;
        fill.powf(self.num_hashes as f64)
    }

    pub(crate) fn from_parts(bits: FixedBitSet, num_hashes: usize, family: HashFamily) -> Self {
        Self {
            bits,
            num_hashes,
            family,
        }
    }
}

impl SetMembership for BloomFilter {
    fn contains(&self, item: &str) -> bool {
        BloomFilter::contains(self, item)
    }

    fn insert(&mut self, item: &str) -> bool {
        BloomFilter::insert(self, item)
    }
}

impl Debug for BloomFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BloomFilter {{ size: {}, num_hashes: {}, strategy: {} }}",
            self.bits.len(),
            self.num_hashes,
            self.family.strategy()
        )
    }
}

pub fn theoretical_false_positive_rate(size: usize, num_hashes: usize, num_items: usize) -> f64 {
    let (m, k, n) = (size as f64, num_hashes as f64, num_items as f64);
    (1. - (-k * n / m).exp()).powf(k)
}

pub(crate) fn optimal_params(num_items: usize, probability: f64) -> Result<(usize, usize)> {
    if num_items == 0 {
        return Err(Error::configuration("num_items", "must be > 0"));
    }
    if !(0. < probability && probability < 1.) {
        return Err(Error::configuration(
            "probability",
            "must be in the range (0, 1)",
        ));
    }
    let n = num_items as f64;
    let size = (-n * probability.ln() / (LN_2 * LN_2)).ceil() as usize;
    let num_hashes = ((size as f64 / n) * LN_2).round().max(1.) as usize;
    Ok((size, num_hashes))
}
