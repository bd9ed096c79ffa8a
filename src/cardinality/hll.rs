use crate::bit_vec::BitVec;
use crate::cardinality::Cardinality;
use crate::error::{Error, Result};
use crate::hash::{HashFamily, HashStrategy};
use std::fmt::{Debug, Formatter};

const REGISTER_BITS: usize = 6;
const TWO_POW_32: f64 = (1u64 << 32) as f64;

/// Largest register count an estimator accepts.
pub const MAX_BUCKETS: usize = 1 << 18;

type Registers = BitVec<u8, REGISTER_BITS>;

/// Post-processing applied to the raw harmonic-mean estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with_serde", serde(rename_all = "snake_case"))]
pub enum Correction {
    /// `alpha * m^2 / Z` as is. Overestimates when few buckets are populated.
    #[default]
    None,
    /// Linear counting over empty registers while the raw estimate is below `2.5 * m`.
    SmallRange,
    /// Small-range correction plus the 32-bit large-range correction.
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EstimatorConfig {
    pub num_buckets: usize,
    #[cfg_attr(feature = "with_serde", serde(default))]
    pub strategy: HashStrategy,
    #[cfg_attr(feature = "with_serde", serde(default))]
    pub correction: Correction,
    #[cfg_attr(feature = "with_serde", serde(default))]
    pub seed: u64,
}

impl EstimatorConfig {
    pub fn new(num_buckets: usize) -> Self {
        Self {
            num_buckets,
            strategy: HashStrategy::default(),
            correction: Correction::default(),
            seed: 0,
        }
    }

    pub fn strategy(mut self, strategy: HashStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn correction(mut self, correction: Correction) -> Self {
        self.correction = correction;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.num_buckets == 0 {
            return Err(Error::configuration("num_buckets", "must be > 0"));
        }
        if self.num_buckets > MAX_BUCKETS {
            return Err(Error::configuration(
                "num_buckets",
                format!("must be at most {MAX_BUCKETS}"),
            ));
        }
        Ok(())
    }
}

/// HyperLogLog-style distinct counter.
///
/// Every item lands in one bucket; the bucket keeps the highest rank (leading
/// zeros of the rest of the hash, plus one) seen so far. Registers only grow,
/// so two estimators with the same configuration merge by element-wise max.
///
/// The relative standard error is about `1.04 / sqrt(num_buckets)`.
#[derive(Clone, PartialEq, Eq)]
pub struct CardinalityEstimator {
    registers: Registers,
    family: HashFamily,
    correction: Correction,
}

impl CardinalityEstimator {
    pub fn new(num_buckets: usize, strategy: HashStrategy) -> Result<Self> {
        Self::from_config(EstimatorConfig::new(num_buckets).strategy(strategy))
    }

    pub fn from_config(config: EstimatorConfig) -> Result<Self> {
        config.validate()?;
        tracing::debug!(
            num_buckets = config.num_buckets,
            strategy = %config.strategy,
            correction = ?config.correction,
            "creating cardinality estimator"
        );
        Ok(Self::unchecked(config))
    }

    pub(crate) fn unchecked(config: EstimatorConfig) -> Self {
        Self {
            registers: Registers::new(config.num_buckets),
            family: HashFamily::with_seed(config.strategy, config.seed),
            correction: config.correction,
        }
    }

    /// Picks the smallest power-of-two bucket count whose standard error is at most `epsilon`.
    pub fn with_error(epsilon: f64) -> Result<Self> {
        Self::from_config(EstimatorConfig::new(buckets_for_error(epsilon)?))
    }

    pub fn config(&self) -> EstimatorConfig {
        EstimatorConfig {
            num_buckets: self.num_buckets(),
            strategy: self.family.strategy(),
            correction: self.correction,
            seed: self.family.seed(),
        }
    }

    pub fn num_buckets(&self) -> usize {
        self.registers.size()
    }

    pub fn hash_family(&self) -> &HashFamily {
        &self.family
    }

    pub fn registers(&self) -> impl Iterator<Item = u8> + '_ {
        self.registers.iter()
    }

    pub fn insert(&mut self, item: &str) {
        self.insert_hash(self.family.hash(item, 0));
    }

    pub fn insert_hash(&mut self, hash: u64) {
        let (index, rank) = bucket_and_rank(hash, self.num_buckets());
        self.raise(index, rank);
    }

    /// `alpha * m^2 / sum(2^-register)` with no range correction.
    pub fn raw_estimate(&self) -> f64 {
        raw_estimate(self.registers.iter(), self.num_buckets())
    }

    /// Rounded distinct-count estimate after the configured correction.
    pub fn estimate(&self) -> f64 {
        let raw = self.raw_estimate();
        let m = self.num_buckets();
        let corrected = match self.correction {
            Correction::None => raw,
            Correction::SmallRange => small_range(raw, self.zero_registers(), m).unwrap_or(raw),
            Correction::Full => small_range(raw, self.zero_registers(), m)
                .unwrap_or_else(|| large_range(raw)),
        };
        corrected.max(0.).round()
    }

    pub fn relative_error(&self) -> f64 {
        1.04 / (self.num_buckets() as f64).sqrt()
    }

    /// Folds `other`'s registers into this one.
    pub fn merge(&mut self, other: &Self) -> Result<()> {
        self.check_compatible(other)?;
        for (index, value) in other.registers.iter().enumerate() {
            self.raise(index, value);
        }
        tracing::debug!(num_buckets = self.num_buckets(), "merged cardinality estimators");
        Ok(())
    }

    pub fn merged(&self, other: &Self) -> Result<Self> {
        let mut combined = self.clone();
        combined.merge(other)?;
        Ok(combined)
    }

    fn check_compatible(&self, other: &Self) -> Result<()> {
        if self.num_buckets() != other.num_buckets() || self.family != other.family {
            return Err(Error::IncompatibleMerge {
                expected: describe(self.num_buckets(), &self.family),
                found: describe(other.num_buckets(), &other.family),
            });
        }
        Ok(())
    }

    pub(crate) fn raise(&mut self, index: usize, value: u8) {
        self.registers.update_max(index, value);
    }

    fn zero_registers(&self) -> usize {
        self.registers.iter().filter(|&r| r == 0).count()
    }
}

impl Cardinality for CardinalityEstimator {
    fn count(&self) -> f64 {
        self.estimate()
    }

    fn insert(&mut self, item: &str) {
        CardinalityEstimator::insert(self, item)
    }
}

impl Debug for CardinalityEstimator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CardinalityEstimator {{ num_buckets: {}, strategy: {}, correction: {:?} }}",
            self.num_buckets(),
            self.family.strategy(),
            self.correction
        )
    }
}

/// Highest value a register can hold.
pub fn max_rank() -> u8 {
    Registers::max_value()
}

/// Splits a hash into a bucket index and the rank of the remaining bits.
///
/// For `2^p` buckets the low `p` bits pick the bucket and the rank is taken over
/// the other `64 - p` bits. Any other bucket count maps the low 32 bits onto
/// `0..num_buckets` and ranks the high 32 bits.
pub(crate) fn bucket_and_rank(hash: u64, num_buckets: usize) -> (usize, u8) {
    let (index, remainder, width) = if num_buckets.is_power_of_two() {
        let p = num_buckets.trailing_zeros();
        let index = (hash & (num_buckets as u64 - 1)) as usize;
        (index, hash >> p, u64::BITS - p)
    } else {
        let low = u128::from(hash as u32);
        let index = ((low * num_buckets as u128) >> 32) as usize;
        (index, hash >> 32, 32)
    };
    let zeros = remainder.leading_zeros() - (u64::BITS - width);
    let rank = (zeros + 1).min(u32::from(max_rank()));
    (index, rank as u8)
}

fn raw_estimate(registers: impl Iterator<Item = u8>, num_buckets: usize) -> f64 {
    let m = num_buckets as f64;
    let z: f64 = registers.map(|r| (-f64::from(r)).exp2()).sum();
    alpha(m) * m * m / z
}

fn alpha(m: f64) -> f64 {
    0.7213 / (1. + 1.079 / m)
}

fn small_range(raw: f64, zeros: usize, num_buckets: usize) -> Option<f64> {
    let m = num_buckets as f64;
    (raw <= 2.5 * m && zeros > 0).then(|| m * (m / zeros as f64).ln())
}

fn large_range(raw: f64) -> f64 {
    if raw > TWO_POW_32 / 30. && raw < TWO_POW_32 {
        -TWO_POW_32 * (1. - raw / TWO_POW_32).ln()
    } else {
        raw
    }
}

fn buckets_for_error(epsilon: f64) -> Result<usize> {
    if !(0. < epsilon && epsilon < 1.) {
        return Err(Error::configuration("epsilon", "must be in the range (0, 1)"));
    }
    let m = (1.04 / epsilon).powi(2).ceil();
    if m > MAX_BUCKETS as f64 {
        return Err(Error::configuration(
            "epsilon",
            format!("needs more than {MAX_BUCKETS} buckets"),
        ));
    }
    Ok((m as usize).next_power_of_two())
}

fn describe(num_buckets: usize, family: &HashFamily) -> String {
    format!(
        "num_buckets={}, strategy={}, seed={}",
        num_buckets,
        family.strategy(),
        family.seed()
    )
}
