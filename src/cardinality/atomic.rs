use crate::cardinality::hll::{bucket_and_rank, CardinalityEstimator, EstimatorConfig};
use crate::error::Result;
use crate::hash::{HashFamily, HashStrategy};
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU8, Ordering};

/// Cardinality estimator that accepts inserts through a shared reference.
///
/// Registers are one byte each and are raised with a compare-and-swap max loop,
/// so concurrent inserts into the same bucket never lose the larger rank.
pub struct AtomicCardinalityEstimator {
    registers: Vec<AtomicU8>,
    family: HashFamily,
    config: EstimatorConfig,
}

impl AtomicCardinalityEstimator {
    pub fn new(num_buckets: usize, strategy: HashStrategy) -> Result<Self> {
        Self::from_config(EstimatorConfig::new(num_buckets).strategy(strategy))
    }

    pub fn from_config(config: EstimatorConfig) -> Result<Self> {
        config.validate()?;
        tracing::debug!(
            num_buckets = config.num_buckets,
            strategy = %config.strategy,
            "creating atomic cardinality estimator"
        );
        Ok(Self {
            registers: (0..config.num_buckets).map(|_| AtomicU8::new(0)).collect(),
            family: HashFamily::with_seed(config.strategy, config.seed),
            config,
        })
    }

    pub fn num_buckets(&self) -> usize {
        self.registers.len()
    }

    pub fn insert(&self, item: &str) {
        let (index, rank) = bucket_and_rank(self.family.hash(item, 0), self.registers.len());
        update_max(&self.registers[index], rank);
    }

    pub fn estimate(&self) -> f64 {
        self.snapshot().estimate()
    }

    /// Copies the current registers into a sequential estimator.
    pub fn snapshot(&self) -> CardinalityEstimator {
        let mut estimator = CardinalityEstimator::unchecked(self.config);
        for (index, register) in self.registers.iter().enumerate() {
            estimator.raise(index, register.load(Ordering::Relaxed));
        }
        estimator
    }
}

fn update_max(register: &AtomicU8, rank: u8) {
    let mut current = register.load(Ordering::Relaxed);
    while rank > current {
        match register.compare_exchange_weak(current, rank, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(actual) => current = actual,
        }
    }
}

impl Debug for AtomicCardinalityEstimator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "AtomicCardinalityEstimator {{ num_buckets: {}, strategy: {} }}",
            self.registers.len(),
            self.family.strategy()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_rejects_zero_buckets() {
        assert!(AtomicCardinalityEstimator::from_config(EstimatorConfig::new(0)).is_err());
        assert!(AtomicCardinalityEstimator::new(usize::MAX, HashStrategy::Salted).is_err());
    }

    #[test]
    fn test_new_matches_config() {
        let estimator = AtomicCardinalityEstimator::new(512, HashStrategy::DoubleHashing).unwrap();
        assert_eq!(estimator.num_buckets(), 512);
        assert_eq!(
            estimator.snapshot().config(),
            EstimatorConfig::new(512).strategy(HashStrategy::DoubleHashing)
        );
        assert_eq!(estimator.estimate(), estimator.snapshot().estimate());
    }

    #[test]
    fn test_update_max() {
        let register = AtomicU8::new(4);

        update_max(&register, 2);
        assert_eq!(register.load(Ordering::Relaxed), 4);

        update_max(&register, 9);
        assert_eq!(register.load(Ordering::Relaxed), 9);
    }

    #[test]
    fn test_snapshot_matches_sequential() {
        let config = EstimatorConfig::new(256).strategy(HashStrategy::Combined);
        let atomic = AtomicCardinalityEstimator::from_config(config).unwrap();
        let mut sequential = CardinalityEstimator::from_config(config).unwrap();

        for i in 0..5000 {
            let item = format!("172.16.{}.{}", i / 256, i % 256);
            atomic.insert(&item);
            sequential.insert(&item);
        }

        assert_eq!(atomic.snapshot(), sequential);
        assert_eq!(atomic.estimate(), sequential.estimate());
    }

    #[test]
    fn test_concurrent_inserts() {
        let config = EstimatorConfig::new(1024);
        let atomic = AtomicCardinalityEstimator::from_config(config).unwrap();
        let mut sequential = CardinalityEstimator::from_config(config).unwrap();

        thread::scope(|s| {
            for t in 0..4 {
                let atomic = &atomic;
                s.spawn(move || {
                    for i in 0..2500 {
                        atomic.insert(&format!("{t}/{i}"));
                    }
                });
            }
        });

        for t in 0..4 {
            for i in 0..2500 {
                sequential.insert(&format!("{t}/{i}"));
            }
        }

        assert_eq!(atomic.snapshot(), sequential);
    }
}
