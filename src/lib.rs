//! Approximate membership and distinct counting over string streams.
//!
//! - [`BloomFilter`]: has this string been seen before? No false negatives.
//! - [`CardinalityEstimator`]: how many distinct strings have been seen?
//!   HyperLogLog-style registers, mergeable by element-wise max.
//!
//! Both draw their hashes from a [`HashFamily`] whose [`HashStrategy`] is part
//! of the configuration. [`set_membership::atomic`] and [`cardinality::atomic`]
//! hold variants that can be shared between threads.
//!
//! ```
//! use probcount::{BloomFilter, CardinalityEstimator, HashStrategy};
//!
//! let mut filter = BloomFilter::new(1000, 3)?;
//! filter.insert("password123");
//! assert!(filter.contains("password123"));
//!
//! let mut estimator = CardinalityEstimator::new(1024, HashStrategy::Salted)?;
//! for i in 0..10_000 {
//!     estimator.insert(&format!("10.0.{}.{}", i / 256, i % 256));
//! }
//! assert!((estimator.estimate() - 10_000.).abs() < 1_000.);
//! # Ok::<(), probcount::Error>(())
//! ```

mod bit_vec;
pub mod cardinality;
pub mod driver;
mod error;
pub mod hash;
pub mod set_membership;

pub use cardinality::hll::{CardinalityEstimator, Correction, EstimatorConfig};
pub use cardinality::Cardinality;
pub use driver::Classification;
pub use error::{Error, Result};
pub use hash::{HashFamily, HashStrategy};
pub use set_membership::bloom::{BloomConfig, BloomFilter};
pub use set_membership::SetMembership;
