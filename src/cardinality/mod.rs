pub mod atomic;
pub mod hash_set;
pub mod hll;

/// Distinct counter over a stream of strings.
pub trait Cardinality {
    fn count(&self) -> f64;
    fn insert(&mut self, item: &str);
}
