pub mod atomic;
pub mod bloom;
pub mod hash_set;

/// Approximate or exact set of strings that only grows.
pub trait SetMembership {
    fn contains(&self, item: &str) -> bool;

    /// Adds the item. Returns `true` if it was not reported present before.
    fn insert(&mut self, item: &str) -> bool;
}
