use crate::set_membership::SetMembership;
use std::collections::HashSet;

impl SetMembership for HashSet<String> {
    fn contains(&self, item: &str) -> bool {
        HashSet::contains(self, item)
    }

    fn insert(&mut self, item: &str) -> bool {
        HashSet::insert(self, item.to_owned())
    }
}
