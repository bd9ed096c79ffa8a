//! Scenario drivers over items that were already read and parsed.
//!
//! [`classify`] implements the reused-password check on top of any
//! [`SetMembership`]; [`compare`] runs an exact and an approximate distinct
//! count over the same items. Nothing here reads files or prints.

use crate::cardinality::hll::CardinalityEstimator;
use crate::cardinality::Cardinality;
use crate::error::{Error, Result};
use crate::set_membership::SetMembership;
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

/// Outcome of checking one item against a membership structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with_serde", serde(rename_all = "snake_case"))]
pub enum Classification {
    AlreadyPresent,
    /// Not seen before; the item has now been inserted.
    Unique,
    InvalidInput,
}

impl Display for Classification {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Classification::AlreadyPresent => "already present",
            Classification::Unique => "unique",
            Classification::InvalidInput => "invalid input",
        };
        f.write_str(name)
    }
}

/// Rejects items that must not reach a filter or an estimator.
pub fn validate(item: &str) -> Result<&str> {
    if item.is_empty() {
        Err(Error::InvalidInput)
    } else {
        Ok(item)
    }
}

pub fn classify_one<S>(set: &mut S, item: &str) -> Classification
where
    S: SetMembership + ?Sized,
{
    let Ok(item) = validate(item) else {
        return Classification::InvalidInput;
    };
    if set.contains(item) {
        Classification::AlreadyPresent
    } else {
        set.insert(item);
        Classification::Unique
    }
}

/// Classifies each item in order, inserting the unique ones as it goes.
pub fn classify<'a, S, I>(set: &mut S, items: I) -> Vec<(&'a str, Classification)>
where
    S: SetMembership + ?Sized,
    I: IntoIterator<Item = &'a str>,
{
    items
        .into_iter()
        .map(|item| {
            let classification = classify_one(set, item);
            tracing::trace!(item, %classification, "classified item");
            (item, classification)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tally {
    pub distinct: u64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    pub exact: Tally,
    pub approximate: Tally,
}

impl Comparison {
    /// `|approximate - exact| / exact`, or 0 when nothing was counted.
    pub fn relative_error(&self) -> f64 {
        if self.exact.distinct == 0 {
            return 0.;
        }
        let exact = self.exact.distinct as f64;
        (self.approximate.distinct as f64 - exact).abs() / exact
    }
}

/// Feeds every non-empty item to `counter` and reports its count and the time taken.
pub fn count_distinct<'a, C, I>(counter: &mut C, items: I) -> Tally
where
    C: Cardinality + ?Sized,
    I: IntoIterator<Item = &'a str>,
{
    let start = Instant::now();
    for item in items {
        if let Ok(item) = validate(item) {
            counter.insert(item);
        }
    }
    let distinct = counter.count().max(0.).round() as u64;
    Tally {
        distinct,
        elapsed: start.elapsed(),
    }
}

/// Counts distinct items exactly and with `estimator`.
pub fn compare<S>(items: &[S], mut estimator: CardinalityEstimator) -> Comparison
where
    S: AsRef<str>,
{
    let mut exact = HashSet::<String>::new();
    let comparison = Comparison {
        exact: count_distinct(&mut exact, items.iter().map(AsRef::as_ref)),
        approximate: count_distinct(&mut estimator, items.iter().map(AsRef::as_ref)),
    };
    tracing::debug!(
        exact = comparison.exact.distinct,
        approximate = comparison.approximate.distinct,
        exact_elapsed = ?comparison.exact.elapsed,
        approximate_elapsed = ?comparison.approximate.elapsed,
        "compared distinct counts"
    );
    comparison
}
