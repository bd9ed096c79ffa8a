use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A constructor was given a parameter that would yield a degenerate structure.
    #[error("invalid configuration: {parameter} {reason}")]
    Configuration {
        parameter: &'static str,
        reason: String,
    },
    /// Two estimators with different bucket counts or hashing cannot be combined.
    #[error("incompatible merge: expected {expected}, found {found}")]
    IncompatibleMerge { expected: String, found: String },
    /// Raised at the boundary for items that must not reach a filter or estimator.
    #[error("invalid input: item must be a non-empty string")]
    InvalidInput,
}

impl Error {
    pub(crate) fn configuration(parameter: &'static str, reason: impl Into<String>) -> Self {
        Error::Configuration {
            parameter,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = Error::configuration("num_hashes", "must be > 0");
        assert_eq!(
            err.to_string(),
            "invalid configuration: num_hashes must be > 0"
        );

        let err = Error::IncompatibleMerge {
            expected: "num_buckets=1024".into(),
            found: "num_buckets=512".into(),
        };
        assert_eq!(
            err.to_string(),
            "incompatible merge: expected num_buckets=1024, found num_buckets=512"
        );
    }
}
