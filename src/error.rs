//! Error type shared by the fallible map operations.

use std::collections::TryReserveError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// `at`/`at_mut` on a key that is not in the map.
    #[error("key not found")]
    KeyNotFound,
    #[error("max load factor must be finite and greater than zero, got {0}")]
    InvalidLoadFactor(f32),
    #[error("requested {requested} buckets, but at most {max} are supported")]
    CapacityOverflow { requested: usize, max: usize },
    /// The node arena addresses at most `max` entries.
    #[error("map already holds the maximum of {max} entries")]
    LengthOverflow { max: usize },
    #[error("failed to allocate the bucket array: {0}")]
    Alloc(#[from] TryReserveError),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_input() {
        assert_eq!(Error::KeyNotFound.to_string(), "key not found");
        assert!(Error::InvalidLoadFactor(-1.0).to_string().contains("-1"));
        let e = Error::CapacityOverflow {
            requested: 10,
            max: 5,
        };
        assert_eq!(
            e.to_string(),
            "requested 10 buckets, but at most 5 are supported"
        );
    }
}
