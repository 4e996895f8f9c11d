//! Hashing and equality policy, bucket-count rounding, and the
//! construction record used by `ChainedHashMap::with_config`.

use crate::error::{Error, Result};
use hashbrown::hash_map::DefaultHashBuilder;

/// Bucket count of a default-constructed map.
pub const DEFAULT_BUCKET_COUNT: usize = 13;

/// Growth threshold of a default-constructed map.
pub const DEFAULT_MAX_LOAD_FACTOR: f32 = 1.0;

/// Key equivalence used to resolve collisions within a chain.
///
/// Implementations must agree with the map's hasher: keys that compare
/// equal must hash equal, otherwise lookups silently miss.
pub trait KeyEq<Q: ?Sized> {
    fn equivalent(&self, stored: &Q, query: &Q) -> bool;
}

/// Equivalence via `Eq`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DefaultKeyEq;

impl<Q: ?Sized + Eq> KeyEq<Q> for DefaultKeyEq {
    #[inline]
    fn equivalent(&self, stored: &Q, query: &Q) -> bool {
        stored == query
    }
}

impl<Q: ?Sized, F> KeyEq<Q> for F
where
    F: Fn(&Q, &Q) -> bool,
{
    #[inline]
    fn equivalent(&self, stored: &Q, query: &Q) -> bool {
        self(stored, query)
    }
}

pub(crate) fn check_load_factor(ml: f32) -> Result<f32> {
    if ml.is_finite() && ml > 0.0 {
        Ok(ml)
    } else {
        Err(Error::InvalidLoadFactor(ml))
    }
}

/// Smallest bucket count that keeps `len` entries at or below `ml`.
pub(crate) fn min_buckets_for(len: usize, ml: f32) -> usize {
    (len as f64 / ml as f64).ceil() as usize
}

fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }
    let mut i = 5;
    while i <= n / i {
        if n % i == 0 || n % (i + 2) == 0 {
            return false;
        }
        i += 6;
    }
    true
}

/// Round a requested bucket count up to the next prime (at least 2).
///
/// Returns `None` when no prime fits in `max`.
pub(crate) fn next_prime(n: usize, max: usize) -> Option<usize> {
    if n <= 2 {
        return (max >= 2).then_some(2);
    }
    let mut c = n | 1;
    while c <= max {
        if is_prime(c) {
            return Some(c);
        }
        c = c.checked_add(2)?;
    }
    None
}

/// Construction parameters for a map. Every field has a default, so
/// callers only override what they need:
///
/// ```
/// use chained_hashmap::{ChainedHashMap, Config};
///
/// let m: ChainedHashMap<u32, &str> =
///     ChainedHashMap::with_config(Config::new().bucket_count(101).max_load_factor(0.5)).unwrap();
/// assert_eq!(m.bucket_count(), 101);
/// ```
#[derive(Clone, Debug)]
pub struct Config<S = DefaultHashBuilder, E = DefaultKeyEq> {
    pub(crate) bucket_count: usize,
    pub(crate) max_load_factor: f32,
    pub(crate) hasher: S,
    pub(crate) key_eq: E,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: Default, E: Default> Default for Config<S, E> {
    fn default() -> Self {
        Self {
            bucket_count: DEFAULT_BUCKET_COUNT,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            hasher: S::default(),
            key_eq: E::default(),
        }
    }
}

impl<S, E> Config<S, E> {
    /// Initial bucket count; rounded up to a prime when the map is built.
    pub fn bucket_count(mut self, n: usize) -> Self {
        self.bucket_count = n;
        self
    }

    pub fn max_load_factor(mut self, ml: f32) -> Self {
        self.max_load_factor = ml;
        self
    }

    pub fn hasher<S2>(self, hasher: S2) -> Config<S2, E> {
        Config {
            bucket_count: self.bucket_count,
            max_load_factor: self.max_load_factor,
            hasher,
            key_eq: self.key_eq,
        }
    }

    pub fn key_eq<E2>(self, key_eq: E2) -> Config<S, E2> {
        Config {
            bucket_count: self.bucket_count,
            max_load_factor: self.max_load_factor,
            hasher: self.hasher,
            key_eq,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_prime_rounds_up() {
        let max = usize::MAX;
        assert_eq!(next_prime(0, max), Some(2));
        assert_eq!(next_prime(2, max), Some(2));
        assert_eq!(next_prime(3, max), Some(3));
        assert_eq!(next_prime(13, max), Some(13));
        assert_eq!(next_prime(14, max), Some(17));
        assert_eq!(next_prime(26, max), Some(29));
        assert_eq!(next_prime(90, max), Some(97));
        assert_eq!(next_prime(14, 16), None);
    }

    #[test]
    fn primality_of_small_numbers() {
        let primes: Vec<usize> = (0..40).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37]);
        assert!(is_prime(7919));
        assert!(!is_prime(7917));
    }

    #[test]
    fn load_factor_validation() {
        assert_eq!(check_load_factor(0.75), Ok(0.75));
        assert!(check_load_factor(0.0).is_err());
        assert!(check_load_factor(-1.0).is_err());
        assert!(check_load_factor(f32::NAN).is_err());
        assert!(check_load_factor(f32::INFINITY).is_err());
    }

    #[test]
    fn min_buckets_rounds_up() {
        assert_eq!(min_buckets_for(0, 1.0), 0);
        assert_eq!(min_buckets_for(10, 1.0), 10);
        assert_eq!(min_buckets_for(10, 0.75), 14);
        assert_eq!(min_buckets_for(10, 4.0), 3);
    }

    #[test]
    fn closures_act_as_key_eq() {
        let same_len = |a: &str, b: &str| a.len() == b.len();
        assert!(KeyEq::<str>::equivalent(&same_len, "ab", "cd"));
        assert!(!KeyEq::<str>::equivalent(&same_len, "ab", "c"));
        assert!(KeyEq::<i32>::equivalent(&DefaultKeyEq, &1, &1));
    }
}
