//! Pair: the key/value record stored in every node.

/// A key with its mapped value. The key cannot be changed once the pair
/// is stored in a map; the value can.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pair<K, V> {
    key: K,
    value: V,
}

impl<K, V> Pair<K, V> {
    pub const fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    #[inline]
    pub fn key(&self) -> &K {
        &self.key
    }

    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    #[inline]
    pub fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }

    /// Borrow both halves at once, the value mutably.
    #[inline]
    pub fn split_mut(&mut self) -> (&K, &mut V) {
        (&self.key, &mut self.value)
    }

    pub(crate) fn replace_value(&mut self, value: V) -> V {
        core::mem::replace(&mut self.value, value)
    }

    pub fn into_parts(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<K, V> From<(K, V)> for Pair<K, V> {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}

impl<K, V> From<Pair<K, V>> for (K, V) {
    fn from(p: Pair<K, V>) -> Self {
        p.into_parts()
    }
}
