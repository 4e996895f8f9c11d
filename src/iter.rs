//! Borrowing and owning iterators over `ChainedHashMap`.

use crate::node::{Buckets, Chain, Node, NodeKey, Slots};
use core::iter::FusedIterator;

/// Shared iteration in bucket order, then chain order within a bucket.
pub struct Iter<'a, K, V> {
    buckets: &'a Buckets,
    slots: &'a Slots<K, V>,
    bucket: usize,
    node: Option<NodeKey>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(buckets: &'a Buckets, slots: &'a Slots<K, V>) -> Self {
        Self {
            buckets,
            slots,
            bucket: 0,
            node: None,
            remaining: slots.len(),
        }
    }
}

impl<'a, K, V> Clone for Iter<'a, K, V> {
    fn clone(&self) -> Self {
        Self { ..*self }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(k) = self.node {
                let n = &self.slots[k];
                self.node = n.next;
                self.remaining -= 1;
                return Some((n.pair.key(), n.pair.value()));
            }
            let (b, head) = self.buckets.first_occupied(self.bucket)?;
            self.bucket = b + 1;
            self.node = Some(head);
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Mutable iteration. Every entry is visited once; the order is the
/// arena's, not the bucket order of [`Iter`].
pub struct IterMut<'a, K, V> {
    it: slotmap::basic::IterMut<'a, NodeKey, Node<K, V>>,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(crate) fn new(slots: &'a mut Slots<K, V>) -> Self {
        Self { it: slots.iter_mut() }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, n)| n.pair.split_mut())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

pub struct Keys<'a, K, V> {
    pub(crate) inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

pub struct Values<'a, K, V> {
    pub(crate) inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K, V> FusedIterator for Values<'_, K, V> {}

pub struct ValuesMut<'a, K, V> {
    pub(crate) inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}
impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}

/// Entries of a single bucket, head first.
pub struct LocalIter<'a, K, V> {
    chain: Chain<'a, K, V>,
}

impl<'a, K, V> LocalIter<'a, K, V> {
    pub(crate) fn new(chain: Chain<'a, K, V>) -> Self {
        Self { chain }
    }
}

impl<'a, K, V> Iterator for LocalIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.chain
            .next()
            .map(|(_, n)| (n.pair.key(), n.pair.value()))
    }
}

impl<K, V> FusedIterator for LocalIter<'_, K, V> {}

/// Owning iterator; consumes the map.
pub struct IntoIter<K, V> {
    it: slotmap::basic::IntoIter<NodeKey, Node<K, V>>,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(slots: Slots<K, V>) -> Self {
        Self {
            it: slots.into_iter(),
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, n)| n.pair.into_parts())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

#[cfg(test)]
mod tests {
    use crate::ChainedHashMap;

    fn sample() -> ChainedHashMap<u32, u32> {
        (0..40).map(|k| (k, k * 10)).collect()
    }

    #[test]
    fn keys_and_values_report_exact_len() {
        let m = sample();
        let mut keys = m.keys();
        assert_eq!(keys.len(), 40);
        keys.next();
        assert_eq!(keys.len(), 39);
        let mut values = m.values();
        values.by_ref().take(15).for_each(drop);
        assert_eq!(values.len(), 25);
    }

    #[test]
    fn cloned_keys_resume_from_the_same_place() {
        let m = sample();
        let mut keys = m.keys();
        keys.next();
        keys.next();
        let rest: Vec<_> = keys.clone().collect();
        assert_eq!(rest, keys.collect::<Vec<_>>());
        assert_eq!(rest.len(), 38);

        let values = m.values();
        assert_eq!(values.clone().sum::<u32>(), values.sum::<u32>());
    }

    #[test]
    fn exhausted_iterators_stay_exhausted() {
        let mut m = sample();
        let mut values = m.values();
        values.by_ref().for_each(drop);
        assert_eq!(values.next(), None);
        assert_eq!(values.next(), None);

        let mut vm = m.values_mut();
        assert_eq!(vm.len(), 40);
        vm.by_ref().for_each(|v| *v += 1);
        assert!(vm.next().is_none());

        let mut it = m.into_iter();
        assert_eq!(it.len(), 40);
        it.by_ref().for_each(drop);
        assert!(it.next().is_none());
    }
}
