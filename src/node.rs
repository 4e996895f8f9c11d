//! Chain nodes and the bucket array.
//!
//! Nodes live in a generational arena; a chain is a null-terminated list
//! of arena keys threaded through `Node::next`. The bucket array only
//! stores chain heads, so relinking a node never moves its pair.

use crate::error::Result;
use crate::pair::Pair;
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Arena key of one chain node.
    pub(crate) struct NodeKey;
}

#[derive(Clone, Debug)]
pub(crate) struct Node<K, V> {
    pub(crate) pair: Pair<K, V>,
    // Computed once at insertion; rehash never calls `K: Hash` again.
    pub(crate) hash: u64,
    pub(crate) next: Option<NodeKey>,
}

pub(crate) type Slots<K, V> = SlotMap<NodeKey, Node<K, V>>;

#[derive(Clone, Debug)]
pub(crate) struct Buckets {
    heads: Vec<Option<NodeKey>>,
}

impl Buckets {
    /// Largest bucket array the allocator could ever hand out.
    pub(crate) const fn max_count() -> usize {
        isize::MAX as usize / core::mem::size_of::<Option<NodeKey>>()
    }

    /// Allocate `n` empty chain heads. Fails without side effects.
    pub(crate) fn try_with_count(n: usize) -> Result<Self> {
        let mut heads = Vec::new();
        heads.try_reserve_exact(n)?;
        heads.resize(n, None);
        Ok(Self { heads })
    }

    #[inline]
    pub(crate) fn count(&self) -> usize {
        self.heads.len()
    }

    #[inline]
    pub(crate) fn index_of(&self, hash: u64) -> usize {
        (hash % self.heads.len() as u64) as usize
    }

    #[inline]
    pub(crate) fn head(&self, bucket: usize) -> Option<NodeKey> {
        self.heads[bucket]
    }

    /// First non-empty bucket at or after `from`, with its head node.
    pub(crate) fn first_occupied(&self, from: usize) -> Option<(usize, NodeKey)> {
        self.heads
            .get(from..)?
            .iter()
            .enumerate()
            .find_map(|(i, h)| h.map(|k| (from + i, k)))
    }

    pub(crate) fn chain<'a, K, V>(
        &self,
        slots: &'a Slots<K, V>,
        bucket: usize,
    ) -> Chain<'a, K, V> {
        Chain {
            slots,
            next: self.heads[bucket],
        }
    }

    pub(crate) fn push_front<K, V>(
        &mut self,
        slots: &mut Slots<K, V>,
        bucket: usize,
        key: NodeKey,
    ) {
        slots[key].next = self.heads[bucket];
        self.heads[bucket] = Some(key);
    }

    /// Detach `key` from the chain of `bucket`, repairing the previous
    /// link or the head. The node itself stays in the arena.
    pub(crate) fn unlink<K, V>(
        &mut self,
        slots: &mut Slots<K, V>,
        bucket: usize,
        key: NodeKey,
    ) -> bool {
        let after = match slots.get(key) {
            Some(n) => n.next,
            None => return false,
        };
        if self.heads[bucket] == Some(key) {
            self.heads[bucket] = after;
            return true;
        }
        let mut cur = self.heads[bucket];
        while let Some(k) = cur {
            let node = &mut slots[k];
            if node.next == Some(key) {
                node.next = after;
                return true;
            }
            cur = node.next;
        }
        false
    }

    /// Move every node of `self` into `into`, walking the old buckets in
    /// order and pushing each node onto the front of its new chain.
    pub(crate) fn relink_into<K, V>(self, slots: &mut Slots<K, V>, into: &mut Buckets) {
        for head in self.heads {
            let mut cur = head;
            while let Some(k) = cur {
                let node = &mut slots[k];
                cur = node.next;
                let b = into.index_of(node.hash);
                node.next = into.heads[b];
                into.heads[b] = Some(k);
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.heads.fill(None);
    }
}

/// Walks one chain, yielding arena keys with their nodes.
pub(crate) struct Chain<'a, K, V> {
    slots: &'a Slots<K, V>,
    next: Option<NodeKey>,
}

impl<'a, K, V> Iterator for Chain<'a, K, V> {
    type Item = (NodeKey, &'a Node<K, V>);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let k = self.next?;
        let node = &self.slots[k];
        self.next = node.next;
        Some((k, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(key: u32, hash: u64) -> Node<u32, ()> {
        Node {
            pair: Pair::new(key, ()),
            hash,
            next: None,
        }
    }

    fn keys_in(b: &Buckets, slots: &Slots<u32, ()>, bucket: usize) -> Vec<u32> {
        b.chain(slots, bucket).map(|(_, n)| *n.pair.key()).collect()
    }

    #[test]
    fn push_front_prepends() {
        let mut slots = Slots::with_key();
        let mut b = Buckets::try_with_count(3).unwrap();
        for k in 0..3 {
            let key = slots.insert(node(k, 0));
            b.push_front(&mut slots, 0, key);
        }
        assert_eq!(keys_in(&b, &slots, 0), [2, 1, 0]);
        assert!(b.head(1).is_none());
    }

    #[test]
    fn unlink_head_middle_and_tail() {
        let mut slots = Slots::with_key();
        let mut b = Buckets::try_with_count(1).unwrap();
        let keys: Vec<NodeKey> = (0..4)
            .map(|k| {
                let key = slots.insert(node(k, 0));
                b.push_front(&mut slots, 0, key);
                key
            })
            .collect();
        // chain: 3 2 1 0
        assert!(b.unlink(&mut slots, 0, keys[3]));
        assert_eq!(keys_in(&b, &slots, 0), [2, 1, 0]);
        assert!(b.unlink(&mut slots, 0, keys[1]));
        assert_eq!(keys_in(&b, &slots, 0), [2, 0]);
        assert!(b.unlink(&mut slots, 0, keys[0]));
        assert_eq!(keys_in(&b, &slots, 0), [2]);
        // Already detached: not found in the chain.
        slots[keys[1]].next = None;
        assert!(!b.unlink(&mut slots, 0, keys[1]));
    }

    #[test]
    fn relink_places_nodes_by_stored_hash() {
        let mut slots = Slots::with_key();
        let mut old = Buckets::try_with_count(2).unwrap();
        for k in 0..10u32 {
            let key = slots.insert(node(k, k as u64));
            let i = old.index_of(k as u64);
            old.push_front(&mut slots, i, key);
        }
        let mut new = Buckets::try_with_count(5).unwrap();
        old.relink_into(&mut slots, &mut new);
        for bucket in 0..5 {
            for k in keys_in(&new, &slots, bucket) {
                assert_eq!(k as usize % 5, bucket);
            }
        }
        let total: usize = (0..5).map(|i| new.chain(&slots, i).count()).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn first_occupied_scans_forward() {
        let mut slots = Slots::with_key();
        let mut b = Buckets::try_with_count(6).unwrap();
        let key = slots.insert(node(7, 4));
        b.push_front(&mut slots, 4, key);
        assert_eq!(b.first_occupied(0), Some((4, key)));
        assert_eq!(b.first_occupied(4), Some((4, key)));
        assert_eq!(b.first_occupied(5), None);
        assert_eq!(b.first_occupied(6), None);
        assert_eq!(b.first_occupied(60), None);
    }

    #[test]
    fn oversized_allocation_fails_cleanly() {
        assert!(Buckets::try_with_count(usize::MAX).is_err());
    }
}
