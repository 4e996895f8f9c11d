//! Position cursors over a `ChainedHashMap`.
//!
//! A cursor is a plain `Copy` value naming a bucket and a node in it; it
//! does not borrow the map. Accessors take the map explicitly, so one
//! cursor type serves both shared and mutable access depending on the
//! borrow that is passed in.
//!
//! Validity
//! - Each map carries an epoch that is replaced whenever its bucket
//!   layout is rebuilt or wiped (rehash, reserve, growth, clear). A
//!   cursor from an older epoch panics when used.
//! - Erasing an entry invalidates only cursors to that entry; the arena
//!   key's generation detects the reuse and the cursor panics when used.
//! - The end cursor is never dereferenced: accessors return `None`.

use crate::chained_hash_map::ChainedHashMap;
use crate::node::NodeKey;
use crate::pair::Pair;
use core::sync::atomic::{AtomicU64, Ordering};

pub(crate) fn next_epoch() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

/// Whole-table position: visits buckets in index order, then each chain
/// from its head.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Cursor {
    epoch: u64,
    bucket: usize,
    node: Option<NodeKey>,
}

impl Cursor {
    pub(crate) fn at(epoch: u64, bucket: usize, node: NodeKey) -> Self {
        Self {
            epoch,
            bucket,
            node: Some(node),
        }
    }

    pub(crate) fn end(epoch: u64, bucket_count: usize) -> Self {
        Self {
            epoch,
            bucket: bucket_count,
            node: None,
        }
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        self.node.is_none()
    }

    /// Bucket holding the pointed-to entry; `None` for the end cursor.
    pub fn bucket(&self) -> Option<usize> {
        self.node.map(|_| self.bucket)
    }

    /// Panics unless the cursor belongs to the current layout of `map`
    /// and its entry (if any) is still live.
    pub(crate) fn resolve<K, V, S, E>(
        &self,
        map: &ChainedHashMap<K, V, S, E>,
    ) -> Option<(usize, NodeKey)> {
        assert_eq!(
            self.epoch, map.epoch,
            "cursor used after its map was rehashed or cleared, or with another map"
        );
        let k = self.node?;
        assert!(
            map.slots.contains_key(k),
            "cursor refers to an erased entry"
        );
        Some((self.bucket, k))
    }

    pub fn entry<'a, K, V, S, E>(
        &self,
        map: &'a ChainedHashMap<K, V, S, E>,
    ) -> Option<&'a Pair<K, V>> {
        let (_, k) = self.resolve(map)?;
        Some(&map.slots[k].pair)
    }

    /// Mutable access to the entry; the key stays read-only.
    pub fn entry_mut<'a, K, V, S, E>(
        &self,
        map: &'a mut ChainedHashMap<K, V, S, E>,
    ) -> Option<&'a mut Pair<K, V>> {
        let (_, k) = self.resolve(map)?;
        Some(&mut map.slots[k].pair)
    }

    pub fn key<'a, K, V, S, E>(&self, map: &'a ChainedHashMap<K, V, S, E>) -> Option<&'a K> {
        self.entry(map).map(Pair::key)
    }

    pub fn value<'a, K, V, S, E>(&self, map: &'a ChainedHashMap<K, V, S, E>) -> Option<&'a V> {
        self.entry(map).map(Pair::value)
    }

    pub fn value_mut<'a, K, V, S, E>(
        &self,
        map: &'a mut ChainedHashMap<K, V, S, E>,
    ) -> Option<&'a mut V> {
        self.entry_mut(map).map(Pair::value_mut)
    }

    /// The following position: the next node in this chain, else the head
    /// of the next non-empty bucket, else the end. The end maps to itself.
    pub fn next<K, V, S, E>(&self, map: &ChainedHashMap<K, V, S, E>) -> Cursor {
        let Some((bucket, k)) = self.resolve(map) else {
            return *self;
        };
        if let Some(n) = map.slots[k].next {
            return Cursor::at(self.epoch, bucket, n);
        }
        match map.buckets.first_occupied(bucket + 1) {
            Some((b, n)) => Cursor::at(self.epoch, b, n),
            None => Cursor::end(self.epoch, map.buckets.count()),
        }
    }
}

/// Position within a single bucket's chain. `None` is the terminal state
/// and equals `map.end_local(bucket)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LocalCursor {
    epoch: u64,
    bucket: usize,
    node: Option<NodeKey>,
}

impl LocalCursor {
    pub(crate) fn new(epoch: u64, bucket: usize, node: Option<NodeKey>) -> Self {
        Self {
            epoch,
            bucket,
            node,
        }
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        self.node.is_none()
    }

    pub fn bucket(&self) -> usize {
        self.bucket
    }

    fn resolve<K, V, S, E>(&self, map: &ChainedHashMap<K, V, S, E>) -> Option<NodeKey> {
        assert_eq!(
            self.epoch, map.epoch,
            "local cursor used after its map was rehashed or cleared, or with another map"
        );
        let k = self.node?;
        assert!(
            map.slots.contains_key(k),
            "local cursor refers to an erased entry"
        );
        Some(k)
    }

    pub fn entry<'a, K, V, S, E>(
        &self,
        map: &'a ChainedHashMap<K, V, S, E>,
    ) -> Option<&'a Pair<K, V>> {
        let k = self.resolve(map)?;
        Some(&map.slots[k].pair)
    }

    pub fn entry_mut<'a, K, V, S, E>(
        &self,
        map: &'a mut ChainedHashMap<K, V, S, E>,
    ) -> Option<&'a mut Pair<K, V>> {
        let k = self.resolve(map)?;
        Some(&mut map.slots[k].pair)
    }

    pub fn next<K, V, S, E>(&self, map: &ChainedHashMap<K, V, S, E>) -> LocalCursor {
        match self.resolve(map) {
            Some(k) => LocalCursor::new(self.epoch, self.bucket, map.slots[k].next),
            None => *self,
        }
    }

    /// Widen to a whole-table cursor at the same entry. A terminal local
    /// cursor has no single successor, so it maps to `None`.
    pub fn to_cursor<K, V, S, E>(&self, map: &ChainedHashMap<K, V, S, E>) -> Option<Cursor> {
        self.resolve(map).map(|k| Cursor::at(self.epoch, self.bucket, k))
    }
}
