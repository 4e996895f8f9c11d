//! ChainedHashMap: the bucket array, its chains, and the rehash policy.

use crate::cursor::{next_epoch, Cursor, LocalCursor};
use crate::error::{Error, Result};
use crate::iter::{IntoIter, Iter, IterMut, Keys, LocalIter, Values, ValuesMut};
use crate::node::{Buckets, Node, NodeKey, Slots};
use crate::pair::Pair;
use crate::policy::{self, Config, DefaultKeyEq, KeyEq, DEFAULT_MAX_LOAD_FACTOR};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::ops::Index;
use hashbrown::hash_map::DefaultHashBuilder;

/// A hash map resolving collisions by chaining.
///
/// Keys are unique. Every entry sits in bucket `hash(key) % bucket_count()`
/// and new entries are pushed onto the front of their bucket's chain.
/// Inserting past `max_load_factor()` grows the bucket array to at least
/// twice its size (rounded up to a prime) before the new entry is linked.
/// If that growth fails the insert fails too and the map is unchanged:
/// `try_insert` and friends return the error, `insert` panics.
pub struct ChainedHashMap<K, V, S = DefaultHashBuilder, E = DefaultKeyEq> {
    pub(crate) buckets: Buckets,
    pub(crate) slots: Slots<K, V>, // node storage using generational keys
    pub(crate) epoch: u64,
    max_load_factor: f32,
    hasher: S,
    key_eq: E,
}

/// Returned by [`ChainedHashMap::emplace`] when the key is already present:
/// the key and the construction arguments come back untouched.
#[derive(Debug)]
pub struct Occupied<K, A> {
    pub cursor: Cursor,
    pub key: K,
    pub args: A,
}

/// Slotmap indexes with `u32` and reserves one index.
const MAX_LEN: usize = (u32::MAX - 1) as usize;

fn rounded_bucket_count(requested: usize) -> Result<usize> {
    let max = Buckets::max_count();
    policy::next_prime(requested, max).ok_or(Error::CapacityOverflow { requested, max })
}

fn or_panic<T>(r: Result<T>) -> T {
    match r {
        Ok(t) => t,
        Err(e) => panic!("{e}"),
    }
}

impl<K, V> ChainedHashMap<K, V> {
    /// An empty map with 13 buckets and a max load factor of 1.0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Panics if no prime bucket count `>= n` can be allocated.
    pub fn with_bucket_count(n: usize) -> Self {
        Self::with_bucket_count_and_hasher(n, DefaultHashBuilder::default())
    }
}

impl<K, V, S: Default, E: Default> Default for ChainedHashMap<K, V, S, E> {
    fn default() -> Self {
        or_panic(Self::with_config(Config::default()))
    }
}

impl<K, V, S, E: Default> ChainedHashMap<K, V, S, E> {
    pub fn with_hasher(hasher: S) -> Self {
        or_panic(Self::with_config(
            Config::new().hasher(hasher).key_eq(E::default()),
        ))
    }

    pub fn with_bucket_count_and_hasher(n: usize, hasher: S) -> Self {
        or_panic(Self::with_config(
            Config::new().bucket_count(n).hasher(hasher).key_eq(E::default()),
        ))
    }
}

impl<K, V, S, E> ChainedHashMap<K, V, S, E> {
    /// Build from a full configuration record. Fails on an invalid load
    /// factor or an unallocatable bucket count.
    pub fn with_config(config: Config<S, E>) -> Result<Self> {
        let max_load_factor = policy::check_load_factor(config.max_load_factor)?;
        let count = rounded_bucket_count(config.bucket_count.max(1))?;
        Ok(Self {
            buckets: Buckets::try_with_count(count)?,
            slots: Slots::with_key(),
            epoch: next_epoch(),
            max_load_factor,
            hasher: config.hasher,
            key_eq: config.key_eq,
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Most entries the map can ever hold.
    pub fn max_len(&self) -> usize {
        MAX_LEN
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }
    pub fn key_eq(&self) -> &E {
        &self.key_eq
    }

    // Bucket interface

    pub fn bucket_count(&self) -> usize {
        self.buckets.count()
    }

    pub fn max_bucket_count(&self) -> usize {
        Buckets::max_count()
    }

    /// Number of entries chained in bucket `n`. Panics if `n >= bucket_count()`.
    pub fn bucket_size(&self, n: usize) -> usize {
        assert!(n < self.bucket_count(), "bucket index out of range");
        self.buckets.chain(&self.slots, n).count()
    }

    pub fn bucket_iter(&self, n: usize) -> LocalIter<'_, K, V> {
        assert!(n < self.bucket_count(), "bucket index out of range");
        LocalIter::new(self.buckets.chain(&self.slots, n))
    }

    pub fn begin_local(&self, n: usize) -> LocalCursor {
        assert!(n < self.bucket_count(), "bucket index out of range");
        LocalCursor::new(self.epoch, n, self.buckets.head(n))
    }

    pub fn end_local(&self, n: usize) -> LocalCursor {
        assert!(n < self.bucket_count(), "bucket index out of range");
        LocalCursor::new(self.epoch, n, None)
    }

    // Hash policy

    pub fn load_factor(&self) -> f32 {
        self.len() as f32 / self.bucket_count() as f32
    }

    pub fn max_load_factor(&self) -> f32 {
        self.max_load_factor
    }

    /// Only affects later growth decisions; never rehashes by itself.
    pub fn set_max_load_factor(&mut self, ml: f32) -> Result<()> {
        self.max_load_factor = policy::check_load_factor(ml)?;
        Ok(())
    }

    /// Rebuild the bucket array with at least `n` buckets and at least
    /// enough to keep the current entries under the max load factor. The
    /// count is rounded up to a prime and may be smaller than the current
    /// one. Invalidates every cursor.
    ///
    /// On error the map is left exactly as it was.
    pub fn try_rehash(&mut self, n: usize) -> Result<()> {
        let wanted = n
            .max(policy::min_buckets_for(self.len(), self.max_load_factor))
            .max(1);
        let count = rounded_bucket_count(wanted)?;
        let fresh = Buckets::try_with_count(count)?;
        log::debug!(
            "rehashing {} entries from {} to {} buckets",
            self.len(),
            self.buckets.count(),
            count
        );
        let old = core::mem::replace(&mut self.buckets, fresh);
        old.relink_into(&mut self.slots, &mut self.buckets);
        self.epoch = next_epoch();
        Ok(())
    }

    /// Panics where [`try_rehash`](Self::try_rehash) would fail.
    pub fn rehash(&mut self, n: usize) {
        or_panic(self.try_rehash(n))
    }

    /// Make room for `n` entries without exceeding the max load factor.
    pub fn try_reserve(&mut self, n: usize) -> Result<()> {
        self.try_rehash(policy::min_buckets_for(n, self.max_load_factor))
    }

    pub fn reserve(&mut self, n: usize) {
        or_panic(self.try_reserve(n))
    }

    /// Grow ahead of linking one more entry if it would exceed the max
    /// load factor. On error the map is untouched.
    fn grow_for_insert(&mut self) -> Result<()> {
        let needed = self.len() + 1;
        if needed > MAX_LEN {
            return Err(Error::LengthOverflow { max: MAX_LEN });
        }
        if needed as f64 <= self.max_load_factor as f64 * self.bucket_count() as f64 {
            return Ok(());
        }
        let target = self
            .bucket_count()
            .saturating_mul(2)
            .max(policy::min_buckets_for(needed, self.max_load_factor));
        log::trace!(
            "load factor would exceed {} at {} entries; growing past {} buckets",
            self.max_load_factor,
            needed,
            self.bucket_count()
        );
        if let Err(e) = self.try_rehash(target) {
            log::debug!("growth to {target} buckets failed: {e}");
            return Err(e);
        }
        Ok(())
    }

    /// Link a node for `key` after growing. `make` only runs once growth
    /// has succeeded, and the returned position is in the final layout.
    fn try_link_new<F>(&mut self, hash: u64, key: K, make: F) -> Result<(usize, NodeKey)>
    where
        F: FnOnce() -> V,
    {
        self.grow_for_insert()?;
        let b = self.buckets.index_of(hash);
        let k = self.slots.insert(Node {
            pair: Pair::new(key, make()),
            hash,
            next: None,
        });
        self.buckets.push_front(&mut self.slots, b, k);
        Ok((b, k))
    }

    // Iteration

    pub fn begin(&self) -> Cursor {
        match self.buckets.first_occupied(0) {
            Some((b, k)) => Cursor::at(self.epoch, b, k),
            None => self.end(),
        }
    }

    pub fn end(&self) -> Cursor {
        Cursor::end(self.epoch, self.bucket_count())
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.buckets, &self.slots)
    }

    /// Mutable access to every entry once. Unlike [`iter`](Self::iter)
    /// the order is storage order, not bucket order; walk with
    /// [`begin`](Self::begin) and [`Cursor::value_mut`] for bucket order.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(&mut self.slots)
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Same storage order as [`iter_mut`](Self::iter_mut).
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    // Position-addressed mutation

    /// Erase the entry at `pos` and return the position after it. Cursors
    /// to other entries stay valid. Panics on the end cursor or a stale one.
    pub fn erase_at(&mut self, pos: Cursor) -> Cursor {
        let next = pos.next(&*self);
        let Some((bucket, k)) = pos.resolve(&*self) else {
            panic!("cannot erase at the end cursor");
        };
        let unlinked = self.buckets.unlink(&mut self.slots, bucket, k);
        debug_assert!(unlinked, "live node missing from its chain");
        self.slots.remove(k);
        next
    }

    /// Erase `[first, last)`; returns `last`.
    pub fn erase_range(&mut self, first: Cursor, last: Cursor) -> Cursor {
        let mut pos = first;
        while pos != last {
            pos = self.erase_at(pos);
        }
        pos
    }

    /// Drop every entry. The bucket count is kept; every cursor is
    /// invalidated.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.buckets.clear();
        self.epoch = next_epoch();
    }

    /// O(1): exchanges buckets, entries and policy; no node is touched.
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }
}

impl<K, V, S, E> ChainedHashMap<K, V, S, E>
where
    K: Hash,
    S: BuildHasher,
{
    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    /// Bucket of `q` and, if present, the node holding an equivalent key.
    fn locate<Q>(&self, hash: u64, q: &Q) -> (usize, Option<NodeKey>)
    where
        K: Borrow<Q>,
        Q: ?Sized,
        E: KeyEq<Q>,
    {
        let b = self.buckets.index_of(hash);
        let found = self
            .buckets
            .chain(&self.slots, b)
            .find(|(_, n)| {
                n.hash == hash && self.key_eq.equivalent(Borrow::<Q>::borrow(n.pair.key()), q)
            })
            .map(|(k, _)| k);
        (b, found)
    }

    fn lookup<Q>(&self, q: &Q) -> Option<(usize, NodeKey)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        match self.locate(self.make_hash(q), q) {
            (b, Some(k)) => Some((b, k)),
            (_, None) => None,
        }
    }

    /// Bucket index `q` hashes to, in `[0, bucket_count())`.
    pub fn bucket<Q>(&self, q: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
    {
        self.buckets.index_of(self.make_hash(q))
    }

    pub fn find<Q>(&self, q: &Q) -> Cursor
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        match self.lookup(q) {
            Some((b, k)) => Cursor::at(self.epoch, b, k),
            None => self.end(),
        }
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        self.lookup(q).is_some()
    }

    /// 0 or 1; keys are unique.
    pub fn count<Q>(&self, q: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        usize::from(self.contains_key(q))
    }

    /// `[found, next)` when present, `[end, end)` otherwise.
    pub fn equal_range<Q>(&self, q: &Q) -> (Cursor, Cursor)
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let first = self.find(q);
        (first, first.next(self))
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let (_, k) = self.lookup(q)?;
        Some(self.slots[k].pair.value())
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let (_, k) = self.lookup(q)?;
        Some(self.slots[k].pair.value_mut())
    }

    pub fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let (_, k) = self.lookup(q)?;
        let p = &self.slots[k].pair;
        Some((p.key(), p.value()))
    }

    /// Checked access: `Err(Error::KeyNotFound)` when absent.
    pub fn at<Q>(&self, q: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        self.get(q).ok_or(Error::KeyNotFound)
    }

    pub fn at_mut<Q>(&mut self, q: &Q) -> Result<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        self.get_mut(q).ok_or(Error::KeyNotFound)
    }

    /// Insert `key -> value` unless an equivalent key exists, in which case
    /// the map is unchanged and the cursor points at the existing entry.
    ///
    /// Panics if the map has to grow and cannot; see
    /// [`try_insert`](Self::try_insert).
    pub fn insert(&mut self, key: K, value: V) -> (Cursor, bool)
    where
        E: KeyEq<K>,
    {
        or_panic(self.try_insert(key, value))
    }

    /// [`insert`](Self::insert) that reports a failed growth instead of
    /// panicking. On `Err` nothing was inserted and the map is unchanged.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<(Cursor, bool)>
    where
        E: KeyEq<K>,
    {
        self.try_insert_with(key, || value)
    }

    /// Like `insert`, but overwrites the mapped value of an existing key.
    pub fn insert_or_assign(&mut self, key: K, value: V) -> (Cursor, bool)
    where
        E: KeyEq<K>,
    {
        or_panic(self.try_insert_or_assign(key, value))
    }

    pub fn try_insert_or_assign(&mut self, key: K, value: V) -> Result<(Cursor, bool)>
    where
        E: KeyEq<K>,
    {
        let hash = self.make_hash(&key);
        if let (b, Some(k)) = self.locate(hash, &key) {
            self.slots[k].pair.replace_value(value);
            return Ok((Cursor::at(self.epoch, b, k), false));
        }
        let (b, k) = self.try_link_new(hash, key, || value)?;
        Ok((Cursor::at(self.epoch, b, k), true))
    }

    /// Insert with a lazily built value: `make` only runs when the key is
    /// absent.
    pub fn try_emplace<F>(&mut self, key: K, make: F) -> (Cursor, bool)
    where
        E: KeyEq<K>,
        F: FnOnce() -> V,
    {
        or_panic(self.try_insert_with(key, make))
    }

    /// Fallible [`try_emplace`](Self::try_emplace). `make` does not run
    /// when the key is present or when growth fails.
    pub fn try_insert_with<F>(&mut self, key: K, make: F) -> Result<(Cursor, bool)>
    where
        E: KeyEq<K>,
        F: FnOnce() -> V,
    {
        let (b, k, inserted) = self.find_or_link(key, make)?;
        Ok((Cursor::at(self.epoch, b, k), inserted))
    }

    fn find_or_link<F>(&mut self, key: K, make: F) -> Result<(usize, NodeKey, bool)>
    where
        E: KeyEq<K>,
        F: FnOnce() -> V,
    {
        let hash = self.make_hash(&key);
        if let (b, Some(k)) = self.locate(hash, &key) {
            return Ok((b, k, false));
        }
        let (b, k) = self.try_link_new(hash, key, make)?;
        Ok((b, k, true))
    }

    /// Build the value from `args` only when the key is absent. On a hit
    /// nothing is converted and `key` and `args` are handed back. Panics
    /// like [`insert`](Self::insert) if the map cannot grow.
    pub fn emplace<A>(&mut self, key: K, args: A) -> core::result::Result<Cursor, Occupied<K, A>>
    where
        E: KeyEq<K>,
        V: From<A>,
    {
        let hash = self.make_hash(&key);
        if let (b, Some(k)) = self.locate(hash, &key) {
            return Err(Occupied {
                cursor: Cursor::at(self.epoch, b, k),
                key,
                args,
            });
        }
        let (b, k) = or_panic(self.try_link_new(hash, key, || V::from(args)));
        Ok(Cursor::at(self.epoch, b, k))
    }

    /// The mapped value of `key`, inserting `V::default()` first if absent.
    pub fn entry_or_default(&mut self, key: K) -> &mut V
    where
        E: KeyEq<K>,
        V: Default,
    {
        let (_, k, _) = or_panic(self.find_or_link(key, V::default));
        self.slots[k].pair.value_mut()
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let (b, k) = self.lookup(q)?;
        let unlinked = self.buckets.unlink(&mut self.slots, b, k);
        debug_assert!(unlinked, "live node missing from its chain");
        self.slots.remove(k).map(|n| n.pair.into_parts())
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    /// Number of entries removed: 0 or 1.
    pub fn erase<Q>(&mut self, q: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        usize::from(self.remove_entry(q).is_some())
    }
}

impl<K: Clone, V: Clone, S: Clone, E: Clone> Clone for ChainedHashMap<K, V, S, E> {
    /// Deep copy with the same bucket count and load-factor target. The
    /// copy has its own epoch, so cursors never cross between the two.
    fn clone(&self) -> Self {
        Self {
            buckets: self.buckets.clone(),
            slots: self.slots.clone(),
            epoch: next_epoch(),
            max_load_factor: self.max_load_factor,
            hasher: self.hasher.clone(),
            key_eq: self.key_eq.clone(),
        }
    }
}

impl<K: Clone, V: Clone, S: Clone, E: Clone> ChainedHashMap<K, V, S, E> {
    pub fn clone_with_bucket_count(&self, n: usize) -> Self {
        let mut copy = self.clone();
        copy.rehash(n);
        copy
    }
}

impl<K, V, S, E> PartialEq for ChainedHashMap<K, V, S, E>
where
    K: Hash,
    V: PartialEq,
    S: BuildHasher,
    E: KeyEq<K>,
{
    /// Same entries; bucket layout and policy are not compared.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).map_or(false, |ov| v == ov))
    }
}

impl<K, V, S, E> Eq for ChainedHashMap<K, V, S, E>
where
    K: Hash,
    V: Eq,
    S: BuildHasher,
    E: KeyEq<K>,
{
}

impl<K: fmt::Debug, V: fmt::Debug, S, E> fmt::Debug for ChainedHashMap<K, V, S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, Q, V, S, E> Index<&Q> for ChainedHashMap<K, V, S, E>
where
    K: Hash + Borrow<Q>,
    Q: ?Sized + Hash,
    S: BuildHasher,
    E: KeyEq<Q>,
{
    type Output = V;

    /// Panics when the key is absent; use [`ChainedHashMap::at`] for a
    /// recoverable lookup.
    fn index(&self, q: &Q) -> &V {
        match self.get(q) {
            Some(v) => v,
            None => panic!("key not found in ChainedHashMap"),
        }
    }
}

impl<K, V, S, E> Extend<(K, V)> for ChainedHashMap<K, V, S, E>
where
    K: Hash,
    S: BuildHasher,
    E: KeyEq<K>,
{
    /// Duplicate keys keep their first value, as with `insert`.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, S, E> FromIterator<(K, V)> for ChainedHashMap<K, V, S, E>
where
    K: Hash,
    S: BuildHasher + Default,
    E: KeyEq<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut m = Self::default();
        m.extend(iter);
        m
    }
}

impl<K: Hash + Eq, V, const N: usize> From<[(K, V); N]> for ChainedHashMap<K, V> {
    fn from(arr: [(K, V); N]) -> Self {
        let mut m = Self::new();
        if N as f64 > DEFAULT_MAX_LOAD_FACTOR as f64 * m.bucket_count() as f64 {
            m.reserve(N);
        }
        m.extend(arr);
        m
    }
}

impl<K, V, S, E> IntoIterator for ChainedHashMap<K, V, S, E> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.slots)
    }
}

impl<'a, K, V, S, E> IntoIterator for &'a ChainedHashMap<K, V, S, E> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, E> IntoIterator for &'a mut ChainedHashMap<K, V, S, E> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
