#![cfg(test)]

// Property tests for ChainedHashMap kept inside the crate so they can
// check the bucket layout directly.

use crate::chained_hash_map::ChainedHashMap;
use crate::policy::DefaultKeyEq;
use core::hash::BuildHasher;
use hashbrown::HashMap;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::Hasher;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    InsertOrAssign(usize, i32),
    TryEmplace(usize, i32),
    Erase(usize),
    EraseAt(usize),
    Find(usize),
    Contains(String),
    Mutate(usize, i32),
    Rehash(usize),
    Clear,
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=24).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::InsertOrAssign(i, v)),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::TryEmplace(i, v)),
            2 => idx.clone().prop_map(OpI::Erase),
            1 => idx.clone().prop_map(OpI::EraseAt),
            2 => idx.clone().prop_map(OpI::Find),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => (0usize..64).prop_map(OpI::Rehash),
            1 => Just(OpI::Clear),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

/// Every node sits in the bucket its hash maps to and the chains hold
/// exactly `len()` nodes.
fn layout_holds<S, E>(sut: &ChainedHashMap<Key, i32, S, E>) -> bool {
    let mut total = 0;
    for b in 0..sut.bucket_count() {
        for (_, n) in sut.buckets.chain(&sut.slots, b) {
            if sut.buckets.index_of(n.hash) != b {
                return false;
            }
            total += 1;
        }
    }
    total == sut.len()
}

fn run_ops<S>(
    mut sut: ChainedHashMap<Key, i32, S, DefaultKeyEq>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError>
where
    S: BuildHasher,
{
    let mut model: HashMap<Key, i32> = HashMap::new();

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(pool, i);
                let already = model.contains_key(&k);
                let (c, inserted) = sut.insert(k.clone(), v);
                prop_assert_eq!(inserted, !already, "insert succeeds only for a new key");
                if inserted {
                    model.insert(k, v);
                }
                prop_assert_eq!(c.value(&sut), model.get(&key_from(pool, i)));
            }
            OpI::InsertOrAssign(i, v) => {
                let k = key_from(pool, i);
                let already = model.contains_key(&k);
                let (c, inserted) = sut.insert_or_assign(k.clone(), v);
                prop_assert_eq!(inserted, !already);
                model.insert(k, v);
                prop_assert_eq!(c.value(&sut), Some(&v));
            }
            OpI::TryEmplace(i, v) => {
                let k = key_from(pool, i);
                let already = model.contains_key(&k);
                let mut ran = false;
                let (_, inserted) = sut.try_emplace(k.clone(), || {
                    ran = true;
                    v
                });
                prop_assert_eq!(inserted, !already);
                prop_assert_eq!(ran, !already, "constructor runs exactly when inserting");
                model.entry(k).or_insert(v);
            }
            OpI::Erase(i) => {
                let k = key_from(pool, i);
                let expected = usize::from(model.remove(&k).is_some());
                prop_assert_eq!(sut.erase(&k), expected);
                prop_assert!(sut.find(&k).is_end());
            }
            OpI::EraseAt(i) => {
                let k = key_from(pool, i);
                let c = sut.find(&k);
                if c.is_end() {
                    prop_assert!(!model.contains_key(&k));
                } else {
                    let after = c.next(&sut);
                    let next = sut.erase_at(c);
                    prop_assert_eq!(next, after);
                    prop_assert!(model.remove(&k).is_some());
                }
            }
            OpI::Find(i) => {
                let k = key_from(pool, i);
                let c = sut.find(&k);
                prop_assert_eq!(c.value(&sut), model.get(&k));
                prop_assert_eq!(sut.count(&k), usize::from(model.contains_key(&k)));
            }
            OpI::Contains(s) => {
                let has = sut.contains_key(s.as_str());
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(has, has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(pool, i);
                if let Some(v) = sut.get_mut(&k) {
                    *v = v.saturating_add(d);
                    let mv = model.get_mut(&k).expect("present in model");
                    *mv = mv.saturating_add(d);
                } else {
                    prop_assert!(!model.contains_key(&k));
                }
            }
            OpI::Rehash(n) => {
                sut.rehash(n);
                prop_assert!(sut.bucket_count() >= n);
            }
            OpI::Clear => {
                let buckets = sut.bucket_count();
                sut.clear();
                model.clear();
                prop_assert_eq!(sut.bucket_count(), buckets);
            }
            OpI::Iterate => {
                let s_keys: BTreeSet<_> = sut.keys().cloned().collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
                let mut walked = 0;
                let mut c = sut.begin();
                while c != sut.end() {
                    walked += 1;
                    c = c.next(&sut);
                }
                prop_assert_eq!(walked, model.len());
            }
        }

        // Post-conditions after each op
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert!(layout_holds(&sut));
        prop_assert!(sut.load_factor() <= sut.max_load_factor());
        for (k, v) in &model {
            prop_assert_eq!(sut.get(k), Some(v));
        }
    }
    Ok(())
}

// Property: state-machine equivalence against hashbrown::HashMap.
// Invariants exercised across random operation sequences:
// - Duplicate keys never overwrite on `insert`/`try_emplace`; they do on
//   `insert_or_assign`.
// - `erase`/`erase_at` remove exactly the addressed entry.
// - Chains stay consistent with stored hashes through growth and rehash.
// - `len`/`is_empty` parity and load factor under the maximum after each op.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_ops(ChainedHashMap::new(), &pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress equality resolution.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: same invariants under worst-case collisions: every key chains
// into bucket 0, so unlinking in the middle of long chains is exercised.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let sut = ChainedHashMap::with_bucket_count_and_hasher(2, ConstBuildHasher);
        run_ops(sut, &pool, ops)?;
    }
}
