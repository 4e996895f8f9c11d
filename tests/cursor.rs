// Cursor semantics through the public API.
//
// - begin()/next() visits every entry once in bucket order and ends at end().
// - Erasing through a cursor returns the successor and keeps other cursors valid.
// - Rehash or clear invalidates all outstanding cursors (they panic when used).
// - Local cursors enumerate exactly one bucket's chain.
use chained_hashmap::{ChainedHashMap, Cursor};
use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};

fn walk(m: &ChainedHashMap<u32, u32>) -> Vec<Cursor> {
    let mut out = Vec::new();
    let mut c = m.begin();
    while c != m.end() {
        out.push(c);
        c = c.next(m);
    }
    out
}

#[test]
fn walk_covers_every_entry_once() {
    let m: ChainedHashMap<u32, u32> = (0..77).map(|i| (i, i + 1)).collect();
    let cursors = walk(&m);
    assert_eq!(cursors.len(), 77);
    let keys: BTreeSet<u32> = cursors.iter().map(|c| *c.key(&m).unwrap()).collect();
    assert_eq!(keys.len(), 77);
    let buckets: Vec<usize> = cursors.iter().map(|c| c.bucket().unwrap()).collect();
    assert!(buckets.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn erase_while_walking() {
    let mut m: ChainedHashMap<u32, u32> = (0..40).map(|i| (i, i)).collect();
    let mut c = m.begin();
    while !c.is_end() {
        if c.key(&m).unwrap() % 2 == 0 {
            c = m.erase_at(c);
        } else {
            c = c.next(&m);
        }
    }
    assert_eq!(m.len(), 20);
    assert!(m.keys().all(|k| k % 2 == 1));
}

#[test]
fn insert_without_growth_keeps_cursors() {
    let mut m: ChainedHashMap<u32, u32> = ChainedHashMap::with_bucket_count(101);
    let (c, _) = m.insert(1, 1);
    for i in 2..50 {
        m.insert(i, i);
    }
    assert_eq!(m.bucket_count(), 101);
    assert_eq!(c.value(&m), Some(&1));
}

#[test]
fn growth_invalidates_cursors() {
    let mut m: ChainedHashMap<u32, u32> = ChainedHashMap::new();
    let (c, _) = m.insert(0, 0);
    for i in 1..100 {
        m.insert(i, i);
    }
    let res = catch_unwind(AssertUnwindSafe(|| c.value(&m).copied()));
    assert!(res.is_err(), "a cursor from before growth must not resolve");
    // A fresh lookup works.
    assert_eq!(m.find(&0).value(&m), Some(&0));
}

#[test]
fn clear_invalidates_cursors() {
    let mut m: ChainedHashMap<u32, u32> = (0..5).map(|i| (i, i)).collect();
    let end = m.end();
    m.clear();
    assert_ne!(end, m.end());
    let res = catch_unwind(AssertUnwindSafe(|| end.next(&m)));
    assert!(res.is_err());
}

#[test]
fn erase_range_middle() {
    let mut m: ChainedHashMap<u32, u32> = (0..30).map(|i| (i, i)).collect();
    let all = walk(&m);
    let doomed: Vec<u32> = all[5..15].iter().map(|c| *c.key(&m).unwrap()).collect();
    let last = m.erase_range(all[5], all[15]);
    assert_eq!(last, all[15]);
    assert_eq!(m.len(), 20);
    for k in doomed {
        assert!(!m.contains_key(&k));
    }
}

#[test]
fn local_cursors_match_bucket_iter() {
    let mut m: ChainedHashMap<u32, u32> = ChainedHashMap::with_bucket_count(5);
    m.set_max_load_factor(8.0).unwrap();
    for i in 0..30 {
        m.insert(i, i);
    }
    assert_eq!(m.bucket_count(), 5);
    for b in 0..m.bucket_count() {
        let mut via_cursor = Vec::new();
        let mut c = m.begin_local(b);
        while c != m.end_local(b) {
            via_cursor.push(*c.entry(&m).unwrap().key());
            c = c.next(&m);
        }
        let via_iter: Vec<u32> = m.bucket_iter(b).map(|(k, _)| *k).collect();
        assert_eq!(via_cursor, via_iter);
        assert_eq!(via_iter.len(), m.bucket_size(b));
        assert!(via_iter.iter().all(|k| m.bucket(k) == b));
    }
}

#[test]
fn local_cursor_mutation() {
    let mut m: ChainedHashMap<u32, u32> = (0..10).map(|i| (i, 0)).collect();
    let b = m.bucket(&3);
    let mut c = m.begin_local(b);
    while !c.is_end() {
        *c.entry_mut(&mut m).unwrap().value_mut() += 1;
        c = c.next(&m);
    }
    assert_eq!(m[&3], 1);
}
