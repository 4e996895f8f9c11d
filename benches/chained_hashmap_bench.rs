use chained_hashmap::ChainedHashMap;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn filled(seed: u64, n: usize) -> (ChainedHashMap<String, u64>, Vec<String>) {
    let mut m = ChainedHashMap::new();
    let keys: Vec<String> = lcg(seed).take(n).map(key).collect();
    for (i, k) in keys.iter().enumerate() {
        m.insert(k.clone(), i as u64);
    }
    (m, keys)
}

fn bench_insert(c: &mut Criterion) {
    c.bench_function("chained::insert_grow_100k", |b| {
        b.iter_batched(
            ChainedHashMap::<String, u64>::new,
            |mut m| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    m.insert(key(x), i as u64);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("chained::insert_reserved_100k", |b| {
        b.iter_batched(
            || {
                let mut m = ChainedHashMap::<String, u64>::new();
                m.reserve(100_000);
                m
            },
            |mut m| {
                for (i, x) in lcg(3).take(100_000).enumerate() {
                    m.insert(key(x), i as u64);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_find(c: &mut Criterion) {
    c.bench_function("chained::find_hit_10k_on_100k", |b| {
        let (m, keys) = filled(7, 100_000);
        // Precompute 10k random query keys using LCG
        let n = keys.len();
        let mut s = 0x9e3779b97f4a7c15u64;
        let queries: Vec<String> = (0..10_000)
            .map(|_| {
                s = s.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
                keys[(s as usize) % n].clone()
            })
            .collect();
        b.iter(|| {
            for k in &queries {
                black_box(m.get(k));
            }
        })
    });

    c.bench_function("chained::find_miss_10k_on_100k", |b| {
        let (m, _) = filled(11, 100_000);
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            for _ in 0..10_000 {
                let k = key(miss.next().unwrap());
                black_box(m.find(&k));
            }
        })
    });
}

fn bench_erase(c: &mut Criterion) {
    c.bench_function("chained::erase_random_10k_of_110k", |b| {
        b.iter_batched(
            || {
                let (m, keys) = filled(5, 110_000);
                let n = keys.len();
                let mut s = 0x9e3779b97f4a7c15u64;
                let doomed: Vec<String> = (0..10_000)
                    .map(|_| {
                        s = s.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
                        keys[(s as usize) % n].clone()
                    })
                    .collect();
                (m, doomed)
            },
            |(mut m, doomed)| {
                for k in &doomed {
                    m.erase(k);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_rehash_and_iter(c: &mut Criterion) {
    c.bench_function("chained::rehash_100k_double", |b| {
        b.iter_batched(
            || filled(13, 100_000).0,
            |mut m| {
                let n = m.bucket_count() * 2;
                m.rehash(n);
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("chained::iter_all_100k", |b| {
        let (m, _) = filled(999, 100_000);
        b.iter(|| {
            let mut sum = 0u64;
            for (_k, v) in m.iter() {
                sum = sum.wrapping_add(*v);
            }
            black_box(sum)
        })
    });

    c.bench_function("chained::cursor_walk_100k", |b| {
        let (m, _) = filled(1001, 100_000);
        b.iter(|| {
            let mut sum = 0u64;
            let mut cur = m.begin();
            while let Some(v) = cur.value(&m) {
                sum = sum.wrapping_add(*v);
                cur = cur.next(&m);
            }
            black_box(sum)
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(12)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches_insert;
    config = bench_config();
    targets = bench_insert
}
criterion_group! {
    name = benches_ops;
    config = bench_config();
    targets = bench_find, bench_erase, bench_rehash_and_iter
}
criterion_main!(benches_insert, benches_ops);
