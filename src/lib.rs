//! chained-hashmap: a separately chained hash map with explicit bucket
//! introspection, position cursors, and a load-factor driven rehash policy.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a hash table whose bucket layout is observable and whose
//!   mutation paths (insert, erase, rehash) keep a small set of invariants
//!   that can be checked independently.
//! - Layers:
//!   - `node`: arena-backed chain nodes and the bucket array of chain
//!     heads. A chain is a list of generational keys threaded through
//!     `Node::next`; nothing else links nodes.
//!   - `policy`: key equivalence (`KeyEq`), prime bucket-count rounding
//!     and the `Config` construction record.
//!   - `ChainedHashMap<K, V, S, E>`: orchestrates buckets and policy to
//!     provide insert/find/erase/rehash and the bucket interface.
//!   - `cursor` / `iter`: non-owning views. Cursors are `Copy`
//!     positions validated against the map; iterators borrow it.
//!
//! Invariants
//! - Keys are pairwise distinct under the map's `KeyEq`.
//! - Every live node sits in bucket `hash % bucket_count()` of the
//!   current layout; `len()` equals the nodes across all chains.
//! - `load_factor() == len() / bucket_count()` between operations.
//!
//! Policy
//! - Default layout: 13 buckets, max load factor 1.0. Bucket counts are
//!   always rounded up to a prime.
//! - New nodes are pushed onto the front of their chain.
//! - An insert that would push the load factor past the maximum first
//!   rebuilds the bucket array with at least twice as many buckets; the
//!   insert then sees the grown layout, so the caller never observes a
//!   half-grown table. If the array cannot grow the insert is refused and
//!   the map is left as it was.
//! - Rehash relinks existing nodes into the new array. Pairs never move
//!   and `K: Hash` is not called again: each node stores its hash.
//!
//! Cursor validity
//! - The map carries an epoch replaced on every rehash and on `clear`.
//!   Cursors record the epoch they were made in and panic when used
//!   against a different one.
//! - Erase invalidates only cursors to the erased entry; the arena key's
//!   generation catches those.
//!
//! Notes and non-goals
//! - Single-threaded: no internal locking; wrap the map in a mutex to
//!   share it.
//! - No custom allocator; nodes live in a `slotmap::SlotMap`.
//! - No open addressing.
//! - The library emits `log` records on rehash and never installs a
//!   logger itself.

pub mod chained_hash_map;
mod chained_hash_map_proptest;
pub mod cursor;
pub mod error;
pub mod iter;
mod node;
pub mod pair;
pub mod policy;

// Public surface
pub use chained_hash_map::{ChainedHashMap, Occupied};
pub use cursor::{Cursor, LocalCursor};
pub use error::{Error, Result};
pub use pair::Pair;
pub use policy::{Config, DefaultKeyEq, KeyEq, DEFAULT_BUCKET_COUNT, DEFAULT_MAX_LOAD_FACTOR};
