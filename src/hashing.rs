//! Deterministic hashing: the `HashMap` used throughout the crate, and the string
//! hash used to derive per-stream seeds.
//!
//! The standard library hasher is randomly keyed per process, so it cannot be used for anything
//! that feeds a random number generator. `xxh3` is stable across runs and platforms.
//!
//! `HashMap<K, V, S>` has no `new` method for a non-default hasher. Use `HashMap::default()`.

use xxhash_rust::xxh3::xxh3_64;

pub use rustc_hash::FxHashMap as HashMap;

/// A convenience method to compute the hash of a `&str`.
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}
