//! Fast non-cryptographic hash map and set aliases.
//!
//! Graph code hashes small integer keys constantly; ahash over
//! hashbrown is measurably faster than SipHash for this workload.

/// Hash map keyed with ahash.
pub type FxHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// Hash set keyed with ahash.
pub type FxHashSet<T> = hashbrown::HashSet<T, ahash::RandomState>;
