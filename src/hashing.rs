//! Hash functions mapping primitive keys onto table slots.
//!
//! Keys are hashed in their canonical `i64` form regardless of the width they
//! are stored at, so an `i32` key hashes identically whether it lives in a
//! 4-byte or an 8-byte table.

#[cfg(feature = "foldhash")]
use core::hash::BuildHasher;

/// Maps a canonical key to a 64-bit hash. The engine masks the low bits to
/// find the key's home slot, so implementations must mix entropy into them.
pub trait HashFunction {
    /// Hashes `key`.
    fn hash(&self, key: i64) -> u64;
}

impl<F> HashFunction for F
where
    F: Fn(i64) -> u64,
{
    #[inline(always)]
    fn hash(&self, key: i64) -> u64 {
        self(key)
    }
}

/// Three-step xorshift over the key bits.
///
/// Cheap and deterministic; sequential identifiers stay spread over distinct
/// home slots, which is the common case for node and relationship ids.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct XorShift;

impl HashFunction for XorShift {
    #[inline(always)]
    fn hash(&self, key: i64) -> u64 {
        let mut h = key as u64;
        h ^= h << 21;
        h ^= h >> 35;
        h ^= h << 4;
        h
    }
}

/// Seeded foldhash over the key.
#[cfg(feature = "foldhash")]
#[derive(Clone)]
pub struct FoldHashing {
    seed: u64,
    state: foldhash::fast::FixedState,
}

#[cfg(feature = "foldhash")]
impl core::fmt::Debug for FoldHashing {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FoldHashing").field("seed", &self.seed).finish()
    }
}

#[cfg(feature = "foldhash")]
impl FoldHashing {
    /// Creates a hash function with a fixed seed. Two instances built from the
    /// same seed hash every key identically.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            state: foldhash::fast::FixedState::with_seed(seed),
        }
    }
}

#[cfg(feature = "foldhash")]
impl Default for FoldHashing {
    fn default() -> Self {
        Self::with_seed(0x243f_6a88_85a3_08d3)
    }
}

#[cfg(feature = "foldhash")]
impl HashFunction for FoldHashing {
    #[inline(always)]
    fn hash(&self, key: i64) -> u64 {
        self.state.hash_one(key)
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// Hash function used when none is given: [`FoldHashing`] with the
        /// `foldhash` feature, [`XorShift`] otherwise.
        pub type DefaultHashFunction = FoldHashing;
    } else {
        /// Hash function used when none is given: [`FoldHashing`] with the
        /// `foldhash` feature, [`XorShift`] otherwise.
        pub type DefaultHashFunction = XorShift;
    }
}
