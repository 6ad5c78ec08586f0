#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(any(feature = "std", test)), no_std)]

extern crate alloc;

mod config;
mod error;
mod hopscotch;
mod iteration;
mod primitive_map;
mod primitive_set;

pub mod diagnostics;
pub mod hashing;
pub mod table;

pub use config::DEFAULT_CAPACITY;
pub use config::DEFAULT_GROWTH_FACTOR;
pub use config::DEFAULT_LOAD_FACTOR;
pub use config::DEFAULT_NEIGHBORHOOD;
pub use config::HopScotchConfig;
pub use error::Error;
pub use error::Result;
#[cfg(any(test, feature = "stats"))]
pub use hopscotch::DebugStats;
pub use hopscotch::HopScotchCollection;
pub use iteration::Entries;
pub use iteration::Keys;
pub use primitive_map::LongIntMap;
pub use primitive_set::IntKeys;
pub use primitive_set::IntSet;
pub use primitive_set::LongSet;
