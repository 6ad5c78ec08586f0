use core::alloc::Layout;

use thiserror::Error;

/// Errors surfaced by table construction and growth.
///
/// Contract violations (storing the null key, addressing a slot outside the
/// table, writing a key wider than the table's key width) are not represented
/// here. They indicate a caller bug and panic instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The allocator could not provide the memory for a table.
    #[error("table allocation failed: requested {bytes} bytes")]
    AllocationFailed {
        /// Size of the requested block in bytes.
        bytes: usize,
        /// Layout that was handed to the allocator.
        layout: Layout,
    },

    /// The requested capacity does not fit in `usize` once rounded up or
    /// multiplied by the slot stride.
    #[error("table capacity overflow")]
    CapacityOverflow,

    /// A configuration value is outside its accepted range.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        /// What was wrong with the configuration.
        message: &'static str,
    },

    /// Repeated growth could not bring an empty slot into the neighborhood of
    /// `key`. Only reachable with a hash function that sends more than
    /// `neighborhood` keys to the same home slot regardless of capacity.
    #[error("neighborhood of key {key} stays saturated after growing")]
    NeighborhoodSaturated {
        /// The key that could not be placed.
        key: i64,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
