//! Slot storage backing a [`HopScotchCollection`](crate::HopScotchCollection).
//!
//! A [`Table`] knows nothing about hashing. It stores, per slot index, a key
//! (or the null key when empty), the neighborhood bitmap of the bucket rooted
//! at that slot, and an opaque value. The engine decides where keys go; the
//! table only performs the reads and writes.
//!
//! Two backings are provided:
//!
//! - [`ArrayTable`]: managed, bounds-checked vectors. The reference backing.
//! - [`RawTable`]: one manually allocated block addressed by byte offsets,
//!   parameterized by a [`KeyWidth`] so that 8-byte ([`LongKey`]) and 4-byte
//!   ([`IntKey`]) keys share all of the addressing and lifecycle code.

use crate::diagnostics::TableDiagnostics;
use crate::error::Result;

mod array;
mod int_key;
mod raw;

pub use array::ArrayTable;
pub use int_key::IntKey;
pub use int_key::IntKeyRawTable;
pub use raw::KeyWidth;
pub use raw::LongKey;
pub use raw::LongKeyRawTable;
pub use raw::RawTable;
#[cfg(test)]
pub(crate) use raw::ledger;

/// Key value marking an empty slot. It can never be stored.
pub const NULL_KEY: i64 = -1;

/// Largest supported neighborhood. Each bucket tracks its neighborhood in a
/// `u32` bitmap, one bit per slot distance.
pub const MAX_NEIGHBORHOOD: usize = u32::BITS as usize;

/// An indexed slot store driven by the hopscotch engine.
///
/// Every `index` argument must be in `0..capacity()`; anything else is a
/// contract violation and panics. Slots written with [`put`](Table::put) must
/// be empty, slots read with [`value`](Table::value) or cleared with
/// [`remove`](Table::remove) must be occupied.
pub trait Table {
    /// Payload stored alongside each key. Sets use `()`.
    type Value: Copy;

    /// Allocates an empty table with `capacity` slots.
    ///
    /// `capacity` must be a power of two. `value_marker` is the payload set
    /// semantics store for every key. `diagnostics` turns on timing in tables
    /// that support it.
    fn allocate(capacity: usize, value_marker: Self::Value, diagnostics: bool) -> Result<Self>
    where
        Self: Sized;

    /// Allocates an empty table of a different capacity sharing this table's
    /// value marker, key width and diagnostics setting.
    fn new_instance(&self, capacity: usize) -> Result<Self>
    where
        Self: Sized;

    /// Number of slots.
    fn capacity(&self) -> usize;

    /// Number of occupied slots.
    fn size(&self) -> usize;

    /// Returns `true` when no slot is occupied.
    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// The sentinel stored in empty slots.
    fn null_key(&self) -> i64 {
        NULL_KEY
    }

    /// Payload used for keys inserted with set semantics.
    fn value_marker(&self) -> Self::Value;

    /// Panics unless `key` can be stored in this table.
    ///
    /// The null key is always rejected. Narrow tables also reject keys that
    /// do not fit their key width.
    fn check_key(&self, key: i64) {
        assert!(
            key != self.null_key(),
            "key {key} is reserved as the empty-slot sentinel"
        );
    }

    /// The key stored at `index`, or [`null_key`](Table::null_key) when empty.
    fn key(&self, index: usize) -> i64;

    /// Neighborhood bitmap of the bucket rooted at `index`. Bit `d` is set when
    /// slot `index + d` (wrapping) holds a key whose home is `index`.
    fn hop_bits(&self, index: usize) -> u32;

    /// Sets bit `distance` in the bitmap of bucket `index`.
    fn put_hop_bit(&mut self, index: usize, distance: usize);

    /// Clears bit `distance` in the bitmap of bucket `index`.
    fn remove_hop_bit(&mut self, index: usize, distance: usize);

    /// Moves a bitmap bit of bucket `index` from distance `from` to `to`.
    fn move_hop_bit(&mut self, index: usize, from: usize, to: usize) {
        self.remove_hop_bit(index, from);
        self.put_hop_bit(index, to);
    }

    /// The value stored at occupied slot `index`.
    fn value(&self, index: usize) -> Self::Value;

    /// Replaces the value at occupied slot `index`, returning the old one.
    fn put_value(&mut self, index: usize, value: Self::Value) -> Self::Value;

    /// Stores `key` and `value` in empty slot `index`.
    fn put(&mut self, index: usize, key: i64, value: Self::Value);

    /// Empties occupied slot `index`, returning its value. The bucket bitmap
    /// rooted at `index` is left untouched.
    fn remove(&mut self, index: usize) -> Self::Value;

    /// Moves the key and value of occupied slot `from` into empty slot `to`.
    fn move_slot(&mut self, from: usize, to: usize) {
        let key = self.key(from);
        let value = self.remove(from);
        self.put(to, key, value);
    }

    /// Empties every slot and clears every bitmap, keeping the capacity.
    fn clear(&mut self);

    /// Diagnostic capability, for tables that keep key-read counters.
    fn diagnostics(&self) -> Option<&dyn TableDiagnostics> {
        None
    }
}

#[cfg(test)]
pub(crate) mod contract_tests {
    //! Behaviour every [`Table`] implementation must share, run against each
    //! backing from its own test module.

    use super::*;

    pub(crate) fn empty_table_reads_null<T: Table>(table: &T) {
        assert_eq!(table.size(), 0);
        assert!(table.is_empty());
        for index in 0..table.capacity() {
            assert_eq!(table.key(index), table.null_key());
            assert_eq!(table.hop_bits(index), 0);
        }
    }

    pub(crate) fn put_remove_roundtrip<T: Table>(table: &mut T, value: T::Value)
    where
        T::Value: PartialEq + core::fmt::Debug,
    {
        let last = table.capacity() - 1;
        table.put(0, 10, value);
        table.put(last, 20, value);
        assert_eq!(table.size(), 2);
        assert_eq!(table.key(0), 10);
        assert_eq!(table.key(last), 20);
        assert_eq!(table.value(last), value);

        assert_eq!(table.remove(0), value);
        assert_eq!(table.key(0), table.null_key());
        assert_eq!(table.size(), 1);

        table.move_slot(last, 1);
        assert_eq!(table.key(1), 20);
        assert_eq!(table.key(last), table.null_key());
        assert_eq!(table.size(), 1);
    }

    pub(crate) fn hop_bits_track_distances<T: Table>(table: &mut T) {
        table.put_hop_bit(3, 0);
        table.put_hop_bit(3, 5);
        table.put_hop_bit(3, MAX_NEIGHBORHOOD - 1);
        assert_eq!(table.hop_bits(3), 1 | (1 << 5) | (1 << 31));

        table.move_hop_bit(3, 5, 2);
        assert_eq!(table.hop_bits(3), 1 | (1 << 2) | (1 << 31));

        table.remove_hop_bit(3, 0);
        table.remove_hop_bit(3, MAX_NEIGHBORHOOD - 1);
        assert_eq!(table.hop_bits(3), 1 << 2);
        assert_eq!(table.hop_bits(4), 0);
    }

    pub(crate) fn clear_resets_everything<T: Table>(table: &mut T, value: T::Value) {
        for index in 0..table.capacity() {
            table.put(index, index as i64 * 3, value);
            table.put_hop_bit(index, 0);
        }
        table.clear();
        empty_table_reads_null(table);
    }

    pub(crate) fn new_instance_is_empty_and_shares_marker<T: Table>(table: &mut T, value: T::Value)
    where
        T::Value: PartialEq + core::fmt::Debug,
    {
        table.put(0, 99, value);
        let grown = table.new_instance(table.capacity() * 2).unwrap();
        assert_eq!(grown.capacity(), table.capacity() * 2);
        assert_eq!(grown.value_marker(), table.value_marker());
        empty_table_reads_null(&grown);
        assert_eq!(table.key(0), 99);
    }
}
