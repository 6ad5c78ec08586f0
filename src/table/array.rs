use alloc::vec::Vec;
use core::alloc::Layout;

use super::NULL_KEY;
use super::Table;
use crate::error::Error;
use crate::error::Result;
use crate::hopscotch::unwrap_or_abort;

/// Table kept in three managed, bounds-checked vectors.
///
/// Keys are stored in their canonical `i64` form whatever width the owning
/// collection uses. Out-of-range indexes panic through slice indexing.
#[derive(Debug, Clone)]
pub struct ArrayTable<V> {
    keys: Vec<i64>,
    hop_bits: Vec<u32>,
    values: Vec<V>,
    size: usize,
    value_marker: V,
}

impl<V: Copy> ArrayTable<V> {
    /// Creates an empty table with `capacity` slots.
    ///
    /// Aborts through [`handle_alloc_error`](alloc::alloc::handle_alloc_error)
    /// if the vectors cannot be allocated. Use [`try_new`](Self::try_new) to
    /// get the failure back as an error.
    pub fn new(capacity: usize, value_marker: V) -> Self {
        unwrap_or_abort(Self::try_new(capacity, value_marker))
    }

    /// Creates an empty table with `capacity` slots, reporting a failed
    /// allocation as [`Error::AllocationFailed`].
    pub fn try_new(capacity: usize, value_marker: V) -> Result<Self> {
        debug_assert!(capacity.is_power_of_two());
        Ok(Self {
            keys: filled(capacity, NULL_KEY)?,
            hop_bits: filled(capacity, 0)?,
            values: filled(capacity, value_marker)?,
            size: 0,
            value_marker,
        })
    }
}

fn filled<T: Copy>(len: usize, value: T) -> Result<Vec<T>> {
    let layout = Layout::array::<T>(len).map_err(|_| Error::CapacityOverflow)?;
    let mut items = Vec::new();
    items
        .try_reserve_exact(len)
        .map_err(|_| Error::AllocationFailed {
            bytes: layout.size(),
            layout,
        })?;
    items.resize(len, value);
    Ok(items)
}

impl<V: Copy> Table for ArrayTable<V> {
    type Value = V;

    fn allocate(capacity: usize, value_marker: V, _diagnostics: bool) -> Result<Self> {
        Self::try_new(capacity, value_marker)
    }

    fn new_instance(&self, capacity: usize) -> Result<Self> {
        Self::try_new(capacity, self.value_marker)
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    fn size(&self) -> usize {
        self.size
    }

    fn value_marker(&self) -> V {
        self.value_marker
    }

    #[inline]
    fn key(&self, index: usize) -> i64 {
        self.keys[index]
    }

    #[inline]
    fn hop_bits(&self, index: usize) -> u32 {
        self.hop_bits[index]
    }

    #[inline]
    fn put_hop_bit(&mut self, index: usize, distance: usize) {
        debug_assert!(self.hop_bits[index] & (1 << distance) == 0);
        self.hop_bits[index] |= 1 << distance;
    }

    #[inline]
    fn remove_hop_bit(&mut self, index: usize, distance: usize) {
        debug_assert!(self.hop_bits[index] & (1 << distance) != 0);
        self.hop_bits[index] &= !(1 << distance);
    }

    #[inline]
    fn value(&self, index: usize) -> V {
        debug_assert!(self.keys[index] != NULL_KEY);
        self.values[index]
    }

    #[inline]
    fn put_value(&mut self, index: usize, value: V) -> V {
        core::mem::replace(&mut self.values[index], value)
    }

    #[inline]
    fn put(&mut self, index: usize, key: i64, value: V) {
        debug_assert!(self.keys[index] == NULL_KEY);
        self.keys[index] = key;
        self.values[index] = value;
        self.size += 1;
    }

    #[inline]
    fn remove(&mut self, index: usize) -> V {
        debug_assert!(self.keys[index] != NULL_KEY);
        self.keys[index] = NULL_KEY;
        self.size -= 1;
        core::mem::replace(&mut self.values[index], self.value_marker)
    }

    fn clear(&mut self) {
        self.keys.fill(NULL_KEY);
        self.hop_bits.fill(0);
        self.values.fill(self.value_marker);
        self.size = 0;
    }
}
