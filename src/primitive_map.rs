use core::fmt::Debug;

use crate::config::HopScotchConfig;
use crate::error::Result;
use crate::hashing::DefaultHashFunction;
use crate::hashing::HashFunction;
use crate::hopscotch::HopScotchCollection;
use crate::hopscotch::unwrap_or_abort;
use crate::iteration::Entries;
use crate::iteration::Keys;
use crate::table::LongKeyRawTable;
use crate::table::Table;

/// A map from `i64` keys to `i32` values.
///
/// Each slot of the default [`LongKeyRawTable`] holds the key, the bucket
/// bitmap and the value back to back: 16 bytes per slot.
///
/// # Examples
///
/// ```rust
/// use hop_prim::LongIntMap;
///
/// let mut degrees: LongIntMap = LongIntMap::new();
/// assert_eq!(degrees.put(1 << 33, 4), None);
/// assert_eq!(degrees.put(1 << 33, 5), Some(4));
/// assert_eq!(degrees.get(1 << 33), Some(5));
/// assert_eq!(degrees.remove(1 << 33), Some(5));
/// assert_eq!(degrees.get(1 << 33), None);
/// ```
pub struct LongIntMap<T: Table<Value = i32> = LongKeyRawTable<i32>, S = DefaultHashFunction> {
    inner: HopScotchCollection<T, S>,
}

impl<T, S> LongIntMap<T, S>
where
    T: Table<Value = i32>,
    S: HashFunction + Default,
{
    /// Creates an empty map with the default configuration.
    pub fn new() -> Self {
        Self {
            inner: HopScotchCollection::new(0),
        }
    }

    /// Creates an empty map sized for at least `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        let config = HopScotchConfig::default().for_keys(capacity);
        unwrap_or_abort(Self::with_config(config))
    }

    /// Creates an empty map from `config`.
    pub fn with_config(config: HopScotchConfig) -> Result<Self> {
        Ok(Self {
            inner: HopScotchCollection::with_config(config, 0)?,
        })
    }
}

impl<T, S> LongIntMap<T, S>
where
    T: Table<Value = i32>,
    S: HashFunction,
{
    /// Associates `value` with `key`, returning the previous value.
    ///
    /// # Panics
    ///
    /// Panics if `key` is `-1`.
    pub fn put(&mut self, key: i64, value: i32) -> Option<i32> {
        self.inner.put(key, value)
    }

    /// Fallible form of [`put`](Self::put).
    pub fn try_put(&mut self, key: i64, value: i32) -> Result<Option<i32>> {
        self.inner.try_put(key, value)
    }

    /// Value stored for `key`.
    pub fn get(&self, key: i64) -> Option<i32> {
        self.inner.get(key)
    }

    /// Returns `true` if `key` has a value.
    pub fn contains_key(&self, key: i64) -> bool {
        self.inner.contains(key)
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: i64) -> Option<i32> {
        self.inner.remove(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of slots in the backing table.
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Iterates the keys in table order.
    pub fn keys(&self) -> Keys<'_, T> {
        self.inner.iter()
    }

    /// Iterates `(key, value)` pairs in table order.
    pub fn iter(&self) -> Entries<'_, T> {
        self.inner.entries()
    }

    /// Calls `visitor` for each key until it returns `true`.
    pub fn visit_keys(&self, visitor: impl FnMut(i64) -> bool) -> bool {
        self.inner.visit_keys(visitor)
    }

    /// Fallible form of [`visit_keys`](Self::visit_keys).
    pub fn try_visit_keys<E>(
        &self,
        visitor: impl FnMut(i64) -> core::result::Result<bool, E>,
    ) -> core::result::Result<bool, E> {
        self.inner.try_visit_keys(visitor)
    }

    /// Calls `visitor` for each entry until it returns `true`.
    pub fn visit_entries(&self, visitor: impl FnMut(i64, i32) -> bool) -> bool {
        self.inner.visit_entries(visitor)
    }

    /// The underlying collection.
    pub fn collection(&self) -> &HopScotchCollection<T, S> {
        &self.inner
    }
}

impl<T, S> Default for LongIntMap<T, S>
where
    T: Table<Value = i32>,
    S: HashFunction + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> Debug for LongIntMap<T, S>
where
    T: Table<Value = i32>,
    S: HashFunction,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<T, S> Extend<(i64, i32)> for LongIntMap<T, S>
where
    T: Table<Value = i32>,
    S: HashFunction,
{
    fn extend<I: IntoIterator<Item = (i64, i32)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.put(key, value);
        }
    }
}

impl<T, S> FromIterator<(i64, i32)> for LongIntMap<T, S>
where
    T: Table<Value = i32>,
    S: HashFunction + Default,
{
    fn from_iter<I: IntoIterator<Item = (i64, i32)>>(iter: I) -> Self {
        let mut map = LongIntMap::new();
        map.extend(iter);
        map
    }
}
