use core::fmt::Debug;
use core::iter::FusedIterator;

use crate::config::HopScotchConfig;
use crate::error::Result;
use crate::hashing::DefaultHashFunction;
use crate::hashing::HashFunction;
use crate::hopscotch::HopScotchCollection;
use crate::hopscotch::unwrap_or_abort;
use crate::iteration::Keys;
use crate::table::IntKeyRawTable;
use crate::table::LongKeyRawTable;
use crate::table::Table;

/// A set of `i64` keys.
///
/// Backed by a [`LongKeyRawTable`] by default. Any payload-free [`Table`] with
/// 8-byte keys can be used instead, for example
/// [`ArrayTable<()>`](crate::table::ArrayTable). Keys that fit in an `i32`
/// belong in an [`IntSet`]: a 4-byte key table under a `LongSet` panics on
/// every key outside the `i32` range.
///
/// The key `-1` is reserved as the empty-slot marker and cannot be stored.
///
/// # Examples
///
/// ```rust
/// use hop_prim::LongSet;
///
/// let mut set: LongSet = LongSet::new();
/// assert!(set.insert(1 << 40));
/// assert!(set.contains(1 << 40));
/// assert!(!set.contains(0));
/// ```
pub struct LongSet<T: Table<Value = ()> = LongKeyRawTable<()>, S = DefaultHashFunction> {
    inner: HopScotchCollection<T, S>,
}

impl<T, S> LongSet<T, S>
where
    T: Table<Value = ()>,
    S: HashFunction + Default,
{
    /// Creates an empty set with the default configuration.
    pub fn new() -> Self {
        Self {
            inner: HopScotchCollection::new(()),
        }
    }

    /// Creates an empty set sized for at least `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        let config = HopScotchConfig::default().for_keys(capacity);
        unwrap_or_abort(Self::with_config(config))
    }

    /// Creates an empty set from `config`.
    pub fn with_config(config: HopScotchConfig) -> Result<Self> {
        Ok(Self {
            inner: HopScotchCollection::with_config(config, ())?,
        })
    }
}

impl<T, S> LongSet<T, S>
where
    T: Table<Value = ()>,
    S: HashFunction,
{
    /// Adds `key`, returning `true` if it was not already present.
    ///
    /// # Panics
    ///
    /// Panics if `key` is `-1`.
    pub fn insert(&mut self, key: i64) -> bool {
        self.inner.insert(key)
    }

    /// Fallible form of [`insert`](Self::insert).
    pub fn try_insert(&mut self, key: i64) -> Result<bool> {
        self.inner.try_insert(key)
    }

    /// Returns `true` if `key` is present.
    pub fn contains(&self, key: i64) -> bool {
        self.inner.contains(key)
    }

    /// Removes `key`, returning `true` if it was present.
    pub fn remove(&mut self, key: i64) -> bool {
        self.inner.remove(key).is_some()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of slots in the backing table.
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Removes every key.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Iterates the keys in table order.
    pub fn iter(&self) -> Keys<'_, T> {
        self.inner.iter()
    }

    /// Calls `visitor` for each key until it returns `true`. Returns whether
    /// the traversal stopped early.
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

    /// The underlying collection.
    pub fn collection(&self) -> &HopScotchCollection<T, S> {
        &self.inner
    }
}

impl<T, S> Default for LongSet<T, S>
where
    T: Table<Value = ()>,
    S: HashFunction + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> Debug for LongSet<T, S>
where
    T: Table<Value = ()>,
    S: HashFunction,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, S> Extend<i64> for LongSet<T, S>
where
    T: Table<Value = ()>,
    S: HashFunction,
{
    fn extend<I: IntoIterator<Item = i64>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<T, S> FromIterator<i64> for LongSet<T, S>
where
    T: Table<Value = ()>,
    S: HashFunction + Default,
{
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        let mut set = LongSet::new();
        set.extend(iter);
        set
    }
}

/// A set of `i32` keys.
///
/// Backed by an [`IntKeyRawTable`], which spends four bytes per key instead of
/// eight. `-1` is reserved as with [`LongSet`].
///
/// ```rust
/// use hop_prim::IntSet;
///
/// let set: IntSet = [3, -7, i32::MAX].into_iter().collect();
/// let mut keys: Vec<i32> = set.iter().collect();
/// keys.sort();
/// assert_eq!(keys, [-7, 3, i32::MAX]);
/// ```
pub struct IntSet<T: Table<Value = ()> = IntKeyRawTable<()>, S = DefaultHashFunction> {
    inner: HopScotchCollection<T, S>,
}

impl<T, S> IntSet<T, S>
where
    T: Table<Value = ()>,
    S: HashFunction + Default,
{
    /// Creates an empty set with the default configuration.
    pub fn new() -> Self {
        Self {
            inner: HopScotchCollection::new(()),
        }
    }

    /// Creates an empty set sized for at least `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        let config = HopScotchConfig::default().for_keys(capacity);
        unwrap_or_abort(Self::with_config(config))
    }

    /// Creates an empty set from `config`.
    pub fn with_config(config: HopScotchConfig) -> Result<Self> {
        Ok(Self {
            inner: HopScotchCollection::with_config(config, ())?,
        })
    }
}

impl<T, S> IntSet<T, S>
where
    T: Table<Value = ()>,
    S: HashFunction,
{
    /// Adds `key`, returning `true` if it was not already present.
    ///
    /// # Panics
    ///
    /// Panics if `key` is `-1`.
    pub fn insert(&mut self, key: i32) -> bool {
        self.inner.insert(key.into())
    }

    /// Fallible form of [`insert`](Self::insert).
    pub fn try_insert(&mut self, key: i32) -> Result<bool> {
        self.inner.try_insert(key.into())
    }

    /// Returns `true` if `key` is present.
    pub fn contains(&self, key: i32) -> bool {
        self.inner.contains(key.into())
    }

    /// Removes `key`, returning `true` if it was present.
    pub fn remove(&mut self, key: i32) -> bool {
        self.inner.remove(key.into()).is_some()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of slots in the backing table.
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Removes every key.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Iterates the keys in table order.
    pub fn iter(&self) -> IntKeys<'_, T> {
        IntKeys {
            keys: self.inner.iter(),
        }
    }

    /// Calls `visitor` for each key until it returns `true`. Returns whether
    /// the traversal stopped early.
    pub fn visit_keys(&self, mut visitor: impl FnMut(i32) -> bool) -> bool {
        self.inner.visit_keys(|key| visitor(narrow(key)))
    }

    /// Fallible form of [`visit_keys`](Self::visit_keys).
    pub fn try_visit_keys<E>(
        &self,
        mut visitor: impl FnMut(i32) -> core::result::Result<bool, E>,
    ) -> core::result::Result<bool, E> {
        self.inner.try_visit_keys(|key| visitor(narrow(key)))
    }

    /// The underlying collection.
    pub fn collection(&self) -> &HopScotchCollection<T, S> {
        &self.inner
    }
}

/// Every key of an [`IntSet`] went in as an `i32`.
#[inline(always)]
fn narrow(key: i64) -> i32 {
    debug_assert!(i32::try_from(key).is_ok());
    key as i32
}

impl<T, S> Default for IntSet<T, S>
where
    T: Table<Value = ()>,
    S: HashFunction + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> Debug for IntSet<T, S>
where
    T: Table<Value = ()>,
    S: HashFunction,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, S> Extend<i32> for IntSet<T, S>
where
    T: Table<Value = ()>,
    S: HashFunction,
{
    fn extend<I: IntoIterator<Item = i32>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<T, S> FromIterator<i32> for IntSet<T, S>
where
    T: Table<Value = ()>,
    S: HashFunction + Default,
{
    fn from_iter<I: IntoIterator<Item = i32>>(iter: I) -> Self {
        let mut set = IntSet::new();
        set.extend(iter);
        set
    }
}

/// Iterator over the keys of an [`IntSet`].
pub struct IntKeys<'a, T> {
    keys: Keys<'a, T>,
}

impl<T: Table> Iterator for IntKeys<'_, T> {
    type Item = i32;

    #[inline]
    fn next(&mut self) -> Option<i32> {
        self.keys.next().map(narrow)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.keys.size_hint()
    }
}

impl<T: Table> ExactSizeIterator for IntKeys<'_, T> {}

impl<T: Table> FusedIterator for IntKeys<'_, T> {}

#[cfg(test)]
mod tests {
    use alloc::format;
    use alloc::vec::Vec;

    use super::*;
    use crate::hashing::XorShift;
    use crate::table::ArrayTable;

    #[test]
    fn long_set_basics() {
        let mut set: LongSet = LongSet::new();
        assert!(set.is_empty());
        assert!(set.insert(i64::MAX));
        assert!(set.insert(i64::MIN));
        assert!(set.insert(0));
        assert!(!set.insert(0));
        assert_eq!(set.len(), 3);
        assert!(set.remove(i64::MIN));
        assert!(!set.remove(i64::MIN));
        assert!(set.contains(i64::MAX));
        set.clear();
        assert!(set.is_empty());
    }

    #[test]
    fn long_set_over_array_table() {
        let set: LongSet<ArrayTable<()>, XorShift> = (0..5_000).collect();
        assert_eq!(set.len(), 5_000);
        assert!((0..5_000).all(|key| set.contains(key)));
        assert!(set.capacity() >= 5_000);
    }

    #[test]
    fn with_capacity_holds_that_many_keys_without_growing() {
        let mut long_set: LongSet = LongSet::with_capacity(1000);
        let mut int_set: IntSet = IntSet::with_capacity(1000);
        let (long_capacity, int_capacity) = (long_set.capacity(), int_set.capacity());
        for key in 0..1000 {
            assert!(long_set.insert(key << 33));
            assert!(int_set.insert(key as i32 - 500_000));
        }
        assert_eq!(long_set.len(), 1000);
        assert_eq!(long_set.capacity(), long_capacity);
        assert_eq!(long_set.collection().growth_count(), 0);
        assert_eq!(int_set.len(), 1000);
        assert_eq!(int_set.capacity(), int_capacity);
        assert_eq!(int_set.collection().growth_count(), 0);

        let mut exact: LongSet<ArrayTable<()>, XorShift> = LongSet::with_capacity(921);
        exact.extend(0..921);
        assert_eq!(exact.capacity(), 1024);
        assert_eq!(exact.collection().growth_count(), 0);
    }

    #[test]
    #[should_panic(expected = "reserved as the empty-slot sentinel")]
    fn long_set_rejects_sentinel() {
        let mut set: LongSet = LongSet::with_capacity(16);
        set.insert(-1);
    }

    #[test]
    fn int_set_roundtrips_negative_keys() {
        let mut set: IntSet = IntSet::with_capacity(64);
        set.extend([-2, i32::MIN, i32::MAX, 0]);
        let mut keys: Vec<i32> = set.iter().collect();
        keys.sort_unstable();
        assert_eq!(keys, [i32::MIN, -2, 0, i32::MAX]);
        assert_eq!(set.iter().len(), 4);
    }

    #[test]
    fn int_set_visitor_stops_early() {
        let set: IntSet = [5, 9, 17, 42].into_iter().collect();
        let mut seen = Vec::new();
        assert!(set.visit_keys(|key| {
            seen.push(key);
            seen.len() == 3
        }));
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|key| [5, 9, 17, 42].contains(key)));

        let failed = set.try_visit_keys(|key| if key == 17 { Err(key) } else { Ok(false) });
        assert_eq!(failed, Err(17));
    }

    #[test]
    fn debug_lists_keys() {
        let mut set: LongSet = LongSet::new();
        set.insert(12);
        assert_eq!(format!("{set:?}"), "{12}");

        let mut set: IntSet = IntSet::new();
        set.insert(-5);
        assert_eq!(format!("{set:?}"), "{-5}");
    }

    #[test]
    fn invalid_config_surfaces_error() {
        let config = HopScotchConfig::default().load_factor(2.0);
        assert!(LongSet::<LongKeyRawTable<()>>::with_config(config).is_err());
        assert!(IntSet::<IntKeyRawTable<()>>::with_config(config).is_err());
    }
}
