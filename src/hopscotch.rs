use alloc::alloc::handle_alloc_error;
use core::cell::Cell;
use core::convert::Infallible;
use core::fmt::Debug;

use crate::config::HopScotchConfig;
use crate::config::max_load;
use crate::diagnostics::VisitStatistics;
use crate::error::Error;
use crate::error::Result;
use crate::hashing::DefaultHashFunction;
use crate::hashing::HashFunction;
use crate::iteration;
use crate::iteration::Entries;
use crate::iteration::Keys;
use crate::table::Table;

/// Growth rounds a single insert may trigger before giving up on its key.
///
/// Each round multiplies the capacity, so with any hash function that mixes
/// its input the first round already succeeds.
const MAX_GROWTH_ATTEMPTS: usize = 8;

/// Internal signal that no empty slot could be brought into a key's
/// neighborhood. Triggers growth, never reaches callers.
struct Stall;

enum Insertion {
    Inserted,
    Existing(usize),
}

/// Hopscotch hash collection over primitive keys.
///
/// Keys are handled in their canonical `i64` form. The collection owns one
/// [`Table`] and decides where keys live in it: every key sits within
/// `neighborhood` slots of its home slot `hash(key) & (capacity - 1)`, and the
/// table's per-bucket bitmaps record which of those slots belong to the
/// bucket. Lookups and removals therefore probe at most `neighborhood` slots.
///
/// When no empty slot can be moved into a key's neighborhood, or occupancy
/// passes the load factor, the table is replaced by a larger one built with
/// [`Table::new_instance`] and every key is rehashed into it. Growth is all
/// or nothing: if allocation fails the previous table stays in place.
///
/// The collection is meant for a single owner. It does no locking.
///
/// # Examples
///
/// ```rust
/// use hop_prim::HopScotchCollection;
/// use hop_prim::HopScotchConfig;
/// use hop_prim::table::LongKeyRawTable;
///
/// let mut nodes: HopScotchCollection<LongKeyRawTable<()>> =
///     HopScotchCollection::with_config(HopScotchConfig::default(), ()).unwrap();
///
/// assert!(nodes.insert(7));
/// assert!(!nodes.insert(7));
/// assert!(nodes.contains(7));
/// assert_eq!(nodes.remove(7), Some(()));
/// assert!(nodes.is_empty());
/// ```
pub struct HopScotchCollection<T: Table, S = DefaultHashFunction> {
    table: T,
    hasher: S,
    neighborhood: usize,
    growth_factor: usize,
    load_factor: f32,
    max_load: usize,
    growths: usize,
    diagnostics: bool,
    last_visit: Cell<Option<VisitStatistics>>,
}

impl<T: Table, S> Debug for HopScotchCollection<T, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HopScotchCollection")
            .field("size", &self.table.size())
            .field("capacity", &self.table.capacity())
            .field("neighborhood", &self.neighborhood)
            .field("max_load", &self.max_load)
            .field("growths", &self.growths)
            .finish()
    }
}

impl<T, S> HopScotchCollection<T, S>
where
    T: Table,
    S: HashFunction + Default,
{
    /// Creates a collection from `config` using the default hash function.
    ///
    /// `value_marker` is stored for keys inserted with set semantics.
    pub fn with_config(config: HopScotchConfig, value_marker: T::Value) -> Result<Self> {
        Self::with_config_and_hasher(config, value_marker, S::default())
    }

    /// Creates a collection with the default configuration.
    ///
    /// # Panics
    ///
    /// Aborts through [`handle_alloc_error`] if the first table cannot be
    /// allocated.
    pub fn new(value_marker: T::Value) -> Self {
        unwrap_or_abort(Self::with_config(HopScotchConfig::default(), value_marker))
    }
}

impl<T, S> HopScotchCollection<T, S>
where
    T: Table,
    S: HashFunction,
{
    /// Creates a collection with the default configuration hashing keys with
    /// `hasher`.
    pub fn with_hasher(value_marker: T::Value, hasher: S) -> Result<Self> {
        Self::with_config_and_hasher(HopScotchConfig::default(), value_marker, hasher)
    }

    /// Creates a collection from `config` hashing keys with `hasher`.
    pub fn with_config_and_hasher(
        config: HopScotchConfig,
        value_marker: T::Value,
        hasher: S,
    ) -> Result<Self> {
        config.validate()?;
        let capacity = config.table_capacity();
        let table = T::allocate(capacity, value_marker, config.diagnostics_enabled())?;

        Ok(Self {
            table,
            hasher,
            neighborhood: config.neighborhood_size(),
            growth_factor: config.growth(),
            load_factor: config.load(),
            max_load: max_load(capacity, config.load()),
            growths: 0,
            diagnostics: config.diagnostics_enabled(),
            last_visit: Cell::new(None),
        })
    }

    /// Number of keys in the collection.
    pub fn len(&self) -> usize {
        self.table.size()
    }

    /// Returns `true` if the collection holds no keys.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of slots in the current table.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Neighborhood size: the maximum probe distance of any key.
    pub fn neighborhood(&self) -> usize {
        self.neighborhood
    }

    /// How many times the table has been replaced by a larger one.
    pub fn growth_count(&self) -> usize {
        self.growths
    }

    /// The table currently backing the collection.
    pub fn table(&self) -> &T {
        &self.table
    }

    /// The hash function in use.
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    #[inline(always)]
    fn mask(&self) -> usize {
        self.table.capacity() - 1
    }

    #[inline(always)]
    fn home(&self, key: i64) -> usize {
        self.hasher.hash(key) as usize & self.mask()
    }

    /// Locates `key`, returning its home bucket and its distance from it.
    #[inline]
    fn find(&self, key: i64) -> Option<(usize, usize)> {
        if self.table.is_empty() {
            return None;
        }

        let mask = self.mask();
        let home = self.home(key);
        let mut bits = self.table.hop_bits(home);
        while bits != 0 {
            let distance = bits.trailing_zeros() as usize;
            bits &= bits - 1;

            debug_assert!(distance < self.neighborhood);
            if self.table.key((home + distance) & mask) == key {
                return Some((home, distance));
            }
        }

        None
    }

    /// Returns `true` if `key` is present.
    #[inline]
    pub fn contains(&self, key: i64) -> bool {
        self.find(key).is_some()
    }

    /// Returns the value stored for `key`.
    #[inline]
    pub fn get(&self, key: i64) -> Option<T::Value> {
        let (home, distance) = self.find(key)?;
        Some(self.table.value((home + distance) & self.mask()))
    }

    /// Inserts `key` with the table's value marker.
    ///
    /// Returns `true` if the key was not present. An existing key keeps its
    /// value.
    ///
    /// # Panics
    ///
    /// Panics if `key` is the null key or does not fit the table's key width.
    /// Aborts through [`handle_alloc_error`] if growing the table fails to
    /// allocate.
    pub fn insert(&mut self, key: i64) -> bool {
        unwrap_or_abort(self.try_insert(key))
    }

    /// Fallible form of [`insert`](Self::insert). On error the collection
    /// holds the same keys as before and stays usable.
    ///
    /// # Panics
    ///
    /// Panics if `key` is the null key or does not fit the table's key width.
    pub fn try_insert(&mut self, key: i64) -> Result<bool> {
        let marker = self.table.value_marker();
        Ok(matches!(self.insert_entry(key, marker)?, Insertion::Inserted))
    }

    /// Associates `value` with `key`, returning the previous value if the key
    /// was present.
    ///
    /// # Panics
    ///
    /// Same conditions as [`insert`](Self::insert).
    pub fn put(&mut self, key: i64, value: T::Value) -> Option<T::Value> {
        unwrap_or_abort(self.try_put(key, value))
    }

    /// Fallible form of [`put`](Self::put).
    pub fn try_put(&mut self, key: i64, value: T::Value) -> Result<Option<T::Value>> {
        match self.insert_entry(key, value)? {
            Insertion::Inserted => Ok(None),
            Insertion::Existing(index) => Ok(Some(self.table.put_value(index, value))),
        }
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove(&mut self, key: i64) -> Option<T::Value> {
        let (home, distance) = self.find(key)?;
        let value = self.table.remove((home + distance) & self.mask());
        self.table.remove_hop_bit(home, distance);
        Some(value)
    }

    /// Removes every key, keeping the current capacity.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Grows the table until `additional` more keys fit under the load
    /// factor.
    pub fn reserve(&mut self, additional: usize) {
        unwrap_or_abort(self.try_reserve(additional))
    }

    /// Fallible form of [`reserve`](Self::reserve).
    pub fn try_reserve(&mut self, additional: usize) -> Result<()> {
        let required = self
            .len()
            .checked_add(additional)
            .ok_or(Error::CapacityOverflow)?;
        while self.max_load < required {
            self.grow()?;
        }
        Ok(())
    }

    fn insert_entry(&mut self, key: i64, value: T::Value) -> Result<Insertion> {
        self.table.check_key(key);

        if let Some((home, distance)) = self.find(key) {
            return Ok(Insertion::Existing((home + distance) & self.mask()));
        }

        if self.table.size() >= self.max_load {
            self.grow()?;
        }

        let mut attempts = 0;
        while place(&mut self.table, &self.hasher, self.neighborhood, key, value).is_err() {
            if attempts == MAX_GROWTH_ATTEMPTS {
                log::warn!(
                    "neighborhood of key {key} still saturated after {attempts} growth rounds at capacity {}",
                    self.table.capacity()
                );
                return Err(Error::NeighborhoodSaturated { key });
            }
            attempts += 1;
            self.grow()?;
        }

        Ok(Insertion::Inserted)
    }

    /// Replaces the table by one `growth_factor` times larger holding the same
    /// keys. The old table, and the memory it owns, is dropped on success; on
    /// failure the new one is.
    #[cold]
    #[inline(never)]
    fn grow(&mut self) -> Result<()> {
        let from = self.table.capacity();
        let mut capacity = from;
        loop {
            capacity = capacity
                .checked_mul(self.growth_factor)
                .ok_or(Error::CapacityOverflow)?;
            let mut grown = self.table.new_instance(capacity)?;

            if rehash(&self.table, &mut grown, &self.hasher, self.neighborhood).is_ok() {
                log::debug!(
                    "grew hopscotch table from {from} to {capacity} slots holding {} keys",
                    self.table.size()
                );
                self.table = grown;
                self.max_load = max_load(capacity, self.load_factor);
                self.growths += 1;
                return Ok(());
            }

            log::debug!("rehash into {capacity} slots stalled, growing further");
        }
    }

    /// Lazy iterator over all keys, in slot order.
    pub fn iter(&self) -> Keys<'_, T> {
        Keys::new(&self.table)
    }

    /// Lazy iterator over all `(key, value)` pairs, in slot order.
    pub fn entries(&self) -> Entries<'_, T> {
        Entries::new(&self.table)
    }

    /// Calls `visitor` for every key until it returns `true`.
    ///
    /// Returns `true` if the visitor ended the traversal early.
    ///
    /// ```rust
    /// use hop_prim::HopScotchCollection;
    /// use hop_prim::HopScotchConfig;
    /// use hop_prim::table::ArrayTable;
    ///
    /// let mut set: HopScotchCollection<ArrayTable<()>> =
    ///     HopScotchCollection::with_config(HopScotchConfig::default(), ()).unwrap();
    /// for key in [5, 9, 17, 42] {
    ///     set.insert(key);
    /// }
    ///
    /// let mut visited = 0;
    /// let stopped = set.visit_keys(|_| {
    ///     visited += 1;
    ///     visited == 3
    /// });
    /// assert!(stopped);
    /// assert_eq!(visited, 3);
    /// ```
    pub fn visit_keys(&self, mut visitor: impl FnMut(i64) -> bool) -> bool {
        match self.try_visit_keys(|key| Ok::<_, Infallible>(visitor(key))) {
            Ok(stopped) => stopped,
            Err(never) => match never {},
        }
    }

    /// Calls `visitor` for every key until it returns `Ok(true)` or an error,
    /// which is passed through.
    pub fn try_visit_keys<E>(
        &self,
        mut visitor: impl FnMut(i64) -> core::result::Result<bool, E>,
    ) -> core::result::Result<bool, E> {
        self.traverse(|_, key| visitor(key))
    }

    /// Calls `visitor` for every `(key, value)` pair until it returns `true`.
    pub fn visit_entries(&self, mut visitor: impl FnMut(i64, T::Value) -> bool) -> bool {
        let visited = self.traverse(|index, key| {
            Ok::<_, Infallible>(visitor(key, self.table.value(index)))
        });
        match visited {
            Ok(stopped) => stopped,
            Err(never) => match never {},
        }
    }

    fn traverse<E>(
        &self,
        visitor: impl FnMut(usize, i64) -> core::result::Result<bool, E>,
    ) -> core::result::Result<bool, E> {
        if !self.diagnostics {
            return iteration::visit(&self.table, visitor);
        }

        let (stopped, stats) = iteration::visit_instrumented(&self.table, visitor)?;
        log::debug!("{stats}");
        self.last_visit.set(Some(stats));
        Ok(stopped)
    }

    /// Statistics of the most recent traversal, when diagnostics are enabled.
    pub fn visit_statistics(&self) -> Option<VisitStatistics> {
        self.last_visit.get()
    }

    /// Forgets the last traversal statistics and zeroes the table's key-read
    /// counters. Idempotent.
    pub fn reset_statistics(&self) {
        self.last_visit.set(None);
        if let Some(diagnostics) = self.table.diagnostics() {
            diagnostics.reset();
        }
    }

    /// Counts live keys by distance from their home slot.
    ///
    /// The returned vector has `neighborhood + 1` bins. The last bin counts
    /// keys found outside their neighborhood and is always zero in a
    /// consistent table.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> alloc::vec::Vec<usize> {
        let mut hist = alloc::vec![0usize; self.neighborhood + 1];
        let mask = self.mask();
        for (index, key) in self.slots() {
            let distance = index.wrapping_sub(self.home(key)) & mask;
            hist[distance.min(self.neighborhood)] += 1;
        }
        hist
    }

    /// Returns occupancy statistics for debugging.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let hist = self.probe_histogram();
        DebugStats {
            populated: self.len(),
            capacity: self.capacity(),
            max_load: self.max_load,
            neighborhood: self.neighborhood,
            growths: self.growths,
            load_factor: self.len() as f64 / self.capacity() as f64,
            max_probe_distance: hist.iter().rposition(|&count| count != 0).unwrap_or(0),
        }
    }

    #[cfg(any(test, feature = "stats"))]
    fn slots(&self) -> impl Iterator<Item = (usize, i64)> + '_ {
        let null_key = self.table.null_key();
        (0..self.table.capacity())
            .map(|index| (index, self.table.key(index)))
            .filter(move |&(_, key)| key != null_key)
    }
}

/// Occupancy statistics of a [`HopScotchCollection`].
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of keys.
    pub populated: usize,
    /// Number of slots.
    pub capacity: usize,
    /// Size at which the next insert grows the table.
    pub max_load: usize,
    /// Neighborhood size.
    pub neighborhood: usize,
    /// Completed growths.
    pub growths: usize,
    /// `populated / capacity`.
    pub load_factor: f64,
    /// Largest distance of any key from its home slot.
    pub max_probe_distance: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hopscotch Collection Statistics ===");
        println!(
            "Population: {}/{} slots ({:.2}% load, grows at {})",
            self.populated,
            self.capacity,
            self.load_factor * 100.0,
            self.max_load
        );
        println!(
            "Neighborhood: {} (max probe distance {})",
            self.neighborhood, self.max_probe_distance
        );
        println!("Growths: {}", self.growths);
    }
}

/// Places `key` in `table`, hopping an empty slot into its neighborhood if
/// needed. The table is left consistent, with or without the key, whatever
/// the outcome.
fn place<T, S>(
    table: &mut T,
    hasher: &S,
    neighborhood: usize,
    key: i64,
    value: T::Value,
) -> core::result::Result<(), Stall>
where
    T: Table,
    S: HashFunction,
{
    let capacity = table.capacity();
    let mask = capacity - 1;
    let null_key = table.null_key();
    let home = hasher.hash(key) as usize & mask;

    let mut distance = (0..capacity)
        .find(|&distance| table.key((home + distance) & mask) == null_key)
        .ok_or(Stall)?;

    while distance >= neighborhood {
        let free = (home + distance) & mask;
        let freed = hop_closer(table, neighborhood, mask, free).ok_or(Stall)?;
        distance = freed.wrapping_sub(home) & mask;
    }

    table.put((home + distance) & mask, key, value);
    table.put_hop_bit(home, distance);
    Ok(())
}

/// Moves the empty slot `free` towards the start of the table.
///
/// Looks at the buckets up to `neighborhood - 1` slots before `free`,
/// farthest first, for a key that sits before `free` and would still be
/// inside its bucket's neighborhood once moved into `free`. The first such key
/// is moved and the slot it vacated is returned.
fn hop_closer<T: Table>(
    table: &mut T,
    neighborhood: usize,
    mask: usize,
    free: usize,
) -> Option<usize> {
    for back in (1..neighborhood).rev() {
        let bucket = free.wrapping_sub(back) & mask;
        let bits = table.hop_bits(bucket);
        if bits == 0 {
            continue;
        }

        let nearest = bits.trailing_zeros() as usize;
        if nearest < back {
            let from = (bucket + nearest) & mask;
            table.move_slot(from, free);
            table.move_hop_bit(bucket, nearest, back);
            return Some(from);
        }
    }

    None
}

/// Places every key of `from` into the empty table `into`.
fn rehash<T, S>(
    from: &T,
    into: &mut T,
    hasher: &S,
    neighborhood: usize,
) -> core::result::Result<(), Stall>
where
    T: Table,
    S: HashFunction,
{
    debug_assert!(into.is_empty());
    iteration::visit(from, |index, key| {
        place(into, hasher, neighborhood, key, from.value(index)).map(|()| false)
    })
    .map(|_| ())
}

/// Escalates errors of the infallible API: allocation failure goes to the
/// global allocation error handler, anything else panics.
pub(crate) fn unwrap_or_abort<R>(result: Result<R>) -> R {
    match result {
        Ok(value) => value,
        Err(Error::AllocationFailed { layout, .. }) => handle_alloc_error(layout),
        Err(error) => panic!("{error}"),
    }
}
