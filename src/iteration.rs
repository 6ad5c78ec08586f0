//! Key traversal over a [`Table`].
//!
//! Both the lazy iterators and the visitor traversal walk slots in index
//! order, skip slots holding the null key, and stop as soon as they have seen
//! `size` live keys, so a sparse table is not scanned past its last key.
//! Traversals borrow the table, which rules out mutating it mid-walk.

use core::iter::FusedIterator;

use crate::diagnostics::Stopwatch;
use crate::diagnostics::VisitStatistics;
use crate::table::Table;

/// Lazy iterator over the live keys of a table, in slot order.
///
/// Created by [`HopScotchCollection::iter`](crate::HopScotchCollection::iter).
pub struct Keys<'a, T> {
    table: &'a T,
    index: usize,
    remaining: usize,
}

impl<'a, T: Table> Keys<'a, T> {
    pub(crate) fn new(table: &'a T) -> Self {
        Keys {
            table,
            index: 0,
            remaining: table.size(),
        }
    }

    /// Advances to the next live slot and returns its index and key.
    #[inline]
    fn next_slot(&mut self) -> Option<(usize, i64)> {
        let capacity = self.table.capacity();
        let null_key = self.table.null_key();
        while self.remaining > 0 && self.index < capacity {
            let index = self.index;
            self.index += 1;

            let key = self.table.key(index);
            if key != null_key {
                self.remaining -= 1;
                return Some((index, key));
            }
        }

        self.remaining = 0;
        None
    }
}

impl<T: Table> Iterator for Keys<'_, T> {
    type Item = i64;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.next_slot().map(|(_, key)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T: Table> ExactSizeIterator for Keys<'_, T> {}

impl<T: Table> FusedIterator for Keys<'_, T> {}

/// Lazy iterator over the live `(key, value)` pairs of a table.
///
/// Created by [`HopScotchCollection::entries`](crate::HopScotchCollection::entries).
pub struct Entries<'a, T> {
    keys: Keys<'a, T>,
}

impl<'a, T: Table> Entries<'a, T> {
    pub(crate) fn new(table: &'a T) -> Self {
        Entries {
            keys: Keys::new(table),
        }
    }
}

impl<T: Table> Iterator for Entries<'_, T> {
    type Item = (i64, T::Value);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let (index, key) = self.keys.next_slot()?;
        Some((key, self.keys.table.value(index)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.keys.size_hint()
    }
}

impl<T: Table> ExactSizeIterator for Entries<'_, T> {}

impl<T: Table> FusedIterator for Entries<'_, T> {}

/// Calls `visitor` with the slot index and key of every live slot until it
/// returns `Ok(true)` or errors. Returns whether the visitor stopped the walk.
pub(crate) fn visit<T, E>(
    table: &T,
    mut visitor: impl FnMut(usize, i64) -> Result<bool, E>,
) -> Result<bool, E>
where
    T: Table,
{
    let mut slots = Keys::new(table);
    while let Some((index, key)) = slots.next_slot() {
        if visitor(index, key)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Same walk as [`visit`], timing slot reads and visitor calls separately.
///
/// The table's own key-read counters, when it has any, are reset first so the
/// returned statistics cover exactly this traversal.
pub(crate) fn visit_instrumented<T, E>(
    table: &T,
    mut visitor: impl FnMut(usize, i64) -> Result<bool, E>,
) -> Result<(bool, VisitStatistics), E>
where
    T: Table,
{
    if let Some(diagnostics) = table.diagnostics() {
        diagnostics.reset();
    }

    let start = Stopwatch::start();
    let capacity = table.capacity();
    let size = table.size();
    let null_key = table.null_key();

    let mut stats = VisitStatistics {
        capacity,
        size,
        slots_scanned: 0,
        visited: 0,
        stopped_early: false,
        elapsed: Default::default(),
        key_lookup: Default::default(),
        visitor: Default::default(),
        key_reads: None,
    };

    let mut index = 0;
    while index < capacity && stats.visited < size {
        let lookup = Stopwatch::start();
        let key = table.key(index);
        stats.key_lookup += lookup.elapsed();
        stats.slots_scanned += 1;

        if key != null_key {
            let call = Stopwatch::start();
            let stop = visitor(index, key)?;
            stats.visitor += call.elapsed();
            stats.visited += 1;
            if stop {
                stats.stopped_early = true;
                break;
            }
        }
        index += 1;
    }

    stats.elapsed = start.elapsed();
    stats.key_reads = table
        .diagnostics()
        .map(|diagnostics| diagnostics.key_read_statistics());
    Ok((stats.stopped_early, stats))
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;
    use core::convert::Infallible;

    use super::*;
    use crate::table::ArrayTable;
    use crate::table::IntKeyRawTable;

    fn sparse_table() -> ArrayTable<i32> {
        let mut table = ArrayTable::new(64, 0);
        table.put(3, 5, 50);
        table.put(17, 9, 90);
        table.put(40, 17, 170);
        table.put(41, 42, 420);
        table
    }

    #[test]
    fn keys_skip_empty_slots() {
        let table = sparse_table();
        let keys: Vec<i64> = Keys::new(&table).collect();
        assert_eq!(keys, [5, 9, 17, 42]);
    }

    #[test]
    fn keys_stop_after_size_live_keys() {
        let table = sparse_table();
        let mut keys = Keys::new(&table);
        assert_eq!(keys.len(), 4);
        for _ in 0..4 {
            keys.next();
        }
        assert_eq!(keys.index, 42, "scanning must stop at the last live key");
        assert_eq!(keys.next(), None);
        assert_eq!(keys.next(), None);
    }

    #[test]
    fn keys_of_empty_table() {
        let table: ArrayTable<()> = ArrayTable::new(128, ());
        assert_eq!(Keys::new(&table).count(), 0);
    }

    #[test]
    fn entries_pair_keys_with_values() {
        let table = sparse_table();
        let entries: Vec<(i64, i32)> = Entries::new(&table).collect();
        assert_eq!(entries, [(5, 50), (9, 90), (17, 170), (42, 420)]);
    }

    #[test]
    fn visitor_stops_on_true() {
        let table = sparse_table();
        let mut seen = Vec::new();
        let stopped = visit(&table, |_, key| {
            seen.push(key);
            Ok::<_, Infallible>(seen.len() == 3)
        })
        .unwrap();
        assert!(stopped);
        assert_eq!(seen, [5, 9, 17]);
    }

    #[test]
    fn visitor_errors_propagate() {
        let table = sparse_table();
        let mut calls = 0;
        let result = visit(&table, |_, key| {
            calls += 1;
            if key == 9 { Err("boom") } else { Ok(false) }
        });
        assert_eq!(result, Err("boom"));
        assert_eq!(calls, 2);
    }

    #[test]
    fn instrumented_visit_matches_plain_visit() {
        let table = sparse_table();
        let mut plain = Vec::new();
        let plain_stopped = visit(&table, |_, key| {
            plain.push(key);
            Ok::<_, Infallible>(key == 17)
        })
        .unwrap();

        let mut instrumented = Vec::new();
        let (stopped, stats) = visit_instrumented(&table, |_, key| {
            instrumented.push(key);
            Ok::<_, Infallible>(key == 17)
        })
        .unwrap();

        assert_eq!(plain, instrumented);
        assert_eq!(plain_stopped, stopped);
        assert_eq!(stats.visited, 3);
        assert_eq!(stats.slots_scanned, 41);
        assert!(stats.stopped_early);
        assert_eq!(stats.key_reads, None);
    }

    #[test]
    fn instrumented_visit_reports_table_key_reads() {
        let mut table = IntKeyRawTable::new(32, (), true).unwrap();
        table.put(0, 1, ());
        table.put(7, 2, ());
        table.key(0);

        let (stopped, stats) = visit_instrumented(&table, |_, _| Ok::<_, Infallible>(false)).unwrap();
        assert!(!stopped);
        assert_eq!(stats.visited, 2);
        assert_eq!(stats.slots_scanned, 8);
        assert_eq!(stats.key_reads.map(|reads| reads.reads), Some(8));
    }
}
