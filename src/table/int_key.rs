use core::cell::Cell;
use core::mem::size_of;
use core::time::Duration;

use super::KeyWidth;
use super::RawTable;
use crate::diagnostics::KeyReadStatistics;
use crate::diagnostics::Stopwatch;
use crate::diagnostics::TableDiagnostics;

/// Raw-memory table with 4-byte keys.
pub type IntKeyRawTable<V> = RawTable<V, IntKey>;

/// 4-byte keys, widened to `i64` on read.
///
/// Writing a key outside the `i32` range panics: the caller asked to store a
/// key through an interface wider than the table supports, and silently
/// truncating it would alias another key.
///
/// Every raw read is counted. With diagnostics enabled the time spent in
/// reads is accumulated too, see [`TableDiagnostics`].
#[derive(Debug, Default)]
pub struct IntKey {
    timed: bool,
    reads: Cell<u64>,
    read_time: Cell<Duration>,
}

impl KeyWidth for IntKey {
    const BYTES: usize = size_of::<i32>();

    fn new(diagnostics: bool) -> Self {
        IntKey {
            timed: diagnostics,
            ..IntKey::default()
        }
    }

    fn sibling(&self) -> Self {
        IntKey::new(self.timed)
    }

    #[inline(always)]
    fn fits(key: i64) -> bool {
        i32::try_from(key).is_ok()
    }

    #[inline(always)]
    unsafe fn read(&self, address: *const u8) -> i64 {
        self.reads.set(self.reads.get() + 1);
        if !self.timed {
            // SAFETY: Caller guarantees `address` is valid for 4 bytes of reads.
            return i64::from(unsafe { address.cast::<i32>().read_unaligned() });
        }

        let watch = Stopwatch::start();
        // SAFETY: Caller guarantees `address` is valid for 4 bytes of reads.
        let key = unsafe { address.cast::<i32>().read_unaligned() };
        self.read_time.set(self.read_time.get() + watch.elapsed());
        i64::from(key)
    }

    #[inline(always)]
    unsafe fn write(&self, address: *mut u8, key: i64) {
        let Ok(narrow) = i32::try_from(key) else {
            panic!("illegal key {key}: it does not fit in a 4-byte key table");
        };
        // SAFETY: Caller guarantees `address` is valid for 4 bytes of writes.
        unsafe { address.cast::<i32>().write_unaligned(narrow) }
    }

    fn diagnostics(&self) -> Option<&dyn TableDiagnostics> {
        Some(self)
    }
}

impl TableDiagnostics for IntKey {
    fn key_read_statistics(&self) -> KeyReadStatistics {
        KeyReadStatistics {
            reads: self.reads.get(),
            read_time: self.read_time.get(),
        }
    }

    fn reset(&self) {
        self.reads.set(0);
        self.read_time.set(Duration::ZERO);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::NULL_KEY;
    use crate::table::Table;
    use crate::table::contract_tests;

    #[test]
    fn empty_table_reads_null() {
        let table = IntKeyRawTable::new(16, (), false).unwrap();
        contract_tests::empty_table_reads_null(&table);
    }

    #[test]
    fn put_remove_roundtrip() {
        let mut table = IntKeyRawTable::new(16, 0i64, false).unwrap();
        contract_tests::put_remove_roundtrip(&mut table, i64::MAX);
    }

    #[test]
    fn hop_bits_track_distances() {
        let mut table = IntKeyRawTable::new(64, (), false).unwrap();
        contract_tests::hop_bits_track_distances(&mut table);
    }

    #[test]
    fn clear_resets_everything() {
        let mut table = IntKeyRawTable::new(32, 1i32, true).unwrap();
        contract_tests::clear_resets_everything(&mut table, 2);
    }

    #[test]
    fn new_instance_is_empty_and_shares_marker() {
        let mut table = IntKeyRawTable::new(8, 'x', false).unwrap();
        contract_tests::new_instance_is_empty_and_shares_marker(&mut table, 'y');
    }

    #[test]
    fn slots_are_four_bytes_narrower() {
        assert_eq!(IntKeyRawTable::<()>::stride(), 8);
        assert_eq!(IntKeyRawTable::<i32>::stride(), 12);
    }

    #[test]
    fn negative_and_extreme_keys_widen_back() {
        let mut table = IntKeyRawTable::new(4, (), false).unwrap();
        table.put(0, i32::MAX as i64, ());
        table.put(1, i32::MIN as i64, ());
        table.put(2, -2, ());
        assert_eq!(table.key(0), i32::MAX as i64);
        assert_eq!(table.key(1), i32::MIN as i64);
        assert_eq!(table.key(2), -2);
        assert_eq!(table.key(3), NULL_KEY);
    }

    #[test]
    #[should_panic(expected = "does not fit in a 4-byte key table")]
    fn key_beyond_i32_fails_the_contract_check() {
        let table = IntKeyRawTable::new(8, (), false).unwrap();
        table.check_key(1 << 31);
    }

    #[test]
    #[should_panic(expected = "illegal key 2147483648")]
    fn key_beyond_i32_is_never_truncated_on_put() {
        let mut table = IntKeyRawTable::new(8, (), false).unwrap();
        table.put(0, 1 << 31, ());
    }

    #[test]
    fn reads_are_counted_and_reset_is_idempotent() {
        let mut table = IntKeyRawTable::new(8, (), true).unwrap();
        table.put(1, 5, ());
        let diagnostics = table.diagnostics().expect("int key tables keep counters");
        diagnostics.reset();

        for index in 0..table.capacity() {
            table.key(index);
        }
        let diagnostics = table.diagnostics().unwrap();
        assert_eq!(diagnostics.key_read_statistics().reads, 8);

        diagnostics.reset();
        assert_eq!(diagnostics.key_read_statistics(), KeyReadStatistics::default());
        diagnostics.reset();
        assert_eq!(diagnostics.key_read_statistics(), KeyReadStatistics::default());
    }

    #[test]
    fn sibling_starts_with_fresh_counters() {
        let table = IntKeyRawTable::new(8, (), true).unwrap();
        table.key(0);
        table.key(1);
        let grown = table.new_instance(16).unwrap();
        assert_eq!(grown.width().key_read_statistics().reads, 0);
        assert_eq!(table.width().key_read_statistics().reads, 2);
    }

    #[test]
    fn long_key_tables_expose_no_diagnostics() {
        let table = crate::table::LongKeyRawTable::new(8, (), true).unwrap();
        assert!(table.diagnostics().is_none());
    }
}
