//! Property tests for the hopscotch collections, run against both table
//! backings through the public API.

use std::collections::HashMap;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;

use hop_prim::HopScotchCollection;
use hop_prim::HopScotchConfig;
use hop_prim::IntSet;
use hop_prim::LongIntMap;
use hop_prim::LongSet;
use hop_prim::hashing::HashFunction;
use hop_prim::hashing::XorShift;
use hop_prim::table::ArrayTable;
use hop_prim::table::IntKeyRawTable;
use hop_prim::table::LongKeyRawTable;
use hop_prim::table::NULL_KEY;
use hop_prim::table::Table;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum MapOp {
    Put(i64, i32),
    Remove(i64),
    Get(i64),
    Clear,
}

fn storable_key() -> impl Strategy<Value = i64> {
    any::<i64>().prop_map(|key| if key == NULL_KEY { 0 } else { key })
}

/// Keys drawn from a small range so operations hit existing entries often.
fn clustered_key() -> impl Strategy<Value = i64> {
    (0..512i64).prop_map(|key| key * 977)
}

fn map_ops() -> impl Strategy<Value = Vec<MapOp>> {
    prop::collection::vec(
        prop_oneof![
            6 => (clustered_key(), any::<i32>()).prop_map(|(k, v)| MapOp::Put(k, v)),
            3 => clustered_key().prop_map(MapOp::Remove),
            3 => clustered_key().prop_map(MapOp::Get),
            1 => Just(MapOp::Clear),
        ],
        0..2000,
    )
}

fn small_config(neighborhood: usize) -> HopScotchConfig {
    HopScotchConfig::default()
        .initial_capacity(16)
        .neighborhood(neighborhood)
}

/// Every bitmap bit points at a key homed in that bucket, inside the
/// neighborhood, and the bits account for every key exactly once.
fn assert_hop_bitmaps_consistent<T: Table, S: HashFunction>(collection: &HopScotchCollection<T, S>) {
    let table = collection.table();
    let mask = table.capacity() - 1;
    let neighborhood = collection.neighborhood();
    let mut accounted = 0;

    for bucket in 0..table.capacity() {
        let bits = table.hop_bits(bucket);
        if neighborhood < 32 {
            assert_eq!(bits >> neighborhood, 0, "bucket {bucket} bits {bits:#b}");
        }
        for distance in 0..neighborhood {
            if bits & (1 << distance) == 0 {
                continue;
            }
            let key = table.key((bucket + distance) & mask);
            assert_ne!(key, table.null_key());
            assert_eq!(collection.hasher().hash(key) as usize & mask, bucket);
            accounted += 1;
        }
    }

    assert_eq!(accounted, collection.len());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn map_matches_model(ops in map_ops()) {
        let mut map: LongIntMap<LongKeyRawTable<i32>, XorShift> =
            LongIntMap::with_config(small_config(32)).unwrap();
        let mut model = HashMap::new();

        for op in ops {
            match op {
                MapOp::Put(key, value) => {
                    prop_assert_eq!(map.put(key, value), model.insert(key, value));
                }
                MapOp::Remove(key) => {
                    prop_assert_eq!(map.remove(key), model.remove(&key));
                }
                MapOp::Get(key) => {
                    prop_assert_eq!(map.get(key), model.get(&key).copied());
                }
                MapOp::Clear => {
                    map.clear();
                    model.clear();
                }
            }
            prop_assert_eq!(map.len(), model.len());
        }

        let entries: HashMap<i64, i32> = map.iter().collect();
        prop_assert_eq!(entries, model);
        assert_hop_bitmaps_consistent(map.collection());
    }

    #[test]
    fn sets_roundtrip_on_both_backings(
        keys in prop::collection::vec(storable_key(), 0..3000),
        neighborhood in 4usize..=32,
    ) {
        let expected: HashSet<i64> = keys.iter().copied().collect();

        let mut raw: HopScotchCollection<LongKeyRawTable<()>> =
            HopScotchCollection::with_config(small_config(neighborhood), ()).unwrap();
        let mut array: HopScotchCollection<ArrayTable<()>> =
            HopScotchCollection::with_config(small_config(neighborhood), ()).unwrap();
        for &key in &keys {
            prop_assert_eq!(raw.insert(key), array.insert(key));
        }

        prop_assert_eq!(raw.len(), expected.len());
        prop_assert_eq!(array.len(), expected.len());
        for &key in &expected {
            prop_assert!(raw.contains(key));
            prop_assert!(array.contains(key));
        }
        prop_assert_eq!(raw.iter().collect::<HashSet<_>>(), expected.clone());
        prop_assert_eq!(array.iter().collect::<HashSet<_>>(), expected);

        assert_hop_bitmaps_consistent(&raw);
        assert_hop_bitmaps_consistent(&array);
    }

    #[test]
    fn removals_keep_remaining_keys(
        keys in prop::collection::hash_set(storable_key(), 1..1500),
        stride in 2usize..5,
    ) {
        let keys: Vec<i64> = keys.into_iter().collect();
        let mut set: LongSet = keys.iter().copied().collect();

        for key in keys.iter().step_by(stride) {
            prop_assert!(set.remove(*key));
        }
        for (index, key) in keys.iter().enumerate() {
            prop_assert_eq!(set.contains(*key), index % stride != 0);
        }
        assert_hop_bitmaps_consistent(set.collection());
    }

    #[test]
    fn int_sets_keep_full_i32_range(keys in prop::collection::vec(any::<i32>(), 0..2000)) {
        let keys: Vec<i32> = keys.into_iter().filter(|&key| key != -1).collect();
        let expected: HashSet<i32> = keys.iter().copied().collect();
        let set: IntSet = keys.iter().copied().collect();

        prop_assert_eq!(set.len(), expected.len());
        prop_assert_eq!(set.iter().collect::<HashSet<_>>(), expected);
    }

    #[test]
    fn sentinel_is_rejected_without_changing_contents(
        keys in prop::collection::hash_set(storable_key(), 0..200),
    ) {
        let mut set: LongSet = keys.iter().copied().collect();
        let before: HashSet<i64> = set.iter().collect();

        let outcome = catch_unwind(AssertUnwindSafe(|| set.insert(NULL_KEY)));
        prop_assert!(outcome.is_err());
        prop_assert!(!set.contains(NULL_KEY));
        prop_assert_eq!(set.iter().collect::<HashSet<_>>(), before);
    }

    #[test]
    fn wide_keys_are_rejected_by_narrow_tables(excess in 0i64..(1 << 32)) {
        let mut set: HopScotchCollection<IntKeyRawTable<()>> =
            HopScotchCollection::with_config(small_config(32), ()).unwrap();
        let key = i64::from(i32::MAX) + 1 + excess;

        let outcome = catch_unwind(AssertUnwindSafe(|| set.insert(key)));
        prop_assert!(outcome.is_err());
        prop_assert!(set.is_empty());
    }

    #[test]
    fn visitor_stops_exactly_when_asked(
        keys in prop::collection::hash_set(storable_key(), 0..500),
        stop_after in 1usize..600,
    ) {
        let set: LongSet = keys.iter().copied().collect();
        let mut visited = 0;
        let stopped = set.visit_keys(|_| {
            visited += 1;
            visited == stop_after
        });

        prop_assert_eq!(stopped, stop_after <= keys.len());
        prop_assert_eq!(visited, stop_after.min(keys.len()));
    }

    #[test]
    fn diagnostics_never_change_results(
        keys in prop::collection::hash_set(any::<i32>().prop_filter("null key", |key| *key != -1), 0..500),
        stop_after in 1usize..600,
    ) {
        let plain: IntSet = keys.iter().copied().collect();
        let mut timed: IntSet =
            IntSet::with_config(HopScotchConfig::default().diagnostics(true)).unwrap();
        timed.extend(keys.iter().copied());

        let mut plain_seen = Vec::new();
        plain.visit_keys(|key| {
            plain_seen.push(key);
            plain_seen.len() == stop_after
        });
        let mut timed_seen = Vec::new();
        timed.visit_keys(|key| {
            timed_seen.push(key);
            timed_seen.len() == stop_after
        });

        prop_assert_eq!(&plain_seen, &timed_seen);
        let stats = timed.collection().visit_statistics().unwrap();
        prop_assert_eq!(stats.visited, plain_seen.len());
        prop_assert_eq!(stats.size, keys.len());
    }
}
