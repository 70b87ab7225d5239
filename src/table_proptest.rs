use alloc::vec::Vec;

use proptest::prelude::*;

use crate::config::TableConfig;
use crate::order_index::OrderIndex;
use crate::slot_table::SlotHooks;
use crate::slot_table::SlotTable;
use crate::slot_table::Unordered;
use crate::strategy::FnStrategy;

type KeyFn = fn(&u64) -> u64;
type EqFn = fn(&u64, &u64) -> bool;
type Coarse = FnStrategy<KeyFn, EqFn>;

/// Four keys per hash value, so probe runs form and collide constantly.
fn coarse() -> Coarse {
    fn hash(key: &u64) -> u64 {
        key / 4
    }
    fn same(a: &u64, b: &u64) -> bool {
        a == b
    }
    FnStrategy::new(hash as KeyFn, same as EqFn)
}

#[derive(Debug, Clone)]
enum Op {
    Insert(u64, u64),
    Remove(u64),
    MoveToFirst(u64),
    MoveToLast(u64),
    Retain(u64),
    Clear,
    Trim,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0u64..96, any::<u64>()).prop_map(|(k, v)| Op::Insert(k, v)),
        4 => (0u64..96).prop_map(Op::Remove),
        1 => (0u64..96).prop_map(Op::MoveToFirst),
        1 => (0u64..96).prop_map(Op::MoveToLast),
        1 => (2u64..5).prop_map(Op::Retain),
        1 => Just(Op::Clear),
        1 => Just(Op::Trim),
    ]
}

fn new_table<H: SlotHooks + Default>() -> SlotTable<u64, u64, Coarse, H> {
    let config = TableConfig::new(4, 0.75).unwrap();
    SlotTable::with_config(config, coarse()).unwrap()
}

fn put<H: SlotHooks>(table: &mut SlotTable<u64, u64, Coarse, H>, key: u64, value: u64) {
    match table.find_slot(&key) {
        Ok(slot) => *table.value_at_mut(slot) = value,
        Err(slot) => {
            table.insert(slot, key, value);
        }
    }
}

fn take<H: SlotHooks>(table: &mut SlotTable<u64, u64, Coarse, H>, key: u64) -> Option<u64> {
    let slot = table.find_slot(&key).ok()?;
    table.remove_slot(slot).map(|(_, v)| v)
}

fn apply_model(model: &mut Vec<(u64, u64)>, op: &Op) {
    match *op {
        Op::Insert(key, value) => match model.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => model.push((key, value)),
        },
        Op::Remove(key) => model.retain(|(k, _)| *k != key),
        Op::MoveToFirst(key) => {
            if let Some(pos) = model.iter().position(|(k, _)| *k == key) {
                let entry = model.remove(pos);
                model.insert(0, entry);
            }
        }
        Op::MoveToLast(key) => {
            if let Some(pos) = model.iter().position(|(k, _)| *k == key) {
                let entry = model.remove(pos);
                model.push(entry);
            }
        }
        Op::Retain(modulus) => model.retain(|(k, _)| k % modulus != 0),
        Op::Clear => model.clear(),
        Op::Trim => {}
    }
}

proptest! {
    #[test]
    fn ordered_table_matches_model(ops in prop::collection::vec(op(), 1..300)) {
        let mut table = new_table::<OrderIndex>();
        let mut model = Vec::new();

        for op in &ops {
            match *op {
                Op::Insert(key, value) => put(&mut table, key, value),
                Op::Remove(key) => {
                    let expected = model.iter().find(|(k, _)| *k == key).map(|(_, v)| *v);
                    prop_assert_eq!(take(&mut table, key), expected);
                }
                Op::MoveToFirst(key) => {
                    if let Ok(slot) = table.find_slot(&key) {
                        table.hooks_mut().move_to_first(slot);
                    }
                }
                Op::MoveToLast(key) => {
                    if let Ok(slot) = table.find_slot(&key) {
                        table.hooks_mut().move_to_last(slot);
                    }
                }
                Op::Retain(modulus) => table.retain(|k, _| k % modulus != 0),
                Op::Clear => table.clear(),
                Op::Trim => table.trim().unwrap(),
            }
            apply_model(&mut model, op);

            table.assert_invariants();
            prop_assert!(table.len() <= table.max_fill());
            let entries: Vec<(u64, u64)> = table.iter().map(|(k, v)| (*k, *v)).collect();
            prop_assert_eq!(&entries, &model);
        }
    }

    #[test]
    fn unordered_table_matches_model(ops in prop::collection::vec(op(), 1..300)) {
        let mut table = new_table::<Unordered>();
        let mut model = Vec::new();

        for op in &ops {
            match *op {
                Op::Insert(key, value) => put(&mut table, key, value),
                Op::Remove(key) => {
                    let expected = model.iter().find(|(k, _)| *k == key).map(|(_, v)| *v);
                    prop_assert_eq!(take(&mut table, key), expected);
                }
                Op::MoveToFirst(_) | Op::MoveToLast(_) => {}
                Op::Retain(modulus) => table.retain(|k, _| k % modulus != 0),
                Op::Clear => table.clear(),
                Op::Trim => table.trim().unwrap(),
            }
            apply_model(&mut model, op);

            table.assert_invariants();
            let mut entries: Vec<(u64, u64)> = table.iter().map(|(k, v)| (*k, *v)).collect();
            entries.sort_unstable();
            let mut expected = model.clone();
            expected.sort_unstable();
            prop_assert_eq!(entries, expected);
            for (key, value) in &model {
                let slot = table.find_slot(key);
                prop_assert!(slot.is_ok());
                prop_assert_eq!(table.get(slot.unwrap()), Some((key, value)));
            }
        }
    }

    #[test]
    fn removal_never_leaves_unreachable_keys(keys in prop::collection::vec(0u64..64, 1..64)) {
        let mut table = new_table::<Unordered>();
        for &key in &keys {
            put(&mut table, key, key);
        }
        let mut present: Vec<u64> = keys.clone();
        present.sort_unstable();
        present.dedup();

        for (i, key) in present.iter().enumerate() {
            prop_assert_eq!(take(&mut table, *key), Some(*key));
            for later in &present[i + 1..] {
                prop_assert!(table.find_slot(later).is_ok());
            }
            table.assert_invariants();
        }
        prop_assert!(table.is_empty());
        prop_assert_eq!(table.capacity(), table.min_capacity());
    }
}
