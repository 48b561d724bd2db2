#![allow(missing_docs)]

use std::collections::BTreeSet;

use proptest::prelude::*;
use vereda::{Bound, KeyBuf, KeyRef, PatriciaIndex, Result, SortedIndex};

fn decode_i64(key: &KeyBuf) -> i64 {
    let bytes: [u8; 8] = key.as_key().as_bytes().try_into().expect("eight byte key");
    i64::from_be_bytes(bytes)
}

fn values(index: &SortedIndex<KeyBuf>) -> Vec<i64> {
    index.iter().map(|(_, key)| decode_i64(key)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn trie_iterates_like_a_btree(
        words in prop::collection::vec("[a-z]{1,6}", 1..80),
        drop_every in 2usize..5,
    ) {
        let mut trie = PatriciaIndex::new();
        let mut model = BTreeSet::new();
        let mut ids = Vec::new();
        for word in &words {
            let inserted = trie.insert(word.clone());
            prop_assert_eq!(inserted.is_ok(), model.insert(word.clone()));
            if let Ok(id) = inserted {
                ids.push(id);
            }
        }
        let listed: Vec<String> = trie.iter().map(|(_, w)| w.clone()).collect();
        prop_assert_eq!(&listed, &model.iter().cloned().collect::<Vec<_>>());

        for id in ids.iter().step_by(drop_every) {
            let word = trie.remove(*id).expect("live id");
            model.remove(&word);
            prop_assert!(trie.find(KeyRef::from_bytes(word.as_bytes())).is_none());
        }
        let listed: Vec<String> = trie.iter().map(|(_, w)| w.clone()).collect();
        prop_assert_eq!(&listed, &model.iter().cloned().collect::<Vec<_>>());
        let reversed: Vec<String> = trie.iter_rev().map(|(_, w)| w.clone()).collect();
        prop_assert_eq!(reversed, model.iter().rev().cloned().collect::<Vec<_>>());
        for word in &model {
            let id = trie.find(KeyRef::from_bytes(word.as_bytes()));
            prop_assert_eq!(id.and_then(|id| trie.get(id)), Some(word));
        }
    }

    #[test]
    fn sorted_index_matches_a_sorted_vec(
        inserts in prop::collection::vec(-50i64..50, 1..120),
        removals in prop::collection::vec(any::<prop::sample::Index>(), 0..40),
    ) {
        let mut index = SortedIndex::new();
        let mut live = Vec::new();
        for value in &inserts {
            live.push((index.insert(KeyBuf::from_i64(*value)).expect("duplicates allowed"), *value));
        }
        for pick in removals {
            if live.is_empty() {
                break;
            }
            let (id, value) = live.swap_remove(pick.index(live.len()));
            let removed = index.remove(id).expect("live id");
            prop_assert_eq!(decode_i64(&removed), value);
        }
        let mut model: Vec<i64> = live.iter().map(|(_, v)| *v).collect();
        model.sort_unstable();
        prop_assert_eq!(values(&index), model.clone());
        prop_assert_eq!(index.len(), model.len());
        let distinct: BTreeSet<i64> = model.iter().copied().collect();
        prop_assert_eq!(index.distinct_keys(), distinct.len());
        for value in &distinct {
            let found = index.find(KeyBuf::from_i64(*value).as_key()).and_then(|id| index.get(id));
            prop_assert_eq!(found.map(decode_i64), Some(*value));
            let group = index.find_all(KeyBuf::from_i64(*value).as_key()).count();
            prop_assert_eq!(group, model.iter().filter(|v| *v == value).count());
        }
    }

    #[test]
    fn signed_bounds_match_range_queries(
        stored in prop::collection::btree_set(-1000i64..1000, 1..60),
        query in -1100i64..1100,
    ) {
        let mut index = SortedIndex::unique();
        for value in &stored {
            index.insert(KeyBuf::from_i64(*value)).expect("unique values");
        }
        let key = KeyBuf::from_i64(query);
        let at = |bound| index.bound(key.as_key(), bound).and_then(|id| index.get(id)).map(decode_i64);
        prop_assert_eq!(at(Bound::Ceil), stored.range(query..).next().copied());
        prop_assert_eq!(at(Bound::Above), stored.range(query + 1..).next().copied());
        prop_assert_eq!(at(Bound::Floor), stored.range(..=query).next_back().copied());
        prop_assert_eq!(at(Bound::Below), stored.range(..query).next_back().copied());
    }
}

#[test]
fn signed_keys_sort_numerically() -> Result<()> {
    let mut index = SortedIndex::new();
    for value in [5i64, -1, 2, -3, 0] {
        index.insert(KeyBuf::from_i64(value))?;
    }
    assert_eq!(values(&index), vec![-3, -1, 0, 2, 5]);
    let first = index.first().and_then(|id| index.get(id)).map(decode_i64);
    let last = index.last().and_then(|id| index.get(id)).map(decode_i64);
    assert_eq!((first, last), (Some(-3), Some(5)));
    Ok(())
}

#[test]
fn duplicates_stay_findable_while_any_remain() -> Result<()> {
    let mut index = SortedIndex::new();
    for _ in 0..3 {
        index.insert(KeyBuf::from_i64(7))?;
    }
    index.insert(KeyBuf::from_i64(8))?;
    let seven = KeyBuf::from_i64(7);
    for remaining in (0..3).rev() {
        let id = index.find(seven.as_key()).expect("group is not empty");
        index.remove(id);
        assert_eq!(index.find_all(seven.as_key()).count(), remaining);
        assert_eq!(index.find(seven.as_key()).is_some(), remaining > 0);
    }
    assert_eq!(index.len(), 1);
    Ok(())
}

#[test]
fn longest_prefix_and_prefix_iteration() -> Result<()> {
    let mut trie = PatriciaIndex::new();
    for word in ["net", "net10", "net10.1", "net2", "other"] {
        trie.insert(word.to_owned())?;
    }
    let hit = trie
        .find_prefix(KeyRef::from_bytes(b"net10.1.7"))
        .and_then(|id| trie.get(id));
    assert_eq!(hit.map(String::as_str), Some("net10.1"));
    let hit = trie
        .find_prefix(KeyRef::from_bytes(b"net3"))
        .and_then(|id| trie.get(id));
    assert_eq!(hit.map(String::as_str), Some("net"));
    let under: Vec<&str> = trie
        .iter_prefix(KeyRef::from_bytes(b"net1"))
        .map(|(_, w)| w.as_str())
        .collect();
    assert_eq!(under, vec!["net10", "net10.1"]);
    assert!(trie.find_prefix(KeyRef::from_bytes(b"zz")).is_none());
    Ok(())
}

#[test]
fn keys_of_every_short_bit_length_stay_distinct() -> Result<()> {
    let mut trie = PatriciaIndex::new();
    let mut inserted = Vec::new();
    for bits in 1..=4u32 {
        for value in 0..(1u8 << bits) {
            let key = KeyBuf::with_bits(&[value << (8 - bits)], bits);
            let id = trie.insert(key.clone())?;
            inserted.push((key, id));
        }
    }
    assert_eq!(trie.len(), 30);
    for (key, id) in &inserted {
        assert_eq!(trie.find(key.as_key()), Some(*id));
    }
    let walked: BTreeSet<_> = trie.iter().map(|(id, _)| id).collect();
    assert_eq!(walked.len(), inserted.len());

    for (key, id) in inserted.iter().step_by(2) {
        trie.remove(*id);
        assert!(trie.find(key.as_key()).is_none());
    }
    for (key, id) in inserted.iter().skip(1).step_by(2) {
        assert_eq!(trie.find(key.as_key()), Some(*id));
    }
    Ok(())
}
