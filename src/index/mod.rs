//! Bit-string key indexes.
//!
//! [`PatriciaIndex`] stores unique keys in a Patricia trie and answers exact,
//! longest-prefix, nearest and ordered lookups. [`SortedIndex`] adds
//! duplicate keys and numeric ordering of signed keys by threading every item
//! into a list beside the trie.
//!
//! Both containers own their items in an arena. The graph engine reuses the
//! same trie and list algorithms over its own vertex and edge storage.

pub(crate) mod links;
pub(crate) mod list;

/// Unique-key Patricia trie.
pub mod patricia;

/// Ordered index with duplicates and signed ordering.
pub mod sorted;

pub use patricia::{Bound, PatriciaIndex};
pub use sorted::SortedIndex;
