//! Character-path trie with a merkle root commitment.
//!
//! Keys are split into individual characters, one trie edge per character.
//! Every mutation recomputes the root hash bottom-up, so [`Trie::root_hash`]
//! is always a commitment to the full current contents. Lookups hand back
//! deep copies: callers can never mutate stored values in place.

use crate::types::hash::{canonical_hash, Digest};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// A single trie node: an optional value plus one child per edge character.
#[derive(Clone, Debug, Default, PartialEq)]
struct Node {
    value: Option<Value>,
    children: BTreeMap<char, Node>,
}

impl Node {
    /// Hashes this node's value together with the hashes of its children.
    fn hash(&self) -> Digest {
        let children: BTreeMap<String, String> = self
            .children
            .iter()
            .map(|(edge, child)| (edge.to_string(), child.hash().to_string()))
            .collect();
        canonical_hash(&json!({
            "value": self.value,
            "children": children,
        }))
    }
}

/// Merkle-hashed key/value store over character paths.
#[derive(Clone, Debug)]
pub struct Trie {
    root: Node,
    root_hash: Digest,
}

impl Trie {
    /// Creates an empty trie.
    pub fn new() -> Trie {
        let root = Node::default();
        let root_hash = root.hash();
        Trie { root, root_hash }
    }

    /// Builds a trie from a batch of items, each keyed by its own canonical
    /// hash. Used to commit a block's transaction series to a single root.
    pub fn from_items<T: serde::Serialize>(items: &[T]) -> Trie {
        let mut trie = Trie::new();
        for item in items {
            let key = canonical_hash(item).to_string();
            trie.put(&key, crate::types::hash::to_json(item));
        }
        trie
    }

    /// Returns the current root commitment.
    pub fn root_hash(&self) -> Digest {
        self.root_hash
    }

    /// Looks up `key`, returning a deep copy of the stored value.
    ///
    /// Returns `None` when the key is absent or no value was ever stored at
    /// its path. Never an error.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut node = &self.root;
        for character in key.chars() {
            node = node.children.get(&character)?;
        }
        node.value.clone()
    }

    /// Stores `value` under `key`, creating intermediate nodes as needed, and
    /// recomputes the root hash.
    pub fn put(&mut self, key: &str, value: Value) {
        let mut node = &mut self.root;
        for character in key.chars() {
            node = node.children.entry(character).or_default();
        }
        node.value = Some(value);
        self.root_hash = self.root.hash();
    }
}

impl Default for Trie {
    fn default() -> Trie {
        Trie::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_what_was_put() {
        let mut trie = Trie::new();
        let value = json!({ "balance": 1000 });
        trie.put("account", value.clone());
        assert_eq!(trie.get("account"), Some(value));
    }

    #[test]
    fn get_returns_none_for_absent_key() {
        let trie = Trie::new();
        assert_eq!(trie.get("missing"), None);
    }

    #[test]
    fn get_returns_none_for_prefix_without_value() {
        let mut trie = Trie::new();
        trie.put("account", json!(1));
        assert_eq!(trie.get("acc"), None);
    }

    #[test]
    fn returned_values_are_independent_copies() {
        let mut trie = Trie::new();
        trie.put("key", json!({ "n": 1 }));
        let before = trie.root_hash();

        let mut fetched = trie.get("key").expect("stored value");
        fetched["n"] = json!(2);

        assert_eq!(trie.get("key"), Some(json!({ "n": 1 })));
        assert_eq!(trie.root_hash(), before);
    }

    #[test]
    fn every_put_changes_the_root() {
        let mut trie = Trie::new();
        let empty = trie.root_hash();
        trie.put("a", json!(1));
        let one = trie.root_hash();
        assert_ne!(empty, one);
        trie.put("b", json!(2));
        assert_ne!(one, trie.root_hash());
    }

    #[test]
    fn overwriting_a_key_changes_the_root() {
        let mut trie = Trie::new();
        trie.put("key", json!(1));
        let before = trie.root_hash();
        trie.put("key", json!(2));
        assert_ne!(before, trie.root_hash());
    }

    #[test]
    fn root_is_independent_of_insertion_order() {
        let mut forward = Trie::new();
        forward.put("alpha", json!(1));
        forward.put("beta", json!(2));

        let mut backward = Trie::new();
        backward.put("beta", json!(2));
        backward.put("alpha", json!(1));

        assert_eq!(forward.root_hash(), backward.root_hash());
    }

    #[test]
    fn from_items_keys_entries_by_their_canonical_hash() {
        let items = vec![json!({ "id": "one" }), json!({ "id": "two" })];
        let trie = Trie::from_items(&items);
        let key = canonical_hash(&items[0]).to_string();
        assert_eq!(trie.get(&key), Some(items[0].clone()));
    }

    #[test]
    fn from_items_root_is_order_independent() {
        let first = json!({ "id": "one" });
        let second = json!({ "id": "two" });
        let forward = Trie::from_items(&[first.clone(), second.clone()]);
        let backward = Trie::from_items(&[second, first]);
        assert_eq!(forward.root_hash(), backward.root_hash());
    }
}
