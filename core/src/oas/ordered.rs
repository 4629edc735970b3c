//! # Ordered Containers
//!
//! Insertion-order-preserving unique-key mappings for the `properties` and
//! `headers` blocks, whose member order is expected to mirror source
//! declaration order.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// An insertion-order-preserving mapping from member name to child node.
///
/// `set` on an existing key replaces the value in place without moving the
/// key; new keys append at the end. Iteration and serialization both follow
/// first-insertion order. There is no deletion operation; callers that need
/// to drop members rebuild the container instead.
///
/// An *unset* container (`Option::<OrderedMap<V>>::None` serialized directly)
/// renders as the JSON literal `null`; an *empty* container renders as `{}`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderedMap<V> {
    entries: IndexMap<String, V>,
}

impl<V> OrderedMap<V> {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Inserts or replaces a member.
    ///
    /// Keys are compared by exact string equality. Replacing keeps the key
    /// at its original position.
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        self.entries.insert(key.into(), value);
    }

    /// Looks up a member by key.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    /// Returns true when the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the container has no members.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(key, value)` pairs in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &V)> {
        self.entries.iter()
    }

    /// Iterates keys in first-insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }
}

impl<V> FromIterator<(String, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_iteration_follows_insertion_order() {
        let mut map = OrderedMap::new();
        map.set("id", 1);
        map.set("name", 2);
        map.set("createdAt", 3);

        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "name", "createdAt"]);
    }

    #[test]
    fn test_update_in_place_does_not_move_key() {
        let mut map = OrderedMap::new();
        map.set("a", 1);
        map.set("b", 2);
        map.set("c", 3);
        map.set("a", 10);

        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(map.get("a"), Some(&10));
    }

    #[test]
    fn test_serialization_order_matches_iteration() {
        let mut map = OrderedMap::new();
        map.set("zebra", 1);
        map.set("apple", 2);

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"zebra":1,"apple":2}"#);
    }

    #[test]
    fn test_empty_container_serializes_as_object() {
        let map: OrderedMap<i32> = OrderedMap::new();
        assert_eq!(serde_json::to_string(&map).unwrap(), "{}");
    }

    #[test]
    fn test_unset_container_serializes_as_null() {
        let map: Option<OrderedMap<i32>> = None;
        assert_eq!(serde_json::to_string(&map).unwrap(), "null");
    }
}
