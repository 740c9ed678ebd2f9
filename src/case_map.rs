//! Case-insensitive ordered map keyed by CIM element names
//!
//! CIM class, property, method, parameter, and qualifier names are
//! case-insensitive but case-preserving: lookups ignore case, while the
//! casing a name was first declared with is retained for display and
//! serialization. This module models that as a single ordered map rather
//! than a pair of dictionaries, per the design notes on case-insensitive
//! maps.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An ordered map from case-insensitive names to values.
///
/// Internally keyed by the lower-cased name; the original casing of the
/// most recent insert is carried alongside the value. Iteration order is
/// insertion order, matching CIM's expectation that property and method
/// order is stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseInsensitiveMap<V> {
    entries: IndexMap<String, (String, V)>,
}

impl<V> Default for CaseInsensitiveMap<V> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<V> CaseInsensitiveMap<V> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace a value under `name`, using `name`'s casing.
    ///
    /// Replacing a value that already exists (under any casing) keeps the
    /// element's position in iteration order but adopts the new casing.
    pub fn insert(&mut self, name: &str, value: V) -> Option<V> {
        let key = name.to_ascii_lowercase();
        self.entries
            .insert(key, (name.to_string(), value))
            .map(|(_, v)| v)
    }

    /// Look up a value by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&V> {
        self.entries.get(&name.to_ascii_lowercase()).map(|(_, v)| v)
    }

    /// Look up a mutable value by name, ignoring case.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut V> {
        self.entries
            .get_mut(&name.to_ascii_lowercase())
            .map(|(_, v)| v)
    }

    /// Whether `name` is present, ignoring case.
    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Remove an entry by name, ignoring case, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<V> {
        self.entries
            .shift_remove(&name.to_ascii_lowercase())
            .map(|(_, v)| v)
    }

    /// The original-cased name as declared, if present.
    pub fn original_name(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|(orig, _)| orig.as_str())
    }

    /// Iterate in insertion order as `(original_name, value)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.values().map(|(name, v)| (name.as_str(), v))
    }

    /// Iterate mutably in insertion order as `(original_name, value)`.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut V)> {
        self.entries
            .values_mut()
            .map(|(name, v)| (name.as_str(), &mut *v))
    }

    /// Original-cased names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.entries.values().map(|(name, _)| name.clone()).collect()
    }

    /// Values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values().map(|(_, v)| v)
    }
}

impl<V> FromIterator<(String, V)> for CaseInsensitiveMap<V> {
    fn from_iter<T: IntoIterator<Item = (String, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (name, value) in iter {
            map.insert(&name, value);
        }
        map
    }
}

/// De-duplicate a list of names case-insensitively, preserving first-seen
/// order and casing. Used for `PropertyList` normalization (DSP0200).
pub fn dedup_case_insensitive(names: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for name in names {
        let lower = name.to_ascii_lowercase();
        if seen.insert(lower) {
            out.push(name.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn insert_and_get_ignores_case() {
        let mut map = CaseInsensitiveMap::new();
        map.insert("Name", 1);
        assert_eq!(map.get("name"), Some(&1));
        assert_eq!(map.get("NAME"), Some(&1));
        assert_eq!(map.get("Name"), Some(&1));
    }

    #[test]
    fn insert_replaces_casing_and_value() {
        let mut map = CaseInsensitiveMap::new();
        map.insert("Name", 1);
        let old = map.insert("NAME", 2);
        assert_eq!(old, Some(1));
        assert_eq!(map.len(), 1);
        assert_eq!(map.names(), vec!["NAME".to_string()]);
    }

    #[test]
    fn preserves_insertion_order() {
        let mut map = CaseInsensitiveMap::new();
        map.insert("Zebra", 1);
        map.insert("Apple", 2);
        map.insert("Mango", 3);
        assert_eq!(map.names(), vec!["Zebra", "Apple", "Mango"]);
    }

    #[test]
    fn dedup_keeps_first_seen_casing() {
        let names = vec!["Foo".to_string(), "FOO".to_string(), "Bar".to_string()];
        assert_eq!(dedup_case_insensitive(&names), vec!["Foo", "Bar"]);
    }

    proptest! {
        /// §8's case-insensitivity law: replacing a lookup name with any
        /// other casing of the same name must not change what is found.
        #[test]
        fn lookup_is_case_insensitive(name in "[a-zA-Z][a-zA-Z0-9_]{0,15}", value in 0i64..1000) {
            let mut map = CaseInsensitiveMap::new();
            map.insert(&name, value);
            prop_assert_eq!(map.get(&name.to_ascii_uppercase()), Some(&value));
            prop_assert_eq!(map.get(&name.to_ascii_lowercase()), Some(&value));
        }

        /// Inserting under any casing of an existing name replaces the
        /// value in place rather than appending a second entry.
        #[test]
        fn reinsert_under_other_casing_keeps_single_entry(
            name in "[a-zA-Z][a-zA-Z0-9_]{0,15}",
            first in 0i64..1000,
            second in 0i64..1000,
        ) {
            let mut map = CaseInsensitiveMap::new();
            map.insert(&name, first);
            map.insert(&name.to_ascii_uppercase(), second);
            prop_assert_eq!(map.len(), 1);
            prop_assert_eq!(map.get(&name), Some(&second));
        }
    }
}
