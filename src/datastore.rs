//! The datastore contract (§4.1): per-namespace keyed object stores for
//! classes, instances, and qualifier declarations, plus a namespace
//! catalog.
//!
//! The in-memory implementation here is the system's only concrete
//! backing store; §4.1 treats it as a replaceable contract, so the
//! [`ObjectStore`] trait is kept narrow enough that another backing
//! store (e.g. a persistent one) could implement it without the
//! responder changing.

use crate::class::CIMClass;
use crate::errors::{CimError, CimResult};
use crate::instance::CIMInstance;
use crate::namespace::{normalize_namespace_name, validate_namespace_name};
use crate::qualifier::CIMQualifierDeclaration;
use indexmap::IndexMap;
use std::sync::RwLock;

/// A single keyed object store with stable iteration order.
///
/// Implementations return owned copies on read so that callers may
/// mutate them freely without the mutation bleeding back into stored
/// state (§4.1, §9 "deep copy on read"): the store itself is free to
/// hold data by reference internally, but its public surface never
/// hands out a live reference into its own storage.
pub trait ObjectStore<V: Clone> {
    /// Whether `key` is present.
    fn exists(&self, key: &str) -> bool;

    /// Fetch a copy of the value stored at `key`.
    fn get(&self, key: &str) -> Option<V>;

    /// Insert `value` at `key`. Returns `false` without modifying the
    /// store if `key` is already present.
    fn create(&mut self, key: &str, value: V) -> bool;

    /// Replace the value stored at `key`. Returns `false` without
    /// modifying the store if `key` is absent.
    fn update(&mut self, key: &str, value: V) -> bool;

    /// Remove the value stored at `key`. Returns `false` if `key` is
    /// absent.
    fn delete(&mut self, key: &str) -> bool;

    /// All stored values in stable (insertion) order.
    fn iter_values(&self) -> Vec<V>;

    /// Number of stored values.
    fn len(&self) -> usize;

    /// Whether the store holds no values.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An `ObjectStore` backed by an in-memory ordered map.
#[derive(Debug, Clone, Default)]
pub struct MapStore<V> {
    entries: IndexMap<String, V>,
}

impl<V> MapStore<V> {
    /// An empty store.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<V: Clone> ObjectStore<V> for MapStore<V> {
    fn exists(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn get(&self, key: &str) -> Option<V> {
        self.entries.get(key).cloned()
    }

    fn create(&mut self, key: &str, value: V) -> bool {
        if self.entries.contains_key(key) {
            return false;
        }
        self.entries.insert(key.to_string(), value);
        true
    }

    fn update(&mut self, key: &str, value: V) -> bool {
        if !self.entries.contains_key(key) {
            return false;
        }
        self.entries.insert(key.to_string(), value);
        true
    }

    fn delete(&mut self, key: &str) -> bool {
        self.entries.shift_remove(key).is_some()
    }

    fn iter_values(&self) -> Vec<V> {
        self.entries.values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// The three object stores hosted by a single namespace (§3 "Namespace").
#[derive(Debug, Clone, Default)]
pub struct NamespaceStore {
    /// Classes, keyed by lower-cased class name.
    pub classes: MapStore<CIMClass>,
    /// Instances, keyed by `CIMInstanceName::canonical_key`.
    pub instances: MapStore<CIMInstance>,
    /// Qualifier declarations, keyed by lower-cased qualifier name.
    pub qualifiers: MapStore<CIMQualifierDeclaration>,
}

impl NamespaceStore {
    /// Whether all three stores are empty (the `removeNamespace`
    /// precondition, §4.2).
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.instances.is_empty() && self.qualifiers.is_empty()
    }
}

/// Outcome of a namespace removal attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveNamespaceOutcome {
    /// The namespace was removed.
    Removed,
    /// No such namespace existed.
    NotFound,
    /// The namespace exists but one of its stores is non-empty.
    NotEmpty,
}

/// The process-wide collection of namespaces and their object stores.
///
/// A single `RwLock` guards the whole catalog: per §5, one operation's
/// effect on all three stores of a namespace must be atomic, which a
/// single lock gives for free at the cost of serializing writers across
/// namespaces too. That coarseness is acceptable for an in-memory mock
/// responder (§9).
pub struct Datastore {
    namespaces: RwLock<IndexMap<String, NamespaceStore>>,
}

impl Default for Datastore {
    fn default() -> Self {
        Self::new()
    }
}

impl Datastore {
    /// An empty datastore with no namespaces.
    pub fn new() -> Self {
        Self {
            namespaces: RwLock::new(IndexMap::new()),
        }
    }

    /// Whether `ns` is present in the catalog, normalizing leading/
    /// trailing `/` the way `addNamespace` does (§4.2).
    pub fn namespace_exists(&self, ns: &str) -> bool {
        let normalized = normalize_namespace_name(ns);
        self.namespaces.read().unwrap().contains_key(&normalized)
    }

    /// All namespace names, in creation order.
    pub fn list_namespaces(&self) -> Vec<String> {
        self.namespaces.read().unwrap().keys().cloned().collect()
    }

    /// Add a new, empty namespace (§4.2).
    ///
    /// Strips leading/trailing `/` before comparing and storing, so
    /// `"root/cimv2"` and `"/root/cimv2/"` name the same namespace.
    /// Fails `ALREADY_EXISTS` if the normalized name is already present.
    pub fn add_namespace(&self, ns: &str) -> CimResult<()> {
        validate_namespace_name(ns)?;
        let normalized = normalize_namespace_name(ns);
        let mut namespaces = self.namespaces.write().unwrap();
        if namespaces.contains_key(&normalized) {
            return Err(CimError::AlreadyExists(format!(
                "namespace {normalized:?} already exists"
            )));
        }
        namespaces.insert(normalized, NamespaceStore::default());
        Ok(())
    }

    /// Remove `ns`, enforcing that all three of its stores are empty.
    pub fn remove_namespace(&self, ns: &str) -> RemoveNamespaceOutcome {
        let normalized = normalize_namespace_name(ns);
        let mut namespaces = self.namespaces.write().unwrap();
        match namespaces.get(&normalized) {
            None => RemoveNamespaceOutcome::NotFound,
            Some(store) if !store.is_empty() => RemoveNamespaceOutcome::NotEmpty,
            Some(_) => {
                namespaces.shift_remove(&normalized);
                RemoveNamespaceOutcome::Removed
            }
        }
    }

    /// Run `f` against a read-only view of `ns`'s stores.
    pub fn read_namespace<R>(&self, ns: &str, f: impl FnOnce(&NamespaceStore) -> R) -> Option<R> {
        let namespaces = self.namespaces.read().unwrap();
        namespaces.get(ns).map(f)
    }

    /// Run `f` against a mutable view of `ns`'s stores.
    pub fn write_namespace<R>(
        &self,
        ns: &str,
        f: impl FnOnce(&mut NamespaceStore) -> R,
    ) -> Option<R> {
        let mut namespaces = self.namespaces.write().unwrap();
        namespaces.get_mut(ns).map(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_namespace_rejects_duplicate() {
        let ds = Datastore::new();
        ds.add_namespace("root/cimv2").unwrap();
        assert!(matches!(
            ds.add_namespace("root/cimv2").unwrap_err(),
            CimError::AlreadyExists(_)
        ));
    }

    #[test]
    fn add_namespace_normalizes_slashes() {
        let ds = Datastore::new();
        ds.add_namespace("/root/cimv2/").unwrap();
        assert!(ds.namespace_exists("root/cimv2"));
        assert!(matches!(
            ds.add_namespace("root/cimv2").unwrap_err(),
            CimError::AlreadyExists(_)
        ));
        assert_eq!(ds.list_namespaces(), vec!["root/cimv2".to_string()]);
    }

    #[test]
    fn remove_namespace_enforces_emptiness() {
        let ds = Datastore::new();
        ds.add_namespace("root/cimv2").unwrap();
        ds.write_namespace("root/cimv2", |store| {
            store.classes.create("cim_foo", CIMClass::new("CIM_Foo"));
        });
        assert_eq!(
            ds.remove_namespace("root/cimv2"),
            RemoveNamespaceOutcome::NotEmpty
        );
        ds.write_namespace("root/cimv2", |store| {
            store.classes.delete("cim_foo");
        });
        assert_eq!(
            ds.remove_namespace("root/cimv2"),
            RemoveNamespaceOutcome::Removed
        );
        assert_eq!(
            ds.remove_namespace("root/cimv2"),
            RemoveNamespaceOutcome::NotFound
        );
    }

    #[test]
    fn map_store_create_update_delete() {
        let mut store: MapStore<u32> = MapStore::new();
        assert!(store.create("a", 1));
        assert!(!store.create("a", 2));
        assert!(store.update("a", 2));
        assert!(!store.update("b", 3));
        assert_eq!(store.get("a"), Some(2));
        assert!(store.delete("a"));
        assert!(!store.delete("a"));
    }
}
