//! Instances and instance paths: `CIMInstance`, `CIMInstanceName` (§3).

use crate::case_map::CaseInsensitiveMap;
use crate::class::CIMClass;
use crate::value::CimValue;
use serde::{Deserialize, Serialize};

/// An instance path: `{classname, namespace?, host?, keybindings}` (§3).
///
/// Equality is defined structurally here rather than via a custom
/// case-insensitive comparator: the repository always constructs and
/// stores paths with the class's canonical name casing and key-property
/// casing (§4.5 steps 5/7), so two paths naming the same instance are
/// always structurally identical by the time they're compared. This
/// resolves the "two paths are equal iff ... case-insensitively" rule
/// (§3 I5/I6) without needing a bespoke `Eq`/`Hash` over `CimValue`,
/// which would otherwise have to define an ordering over floating-point
/// scalars.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CIMInstanceName {
    /// The instance's class name.
    pub classname: String,
    /// Namespace the instance lives in, if resolved.
    pub namespace: Option<String>,
    /// Host identity, filled in for association results (§4.7.5).
    pub host: Option<String>,
    /// Key property name to value.
    pub keybindings: CaseInsensitiveMap<CimValue>,
}

impl CIMInstanceName {
    /// A new, empty path for `classname`.
    pub fn new(classname: impl Into<String>) -> Self {
        Self {
            classname: classname.into(),
            namespace: None,
            host: None,
            keybindings: CaseInsensitiveMap::new(),
        }
    }

    /// Builder: attach a keybinding.
    pub fn with_key(mut self, name: &str, value: CimValue) -> Self {
        self.keybindings.insert(name, value);
        self
    }

    /// Builder: set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Structural path equality: classname (case-insensitive) and every
    /// keybinding name/value match.
    pub fn matches(&self, other: &CIMInstanceName) -> bool {
        if !self.classname.eq_ignore_ascii_case(&other.classname) {
            return false;
        }
        if self.keybindings.len() != other.keybindings.len() {
            return false;
        }
        self.keybindings
            .iter()
            .all(|(name, value)| other.keybindings.get(name) == Some(value))
    }

    /// A deterministic string key for use in lookup tables, combining the
    /// lower-cased classname and a sorted rendering of the keybindings.
    pub fn canonical_key(&self) -> String {
        let mut parts: Vec<String> = self
            .keybindings
            .iter()
            .map(|(name, value)| format!("{}={:?}", name.to_ascii_lowercase(), value))
            .collect();
        parts.sort();
        format!("{}|{}", self.classname.to_ascii_lowercase(), parts.join(","))
    }
}

/// An instance: `{classname, properties, path}` (§3).
///
/// Instance-level qualifiers are deprecated per DSP0004 and are never
/// represented here; any supplied on write are dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CIMInstance {
    /// The instance's class name.
    pub classname: String,
    /// Property values, case-insensitively keyed.
    pub properties: CaseInsensitiveMap<CimValue>,
    /// This instance's path, kept consistent with `properties` (I5).
    pub path: CIMInstanceName,
}

impl CIMInstance {
    /// A new instance of `classname` with an empty path and no properties.
    pub fn new(classname: impl Into<String>) -> Self {
        let classname = classname.into();
        Self {
            classname: classname.clone(),
            properties: CaseInsensitiveMap::new(),
            path: CIMInstanceName::new(classname),
        }
    }

    /// Builder: set a property value.
    pub fn with_property(mut self, name: &str, value: CimValue) -> Self {
        self.properties.insert(name, value);
        self
    }

    /// Rebuild `path` from this instance's key properties, per the target
    /// class's declared keys, in the class's property name casing.
    pub fn rebuild_path(&mut self, target_class: &CIMClass, namespace: &str) {
        let mut path = CIMInstanceName::new(self.classname.clone()).with_namespace(namespace);
        for key_name in target_class.key_property_names() {
            if let Some(value) = self.properties.get(&key_name) {
                path = path.with_key(&key_name, value.clone());
            }
        }
        self.path = path;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::CimScalar;

    #[test]
    fn matches_ignores_classname_case() {
        let a = CIMInstanceName::new("CIM_Foo").with_key("Id", CimValue::Scalar(CimScalar::Uint32(1)));
        let b = CIMInstanceName::new("cim_foo").with_key("id", CimValue::Scalar(CimScalar::Uint32(1)));
        assert!(a.matches(&b));
    }

    #[test]
    fn matches_detects_value_mismatch() {
        let a = CIMInstanceName::new("CIM_Foo").with_key("Id", CimValue::Scalar(CimScalar::Uint32(1)));
        let b = CIMInstanceName::new("CIM_Foo").with_key("Id", CimValue::Scalar(CimScalar::Uint32(2)));
        assert!(!a.matches(&b));
    }

    #[test]
    fn canonical_key_stable_under_insertion_order() {
        let a = CIMInstanceName::new("X")
            .with_key("A", CimValue::Scalar(CimScalar::Uint32(1)))
            .with_key("B", CimValue::Scalar(CimScalar::Uint32(2)));
        let b = CIMInstanceName::new("X")
            .with_key("B", CimValue::Scalar(CimScalar::Uint32(2)))
            .with_key("A", CimValue::Scalar(CimScalar::Uint32(1)));
        assert_eq!(a.canonical_key(), b.canonical_key());
    }
}
