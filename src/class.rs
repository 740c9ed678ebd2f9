//! The class schema model: `CIMClass`, `CIMProperty`, `CIMMethod`,
//! `CIMParameter` (§3).

use crate::case_map::CaseInsensitiveMap;
use crate::qualifier::{has_boolean_qualifier, QualifierMap, QUALIFIER_ASSOCIATION, QUALIFIER_KEY};
use crate::value::{CimType, CimValue};
use serde::{Deserialize, Serialize};

/// A method input/output parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CIMParameter {
    /// Parameter name.
    pub name: String,
    /// Declared type.
    pub param_type: CimType,
    /// Whether the parameter is array-shaped.
    pub is_array: bool,
    /// Fixed array size, if declared.
    pub array_size: Option<u32>,
    /// Parameter-level qualifiers.
    pub qualifiers: QualifierMap,
}

/// A class property: `{name, type, is_array, array_size?, default_value?,
/// qualifiers, class_origin, propagated}` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CIMProperty {
    /// Property name.
    pub name: String,
    /// Declared value type.
    pub value_type: CimType,
    /// Whether the property is array-shaped.
    pub is_array: bool,
    /// Fixed array size, if declared.
    pub array_size: Option<u32>,
    /// Default value used by CreateInstance when the instance omits this
    /// property (§4.5 step 6).
    pub default_value: Option<CimValue>,
    /// Property-level qualifiers.
    pub qualifiers: QualifierMap,
    /// The ancestor class that first declared this property, set during
    /// resolution (§4.3).
    pub class_origin: Option<String>,
    /// Whether this property was propagated from an ancestor rather than
    /// locally declared.
    pub propagated: bool,
}

impl CIMProperty {
    /// A new locally-declared property (not yet resolved).
    pub fn new(name: impl Into<String>, value_type: CimType, is_array: bool) -> Self {
        Self {
            name: name.into(),
            value_type,
            is_array,
            array_size: None,
            default_value: None,
            qualifiers: QualifierMap::new(),
            class_origin: None,
            propagated: false,
        }
    }

    /// Whether this property carries the `Key` qualifier.
    pub fn is_key(&self) -> bool {
        has_boolean_qualifier(&self.qualifiers, QUALIFIER_KEY)
    }

    /// Whether this is a reference-typed property.
    pub fn is_reference(&self) -> bool {
        matches!(self.value_type, CimType::Reference { .. })
    }

    /// Builder: attach a qualifier.
    pub fn with_qualifier(mut self, name: &str, value: CimValue) -> Self {
        self.qualifiers.insert(name, value);
        self
    }

    /// Builder: attach a default value.
    pub fn with_default(mut self, value: CimValue) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// A class method: `{name, return_type, parameters, qualifiers,
/// class_origin, propagated}` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CIMMethod {
    /// Method name.
    pub name: String,
    /// Declared return type.
    pub return_type: CimType,
    /// Ordered parameters.
    pub parameters: CaseInsensitiveMap<CIMParameter>,
    /// Method-level qualifiers.
    pub qualifiers: QualifierMap,
    /// The ancestor class that first declared this method.
    pub class_origin: Option<String>,
    /// Whether this method was propagated from an ancestor.
    pub propagated: bool,
}

impl CIMMethod {
    /// A new locally-declared method (not yet resolved).
    pub fn new(name: impl Into<String>, return_type: CimType) -> Self {
        Self {
            name: name.into(),
            return_type,
            parameters: CaseInsensitiveMap::new(),
            qualifiers: QualifierMap::new(),
            class_origin: None,
            propagated: false,
        }
    }
}

/// A namespace-scoped class: `{classname, superclass?, qualifiers,
/// properties, methods}` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CIMClass {
    /// Class name, unique per namespace case-insensitively (I1).
    pub classname: String,
    /// Parent class name, if any (I2).
    pub superclass: Option<String>,
    /// Class-level qualifiers.
    pub qualifiers: QualifierMap,
    /// Ordered properties, local and inherited.
    pub properties: CaseInsensitiveMap<CIMProperty>,
    /// Ordered methods, local and inherited.
    pub methods: CaseInsensitiveMap<CIMMethod>,
}

impl CIMClass {
    /// A new class with no superclass, properties, or methods.
    pub fn new(classname: impl Into<String>) -> Self {
        Self {
            classname: classname.into(),
            superclass: None,
            qualifiers: QualifierMap::new(),
            properties: CaseInsensitiveMap::new(),
            methods: CaseInsensitiveMap::new(),
        }
    }

    /// Builder: set the superclass.
    pub fn with_superclass(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    /// Builder: add a property.
    pub fn with_property(mut self, property: CIMProperty) -> Self {
        self.properties.insert(&property.name.clone(), property);
        self
    }

    /// Builder: add a method.
    pub fn with_method(mut self, method: CIMMethod) -> Self {
        self.methods.insert(&method.name.clone(), method);
        self
    }

    /// Builder: attach a class-level qualifier.
    pub fn with_qualifier(mut self, name: &str, value: CimValue) -> Self {
        self.qualifiers.insert(name, value);
        self
    }

    /// Whether this class carries the `Association` qualifier.
    pub fn is_association(&self) -> bool {
        has_boolean_qualifier(&self.qualifiers, QUALIFIER_ASSOCIATION)
    }

    /// All key property names, in declaration order.
    pub fn key_property_names(&self) -> Vec<String> {
        self.properties
            .iter()
            .filter(|(_, p)| p.is_key())
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// All reference-typed properties, in declaration order.
    pub fn reference_properties(&self) -> Vec<&CIMProperty> {
        self.properties
            .values()
            .filter(|p| p.is_reference())
            .collect()
    }

    /// Apply class shaping rules (§4.4) to a copy of this class:
    /// LocalOnly, PropertyList, IncludeQualifiers, IncludeClassOrigin,
    /// in that order.
    pub fn shaped(
        &self,
        local_only: bool,
        property_list: Option<&[String]>,
        include_qualifiers: bool,
        include_class_origin: bool,
    ) -> CIMClass {
        let mut out = self.clone();

        if local_only {
            out.properties = out
                .properties
                .iter()
                .filter(|(_, p)| !p.propagated)
                .map(|(name, p)| (name.to_string(), p.clone()))
                .collect();
            out.methods = out
                .methods
                .iter()
                .filter(|(_, m)| !m.propagated)
                .map(|(name, m)| (name.to_string(), m.clone()))
                .collect();
        }

        if let Some(list) = property_list {
            let wanted: std::collections::HashSet<String> =
                list.iter().map(|n| n.to_ascii_lowercase()).collect();
            out.properties = out
                .properties
                .iter()
                .filter(|(name, _)| wanted.contains(&name.to_ascii_lowercase()))
                .map(|(name, p)| (name.to_string(), p.clone()))
                .collect();
        }

        if !include_qualifiers {
            out.qualifiers = QualifierMap::new();
            for (name, p) in out.properties.iter_mut() {
                let _ = name;
                p.qualifiers = QualifierMap::new();
            }
            for (name, m) in out.methods.iter_mut() {
                let _ = name;
                m.qualifiers = QualifierMap::new();
                for (_, param) in m.parameters.iter_mut() {
                    param.qualifiers = QualifierMap::new();
                }
            }
        }

        if !include_class_origin {
            for (name, p) in out.properties.iter_mut() {
                let _ = name;
                p.class_origin = None;
            }
            for (name, m) in out.methods.iter_mut() {
                let _ = name;
                m.class_origin = None;
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::CimScalar;

    fn bool_true() -> CimValue {
        CimValue::Scalar(CimScalar::Boolean(true))
    }

    #[test]
    fn is_association_reads_qualifier() {
        let class = CIMClass::new("CIM_AtoB").with_qualifier("Association", bool_true());
        assert!(class.is_association());
        assert!(!CIMClass::new("CIM_A").is_association());
    }

    #[test]
    fn key_property_names_collects_keys() {
        let class = CIMClass::new("CIM_A")
            .with_property(CIMProperty::new("Id", CimType::String, false).with_qualifier("Key", bool_true()))
            .with_property(CIMProperty::new("Name", CimType::String, false));
        assert_eq!(class.key_property_names(), vec!["Id".to_string()]);
    }

    #[test]
    fn shaped_local_only_drops_propagated() {
        let mut class = CIMClass::new("B").with_property(CIMProperty::new("Local", CimType::String, false));
        let mut inherited = CIMProperty::new("Inherited", CimType::String, false);
        inherited.propagated = true;
        inherited.class_origin = Some("A".into());
        class.properties.insert("Inherited", inherited);

        let shaped = class.shaped(true, None, true, true);
        assert!(shaped.properties.contains_key("Local"));
        assert!(!shaped.properties.contains_key("Inherited"));

        let unshaped = class.shaped(false, None, true, true);
        assert!(unshaped.properties.contains_key("Inherited"));
    }

    #[test]
    fn shaped_strips_qualifiers_and_class_origin() {
        let mut prop = CIMProperty::new("P", CimType::String, false);
        prop.class_origin = Some("A".into());
        prop.qualifiers.insert("Description", CimValue::Scalar(CimScalar::String("x".into())));
        let class = CIMClass::new("A").with_property(prop);

        let shaped = class.shaped(false, None, false, false);
        let p = shaped.properties.get("P").unwrap();
        assert!(p.qualifiers.is_empty());
        assert!(p.class_origin.is_none());
    }
}
