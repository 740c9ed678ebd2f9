//! Qualifier declarations: the typed flag schema attached to classes,
//! properties, methods, parameters, and (deprecated) instances.

use crate::case_map::CaseInsensitiveMap;
use crate::value::{CimType, CimValue};
use serde::{Deserialize, Serialize};

/// The well-known qualifier name marking a key property.
pub const QUALIFIER_KEY: &str = "Key";
/// The well-known qualifier name marking an association class.
pub const QUALIFIER_ASSOCIATION: &str = "Association";

/// A map of qualifier name to qualifier value, attached to a class,
/// property, method, or parameter. Instance-level qualifiers are
/// deprecated per DSP0004 and never persisted (§3 CIMInstance).
pub type QualifierMap = CaseInsensitiveMap<CimValue>;

/// Returns whether a qualifier map carries a truthy boolean qualifier
/// (the usual shape of `Key` and `Association`): present and not
/// explicitly set to `false`.
pub fn has_boolean_qualifier(qualifiers: &QualifierMap, name: &str) -> bool {
    match qualifiers.get(name) {
        Some(CimValue::Scalar(crate::value::CimScalar::Boolean(b))) => *b,
        Some(_) => true,
        None => false,
    }
}

/// The kind of schema element a qualifier can be attached to, used when
/// validating a qualifier's declared scope during class resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// The class itself.
    Class,
    /// An association class (a class carrying the `Association` qualifier).
    Association,
    /// A property.
    Property,
    /// A reference-typed property.
    Reference,
    /// A method.
    Method,
    /// A method parameter.
    Parameter,
}

/// Which kinds of schema element a qualifier declaration may be applied to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualifierScopes {
    /// Applies to classes.
    pub class: bool,
    /// Applies to association classes specifically.
    pub association: bool,
    /// Applies to properties.
    pub property: bool,
    /// Applies to reference properties.
    pub reference: bool,
    /// Applies to methods.
    pub method: bool,
    /// Applies to method parameters.
    pub parameter: bool,
    /// Applies anywhere, overriding the other flags.
    pub any: bool,
}

impl QualifierScopes {
    /// A scope accepting every element kind.
    pub fn any() -> Self {
        Self {
            any: true,
            ..Default::default()
        }
    }

    /// Whether this scope permits attaching the qualifier to `kind`.
    pub fn permits(&self, kind: ElementKind) -> bool {
        if self.any {
            return true;
        }
        match kind {
            ElementKind::Class => self.class,
            ElementKind::Association => self.class || self.association,
            ElementKind::Property => self.property,
            ElementKind::Reference => self.property || self.reference,
            ElementKind::Method => self.method,
            ElementKind::Parameter => self.parameter,
        }
    }
}

/// Flavor rules governing qualifier propagation and overridability
/// (DSP0004 §5.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualifierFlavors {
    /// Subclasses may override the qualifier's value (default `true`).
    pub overridable: bool,
    /// The qualifier propagates from a class to its subclasses.
    pub to_subclass: bool,
    /// The qualifier value is subject to locale translation.
    pub translatable: bool,
}

impl Default for QualifierFlavors {
    fn default() -> Self {
        Self {
            overridable: true,
            to_subclass: true,
            translatable: false,
        }
    }
}

/// A namespace-scoped qualifier declaration: `{name, type, scopes,
/// flavors, default}` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CIMQualifierDeclaration {
    /// The qualifier's name, e.g. `Key`, `Association`, `Description`.
    pub name: String,
    /// The declared value type.
    pub qualifier_type: CimType,
    /// Whether the qualifier's value is array-shaped.
    pub is_array: bool,
    /// Element kinds this qualifier may be attached to.
    pub scopes: QualifierScopes,
    /// Propagation/override rules.
    pub flavors: QualifierFlavors,
    /// The default value used when an element declares the qualifier
    /// without an explicit value.
    pub default: CimValue,
}

impl CIMQualifierDeclaration {
    /// Validate that a qualifier value attached to some element conforms
    /// to this declaration's type/array-ness and scope.
    pub fn validate(&self, value: &CimValue, kind: ElementKind) -> Result<(), String> {
        if !self.scopes.permits(kind) {
            return Err(format!(
                "qualifier {:?} is not permitted on {:?}",
                self.name, kind
            ));
        }
        if !value.conforms_to(&self.qualifier_type, self.is_array) {
            return Err(format!(
                "qualifier {:?} value does not match declared type",
                self.name
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::CimScalar;

    #[test]
    fn scope_any_permits_everything() {
        let scopes = QualifierScopes::any();
        assert!(scopes.permits(ElementKind::Parameter));
        assert!(scopes.permits(ElementKind::Class));
    }

    #[test]
    fn scope_property_excludes_method() {
        let scopes = QualifierScopes {
            property: true,
            ..Default::default()
        };
        assert!(scopes.permits(ElementKind::Property));
        assert!(!scopes.permits(ElementKind::Method));
    }

    #[test]
    fn validate_rejects_wrong_type() {
        let decl = CIMQualifierDeclaration {
            name: "Key".into(),
            qualifier_type: CimType::Boolean,
            is_array: false,
            scopes: QualifierScopes {
                property: true,
                ..Default::default()
            },
            flavors: QualifierFlavors::default(),
            default: CimValue::Scalar(CimScalar::Boolean(false)),
        };
        let bad = CimValue::Scalar(CimScalar::String("x".into()));
        assert!(decl.validate(&bad, ElementKind::Property).is_err());
        let good = CimValue::Scalar(CimScalar::Boolean(true));
        assert!(decl.validate(&good, ElementKind::Property).is_ok());
        assert!(decl.validate(&good, ElementKind::Method).is_err());
    }
}
