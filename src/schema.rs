//! The schema resolver: class inheritance propagation and qualifier
//! validation on `CreateClass` (§4.3).

use crate::class::CIMClass;
use crate::datastore::NamespaceStore;
use crate::errors::{CimError, CimResult};
use crate::qualifier::ElementKind;

/// Resolve `new_class` against `store`: locate its superclass, merge
/// inherited properties/methods, and validate every qualifier against
/// the namespace's qualifier declarations.
///
/// Returns the fully resolved class to be stored; `new_class` itself is
/// never stored as-is (§4.4 CreateClass).
pub fn resolve_class(store: &NamespaceStore, new_class: &CIMClass) -> CimResult<CIMClass> {
    let mut resolved = CIMClass::new(new_class.classname.clone());
    resolved.superclass = new_class.superclass.clone();
    resolved.qualifiers = new_class.qualifiers.clone();

    let superclass = match &new_class.superclass {
        Some(name) => {
            let found = store.classes.get(&name.to_ascii_lowercase());
            match found {
                Some(c) => Some(c),
                None => {
                    return Err(CimError::InvalidSuperclass(format!(
                        "superclass {name:?} not found for class {:?}",
                        new_class.classname
                    )))
                }
            }
        }
        None => None,
    };

    if let Some(parent) = &superclass {
        for (name, prop) in parent.properties.iter() {
            if !new_class.properties.contains_key(name) {
                let mut inherited = prop.clone();
                inherited.propagated = true;
                if inherited.class_origin.is_none() {
                    inherited.class_origin = Some(parent.classname.clone());
                }
                resolved.properties.insert(name, inherited);
            }
        }
        for (name, method) in parent.methods.iter() {
            if !new_class.methods.contains_key(name) {
                let mut inherited = method.clone();
                inherited.propagated = true;
                if inherited.class_origin.is_none() {
                    inherited.class_origin = Some(parent.classname.clone());
                }
                resolved.methods.insert(name, inherited);
            }
        }
    }

    for (name, prop) in new_class.properties.iter() {
        let mut local = prop.clone();
        local.class_origin = Some(new_class.classname.clone());
        local.propagated = false;
        resolved.properties.insert(name, local);
    }
    for (name, method) in new_class.methods.iter() {
        let mut local = method.clone();
        local.class_origin = Some(new_class.classname.clone());
        local.propagated = false;
        resolved.methods.insert(name, local);
    }

    validate_qualifiers(store, &resolved)?;

    Ok(resolved)
}

fn validate_qualifiers(store: &NamespaceStore, class: &CIMClass) -> CimResult<()> {
    let class_kind = if class.is_association() {
        ElementKind::Association
    } else {
        ElementKind::Class
    };

    for (name, value) in class.qualifiers.iter() {
        check_one(store, name, value, class_kind)?;
    }
    for (_, prop) in class.properties.iter() {
        let kind = if prop.is_reference() {
            ElementKind::Reference
        } else {
            ElementKind::Property
        };
        for (name, value) in prop.qualifiers.iter() {
            check_one(store, name, value, kind)?;
        }
    }
    for (_, method) in class.methods.iter() {
        for (name, value) in method.qualifiers.iter() {
            check_one(store, name, value, ElementKind::Method)?;
        }
        for (_, param) in method.parameters.iter() {
            for (name, value) in param.qualifiers.iter() {
                check_one(store, name, value, ElementKind::Parameter)?;
            }
        }
    }
    Ok(())
}

fn check_one(
    store: &NamespaceStore,
    name: &str,
    value: &crate::value::CimValue,
    kind: ElementKind,
) -> CimResult<()> {
    let decl = store.qualifiers.get(&name.to_ascii_lowercase()).ok_or_else(|| {
        CimError::InvalidParameter(format!("qualifier {name:?} has no declaration"))
    })?;
    decl.validate(value, kind)
        .map_err(CimError::InvalidParameter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::CIMProperty;
    use crate::datastore::ObjectStore;
    use crate::qualifier::{
        CIMQualifierDeclaration, QualifierFlavors, QualifierScopes, QUALIFIER_KEY,
    };
    use crate::value::{CimScalar, CimType, CimValue};

    fn store_with_key_qualifier() -> NamespaceStore {
        let mut store = NamespaceStore::default();
        store.qualifiers.create(
            "key",
            CIMQualifierDeclaration {
                name: QUALIFIER_KEY.into(),
                qualifier_type: CimType::Boolean,
                is_array: false,
                scopes: QualifierScopes {
                    property: true,
                    reference: true,
                    ..Default::default()
                },
                flavors: QualifierFlavors::default(),
                default: CimValue::Scalar(CimScalar::Boolean(false)),
            },
        );
        store
    }

    #[test]
    fn resolve_without_superclass_marks_local_origin() {
        let store = store_with_key_qualifier();
        let class = CIMClass::new("A").with_property(
            CIMProperty::new("Id", CimType::String, false)
                .with_qualifier("Key", CimValue::Scalar(CimScalar::Boolean(true))),
        );
        let resolved = resolve_class(&store, &class).unwrap();
        let prop = resolved.properties.get("Id").unwrap();
        assert_eq!(prop.class_origin.as_deref(), Some("A"));
        assert!(!prop.propagated);
    }

    #[test]
    fn resolve_inherits_and_marks_propagated() {
        let mut store = store_with_key_qualifier();
        let a = CIMClass::new("A").with_property(
            CIMProperty::new("Id", CimType::String, false)
                .with_qualifier("Key", CimValue::Scalar(CimScalar::Boolean(true))),
        );
        let resolved_a = resolve_class(&store, &a).unwrap();
        store.classes.create("a", resolved_a);

        let b = CIMClass::new("B")
            .with_superclass("A")
            .with_property(CIMProperty::new("Extra", CimType::Uint32, false));
        let resolved_b = resolve_class(&store, &b).unwrap();

        let id_prop = resolved_b.properties.get("Id").unwrap();
        assert!(id_prop.propagated);
        assert_eq!(id_prop.class_origin.as_deref(), Some("A"));

        let extra_prop = resolved_b.properties.get("Extra").unwrap();
        assert!(!extra_prop.propagated);
        assert_eq!(extra_prop.class_origin.as_deref(), Some("B"));
    }

    #[test]
    fn resolve_missing_superclass_fails() {
        let store = store_with_key_qualifier();
        let b = CIMClass::new("B").with_superclass("Ghost");
        let err = resolve_class(&store, &b).unwrap_err();
        assert!(matches!(err, CimError::InvalidSuperclass(_)));
    }

    #[test]
    fn resolve_rejects_undeclared_qualifier() {
        let store = NamespaceStore::default();
        let class = CIMClass::new("A").with_qualifier(
            "Description",
            CimValue::Scalar(CimScalar::String("hi".into())),
        );
        let err = resolve_class(&store, &class).unwrap_err();
        assert!(matches!(err, CimError::InvalidParameter(_)));
    }
}
