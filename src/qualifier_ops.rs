//! Qualifier declaration operations (§4.6).

use crate::datastore::{Datastore, ObjectStore};
use crate::errors::{CimError, CimResult};
use crate::namespace::require_namespace;
use crate::qualifier::CIMQualifierDeclaration;

/// `EnumerateQualifiers(ns)` (§4.6).
pub fn enumerate_qualifiers(ds: &Datastore, ns: &str) -> CimResult<Vec<CIMQualifierDeclaration>> {
    require_namespace(ds, ns)?;
    Ok(ds
        .read_namespace(ns, |store| store.qualifiers.iter_values())
        .unwrap_or_default())
}

/// `GetQualifier(ns, name)` (§4.6).
pub fn get_qualifier(ds: &Datastore, ns: &str, name: &str) -> CimResult<CIMQualifierDeclaration> {
    require_namespace(ds, ns)?;
    ds.read_namespace(ns, |store| store.qualifiers.get(&name.to_ascii_lowercase()))
        .flatten()
        .ok_or_else(|| CimError::NotFound(format!("qualifier {name:?} not found")))
}

/// `SetQualifier(ns, decl)` (§4.6): create if absent, replace if present.
pub fn set_qualifier(ds: &Datastore, ns: &str, decl: CIMQualifierDeclaration) -> CimResult<()> {
    require_namespace(ds, ns)?;
    let key = decl.name.to_ascii_lowercase();
    let applied = ds
        .write_namespace(ns, |store| {
            if store.qualifiers.create(&key, decl.clone()) {
                true
            } else {
                store.qualifiers.update(&key, decl.clone())
            }
        })
        .unwrap_or(false);
    if applied {
        Ok(())
    } else {
        Err(CimError::Failed(format!(
            "could not set qualifier {:?}",
            decl.name
        )))
    }
}

/// `DeleteQualifier(ns, name)` (§4.6).
pub fn delete_qualifier(ds: &Datastore, ns: &str, name: &str) -> CimResult<()> {
    require_namespace(ds, ns)?;
    let key = name.to_ascii_lowercase();
    let deleted = ds
        .write_namespace(ns, |store| store.qualifiers.delete(&key))
        .unwrap_or(false);
    if deleted {
        Ok(())
    } else {
        Err(CimError::NotFound(format!("qualifier {name:?} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qualifier::{QualifierFlavors, QualifierScopes};
    use crate::value::{CimScalar, CimType, CimValue};

    fn sample_decl(name: &str) -> CIMQualifierDeclaration {
        CIMQualifierDeclaration {
            name: name.into(),
            qualifier_type: CimType::Boolean,
            is_array: false,
            scopes: QualifierScopes::any(),
            flavors: QualifierFlavors::default(),
            default: CimValue::Scalar(CimScalar::Boolean(false)),
        }
    }

    #[test]
    fn set_qualifier_is_idempotent() {
        let ds = Datastore::new();
        ds.add_namespace("root/cimv2").unwrap();
        set_qualifier(&ds, "root/cimv2", sample_decl("Key")).unwrap();
        set_qualifier(&ds, "root/cimv2", sample_decl("Key")).unwrap();
        let decls = enumerate_qualifiers(&ds, "root/cimv2").unwrap();
        assert_eq!(decls.len(), 1);
    }

    #[test]
    fn get_and_delete_qualifier() {
        let ds = Datastore::new();
        ds.add_namespace("root/cimv2").unwrap();
        set_qualifier(&ds, "root/cimv2", sample_decl("Key")).unwrap();
        assert!(get_qualifier(&ds, "root/cimv2", "key").is_ok());
        delete_qualifier(&ds, "root/cimv2", "KEY").unwrap();
        assert!(matches!(
            get_qualifier(&ds, "root/cimv2", "Key").unwrap_err(),
            CimError::NotFound(_)
        ));
        assert!(matches!(
            delete_qualifier(&ds, "root/cimv2", "Key").unwrap_err(),
            CimError::NotFound(_)
        ));
    }
}
