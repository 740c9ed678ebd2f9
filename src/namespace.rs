//! Namespace validation and lifecycle (§4.2)

use crate::datastore::Datastore;
use crate::errors::{CimError, CimResult};

/// Validate a namespace name, failing `INVALID_NAMESPACE` if empty.
///
/// This does not check existence in a particular datastore; callers
/// combine it with a catalog lookup where presence matters.
pub fn validate_namespace_name(ns: &str) -> CimResult<()> {
    if ns.trim_matches('/').is_empty() {
        return Err(CimError::InvalidNamespace(format!(
            "namespace name {ns:?} is empty"
        )));
    }
    Ok(())
}

/// Strip leading/trailing `/` from a namespace name, as `addNamespace`
/// does before storing it (§4.2).
pub fn normalize_namespace_name(ns: &str) -> String {
    ns.trim_matches('/').to_string()
}

/// Fail `INVALID_NAMESPACE` unless `ns` names a namespace already
/// present in `ds`'s catalog. Every class/instance/qualifier/association
/// operation calls this before touching a namespace's stores, so it
/// lives here rather than being re-implemented per module.
pub fn require_namespace(ds: &Datastore, ns: &str) -> CimResult<()> {
    if ds.namespace_exists(ns) {
        Ok(())
    } else {
        Err(CimError::InvalidNamespace(format!(
            "namespace {ns:?} does not exist"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_slashes() {
        assert_eq!(normalize_namespace_name("/root/test/"), "root/test");
        assert_eq!(normalize_namespace_name("root/test"), "root/test");
    }

    #[test]
    fn validate_rejects_empty() {
        assert!(validate_namespace_name("").is_err());
        assert!(validate_namespace_name("///").is_err());
        assert!(validate_namespace_name("root").is_ok());
    }

    #[test]
    fn require_namespace_checks_catalog() {
        let ds = Datastore::new();
        assert!(require_namespace(&ds, "root/cimv2").is_err());
        ds.add_namespace("root/cimv2").unwrap();
        assert!(require_namespace(&ds, "root/cimv2").is_ok());
    }
}
