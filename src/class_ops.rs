//! Class operations (§4.4): enumeration, get, create, delete; shared
//! superclass/subclass walks and class shaping.

use crate::class::CIMClass;
use crate::datastore::{Datastore, ObjectStore};
use crate::errors::{CimError, CimResult};
use crate::namespace::require_namespace;
use crate::schema::resolve_class;
use std::collections::HashSet;

/// Walk `superclass` pointers from `classname` to the root, ordered
/// root→self (inclusive of `classname` only if `include_self`).
pub fn superclass_chain(
    ds: &Datastore,
    ns: &str,
    classname: &str,
    include_self: bool,
) -> CimResult<Vec<String>> {
    require_namespace(ds, ns)?;
    let mut chain = Vec::new();
    let mut current = Some(classname.to_string());
    let mut first = true;
    while let Some(name) = current {
        let class = get_class_raw(ds, ns, &name)?;
        if !first || include_self {
            chain.push(class.classname.clone());
        }
        first = false;
        current = class.superclass.clone();
    }
    chain.reverse();
    Ok(chain)
}

/// One-level or transitive-closure subclass names of `classname`
/// (case-insensitive), optionally including `classname` itself. With
/// `classname = None`, returns namespace roots (classes with no
/// superclass).
pub fn subclass_names(
    ds: &Datastore,
    ns: &str,
    classname: Option<&str>,
    deep: bool,
) -> CimResult<Vec<String>> {
    require_namespace(ds, ns)?;
    let all = ds
        .read_namespace(ns, |store| store.classes.iter_values())
        .unwrap_or_default();

    let direct_children = |parent_lower: Option<&str>| -> Vec<String> {
        all.iter()
            .filter(|c| match (&c.superclass, parent_lower) {
                (None, None) => true,
                (Some(sup), Some(p)) => sup.eq_ignore_ascii_case(p),
                _ => false,
            })
            .map(|c| c.classname.clone())
            .collect()
    };

    if !deep {
        return Ok(direct_children(classname));
    }

    let mut result = Vec::new();
    let mut frontier = direct_children(classname);
    let mut seen: HashSet<String> = HashSet::new();
    while let Some(name) = frontier.pop() {
        if !seen.insert(name.to_ascii_lowercase()) {
            continue;
        }
        result.push(name.clone());
        frontier.extend(direct_children(Some(&name)));
    }
    Ok(result)
}

/// The transitive closure of `classname`'s subclasses plus `classname`
/// itself, used by DeleteClass and instance enumeration.
pub fn closed_subclass_set(ds: &Datastore, ns: &str, classname: &str) -> CimResult<Vec<String>> {
    let class = get_class_raw(ds, ns, classname)?;
    let mut set = subclass_names(ds, ns, Some(classname), true)?;
    set.push(class.classname);
    Ok(set)
}

pub(crate) fn get_class_raw(ds: &Datastore, ns: &str, classname: &str) -> CimResult<CIMClass> {
    require_namespace(ds, ns)?;
    ds.read_namespace(ns, |store| store.classes.get(&classname.to_ascii_lowercase()))
        .flatten()
        .ok_or_else(|| CimError::InvalidClass(format!("class {classname:?} not found")))
}

/// `GetClass(ns, className, ...)` (§4.4).
pub fn get_class(
    ds: &Datastore,
    ns: &str,
    classname: &str,
    local_only: bool,
    include_qualifiers: bool,
    include_class_origin: bool,
    property_list: Option<&[String]>,
) -> CimResult<CIMClass> {
    let class = get_class_raw(ds, ns, classname)?;
    Ok(class.shaped(local_only, property_list, include_qualifiers, include_class_origin))
}

/// `EnumerateClasses(ns, className?, deepInheritance?, ...)` (§4.4).
///
/// `deepInheritance` defaults to `false` per DSP0200.
#[allow(clippy::too_many_arguments)]
pub fn enumerate_classes(
    ds: &Datastore,
    ns: &str,
    classname: Option<&str>,
    deep_inheritance: bool,
    local_only: bool,
    include_qualifiers: bool,
    include_class_origin: bool,
) -> CimResult<Vec<CIMClass>> {
    require_namespace(ds, ns)?;
    if let Some(name) = classname {
        get_class_raw(ds, ns, name)?;
    }
    let names = subclass_names(ds, ns, classname, deep_inheritance)?;
    names
        .into_iter()
        .map(|name| get_class(ds, ns, &name, local_only, include_qualifiers, include_class_origin, None))
        .collect()
}

/// `EnumerateClassNames(ns, className?, deepInheritance?)` (§4.4).
pub fn enumerate_class_names(
    ds: &Datastore,
    ns: &str,
    classname: Option<&str>,
    deep_inheritance: bool,
) -> CimResult<Vec<String>> {
    require_namespace(ds, ns)?;
    if let Some(name) = classname {
        get_class_raw(ds, ns, name)?;
    }
    subclass_names(ds, ns, classname, deep_inheritance)
}

/// `CreateClass(ns, newClass)` (§4.4).
pub fn create_class(ds: &Datastore, ns: &str, new_class: &CIMClass) -> CimResult<()> {
    require_namespace(ds, ns)?;
    let key = new_class.classname.to_ascii_lowercase();
    if ds.read_namespace(ns, |store| store.classes.exists(&key)).unwrap_or(false) {
        return Err(CimError::AlreadyExists(format!(
            "class {:?} already exists",
            new_class.classname
        )));
    }
    let resolved = ds
        .read_namespace(ns, |store| resolve_class(store, new_class))
        .unwrap()?;
    ds.write_namespace(ns, |store| store.classes.create(&key, resolved));
    Ok(())
}

/// `ModifyClass` — explicitly unsupported (§4.4).
pub fn modify_class() -> CimResult<()> {
    Err(CimError::NotSupported("ModifyClass is not supported".into()))
}

/// `DeleteClass(ns, className)` (§4.4).
///
/// Deletes every instance whose class falls in the deep subclass set,
/// then deletes classes in descending-depth order. Referential
/// integrity across reference properties is intentionally not enforced.
pub fn delete_class(ds: &Datastore, ns: &str, classname: &str) -> CimResult<()> {
    require_namespace(ds, ns)?;
    let key = classname.to_ascii_lowercase();
    if !ds.read_namespace(ns, |store| store.classes.exists(&key)).unwrap_or(false) {
        return Err(CimError::NotFound(format!("class {classname:?} not found")));
    }
    let doomed_classes = closed_subclass_set(ds, ns, classname)?;
    let doomed_lower: HashSet<String> = doomed_classes.iter().map(|c| c.to_ascii_lowercase()).collect();

    // Order classes by descending depth so children are removed before
    // their ancestors.
    let mut depths: Vec<(String, usize)> = Vec::new();
    for name in &doomed_classes {
        let depth = superclass_chain(ds, ns, name, true)?.len();
        depths.push((name.clone(), depth));
    }
    depths.sort_by(|a, b| b.1.cmp(&a.1));

    ds.write_namespace(ns, |store| {
        let instance_keys: Vec<String> = store
            .instances
            .iter_values()
            .into_iter()
            .filter(|inst| doomed_lower.contains(&inst.classname.to_ascii_lowercase()))
            .map(|inst| inst.path.canonical_key())
            .collect();
        for key in instance_keys {
            store.instances.delete(&key);
        }
        for (name, _) in &depths {
            store.classes.delete(&name.to_ascii_lowercase());
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::CIMProperty;
    use crate::value::CimType;

    fn setup_abc(ds: &Datastore, ns: &str) {
        ds.add_namespace(ns).unwrap();
        create_class(ds, ns, &CIMClass::new("A")).unwrap();
        create_class(ds, ns, &CIMClass::new("B").with_superclass("A")).unwrap();
        create_class(ds, ns, &CIMClass::new("C").with_superclass("B")).unwrap();
    }

    #[test]
    fn create_class_rejects_duplicate() {
        let ds = Datastore::new();
        setup_abc(&ds, "root/cimv2");
        let err = create_class(&ds, "root/cimv2", &CIMClass::new("A")).unwrap_err();
        assert!(matches!(err, CimError::AlreadyExists(_)));
    }

    #[test]
    fn enumerate_classes_default_shallow() {
        let ds = Datastore::new();
        setup_abc(&ds, "root/cimv2");
        let names = enumerate_class_names(&ds, "root/cimv2", Some("A"), false).unwrap();
        assert_eq!(names, vec!["B".to_string()]);
        let deep = enumerate_class_names(&ds, "root/cimv2", Some("A"), true).unwrap();
        assert_eq!(deep.len(), 2);
    }

    #[test]
    fn enumerate_roots_when_classname_absent() {
        let ds = Datastore::new();
        setup_abc(&ds, "root/cimv2");
        create_class(&ds, "root/cimv2", &CIMClass::new("Z")).unwrap();
        let mut roots = enumerate_class_names(&ds, "root/cimv2", None, false).unwrap();
        roots.sort();
        assert_eq!(roots, vec!["A".to_string(), "Z".to_string()]);
    }

    #[test]
    fn get_class_local_only_drops_inherited() {
        let ds = Datastore::new();
        ds.add_namespace("root/cimv2").unwrap();
        create_class(&ds, "root/cimv2", &CIMClass::new("A").with_property(CIMProperty::new("p", CimType::Uint32, false))).unwrap();
        create_class(&ds, "root/cimv2", &CIMClass::new("B").with_superclass("A")).unwrap();

        let local = get_class(&ds, "root/cimv2", "B", true, true, true, None).unwrap();
        assert!(!local.properties.contains_key("p"));
        let full = get_class(&ds, "root/cimv2", "B", false, true, true, None).unwrap();
        assert!(full.properties.contains_key("p"));
    }

    #[test]
    fn delete_class_removes_descendants() {
        let ds = Datastore::new();
        setup_abc(&ds, "root/cimv2");
        delete_class(&ds, "root/cimv2", "A").unwrap();
        assert!(get_class(&ds, "root/cimv2", "A", false, true, true, None).is_err());
        assert!(get_class(&ds, "root/cimv2", "B", false, true, true, None).is_err());
        assert!(get_class(&ds, "root/cimv2", "C", false, true, true, None).is_err());
    }

    #[test]
    fn delete_class_missing_target_fails_not_found() {
        let ds = Datastore::new();
        ds.add_namespace("root/cimv2").unwrap();
        let err = delete_class(&ds, "root/cimv2", "Ghost").unwrap_err();
        assert!(matches!(err, CimError::NotFound(_)));
    }
}
