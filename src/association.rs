//! The association engine (§4.7): reference/associator traversal at
//! both the class and instance level.

use crate::class::CIMClass;
use crate::class_ops::{closed_subclass_set, get_class, get_class_raw, superclass_chain};
use crate::datastore::{Datastore, ObjectStore};
use crate::errors::{CimError, CimResult};
use crate::instance::{CIMInstance, CIMInstanceName};
use crate::namespace::require_namespace;
use std::collections::{HashMap, HashSet};

/// A class-name reference, as returned alongside shaped class bodies by
/// References/Associators over class-level objects (§4.7.5).
#[derive(Debug, Clone, PartialEq)]
pub struct CIMClassNameRef {
    /// The referenced class's name.
    pub classname: String,
    /// Namespace of the reference, if resolved.
    pub namespace: Option<String>,
    /// Host identity of the reference.
    pub host: Option<String>,
}

/// Either a class name or an instance path, the two shapes `objectName`
/// can take for Reference*/Associator* operations (§4.7.5).
#[derive(Debug, Clone)]
pub enum ObjectRef {
    /// A class-level request, naming the class.
    Class(String),
    /// An instance-level request, naming a concrete instance.
    Instance(CIMInstanceName),
}

/// The shape of a paths-only result: either class names or instance
/// paths, depending on which shape `objectName` took.
#[derive(Debug, Clone)]
pub enum AssociationNames {
    /// Instance paths, host-filled (§4.7.5).
    Instances(Vec<CIMInstanceName>),
    /// Class-name references.
    Classes(Vec<CIMClassNameRef>),
}

/// The shape of a full-object result: either instances or
/// `(classname-ref, shaped class)` pairs (§4.7.5).
#[derive(Debug, Clone)]
pub enum AssociationObjects {
    /// Instances, host-filled.
    Instances(Vec<CIMInstance>),
    /// Class-name/shaped-class pairs.
    Classes(Vec<(CIMClassNameRef, CIMClass)>),
}

fn class_exists(ds: &Datastore, ns: &str, name: &str) -> bool {
    ds.read_namespace(ns, |store| store.classes.exists(&name.to_ascii_lowercase()))
        .unwrap_or(false)
}

/// Require a class to exist, mapping absence to `INVALID_PARAMETER`
/// rather than `INVALID_CLASS`: association operations treat a missing
/// target/assoc/result class as a bad parameter (§4.7.5).
fn require_class_param(ds: &Datastore, ns: &str, name: &str, what: &str) -> CimResult<()> {
    if class_exists(ds, ns, name) {
        Ok(())
    } else {
        Err(CimError::InvalidParameter(format!(
            "{what} class {name:?} does not exist in namespace {ns:?}"
        )))
    }
}

fn ancestor_chain_lower(ds: &Datastore, ns: &str, classname: &str) -> CimResult<HashSet<String>> {
    Ok(superclass_chain(ds, ns, classname, true)?
        .into_iter()
        .map(|n| n.to_ascii_lowercase())
        .collect())
}

fn descendant_set_lower(
    ds: &Datastore,
    ns: &str,
    classname: Option<&str>,
) -> CimResult<HashSet<String>> {
    match classname {
        None => Ok(HashSet::new()),
        Some(name) => Ok(closed_subclass_set(ds, ns, name)?
            .into_iter()
            .map(|n| n.to_ascii_lowercase())
            .collect()),
    }
}

/// All association classes declared in a namespace.
fn association_classes(ds: &Datastore, ns: &str) -> Vec<CIMClass> {
    ds.read_namespace(ns, |store| store.classes.iter_values())
        .unwrap_or_default()
        .into_iter()
        .filter(|c| c.is_association())
        .collect()
}

/// §4.7.1: class-level reference class names.
pub fn class_level_reference_classnames(
    ds: &Datastore,
    ns: &str,
    target_class: &str,
    result_class: Option<&str>,
    role: Option<&str>,
) -> CimResult<Vec<String>> {
    require_namespace(ds, ns)?;
    require_class_param(ds, ns, target_class, "target")?;
    if let Some(rc) = result_class {
        require_class_param(ds, ns, rc, "result")?;
    }

    let target_chain = ancestor_chain_lower(ds, ns, target_class)?;
    let result_set = descendant_set_lower(ds, ns, result_class)?;

    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for assoc in association_classes(ds, ns) {
        for prop in assoc.reference_properties() {
            let ref_class_lower = prop
                .value_type
                .reference_class()
                .map(|s| s.to_ascii_lowercase())
                .unwrap_or_default();
            let matches_target = target_chain.contains(&ref_class_lower);
            let matches_result = result_set.is_empty()
                || result_set.contains(&assoc.classname.to_ascii_lowercase());
            let matches_role = role
                .map(|r| prop.name.eq_ignore_ascii_case(r))
                .unwrap_or(true);
            if matches_target && matches_result && matches_role {
                let lower = assoc.classname.to_ascii_lowercase();
                if seen.insert(lower) {
                    out.push(assoc.classname.clone());
                }
            }
        }
    }
    Ok(out)
}

/// §4.7.2: instance-level reference instances (the association
/// instances linking to `target`), before extracting just their paths.
fn instance_level_reference_instances(
    ds: &Datastore,
    ns: &str,
    target: &CIMInstanceName,
    result_class: Option<&str>,
    role: Option<&str>,
) -> CimResult<Vec<CIMInstance>> {
    require_namespace(ds, ns)?;
    if let Some(rc) = result_class {
        require_class_param(ds, ns, rc, "result")?;
    }
    let result_set = descendant_set_lower(ds, ns, result_class)?;

    let all = ds
        .read_namespace(ns, |store| store.instances.iter_values())
        .unwrap_or_default();

    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for instance in all {
        let owning_class = get_class_raw(ds, ns, &instance.classname)?;
        for prop in owning_class.reference_properties() {
            let matches_role = role.map(|r| prop.name.eq_ignore_ascii_case(r)).unwrap_or(true);
            if !matches_role {
                continue;
            }
            let referenced = instance
                .properties
                .get(&prop.name)
                .and_then(|v| v.as_reference());
            if let Some(path) = referenced {
                if path.matches(target) {
                    let matches_result = result_set.is_empty()
                        || result_set.contains(&instance.classname.to_ascii_lowercase());
                    if matches_result {
                        let key = instance.path.canonical_key();
                        if seen.insert(key) {
                            out.push(instance.clone());
                        }
                    }
                }
            }
        }
    }
    Ok(out)
}

/// §4.7.2: instance-level reference paths.
pub fn instance_level_reference_paths(
    ds: &Datastore,
    ns: &str,
    target: &CIMInstanceName,
    result_class: Option<&str>,
    role: Option<&str>,
) -> CimResult<Vec<CIMInstanceName>> {
    Ok(instance_level_reference_instances(ds, ns, target, result_class, role)?
        .into_iter()
        .map(|inst| inst.path)
        .collect())
}

/// §4.7.3: class-level associated class names.
pub fn class_level_associated_classnames(
    ds: &Datastore,
    ns: &str,
    target_class: &str,
    assoc_class: Option<&str>,
    result_class: Option<&str>,
    role: Option<&str>,
    result_role: Option<&str>,
) -> CimResult<Vec<String>> {
    require_namespace(ds, ns)?;
    require_class_param(ds, ns, target_class, "target")?;
    if let Some(ac) = assoc_class {
        require_class_param(ds, ns, ac, "assoc")?;
    }
    if let Some(rc) = result_class {
        require_class_param(ds, ns, rc, "result")?;
    }

    let ref_classnames =
        class_level_reference_classnames(ds, ns, target_class, assoc_class, role)?;
    let assoc_set = descendant_set_lower(ds, ns, assoc_class)?;
    let result_set = descendant_set_lower(ds, ns, result_class)?;
    let target_lower = target_class.to_ascii_lowercase();

    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for assoc_name in ref_classnames {
        let assoc = get_class_raw(ds, ns, &assoc_name)?;
        if !assoc_set.is_empty() && !assoc_set.contains(&assoc.classname.to_ascii_lowercase()) {
            continue;
        }

        let mut counts: HashMap<String, usize> = HashMap::new();
        for prop in assoc.reference_properties() {
            if let Some(rc) = prop.value_type.reference_class() {
                *counts.entry(rc.to_ascii_lowercase()).or_insert(0) += 1;
            }
        }

        for prop in assoc.reference_properties() {
            let ref_class = match prop.value_type.reference_class() {
                Some(rc) => rc.to_string(),
                None => continue,
            };
            let ref_class_lower = ref_class.to_ascii_lowercase();

            if ref_class_lower == target_lower
                && counts.get(&target_lower).copied().unwrap_or(0) == 1
            {
                continue;
            }

            let matches_result = result_set.is_empty() || result_set.contains(&ref_class_lower);
            let matches_result_role = result_role
                .map(|r| prop.name.eq_ignore_ascii_case(r))
                .unwrap_or(true);
            if matches_result && matches_result_role && seen.insert(ref_class_lower) {
                out.push(ref_class);
            }
        }
    }
    Ok(out)
}

/// §4.7.4: instance-level associated instance paths.
pub fn instance_level_associated_paths(
    ds: &Datastore,
    ns: &str,
    target: &CIMInstanceName,
    assoc_class: Option<&str>,
    result_class: Option<&str>,
    role: Option<&str>,
    result_role: Option<&str>,
) -> CimResult<Vec<CIMInstanceName>> {
    require_namespace(ds, ns)?;
    if let Some(ac) = assoc_class {
        require_class_param(ds, ns, ac, "assoc")?;
    }
    if let Some(rc) = result_class {
        require_class_param(ds, ns, rc, "result")?;
    }
    let result_set = descendant_set_lower(ds, ns, result_class)?;

    let ref_instances =
        instance_level_reference_instances(ds, ns, target, assoc_class, role)?;

    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for assoc_inst in ref_instances {
        let owning_class = get_class_raw(ds, ns, &assoc_inst.classname)?;
        for prop in owning_class.reference_properties() {
            let value = match assoc_inst
                .properties
                .get(&prop.name)
                .and_then(|v| v.as_reference())
            {
                Some(path) => path,
                None => continue,
            };
            if value.matches(target) {
                continue;
            }
            let matches_result =
                result_set.is_empty() || result_set.contains(&value.classname.to_ascii_lowercase());
            let matches_result_role = result_role
                .map(|r| prop.name.eq_ignore_ascii_case(r))
                .unwrap_or(true);
            if matches_result && matches_result_role {
                let key = value.canonical_key();
                if seen.insert(key) {
                    out.push(value.clone());
                }
            }
        }
    }
    Ok(out)
}

fn fill_host(mut path: CIMInstanceName, host: &str) -> CIMInstanceName {
    if path.host.is_none() {
        path.host = Some(host.to_string());
    }
    path
}

/// `ReferenceNames` (§4.7.5): dispatches on whether `object` is a class
/// name or an instance name.
pub fn reference_names(
    ds: &Datastore,
    ns: &str,
    object: &ObjectRef,
    result_class: Option<&str>,
    role: Option<&str>,
    host: &str,
) -> CimResult<AssociationNames> {
    match object {
        ObjectRef::Class(classname) => {
            let names = class_level_reference_classnames(ds, ns, classname, result_class, role)?;
            Ok(AssociationNames::Classes(
                names
                    .into_iter()
                    .map(|classname| CIMClassNameRef {
                        classname,
                        namespace: Some(ns.to_string()),
                        host: Some(host.to_string()),
                    })
                    .collect(),
            ))
        }
        ObjectRef::Instance(path) => {
            let paths = instance_level_reference_paths(ds, ns, path, result_class, role)?;
            Ok(AssociationNames::Instances(
                paths.into_iter().map(|p| fill_host(p, host)).collect(),
            ))
        }
    }
}

/// `References` (§4.7.5): like `reference_names` but returns shaped full
/// objects.
#[allow(clippy::too_many_arguments)]
pub fn references(
    ds: &Datastore,
    ns: &str,
    object: &ObjectRef,
    result_class: Option<&str>,
    role: Option<&str>,
    include_qualifiers: bool,
    include_class_origin: bool,
    property_list: Option<&[String]>,
    host: &str,
) -> CimResult<AssociationObjects> {
    match object {
        ObjectRef::Class(classname) => {
            let names = class_level_reference_classnames(ds, ns, classname, result_class, role)?;
            let mut out = Vec::new();
            for name in names {
                let class = get_class(ds, ns, &name, false, include_qualifiers, include_class_origin, property_list)?;
                out.push((
                    CIMClassNameRef {
                        classname: name,
                        namespace: Some(ns.to_string()),
                        host: Some(host.to_string()),
                    },
                    class,
                ));
            }
            Ok(AssociationObjects::Classes(out))
        }
        ObjectRef::Instance(path) => {
            let instances = instance_level_reference_instances(ds, ns, path, result_class, role)?;
            let mut out = Vec::new();
            for mut inst in instances {
                inst.path = fill_host(inst.path.clone(), host);
                out.push(inst);
            }
            Ok(AssociationObjects::Instances(out))
        }
    }
}

/// `AssociatorNames` (§4.7.5).
#[allow(clippy::too_many_arguments)]
pub fn associator_names(
    ds: &Datastore,
    ns: &str,
    object: &ObjectRef,
    assoc_class: Option<&str>,
    result_class: Option<&str>,
    role: Option<&str>,
    result_role: Option<&str>,
    host: &str,
) -> CimResult<AssociationNames> {
    match object {
        ObjectRef::Class(classname) => {
            let names = class_level_associated_classnames(
                ds,
                ns,
                classname,
                assoc_class,
                result_class,
                role,
                result_role,
            )?;
            Ok(AssociationNames::Classes(
                names
                    .into_iter()
                    .map(|classname| CIMClassNameRef {
                        classname,
                        namespace: Some(ns.to_string()),
                        host: Some(host.to_string()),
                    })
                    .collect(),
            ))
        }
        ObjectRef::Instance(path) => {
            let paths = instance_level_associated_paths(
                ds,
                ns,
                path,
                assoc_class,
                result_class,
                role,
                result_role,
            )?;
            Ok(AssociationNames::Instances(
                paths.into_iter().map(|p| fill_host(p, host)).collect(),
            ))
        }
    }
}

/// `Associators` (§4.7.5).
#[allow(clippy::too_many_arguments)]
pub fn associators(
    ds: &Datastore,
    ns: &str,
    object: &ObjectRef,
    assoc_class: Option<&str>,
    result_class: Option<&str>,
    role: Option<&str>,
    result_role: Option<&str>,
    include_qualifiers: bool,
    include_class_origin: bool,
    property_list: Option<&[String]>,
    host: &str,
) -> CimResult<AssociationObjects> {
    match object {
        ObjectRef::Class(classname) => {
            let names = class_level_associated_classnames(
                ds,
                ns,
                classname,
                assoc_class,
                result_class,
                role,
                result_role,
            )?;
            let mut out = Vec::new();
            for name in names {
                let class = get_class(ds, ns, &name, false, include_qualifiers, include_class_origin, property_list)?;
                out.push((
                    CIMClassNameRef {
                        classname: name,
                        namespace: Some(ns.to_string()),
                        host: Some(host.to_string()),
                    },
                    class,
                ));
            }
            Ok(AssociationObjects::Classes(out))
        }
        ObjectRef::Instance(path) => {
            let paths = instance_level_associated_paths(
                ds,
                ns,
                path,
                assoc_class,
                result_class,
                role,
                result_role,
            )?;
            let mut out = Vec::new();
            for p in paths {
                let mut inst = crate::instance_ops::get_instance(
                    ds,
                    ns,
                    &p,
                    false,
                    include_qualifiers,
                    include_class_origin,
                    property_list,
                )?;
                inst.path = fill_host(inst.path.clone(), host);
                out.push(inst);
            }
            Ok(AssociationObjects::Instances(out))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::CIMProperty;
    use crate::class_ops::create_class;
    use crate::instance_ops::create_instance;
    use crate::qualifier::{CIMQualifierDeclaration, QualifierScopes, QualifierFlavors};
    use crate::value::{CimScalar, CimType, CimValue};

    fn setup_association_fixture(ds: &Datastore, ns: &str) {
        ds.add_namespace(ns).unwrap();
        ds.write_namespace(ns, |store| {
            for q in ["Key", "Association"] {
                store.qualifiers.create(
                    &q.to_ascii_lowercase(),
                    CIMQualifierDeclaration {
                        name: q.into(),
                        qualifier_type: CimType::Boolean,
                        is_array: false,
                        scopes: QualifierScopes::any(),
                        flavors: QualifierFlavors::default(),
                        default: CimValue::Scalar(CimScalar::Boolean(false)),
                    },
                );
            }
        });

        let key_true = || CimValue::Scalar(CimScalar::Boolean(true));

        create_class(
            ds,
            ns,
            &CIMClass::new("CIM_A")
                .with_property(CIMProperty::new("Id", CimType::Uint32, false).with_qualifier("Key", key_true())),
        )
        .unwrap();
        create_class(
            ds,
            ns,
            &CIMClass::new("CIM_B")
                .with_property(CIMProperty::new("Id", CimType::Uint32, false).with_qualifier("Key", key_true())),
        )
        .unwrap();
        create_class(
            ds,
            ns,
            &CIMClass::new("CIM_AtoB")
                .with_qualifier("Association", key_true())
                .with_property(
                    CIMProperty::new(
                        "left",
                        CimType::Reference {
                            reference_class: "CIM_A".into(),
                        },
                        false,
                    )
                    .with_qualifier("Key", key_true()),
                )
                .with_property(
                    CIMProperty::new(
                        "right",
                        CimType::Reference {
                            reference_class: "CIM_B".into(),
                        },
                        false,
                    )
                    .with_qualifier("Key", key_true()),
                ),
        )
        .unwrap();

        let a1 = create_instance(
            ds,
            ns,
            &CIMInstance::new("CIM_A").with_property("Id", CimValue::Scalar(CimScalar::Uint32(1))),
        )
        .unwrap();
        let b1 = create_instance(
            ds,
            ns,
            &CIMInstance::new("CIM_B").with_property("Id", CimValue::Scalar(CimScalar::Uint32(1))),
        )
        .unwrap();
        create_instance(
            ds,
            ns,
            &CIMInstance::new("CIM_AtoB")
                .with_property("left", CimValue::Scalar(CimScalar::Reference(Box::new(a1))))
                .with_property("right", CimValue::Scalar(CimScalar::Reference(Box::new(b1)))),
        )
        .unwrap();
    }

    #[test]
    fn associator_names_basic_traversal() {
        let ds = Datastore::new();
        setup_association_fixture(&ds, "root/cimv2");
        let a1 = CIMInstanceName::new("CIM_A").with_key("Id", CimValue::Scalar(CimScalar::Uint32(1)));

        let result = associator_names(
            &ds,
            "root/cimv2",
            &ObjectRef::Instance(a1.clone()),
            None,
            None,
            None,
            None,
            "localhost",
        )
        .unwrap();
        match result {
            AssociationNames::Instances(paths) => {
                assert_eq!(paths.len(), 1);
                assert_eq!(paths[0].classname, "CIM_B");
            }
            _ => panic!("expected instance paths"),
        }
    }

    #[test]
    fn associator_names_result_class_excludes_self() {
        let ds = Datastore::new();
        setup_association_fixture(&ds, "root/cimv2");
        let a1 = CIMInstanceName::new("CIM_A").with_key("Id", CimValue::Scalar(CimScalar::Uint32(1)));

        let result = associator_names(
            &ds,
            "root/cimv2",
            &ObjectRef::Instance(a1.clone()),
            None,
            Some("CIM_A"),
            None,
            None,
            "localhost",
        )
        .unwrap();
        match result {
            AssociationNames::Instances(paths) => assert!(paths.is_empty()),
            _ => panic!("expected instance paths"),
        }
    }

    #[test]
    fn associator_names_role_filters() {
        let ds = Datastore::new();
        setup_association_fixture(&ds, "root/cimv2");
        let a1 = CIMInstanceName::new("CIM_A").with_key("Id", CimValue::Scalar(CimScalar::Uint32(1)));

        let matching = associator_names(
            &ds,
            "root/cimv2",
            &ObjectRef::Instance(a1.clone()),
            None,
            None,
            Some("left"),
            Some("right"),
            "localhost",
        )
        .unwrap();
        match matching {
            AssociationNames::Instances(paths) => assert_eq!(paths.len(), 1),
            _ => panic!(),
        }

        let reversed = associator_names(
            &ds,
            "root/cimv2",
            &ObjectRef::Instance(a1),
            None,
            None,
            Some("right"),
            Some("left"),
            "localhost",
        )
        .unwrap();
        match reversed {
            AssociationNames::Instances(paths) => assert!(paths.is_empty()),
            _ => panic!(),
        }
    }

    #[test]
    fn missing_target_class_is_invalid_parameter() {
        let ds = Datastore::new();
        setup_association_fixture(&ds, "root/cimv2");
        let err = class_level_reference_classnames(&ds, "root/cimv2", "CIM_Ghost", None, None)
            .unwrap_err();
        assert!(matches!(err, CimError::InvalidParameter(_)));
    }
}
