//! Instance operations (§4.5): create/get/modify/delete, enumeration,
//! and the namespace-creation side effect of `CreateInstance`.

use crate::case_map::dedup_case_insensitive;
use crate::class::CIMClass;
use crate::class_ops::{closed_subclass_set, get_class};
use crate::datastore::{Datastore, ObjectStore};
use crate::errors::{CimError, CimResult};
use crate::instance::{CIMInstance, CIMInstanceName};
use crate::namespace::require_namespace;
use crate::value::{CimScalar, CimValue};

/// Class names (case-insensitive) whose instance creation is special
/// cased as a namespace-creation request (§6).
const NAMESPACE_CREATION_CLASSES: [&str; 2] = ["pg_namespace", "cim_namespace"];

fn is_namespace_creation_class(classname: &str) -> bool {
    NAMESPACE_CREATION_CLASSES.contains(&classname.to_ascii_lowercase().as_str())
}

fn get_instance_raw(ds: &Datastore, ns: &str, path: &CIMInstanceName) -> CimResult<CIMInstance> {
    let key = path.canonical_key();
    ds.read_namespace(ns, |store| store.instances.get(&key))
        .flatten()
        .ok_or_else(|| CimError::NotFound(format!("instance {key:?} not found")))
}

/// Apply instance shaping (§4.5): `localOnly` drops properties whose
/// declaring ancestor differs from the instance's own class;
/// `propertyList` filters by name. `includeQualifiers`/
/// `includeClassOrigin` are accepted for API parity with the class
/// operations but have no observable effect: per §3, `CIMInstance`
/// carries neither per-property qualifiers nor a per-property class
/// origin in this data model.
pub fn shape_instance(
    instance: &CIMInstance,
    target_class: &CIMClass,
    local_only: bool,
    property_list: Option<&[String]>,
) -> CIMInstance {
    let mut out = instance.clone();

    if local_only {
        out.properties = out
            .properties
            .iter()
            .filter(|(name, _)| {
                target_class
                    .properties
                    .get(name)
                    .map(|p| {
                        p.class_origin
                            .as_deref()
                            .map(|origin| origin.eq_ignore_ascii_case(&instance.classname))
                            .unwrap_or(true)
                    })
                    .unwrap_or(true)
            })
            .map(|(name, v)| (name.to_string(), v.clone()))
            .collect();
    }

    if let Some(list) = property_list {
        let wanted: std::collections::HashSet<String> =
            list.iter().map(|n| n.to_ascii_lowercase()).collect();
        out.properties = out
            .properties
            .iter()
            .filter(|(name, _)| wanted.contains(&name.to_ascii_lowercase()))
            .map(|(name, v)| (name.to_string(), v.clone()))
            .collect();
    }

    out
}

/// `CreateInstance(ns, newInstance)` (§4.5).
///
/// Returns the newly stored instance's path.
pub fn create_instance(
    ds: &Datastore,
    ns: &str,
    new_instance: &CIMInstance,
) -> CimResult<CIMInstanceName> {
    require_namespace(ds, ns)?;

    let target_class = get_class(ds, ns, &new_instance.classname, false, true, true, None)
        .map_err(|_| {
            CimError::InvalidClass(format!(
                "cannot create instance: class {:?} does not exist in namespace {ns:?}",
                new_instance.classname
            ))
        })?;

    let mut instance = new_instance.clone();

    let mut pending_namespace: Option<String> = None;
    if is_namespace_creation_class(&instance.classname) {
        let name_value = instance.properties.get("Name").cloned().ok_or_else(|| {
            CimError::InvalidParameter(format!(
                "namespace creation via CreateInstance: missing 'Name' property in the {:?} instance",
                instance.classname
            ))
        })?;
        let raw_name = match &name_value {
            CimValue::Scalar(CimScalar::String(s)) => s.clone(),
            _ => {
                return Err(CimError::InvalidParameter(
                    "namespace creation 'Name' property must be a string".into(),
                ))
            }
        };
        let new_ns = raw_name.trim_matches('/').to_string();
        instance.properties.insert("Name", CimValue::Scalar(CimScalar::String(new_ns.clone())));

        let ns_classname = if new_instance.classname.eq_ignore_ascii_case("pg_namespace") {
            "PG_Namespace"
        } else {
            "CIM_Namespace"
        };
        instance.properties.insert(
            "CreationClassName",
            CimValue::Scalar(CimScalar::String(ns_classname.to_string())),
        );
        instance.properties.insert(
            "ObjectManagerName",
            CimValue::Scalar(CimScalar::String("MyFakeObjectManager".to_string())),
        );
        instance.properties.insert(
            "ObjectManagerCreationClassName",
            CimValue::Scalar(CimScalar::String("CIM_ObjectManager".to_string())),
        );
        instance.properties.insert(
            "SystemName",
            CimValue::Scalar(CimScalar::String("Mock_Test_WBEMServerTest".to_string())),
        );
        instance.properties.insert(
            "SystemCreationClassName",
            CimValue::Scalar(CimScalar::String("CIM_ComputerSystem".to_string())),
        );
        pending_namespace = Some(new_ns);
    }

    for key_name in target_class.key_property_names() {
        if instance.properties.get(&key_name).is_none() {
            return Err(CimError::InvalidParameter(format!(
                "key property {key_name:?} not in NewInstance"
            )));
        }
    }

    let mut normalized = CIMInstance::new(target_class.classname.clone());
    for (prop_name, value) in instance.properties.iter() {
        let class_prop = target_class.properties.get(prop_name).ok_or_else(|| {
            CimError::InvalidParameter(format!(
                "property {prop_name:?} not declared in class {:?}",
                target_class.classname
            ))
        })?;
        if !value.conforms_to(&class_prop.value_type, class_prop.is_array) {
            return Err(CimError::InvalidParameter(format!(
                "property {prop_name:?} type/array-ness does not match class declaration"
            )));
        }
        normalized
            .properties
            .insert(&class_prop.name, value.clone());
    }

    for (class_prop_name, class_prop) in target_class.properties.iter() {
        if !normalized.properties.contains_key(class_prop_name) {
            let default = class_prop.default_value.clone().unwrap_or(CimValue::Null);
            normalized.properties.insert(class_prop_name, default);
        }
    }

    normalized.rebuild_path(&target_class, ns);

    let existing = ds
        .read_namespace(ns, |store| store.instances.exists(&normalized.path.canonical_key()))
        .unwrap_or(false);
    if existing {
        return Err(CimError::AlreadyExists(format!(
            "instance {:?} already exists in namespace {ns:?}",
            normalized.path.canonical_key()
        )));
    }

    if let Some(new_ns) = &pending_namespace {
        ds.add_namespace(new_ns)?;
    }

    let key = normalized.path.canonical_key();
    ds.write_namespace(ns, |store| store.instances.create(&key, normalized.clone()));

    Ok(normalized.path.clone())
}

/// `GetInstance(ns, iname, ...)` (§4.5).
pub fn get_instance(
    ds: &Datastore,
    ns: &str,
    iname: &CIMInstanceName,
    local_only: bool,
    include_qualifiers: bool,
    include_class_origin: bool,
    property_list: Option<&[String]>,
) -> CimResult<CIMInstance> {
    let _ = (include_qualifiers, include_class_origin);
    check_path_namespace(ns, iname)?;
    let target_class = get_class(ds, ns, &iname.classname, false, true, true, None)?;
    let instance = get_instance_raw(ds, ns, iname)?;
    Ok(shape_instance(&instance, &target_class, local_only, property_list))
}

fn check_path_namespace(ns: &str, iname: &CIMInstanceName) -> CimResult<()> {
    match &iname.namespace {
        None => Ok(()),
        Some(path_ns) if path_ns == ns => Ok(()),
        Some(path_ns) => Err(CimError::InvalidNamespace(format!(
            "path namespace {path_ns:?} does not match operation namespace {ns:?}"
        ))),
    }
}

/// `DeleteInstance(ns, iname)` (§4.5).
pub fn delete_instance(ds: &Datastore, ns: &str, iname: &CIMInstanceName) -> CimResult<()> {
    check_path_namespace(ns, iname)?;
    get_class(ds, ns, &iname.classname, false, true, true, None)?;
    let instance = get_instance_raw(ds, ns, iname)?;

    if is_namespace_creation_class(&instance.classname) {
        if let Some(CimValue::Scalar(CimScalar::String(target_ns))) =
            instance.path.keybindings.get("Name")
        {
            match ds.remove_namespace(target_ns) {
                crate::datastore::RemoveNamespaceOutcome::NotEmpty => {
                    return Err(CimError::NamespaceNotEmpty(format!(
                        "namespace {target_ns:?} is not empty"
                    )))
                }
                crate::datastore::RemoveNamespaceOutcome::NotFound
                | crate::datastore::RemoveNamespaceOutcome::Removed => {}
            }
        }
    }

    let key = instance.path.canonical_key();
    let deleted = ds.write_namespace(ns, |store| store.instances.delete(&key)).unwrap_or(false);
    if deleted {
        Ok(())
    } else {
        Err(CimError::NotFound(format!("instance {key:?} not found")))
    }
}

/// `ModifyInstance(ns, modifiedInstance, ...)` (§4.5).
pub fn modify_instance(
    ds: &Datastore,
    ns: &str,
    modified_instance: &CIMInstance,
    property_list: Option<&[String]>,
) -> CimResult<()> {
    if let Some(list) = property_list {
        if list.is_empty() {
            return Ok(());
        }
    }

    let mut path = modified_instance.path.clone();
    match &path.namespace {
        None => path.namespace = Some(ns.to_string()),
        Some(existing) if existing == ns => {}
        Some(other) => {
            return Err(CimError::InvalidNamespace(format!(
                "path namespace {other:?} does not match operation namespace {ns:?}"
            )))
        }
    }

    if !modified_instance.classname.eq_ignore_ascii_case(&path.classname) {
        return Err(CimError::InvalidParameter(
            "modified instance classname does not match its path's classname".into(),
        ));
    }

    let target_class = get_class(ds, ns, &modified_instance.classname, false, true, true, None)
        .map_err(|_| CimError::InvalidClass(format!(
            "class {:?} not found",
            modified_instance.classname
        )))?;

    let original = get_instance_raw(ds, ns, &path)?;

    let deduped_list = property_list.map(|l| dedup_case_insensitive(l));

    if let Some(list) = &deduped_list {
        for name in list {
            if !target_class.properties.contains_key(name) {
                return Err(CimError::InvalidParameter(format!(
                    "propertyList names {name:?}, which is not declared in class {:?}",
                    target_class.classname
                )));
            }
        }
    }
    for name in modified_instance.properties.names() {
        if !target_class.properties.contains_key(&name) {
            return Err(CimError::InvalidParameter(format!(
                "property {name:?} is not declared in class {:?}",
                target_class.classname
            )));
        }
    }

    let mut overlay = modified_instance.properties.clone();
    let unchanged: Vec<String> = overlay
        .iter()
        .filter(|(name, value)| original.properties.get(name) == Some(*value))
        .map(|(name, _)| name.to_string())
        .collect();
    for name in unchanged {
        overlay.remove(&name);
    }

    for key_name in target_class.key_property_names() {
        if overlay.contains_key(&key_name) {
            return Err(CimError::InvalidParameter(format!(
                "key property {key_name:?} may not be modified"
            )));
        }
    }

    if let Some(list) = &deduped_list {
        let wanted: std::collections::HashSet<String> =
            list.iter().map(|n| n.to_ascii_lowercase()).collect();
        let names: Vec<String> = overlay.names();
        for name in names {
            if !wanted.contains(&name.to_ascii_lowercase()) {
                overlay.remove(&name);
            }
        }
    }

    let mut normalized_overlay = crate::case_map::CaseInsensitiveMap::new();
    for (name, value) in overlay.iter() {
        let class_prop = target_class.properties.get(name).unwrap();
        if !value.conforms_to(&class_prop.value_type, class_prop.is_array) {
            return Err(CimError::InvalidParameter(format!(
                "property {name:?} type/array-ness does not match class declaration"
            )));
        }
        normalized_overlay.insert(&class_prop.name, value.clone());
    }

    let mut updated = original.clone();
    for (name, value) in normalized_overlay.iter() {
        updated.properties.insert(name, value.clone());
    }

    let key = path.canonical_key();
    let ok = ds.write_namespace(ns, |store| store.instances.update(&key, updated)).unwrap_or(false);
    if ok {
        Ok(())
    } else {
        Err(CimError::Failed("failed to persist modified instance".into()))
    }
}

/// `EnumerateInstances(ns, className, ...)` (§4.5).
///
/// `deepInheritance` defaults to `true` here, unlike `EnumerateClasses`.
#[allow(clippy::too_many_arguments)]
pub fn enumerate_instances(
    ds: &Datastore,
    ns: &str,
    classname: &str,
    local_only: bool,
    deep_inheritance: bool,
    property_list: Option<&[String]>,
) -> CimResult<Vec<CIMInstance>> {
    let target_class = get_class(ds, ns, classname, false, true, true, None)?;
    let subclasses = closed_subclass_set(ds, ns, classname)?;
    let subclasses_lower: std::collections::HashSet<String> =
        subclasses.iter().map(|c| c.to_ascii_lowercase()).collect();

    let effective_list: Option<Vec<String>> = if deep_inheritance {
        property_list.map(|l| l.to_vec())
    } else {
        let base: Vec<String> = property_list
            .map(|l| l.to_vec())
            .unwrap_or_else(|| target_class.properties.names());
        let class_names: std::collections::HashSet<String> = target_class
            .properties
            .names()
            .into_iter()
            .map(|n| n.to_ascii_lowercase())
            .collect();
        Some(
            base.into_iter()
                .filter(|n| class_names.contains(&n.to_ascii_lowercase()))
                .collect(),
        )
    };

    let all = ds
        .read_namespace(ns, |store| store.instances.iter_values())
        .unwrap_or_default();

    let mut out = Vec::new();
    for instance in all {
        if !subclasses_lower.contains(&instance.classname.to_ascii_lowercase()) {
            continue;
        }
        let instance_class = if instance.classname.eq_ignore_ascii_case(classname) {
            target_class.clone()
        } else {
            get_class(ds, ns, &instance.classname, false, true, true, None)?
        };
        out.push(shape_instance(
            &instance,
            &instance_class,
            local_only,
            effective_list.as_deref(),
        ));
    }
    Ok(out)
}

/// `EnumerateInstanceNames(ns, className)` (§4.5).
pub fn enumerate_instance_names(
    ds: &Datastore,
    ns: &str,
    classname: &str,
) -> CimResult<Vec<CIMInstanceName>> {
    let _ = get_class(ds, ns, classname, false, true, true, None)?;
    let subclasses = closed_subclass_set(ds, ns, classname)?;
    let subclasses_lower: std::collections::HashSet<String> =
        subclasses.iter().map(|c| c.to_ascii_lowercase()).collect();

    let all = ds
        .read_namespace(ns, |store| store.instances.iter_values())
        .unwrap_or_default();
    Ok(all
        .into_iter()
        .filter(|inst| subclasses_lower.contains(&inst.classname.to_ascii_lowercase()))
        .map(|inst| inst.path)
        .collect())
}

/// `ExecQuery` — explicitly unsupported (§4.5, §6).
pub fn exec_query() -> CimResult<()> {
    Err(CimError::NotSupported("ExecQuery is not supported".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::CIMProperty;
    use crate::class_ops::create_class;
    use crate::qualifier::{CIMQualifierDeclaration, QualifierScopes, QualifierFlavors};
    use crate::value::CimType;

    fn setup(ds: &Datastore, ns: &str) {
        ds.add_namespace(ns).unwrap();
        ds.write_namespace(ns, |store| {
            store.qualifiers.create(
                "key",
                CIMQualifierDeclaration {
                    name: "Key".into(),
                    qualifier_type: CimType::Boolean,
                    is_array: false,
                    scopes: QualifierScopes::any(),
                    flavors: QualifierFlavors::default(),
                    default: CimValue::Scalar(CimScalar::Boolean(false)),
                },
            );
        });
        create_class(
            ds,
            ns,
            &CIMClass::new("CIM_Foo").with_property(
                CIMProperty::new("Id", CimType::Uint32, false)
                    .with_qualifier("Key", CimValue::Scalar(CimScalar::Boolean(true))),
            ).with_property(CIMProperty::new("Name", CimType::String, false).with_default(CimValue::Scalar(CimScalar::String("unnamed".into())))),
        )
        .unwrap();
    }

    #[test]
    fn create_instance_fills_defaults_and_builds_path() {
        let ds = Datastore::new();
        setup(&ds, "root/cimv2");
        let inst = CIMInstance::new("CIM_Foo").with_property("Id", CimValue::Scalar(CimScalar::Uint32(1)));
        let path = create_instance(&ds, "root/cimv2", &inst).unwrap();
        assert_eq!(path.keybindings.get("Id"), Some(&CimValue::Scalar(CimScalar::Uint32(1))));

        let fetched = get_instance(&ds, "root/cimv2", &path, false, true, true, None).unwrap();
        assert_eq!(
            fetched.properties.get("Name"),
            Some(&CimValue::Scalar(CimScalar::String("unnamed".into())))
        );
    }

    #[test]
    fn create_instance_missing_key_fails() {
        let ds = Datastore::new();
        setup(&ds, "root/cimv2");
        let inst = CIMInstance::new("CIM_Foo");
        let err = create_instance(&ds, "root/cimv2", &inst).unwrap_err();
        assert!(matches!(err, CimError::InvalidParameter(_)));
    }

    #[test]
    fn create_instance_duplicate_fails() {
        let ds = Datastore::new();
        setup(&ds, "root/cimv2");
        let inst = CIMInstance::new("CIM_Foo").with_property("Id", CimValue::Scalar(CimScalar::Uint32(1)));
        create_instance(&ds, "root/cimv2", &inst).unwrap();
        let err = create_instance(&ds, "root/cimv2", &inst).unwrap_err();
        assert!(matches!(err, CimError::AlreadyExists(_)));
    }

    #[test]
    fn namespace_creation_via_create_instance() {
        let ds = Datastore::new();
        setup(&ds, "root/cimv2");
        ds.write_namespace("root/cimv2", |store| {
            store.qualifiers.create(
                "dummy",
                CIMQualifierDeclaration {
                    name: "Dummy".into(),
                    qualifier_type: CimType::Boolean,
                    is_array: false,
                    scopes: QualifierScopes::any(),
                    flavors: QualifierFlavors::default(),
                    default: CimValue::Scalar(CimScalar::Boolean(false)),
                },
            );
        });
        create_class(
            &ds,
            "root/cimv2",
            &CIMClass::new("CIM_Namespace")
                .with_property(CIMProperty::new("Name", CimType::String, false).with_qualifier("Key", CimValue::Scalar(CimScalar::Boolean(true))))
                .with_property(CIMProperty::new("CreationClassName", CimType::String, false))
                .with_property(CIMProperty::new("ObjectManagerName", CimType::String, false))
                .with_property(CIMProperty::new("ObjectManagerCreationClassName", CimType::String, false))
                .with_property(CIMProperty::new("SystemName", CimType::String, false))
                .with_property(CIMProperty::new("SystemCreationClassName", CimType::String, false)),
        )
        .unwrap();

        let inst = CIMInstance::new("CIM_Namespace")
            .with_property("Name", CimValue::Scalar(CimScalar::String("/root/test/".into())));
        let path = create_instance(&ds, "root/cimv2", &inst).unwrap();
        assert!(ds.namespace_exists("root/test"));

        let created = get_instance(&ds, "root/cimv2", &path, false, true, true, None).unwrap();
        assert_eq!(
            created.properties.get("SystemName"),
            Some(&CimValue::Scalar(CimScalar::String("Mock_Test_WBEMServerTest".into())))
        );
    }

    #[test]
    fn modify_instance_rejects_key_change() {
        let ds = Datastore::new();
        setup(&ds, "root/cimv2");
        let inst = CIMInstance::new("CIM_Foo").with_property("Id", CimValue::Scalar(CimScalar::Uint32(1)));
        let path = create_instance(&ds, "root/cimv2", &inst).unwrap();

        let mut modified = CIMInstance::new("CIM_Foo");
        modified.path = path;
        modified.properties.insert("Id", CimValue::Scalar(CimScalar::Uint32(2)));
        let err = modify_instance(&ds, "root/cimv2", &modified, None).unwrap_err();
        assert!(matches!(err, CimError::InvalidParameter(_)));
    }

    #[test]
    fn modify_instance_updates_non_key_property() {
        let ds = Datastore::new();
        setup(&ds, "root/cimv2");
        let inst = CIMInstance::new("CIM_Foo").with_property("Id", CimValue::Scalar(CimScalar::Uint32(1)));
        let path = create_instance(&ds, "root/cimv2", &inst).unwrap();

        let mut modified = CIMInstance::new("CIM_Foo");
        modified.path = path.clone();
        modified
            .properties
            .insert("Name", CimValue::Scalar(CimScalar::String("renamed".into())));
        modify_instance(&ds, "root/cimv2", &modified, None).unwrap();

        let fetched = get_instance(&ds, "root/cimv2", &path, false, true, true, None).unwrap();
        assert_eq!(
            fetched.properties.get("Name"),
            Some(&CimValue::Scalar(CimScalar::String("renamed".into())))
        );
    }

    #[test]
    fn enumerate_instances_default_deep_inheritance() {
        let ds = Datastore::new();
        setup(&ds, "root/cimv2");
        create_class(&ds, "root/cimv2", &CIMClass::new("CIM_Bar").with_superclass("CIM_Foo")).unwrap();
        let inst = CIMInstance::new("CIM_Bar").with_property("Id", CimValue::Scalar(CimScalar::Uint32(9)));
        create_instance(&ds, "root/cimv2", &inst).unwrap();

        let all = enumerate_instances(&ds, "root/cimv2", "CIM_Foo", false, true, None).unwrap();
        assert_eq!(all.len(), 1);
        let names = enumerate_instance_names(&ds, "root/cimv2", "CIM_Foo").unwrap();
        assert_eq!(names.len(), 1);
    }
}
