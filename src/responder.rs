//! The top-level responder (§2, §6): composes the datastore and every
//! operation module behind the programmatic surface a dispatcher calls.

use crate::association::{self, AssociationNames, AssociationObjects, ObjectRef};
use crate::class::CIMClass;
use crate::class_ops;
use crate::config::RepositoryConfig;
use crate::datastore::Datastore;
use crate::errors::CimResult;
use crate::instance::{CIMInstance, CIMInstanceName};
use crate::instance_ops;
use crate::pull::{FilterParams, Page, PullSessionManager, PullType};
use crate::qualifier::CIMQualifierDeclaration;
use crate::qualifier_ops;
use tracing::{debug, info};

/// The in-process CIM object repository and operation responder (§1).
///
/// Owns the datastore, the process-wide pull-session table, and the
/// host identity used to fill association results (§4.7.5).
pub struct Responder {
    datastore: Datastore,
    sessions: PullSessionManager<CIMInstance>,
    path_sessions: PullSessionManager<CIMInstanceName>,
    config: RepositoryConfig,
}

impl Default for Responder {
    fn default() -> Self {
        Self::new(RepositoryConfig::default())
    }
}

impl Responder {
    /// A new responder with no namespaces, configured per `config`.
    pub fn new(config: RepositoryConfig) -> Self {
        Self {
            datastore: Datastore::new(),
            sessions: PullSessionManager::new(config.disable_pull_operations),
            path_sessions: PullSessionManager::new(config.disable_pull_operations),
            config,
        }
    }

    /// The underlying datastore, for namespace administration
    /// (`add_namespace`/`remove_namespace`/`list_namespaces`) that sits
    /// outside the operation surface proper (§4.2).
    pub fn datastore(&self) -> &Datastore {
        &self.datastore
    }

    fn host(&self) -> &str {
        &self.config.host
    }

    // ---- Class operations (§4.4) ----

    /// `EnumerateClasses`.
    pub fn enumerate_classes(
        &self,
        ns: &str,
        classname: Option<&str>,
        deep_inheritance: bool,
        local_only: bool,
        include_qualifiers: bool,
        include_class_origin: bool,
    ) -> CimResult<Vec<CIMClass>> {
        class_ops::enumerate_classes(
            &self.datastore,
            ns,
            classname,
            deep_inheritance,
            local_only,
            include_qualifiers,
            include_class_origin,
        )
    }

    /// `EnumerateClassNames`.
    pub fn enumerate_class_names(
        &self,
        ns: &str,
        classname: Option<&str>,
        deep_inheritance: bool,
    ) -> CimResult<Vec<String>> {
        class_ops::enumerate_class_names(&self.datastore, ns, classname, deep_inheritance)
    }

    /// `GetClass`.
    pub fn get_class(
        &self,
        ns: &str,
        classname: &str,
        local_only: bool,
        include_qualifiers: bool,
        include_class_origin: bool,
        property_list: Option<&[String]>,
    ) -> CimResult<CIMClass> {
        class_ops::get_class(
            &self.datastore,
            ns,
            classname,
            local_only,
            include_qualifiers,
            include_class_origin,
            property_list,
        )
    }

    /// `CreateClass`.
    pub fn create_class(&self, ns: &str, new_class: &CIMClass) -> CimResult<()> {
        debug!(namespace = %ns, classname = %new_class.classname, "CreateClass");
        class_ops::create_class(&self.datastore, ns, new_class)
    }

    /// `ModifyClass` — always `NOT_SUPPORTED`.
    pub fn modify_class(&self) -> CimResult<()> {
        class_ops::modify_class()
    }

    /// `DeleteClass`.
    pub fn delete_class(&self, ns: &str, classname: &str) -> CimResult<()> {
        info!(namespace = %ns, classname = %classname, "DeleteClass");
        class_ops::delete_class(&self.datastore, ns, classname)
    }

    // ---- Qualifier operations (§4.6) ----

    /// `EnumerateQualifiers`.
    pub fn enumerate_qualifiers(&self, ns: &str) -> CimResult<Vec<CIMQualifierDeclaration>> {
        qualifier_ops::enumerate_qualifiers(&self.datastore, ns)
    }

    /// `GetQualifier`.
    pub fn get_qualifier(&self, ns: &str, name: &str) -> CimResult<CIMQualifierDeclaration> {
        qualifier_ops::get_qualifier(&self.datastore, ns, name)
    }

    /// `SetQualifier`.
    pub fn set_qualifier(&self, ns: &str, decl: CIMQualifierDeclaration) -> CimResult<()> {
        debug!(namespace = %ns, qualifier = %decl.name, "SetQualifier");
        qualifier_ops::set_qualifier(&self.datastore, ns, decl)
    }

    /// `DeleteQualifier`.
    pub fn delete_qualifier(&self, ns: &str, name: &str) -> CimResult<()> {
        info!(namespace = %ns, qualifier = %name, "DeleteQualifier");
        qualifier_ops::delete_qualifier(&self.datastore, ns, name)
    }

    // ---- Instance operations (§4.5) ----

    /// `CreateInstance`.
    pub fn create_instance(&self, ns: &str, new_instance: &CIMInstance) -> CimResult<CIMInstanceName> {
        debug!(namespace = %ns, classname = %new_instance.classname, "CreateInstance");
        instance_ops::create_instance(&self.datastore, ns, new_instance)
    }

    /// `ModifyInstance`.
    pub fn modify_instance(
        &self,
        ns: &str,
        modified_instance: &CIMInstance,
        property_list: Option<&[String]>,
    ) -> CimResult<()> {
        debug!(namespace = %ns, classname = %modified_instance.classname, "ModifyInstance");
        instance_ops::modify_instance(&self.datastore, ns, modified_instance, property_list)
    }

    /// `GetInstance`.
    #[allow(clippy::too_many_arguments)]
    pub fn get_instance(
        &self,
        ns: &str,
        iname: &CIMInstanceName,
        local_only: bool,
        include_qualifiers: bool,
        include_class_origin: bool,
        property_list: Option<&[String]>,
    ) -> CimResult<CIMInstance> {
        instance_ops::get_instance(
            &self.datastore,
            ns,
            iname,
            local_only,
            include_qualifiers,
            include_class_origin,
            property_list,
        )
    }

    /// `DeleteInstance`.
    pub fn delete_instance(&self, ns: &str, iname: &CIMInstanceName) -> CimResult<()> {
        info!(namespace = %ns, classname = %iname.classname, "DeleteInstance");
        instance_ops::delete_instance(&self.datastore, ns, iname)
    }

    /// `EnumerateInstances`.
    #[allow(clippy::too_many_arguments)]
    pub fn enumerate_instances(
        &self,
        ns: &str,
        classname: &str,
        local_only: bool,
        deep_inheritance: bool,
        property_list: Option<&[String]>,
    ) -> CimResult<Vec<CIMInstance>> {
        instance_ops::enumerate_instances(
            &self.datastore,
            ns,
            classname,
            local_only,
            deep_inheritance,
            property_list,
        )
    }

    /// `EnumerateInstanceNames`.
    pub fn enumerate_instance_names(&self, ns: &str, classname: &str) -> CimResult<Vec<CIMInstanceName>> {
        instance_ops::enumerate_instance_names(&self.datastore, ns, classname)
    }

    /// `ExecQuery` — always `NOT_SUPPORTED`.
    pub fn exec_query(&self) -> CimResult<()> {
        instance_ops::exec_query()
    }

    // ---- Association engine (§4.7) ----

    /// `ReferenceNames`.
    pub fn reference_names(
        &self,
        ns: &str,
        object: &ObjectRef,
        result_class: Option<&str>,
        role: Option<&str>,
    ) -> CimResult<AssociationNames> {
        association::reference_names(&self.datastore, ns, object, result_class, role, self.host())
    }

    /// `References`.
    #[allow(clippy::too_many_arguments)]
    pub fn references(
        &self,
        ns: &str,
        object: &ObjectRef,
        result_class: Option<&str>,
        role: Option<&str>,
        include_qualifiers: bool,
        include_class_origin: bool,
        property_list: Option<&[String]>,
    ) -> CimResult<AssociationObjects> {
        association::references(
            &self.datastore,
            ns,
            object,
            result_class,
            role,
            include_qualifiers,
            include_class_origin,
            property_list,
            self.host(),
        )
    }

    /// `AssociatorNames`.
    #[allow(clippy::too_many_arguments)]
    pub fn associator_names(
        &self,
        ns: &str,
        object: &ObjectRef,
        assoc_class: Option<&str>,
        result_class: Option<&str>,
        role: Option<&str>,
        result_role: Option<&str>,
    ) -> CimResult<AssociationNames> {
        association::associator_names(
            &self.datastore,
            ns,
            object,
            assoc_class,
            result_class,
            role,
            result_role,
            self.host(),
        )
    }

    /// `Associators`.
    #[allow(clippy::too_many_arguments)]
    pub fn associators(
        &self,
        ns: &str,
        object: &ObjectRef,
        assoc_class: Option<&str>,
        result_class: Option<&str>,
        role: Option<&str>,
        result_role: Option<&str>,
        include_qualifiers: bool,
        include_class_origin: bool,
        property_list: Option<&[String]>,
    ) -> CimResult<AssociationObjects> {
        association::associators(
            &self.datastore,
            ns,
            object,
            assoc_class,
            result_class,
            role,
            result_role,
            include_qualifiers,
            include_class_origin,
            property_list,
            self.host(),
        )
    }

    // ---- Pull session manager (§4.8) ----

    /// `OpenEnumerateInstances`.
    pub fn open_enumerate_instances(
        &self,
        ns: &str,
        classname: &str,
        local_only: bool,
        deep_inheritance: bool,
        property_list: Option<&[String]>,
        params: &FilterParams,
        max_object_count: Option<u32>,
    ) -> CimResult<Page<CIMInstance>> {
        debug!(namespace = %ns, classname = %classname, "OpenEnumerateInstances");
        let all = instance_ops::enumerate_instances(
            &self.datastore,
            ns,
            classname,
            local_only,
            deep_inheritance,
            property_list,
        )?;
        self.sessions
            .open(ns, PullType::PullInstances, params, max_object_count, all)
    }

    /// `OpenEnumerateInstancePaths`.
    pub fn open_enumerate_instance_paths(
        &self,
        ns: &str,
        classname: &str,
        params: &FilterParams,
        max_object_count: Option<u32>,
    ) -> CimResult<Page<CIMInstanceName>> {
        let all = instance_ops::enumerate_instance_names(&self.datastore, ns, classname)?;
        self.open_paths(ns, PullType::PullInstancePaths, params, max_object_count, all)
    }

    /// `OpenReferenceInstances`.
    #[allow(clippy::too_many_arguments)]
    pub fn open_reference_instances(
        &self,
        ns: &str,
        target: &CIMInstanceName,
        result_class: Option<&str>,
        role: Option<&str>,
        include_qualifiers: bool,
        include_class_origin: bool,
        property_list: Option<&[String]>,
        params: &FilterParams,
        max_object_count: Option<u32>,
    ) -> CimResult<Page<CIMInstance>> {
        let objects = self.references(
            ns,
            &ObjectRef::Instance(target.clone()),
            result_class,
            role,
            include_qualifiers,
            include_class_origin,
            property_list,
        )?;
        let all = match objects {
            AssociationObjects::Instances(instances) => instances,
            AssociationObjects::Classes(_) => Vec::new(),
        };
        self.sessions
            .open(ns, PullType::PullInstancesWithPath, params, max_object_count, all)
    }

    /// `OpenReferenceInstancePaths`.
    pub fn open_reference_instance_paths(
        &self,
        ns: &str,
        target: &CIMInstanceName,
        result_class: Option<&str>,
        role: Option<&str>,
        params: &FilterParams,
        max_object_count: Option<u32>,
    ) -> CimResult<Page<CIMInstanceName>> {
        let names = self.reference_names(ns, &ObjectRef::Instance(target.clone()), result_class, role)?;
        let all = match names {
            AssociationNames::Instances(paths) => paths,
            AssociationNames::Classes(_) => Vec::new(),
        };
        self.open_paths(ns, PullType::PullInstancePaths, params, max_object_count, all)
    }

    /// `OpenAssociatorInstances`.
    #[allow(clippy::too_many_arguments)]
    pub fn open_associator_instances(
        &self,
        ns: &str,
        target: &CIMInstanceName,
        assoc_class: Option<&str>,
        result_class: Option<&str>,
        role: Option<&str>,
        result_role: Option<&str>,
        include_qualifiers: bool,
        include_class_origin: bool,
        property_list: Option<&[String]>,
        params: &FilterParams,
        max_object_count: Option<u32>,
    ) -> CimResult<Page<CIMInstance>> {
        let objects = self.associators(
            ns,
            &ObjectRef::Instance(target.clone()),
            assoc_class,
            result_class,
            role,
            result_role,
            include_qualifiers,
            include_class_origin,
            property_list,
        )?;
        let all = match objects {
            AssociationObjects::Instances(instances) => instances,
            AssociationObjects::Classes(_) => Vec::new(),
        };
        self.sessions
            .open(ns, PullType::PullInstancesWithPath, params, max_object_count, all)
    }

    /// `OpenAssociatorInstancePaths`.
    #[allow(clippy::too_many_arguments)]
    pub fn open_associator_instance_paths(
        &self,
        ns: &str,
        target: &CIMInstanceName,
        assoc_class: Option<&str>,
        result_class: Option<&str>,
        role: Option<&str>,
        result_role: Option<&str>,
        params: &FilterParams,
        max_object_count: Option<u32>,
    ) -> CimResult<Page<CIMInstanceName>> {
        let names = self.associator_names(ns, &ObjectRef::Instance(target.clone()), assoc_class, result_class, role, result_role)?;
        let all = match names {
            AssociationNames::Instances(paths) => paths,
            AssociationNames::Classes(_) => Vec::new(),
        };
        self.open_paths(ns, PullType::PullInstancePaths, params, max_object_count, all)
    }

    /// `OpenQueryInstances` — delegates to `ExecQuery` and so always
    /// fails `NOT_SUPPORTED` before any session is created (§4.8).
    pub fn open_query_instances(&self) -> CimResult<Page<CIMInstance>> {
        instance_ops::exec_query()?;
        unreachable!("exec_query always fails")
    }

    /// `PullInstancesWithPath`.
    pub fn pull_instances_with_path(
        &self,
        ns: &str,
        context_id: &str,
        max_object_count: Option<u32>,
    ) -> CimResult<Page<CIMInstance>> {
        self.sessions
            .pull(ns, PullType::PullInstancesWithPath, context_id, max_object_count)
    }

    /// `PullInstances`.
    pub fn pull_instances(
        &self,
        ns: &str,
        context_id: &str,
        max_object_count: Option<u32>,
    ) -> CimResult<Page<CIMInstance>> {
        self.sessions
            .pull(ns, PullType::PullInstances, context_id, max_object_count)
    }

    /// `PullInstancePaths`.
    pub fn pull_instance_paths(
        &self,
        ns: &str,
        context_id: &str,
        max_object_count: Option<u32>,
    ) -> CimResult<Page<CIMInstanceName>> {
        let page = self
            .path_sessions
            .pull(ns, PullType::PullInstancePaths, context_id, max_object_count)?;
        Ok(page)
    }

    /// `CloseEnumeration`.
    pub fn close_enumeration(&self, context_id: &str) -> CimResult<()> {
        debug!(context_id = %context_id, "CloseEnumeration");
        self.sessions.close(context_id)
    }

    fn open_paths(
        &self,
        ns: &str,
        pull_type: PullType,
        params: &FilterParams,
        max_object_count: Option<u32>,
        all: Vec<CIMInstanceName>,
    ) -> CimResult<Page<CIMInstanceName>> {
        self.path_sessions.open(ns, pull_type, params, max_object_count, all)
    }
}
