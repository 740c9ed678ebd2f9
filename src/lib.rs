// Copyright 2025 Cowboy AI, LLC.

//! # CIM Repository
//!
//! An in-process CIM (Common Information Model) object repository and
//! WBEM operation responder, after DMTF DSP0004/DSP0200.
//!
//! The crate models a namespaced, schema-aware object store — classes,
//! instances, and qualifier declarations — and answers the class,
//! instance, qualifier, association, and paged-enumeration operations a
//! WBEM server would expose, without any wire transport of its own.
//!
//! ## Layout
//!
//! - [`value`], [`qualifier`], [`class`], [`instance`] — the object
//!   model (§3).
//! - [`case_map`] — the case-insensitive, case-preserving ordered map
//!   used throughout.
//! - [`namespace`], [`datastore`] — the namespace catalog and the
//!   per-namespace object stores (§4.1, §4.2).
//! - [`schema`] — class inheritance resolution on `CreateClass` (§4.3).
//! - [`class_ops`], [`instance_ops`], [`qualifier_ops`] — the CRUD
//!   operation surfaces (§4.4–§4.6).
//! - [`association`] — reference/associator traversal (§4.7).
//! - [`pull`] — the paged-enumeration session state machine (§4.8).
//! - [`config`] — responder-wide configuration.
//! - [`errors`] — the single tagged `CimError` kind (§7).
//! - [`responder`] — [`responder::Responder`], the façade composing all
//!   of the above into the full programmatic surface (§6).

#![warn(missing_docs)]

pub mod association;
pub mod case_map;
pub mod class;
pub mod class_ops;
pub mod config;
pub mod datastore;
pub mod errors;
pub mod instance;
pub mod instance_ops;
pub mod namespace;
pub mod pull;
pub mod qualifier;
pub mod qualifier_ops;
pub mod responder;
pub mod schema;
pub mod value;

pub use association::{AssociationNames, AssociationObjects, CIMClassNameRef, ObjectRef};
pub use class::{CIMClass, CIMMethod, CIMParameter, CIMProperty};
pub use config::RepositoryConfig;
pub use datastore::{Datastore, NamespaceStore, ObjectStore, RemoveNamespaceOutcome};
pub use errors::{CimError, CimResult};
pub use instance::{CIMInstance, CIMInstanceName};
pub use pull::{FilterParams, Page, PullType};
pub use qualifier::{CIMQualifierDeclaration, ElementKind, QualifierFlavors, QualifierScopes};
pub use responder::Responder;
pub use value::{CimScalar, CimType, CimValue};
