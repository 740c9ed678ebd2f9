// Copyright 2025 Cowboy AI, LLC.

//! Error types for repository and operation handling (§7)

use thiserror::Error;

/// The single tagged failure kind the responder raises, carrying a CIM
/// status code and a human-readable message (§7).
#[derive(Debug, Clone, Error)]
pub enum CimError {
    /// Namespace absent, or mismatched against a supplied path.
    #[error("CIM_ERR_INVALID_NAMESPACE: {0}")]
    InvalidNamespace(String),

    /// Class, instance, qualifier, or namespace not present.
    #[error("CIM_ERR_NOT_FOUND: {0}")]
    NotFound(String),

    /// The creation class for an instance operation is absent.
    #[error("CIM_ERR_INVALID_CLASS: {0}")]
    InvalidClass(String),

    /// A class create names a superclass that does not exist.
    #[error("CIM_ERR_INVALID_SUPERCLASS: {0}")]
    InvalidSuperclass(String),

    /// Create collided with an existing key.
    #[error("CIM_ERR_ALREADY_EXISTS: {0}")]
    AlreadyExists(String),

    /// Type mismatch, schema violation, key-property error, missing or
    /// unexpected properties, or an association parameter class missing.
    #[error("CIM_ERR_INVALID_PARAMETER: {0}")]
    InvalidParameter(String),

    /// `ModifyClass`, `ExecQuery`, or a pull operation while disabled.
    #[error("CIM_ERR_NOT_SUPPORTED: {0}")]
    NotSupported(String),

    /// A namespace removal (direct, or via `DeleteInstance` on a
    /// namespace-creation class) found a non-empty namespace.
    #[error("CIM_ERR_NAMESPACE_NOT_EMPTY: {0}")]
    NamespaceNotEmpty(String),

    /// A pull/close operation referenced a missing or type-mismatched
    /// enumeration context.
    #[error("CIM_ERR_INVALID_ENUMERATION_CONTEXT: {0}")]
    InvalidEnumerationContext(String),

    /// `Open...` supplied an unsupported `FilterQueryLanguage`.
    #[error("CIM_ERR_QUERY_LANGUAGE_NOT_SUPPORTED: {0}")]
    QueryLanguageNotSupported(String),

    /// Fallback for unclassified datastore failures.
    #[error("CIM_ERR_FAILED: {0}")]
    Failed(String),
}

/// Result type for repository and operation handling.
pub type CimResult<T> = Result<T, CimError>;

impl CimError {
    /// The numeric CIM status code for this error kind (the same small
    /// integer set WBEM implementations expose as `CIM_ERR_*` constants).
    pub fn status_code(&self) -> u16 {
        match self {
            CimError::Failed(_) => 1,
            CimError::InvalidNamespace(_) => 3,
            CimError::InvalidParameter(_) => 4,
            CimError::InvalidClass(_) => 5,
            CimError::NotFound(_) => 6,
            CimError::NotSupported(_) => 7,
            CimError::InvalidSuperclass(_) => 9,
            CimError::AlreadyExists(_) => 11,
            CimError::NamespaceNotEmpty(_) => 13,
            CimError::InvalidEnumerationContext(_) => 21,
            CimError::QueryLanguageNotSupported(_) => 22,
        }
    }

    /// Whether this is a not-found class of error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CimError::NotFound(_))
    }
}
