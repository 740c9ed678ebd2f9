//! The pull enumeration session manager (§4.8): `Open…` / `Pull…` /
//! `Close`, with opaque UUID context handles.

use crate::errors::{CimError, CimResult};
use indexmap::IndexMap;
use std::sync::RwLock;
use uuid::Uuid;

/// Default `MaxObjectCount` when the caller omits it (§4.8).
pub const DEFAULT_MAX_OBJECT_COUNT: u32 = 100;

/// Upper bound on `OperationTimeout` seconds (§4.8).
pub const OPEN_MAX_TIMEOUT: u32 = 40;

/// Which `Pull…` variant a context was opened for; pulling with the
/// wrong variant is an `INVALID_ENUMERATION_CONTEXT` error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullType {
    /// Backs `PullInstancesWithPath`.
    PullInstancesWithPath,
    /// Backs `PullInstancePaths`.
    PullInstancePaths,
    /// Backs `PullInstances`.
    PullInstances,
}

/// Request-time filter-query parameters, common to every `Open…`
/// operation (§4.8).
#[derive(Debug, Clone, Default)]
pub struct FilterParams {
    /// `FilterQuery` text, if supplied.
    pub filter_query: Option<String>,
    /// `FilterQueryLanguage` tag, if supplied.
    pub filter_query_language: Option<String>,
    /// `OperationTimeout` in seconds, if supplied.
    pub operation_timeout: Option<u32>,
}

const SUPPORTED_QUERY_LANGUAGE: &str = "DMTF:FQL";

/// Validate the filter/timeout parameters shared by every `Open…`
/// variant, independent of the underlying operation.
pub fn validate_open_params(params: &FilterParams) -> CimResult<()> {
    if params.filter_query.is_some() && params.filter_query_language.is_none() {
        return Err(CimError::InvalidParameter(
            "FilterQuery given without FilterQueryLanguage".into(),
        ));
    }
    if let Some(lang) = &params.filter_query_language {
        if !lang.eq_ignore_ascii_case(SUPPORTED_QUERY_LANGUAGE) {
            return Err(CimError::QueryLanguageNotSupported(format!(
                "unsupported FilterQueryLanguage {lang:?}"
            )));
        }
    }
    if let Some(timeout) = params.operation_timeout {
        if timeout > OPEN_MAX_TIMEOUT {
            return Err(CimError::InvalidParameter(format!(
                "OperationTimeout {timeout} exceeds the maximum of {OPEN_MAX_TIMEOUT}"
            )));
        }
    }
    Ok(())
}

struct Context<T> {
    pull_type: PullType,
    namespace: String,
    data: Vec<T>,
}

/// The outcome of `Open…` or `Pull…`: a page of results, whether the
/// sequence is exhausted, and (if not) the context id to continue with.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// This page's items.
    pub items: Vec<T>,
    /// Whether the enumeration is complete.
    pub end_of_sequence: bool,
    /// The context id to pass to the next `Pull…`/`Close`, empty once
    /// `end_of_sequence` is true.
    pub context_id: String,
}

/// The process-wide pull-session table (§4.8, §9 "single process-wide
/// table"). One table instance is generic over the responder's richest
/// result shape (`CIMInstance`); paths-only sessions store the same
/// items and simply project to paths.
pub struct PullSessionManager<T> {
    contexts: RwLock<IndexMap<String, Context<T>>>,
    disable_pull_operations: bool,
}

impl<T: Clone> Default for PullSessionManager<T> {
    fn default() -> Self {
        Self::new(false)
    }
}

impl<T: Clone> PullSessionManager<T> {
    /// A new, empty session table. `disable_pull_operations` mirrors the
    /// host configuration flag of the same name (§4.8, §6).
    pub fn new(disable_pull_operations: bool) -> Self {
        Self {
            contexts: RwLock::new(IndexMap::new()),
            disable_pull_operations,
        }
    }

    fn check_enabled(&self) -> CimResult<()> {
        if self.disable_pull_operations {
            Err(CimError::NotSupported(
                "pull operations are disabled".into(),
            ))
        } else {
            Ok(())
        }
    }

    /// `Open…`: eagerly run the underlying non-paged operation and slice
    /// the first page. `all` is the full, already-computed result set.
    pub fn open(
        &self,
        namespace: &str,
        pull_type: PullType,
        params: &FilterParams,
        max_object_count: Option<u32>,
        all: Vec<T>,
    ) -> CimResult<Page<T>> {
        self.check_enabled()?;
        validate_open_params(params)?;

        let n = max_object_count.unwrap_or(DEFAULT_MAX_OBJECT_COUNT) as usize;
        if all.len() <= n {
            return Ok(Page {
                items: all,
                end_of_sequence: true,
                context_id: String::new(),
            });
        }

        let mut all = all;
        let tail = all.split_off(n);
        let context_id = Uuid::new_v4().to_string();
        self.contexts.write().unwrap().insert(
            context_id.clone(),
            Context {
                pull_type,
                namespace: namespace.to_string(),
                data: tail,
            },
        );
        Ok(Page {
            items: all,
            end_of_sequence: false,
            context_id,
        })
    }

    /// `Pull…`: continue an open context, failing if it is missing,
    /// type-mismatched, or namespace-mismatched.
    pub fn pull(
        &self,
        namespace: &str,
        pull_type: PullType,
        context_id: &str,
        max_object_count: Option<u32>,
    ) -> CimResult<Page<T>> {
        self.check_enabled()?;
        let n = max_object_count.unwrap_or(DEFAULT_MAX_OBJECT_COUNT) as usize;

        let mut contexts = self.contexts.write().unwrap();
        let ctx = contexts.get_mut(context_id).ok_or_else(|| {
            CimError::InvalidEnumerationContext(format!(
                "enumeration context {context_id:?} not found"
            ))
        })?;
        if ctx.pull_type != pull_type || ctx.namespace != namespace {
            return Err(CimError::InvalidEnumerationContext(format!(
                "enumeration context {context_id:?} does not match the requested pull type or namespace"
            )));
        }

        let take = n.min(ctx.data.len());
        let items: Vec<T> = ctx.data.drain(0..take).collect();
        let end_of_sequence = ctx.data.is_empty();
        if end_of_sequence {
            contexts.shift_remove(context_id);
            Ok(Page {
                items,
                end_of_sequence: true,
                context_id: String::new(),
            })
        } else {
            Ok(Page {
                items,
                end_of_sequence: false,
                context_id: context_id.to_string(),
            })
        }
    }

    /// `Close…`: discard a context outright.
    pub fn close(&self, context_id: &str) -> CimResult<()> {
        self.check_enabled()?;
        let removed = self.contexts.write().unwrap().shift_remove(context_id).is_some();
        if removed {
            Ok(())
        } else {
            Err(CimError::InvalidEnumerationContext(format!(
                "enumeration context {context_id:?} not found"
            )))
        }
    }

    /// Number of open contexts, for diagnostics/tests.
    pub fn open_count(&self) -> usize {
        self.contexts.read().unwrap().len()
    }
}
