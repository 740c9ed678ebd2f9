//! Responder-wide configuration: host identity and the `disablePullOperations`
//! flag (§4.8, §6).

use serde::{Deserialize, Serialize};

/// The default host identity used to fill `host` on association results
/// when none is configured (§4.7.5).
pub const DEFAULT_HOST: &str = "localhost";

/// Ambient configuration for one responder instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Host identity filled into instance paths returned by the
    /// association operations when their own `host` is unset.
    pub host: String,

    /// When set, every `Open…`, `Pull…`, and `CloseEnumeration`
    /// operation fails `NOT_SUPPORTED` (§4.8).
    pub disable_pull_operations: bool,

    /// `MaxObjectCount` used by `Open…` when the caller omits it.
    pub default_max_object_count: u32,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            disable_pull_operations: false,
            default_max_object_count: crate::pull::DEFAULT_MAX_OBJECT_COUNT,
        }
    }
}

impl RepositoryConfig {
    /// A config with pull operations disabled, used by dispatchers that
    /// only want the non-paged surface.
    pub fn with_pull_disabled(mut self) -> Self {
        self.disable_pull_operations = true;
        self
    }

    /// Builder: override the host identity.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }
}
