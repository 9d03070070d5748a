//! Narrow capability interfaces the core consumes from its host (§6).

use async_trait::async_trait;
use thiserror::Error;

use crate::secure::SecureString;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential not found: {0}")]
    NotFound(String),
    #[error("credential provider error: {0}")]
    Provider(String),
}

/// Resolves a credential reference to its field values. The core treats
/// credentials as opaque — storage and encryption are a host concern.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn get(&self, reference: &str) -> Result<SecureString, CredentialError>;
}

/// Resolves environment variable lookups used by `$env.<name>` in
/// expressions. Implementations typically check a workflow-scoped map
/// before falling back to the process environment.
pub trait EnvironmentProvider: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
}

/// An [`EnvironmentProvider`] backed by the process environment, used as
/// the fallback tier in `$env.<name>` resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironmentProvider;

impl EnvironmentProvider for ProcessEnvironmentProvider {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Layers a workflow-scoped variable map over the process environment,
/// matching spec §4.3: "`$env.<name>` — environment variables, then
/// process environment as fallback."
pub struct LayeredEnvironmentProvider {
    overrides: std::collections::HashMap<String, String>,
}

impl LayeredEnvironmentProvider {
    pub fn new(overrides: std::collections::HashMap<String, String>) -> Self {
        Self { overrides }
    }
}

impl EnvironmentProvider for LayeredEnvironmentProvider {
    fn get(&self, name: &str) -> Option<String> {
        self.overrides
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
    }
}
