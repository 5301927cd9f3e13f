use serde::{Deserialize, Serialize};
use url::Url;

use crate::SerializableSecretString;
use crate::shared::ValidationError;

/// Configuration for the space directory service that maps external space
/// identifiers to space names and lists the caller's environment namespaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DirectoryConfig {
    /// Base URL of the directory API.
    pub base_url: String,
    /// Bearer token forwarded to the directory. Sensitive and redacted in
    /// debug output.
    pub token: SerializableSecretString,
}

impl DirectoryConfig {
    /// Validates the [`DirectoryConfig`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        Url::parse(&self.base_url).map_err(|source| ValidationError::InvalidUrl {
            field: "directory.base_url",
            source,
        })?;

        Ok(())
    }
}
