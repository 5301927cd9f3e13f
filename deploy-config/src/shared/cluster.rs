use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::SerializableSecretString;
use crate::shared::ValidationError;

/// Configuration for connecting to the orchestration cluster API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ClusterConfig {
    /// Base URL of the cluster API server.
    pub api_url: String,
    /// Bearer token used to authenticate against the cluster. Sensitive and
    /// redacted in debug output.
    pub token: SerializableSecretString,
}

impl ClusterConfig {
    /// Validates the [`ClusterConfig`].
    ///
    /// Checks that the API URL parses and that a token was supplied.
    pub fn validate(&self) -> Result<(), ValidationError> {
        Url::parse(&self.api_url).map_err(|source| ValidationError::InvalidUrl {
            field: "cluster.api_url",
            source,
        })?;

        if self.token.expose_secret().is_empty() {
            return Err(ValidationError::EmptyField("cluster.token"));
        }

        Ok(())
    }
}
