use serde::{Deserialize, Serialize};
use url::Url;

use crate::shared::ValidationError;

/// Default sampling step requested from the metrics backend, in seconds.
const DEFAULT_STEP_SECONDS: u64 = 30;

/// Configuration for the metrics backend queried for usage data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MetricsBackendConfig {
    /// Base URL of the Prometheus-compatible query API.
    pub base_url: String,
    /// Sampling step used for range queries, in seconds.
    #[serde(default = "default_step_seconds")]
    pub step_seconds: u64,
}

fn default_step_seconds() -> u64 {
    DEFAULT_STEP_SECONDS
}

impl MetricsBackendConfig {
    /// Validates the [`MetricsBackendConfig`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        Url::parse(&self.base_url).map_err(|source| ValidationError::InvalidUrl {
            field: "metrics.base_url",
            source,
        })?;

        if self.step_seconds == 0 {
            return Err(ValidationError::EmptyField("metrics.step_seconds"));
        }

        Ok(())
    }
}
