use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, ReplicationController, ResourceQuota, Service};
use serde_json::Value;
use thiserror::Error;

use crate::k8s::client::DeploymentsClient;
use crate::k8s::stats::UsagePoint;

/// Errors emitted by the cluster integration.
///
/// Variants wrap lower-level libraries where appropriate to preserve context.
/// `NotFound` and `BadParameter` map to "not present" and "invalid request"
/// responses; the remaining variants are upstream or decoding failures that
/// abort the aggregation for the request.
#[derive(Debug, Error)]
pub enum K8sError {
    /// The requested application, deployment or namespace does not exist.
    #[error("{0} was not found")]
    NotFound(String),

    /// A caller-supplied value is invalid.
    #[error("bad parameter: {0}")]
    BadParameter(String),

    /// The orchestration or metrics backend answered with a non-2xx status.
    #[error("request to {url} failed with status {status}")]
    UpstreamStatus { status: u16, url: String },

    /// A transport-level failure while talking to the cluster API.
    #[error("cluster request failed: {0}")]
    Upstream(#[from] kube::Error),

    /// A transport-level failure while talking to the metrics backend.
    #[error("metrics request failed: {0}")]
    MetricsTransport(#[from] reqwest::Error),

    /// A response body could not be decoded into the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl K8sError {
    /// Creates a not-found error with the given subject.
    pub fn not_found(subject: impl Into<String>) -> Self {
        Self::NotFound(subject.into())
    }

    /// Creates a bad-parameter error with the given message.
    pub fn bad_parameter(msg: impl Into<String>) -> Self {
        Self::BadParameter(msg.into())
    }

    /// Creates a malformed-response error with the given message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

/// Coordinates of a resource kind without typed bindings, addressed through
/// the dynamic API.
#[derive(Debug, Clone)]
pub struct RawKind {
    pub group: &'static str,
    pub version: &'static str,
    pub kind: &'static str,
    pub plural: &'static str,
}

impl RawKind {
    /// Returns the `apiVersion` string for this kind.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.to_string()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

/// Client interface describing the orchestration operations used by the API.
///
/// One fetch capability per resource kind: typed lists for kinds with
/// bindings, [`K8sApi::list_raw`] for the rest. Implementations must report
/// non-2xx answers as [`K8sError::UpstreamStatus`] carrying the HTTP status
/// and the request URL.
#[async_trait]
pub trait K8sApi: Send + Sync {
    /// Lists replication controllers in a namespace, optionally restricted
    /// by a label selector.
    async fn list_replication_controllers(
        &self,
        namespace: &str,
        selector: Option<&str>,
    ) -> Result<Vec<ReplicationController>, K8sError>;

    /// Lists pods in a namespace, optionally restricted by a label selector.
    async fn list_pods(
        &self,
        namespace: &str,
        selector: Option<&str>,
    ) -> Result<Vec<Pod>, K8sError>;

    /// Lists services in a namespace.
    async fn list_services(&self, namespace: &str) -> Result<Vec<Service>, K8sError>;

    /// Lists resource quotas in a namespace.
    async fn list_resource_quotas(&self, namespace: &str) -> Result<Vec<ResourceQuota>, K8sError>;

    /// Lists a resource kind without typed bindings as raw JSON objects.
    ///
    /// With `allow_missing`, a 404 for the whole kind (e.g. the CRD is not
    /// installed on this cluster) yields an empty list instead of an error.
    async fn list_raw(
        &self,
        namespace: &str,
        kind: &RawKind,
        allow_missing: bool,
    ) -> Result<Vec<Value>, K8sError>;

    /// Patches the desired replica count of a replication controller.
    async fn patch_replication_controller_replicas(
        &self,
        namespace: &str,
        name: &str,
        replicas: i32,
    ) -> Result<(), K8sError>;

    /// Deletes a replication controller.
    async fn delete_replication_controller(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), K8sError>;

    /// Deletes a service.
    async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), K8sError>;

    /// Deletes a resource of a kind without typed bindings.
    async fn delete_raw(
        &self,
        namespace: &str,
        kind: &RawKind,
        name: &str,
    ) -> Result<(), K8sError>;
}

/// Client interface for the metrics backend.
///
/// All timestamps are absolute Unix milliseconds as floats, matching the
/// representation exposed by the API; implementations convert whatever their
/// backend reports at the decoding boundary and never afterwards.
#[async_trait]
pub trait MetricsApi: Send + Sync {
    /// Returns one combined cpu/memory sample for the given pods at the
    /// given instant, or `None` when the backend has no data for them.
    async fn usage_at(
        &self,
        namespace: &str,
        pods: &[String],
        at_ms: f64,
    ) -> Result<Option<UsagePoint>, K8sError>;

    /// Returns combined cpu/memory samples for the given pods over the
    /// `[start_ms, end_ms]` window, in non-decreasing time order.
    async fn usage_range(
        &self,
        namespace: &str,
        pods: &[String],
        start_ms: f64,
        end_ms: f64,
    ) -> Result<Vec<UsagePoint>, K8sError>;
}

/// Acquires request-scoped deployment clients.
///
/// Every acquisition yields a fresh client owned by exactly one request;
/// clients are never pooled or shared across concurrent requests, and they
/// are released when the request scope ends.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn deployments_client(&self) -> Result<DeploymentsClient, K8sError>;
}
