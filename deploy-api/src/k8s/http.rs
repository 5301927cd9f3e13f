use std::sync::Arc;

use async_trait::async_trait;
use deploy_config::shared::{ClusterConfig, MetricsBackendConfig};
use k8s_openapi::api::core::v1::{Pod, ReplicationController, ResourceQuota, Service};
use kube::api::{Api, DeleteParams, DynamicObject, ListParams, Patch, PatchParams};
use kube::discovery::ApiResource;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use crate::k8s::client::DeploymentsClient;
use crate::k8s::metrics::HttpMetricsApi;
use crate::k8s::{ClientFactory, K8sApi, K8sError, RawKind};

/// Resource client backed by the [`kube`] crate.
///
/// The underlying client is constructed explicitly from the configured
/// cluster URL and bearer token; ambient configuration (in-cluster service
/// accounts, `~/.kube/config`) and process-wide defaults are deliberately
/// not consulted.
pub struct HttpK8sApi {
    client: kube::Client,
    cluster_url: String,
}

impl HttpK8sApi {
    /// Creates a resource client for the configured cluster.
    pub fn new(config: &ClusterConfig) -> Result<Self, K8sError> {
        let cluster_url = config
            .api_url
            .parse::<http::Uri>()
            .map_err(|err| K8sError::bad_parameter(format!("cluster api url: {err}")))?;

        let mut kube_config = kube::Config::new(cluster_url);
        kube_config.auth_info.token =
            Some(SecretString::from(config.token.expose_secret().to_string()));

        let client = kube::Client::try_from(kube_config)?;

        Ok(Self {
            client,
            cluster_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn typed_url(&self, namespace: &str, plural: &str) -> String {
        format!(
            "{}/api/v1/namespaces/{namespace}/{plural}",
            self.cluster_url
        )
    }

    fn raw_url(&self, namespace: &str, kind: &RawKind) -> String {
        format!(
            "{}/apis/{}/namespaces/{namespace}/{}",
            self.cluster_url,
            kind.api_version(),
            kind.plural
        )
    }

    fn replication_controllers(&self, namespace: &str) -> Api<ReplicationController> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn services(&self, namespace: &str) -> Api<Service> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn dynamic(&self, namespace: &str, kind: &RawKind) -> Api<DynamicObject> {
        let resource = ApiResource {
            group: kind.group.to_string(),
            version: kind.version.to_string(),
            kind: kind.kind.to_string(),
            api_version: kind.api_version(),
            plural: kind.plural.to_string(),
        };

        Api::namespaced_with(self.client.clone(), namespace, &resource)
    }
}

/// Maps a kube error onto the upstream error kinds, attaching the request
/// URL to status failures.
fn upstream_error(err: kube::Error, url: String) -> K8sError {
    match err {
        kube::Error::Api(response) => K8sError::UpstreamStatus {
            status: response.code,
            url,
        },
        other => K8sError::Upstream(other),
    }
}

fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 404)
}

fn list_params(selector: Option<&str>) -> ListParams {
    match selector {
        Some(selector) => ListParams::default().labels(selector),
        None => ListParams::default(),
    }
}

#[async_trait]
impl K8sApi for HttpK8sApi {
    async fn list_replication_controllers(
        &self,
        namespace: &str,
        selector: Option<&str>,
    ) -> Result<Vec<ReplicationController>, K8sError> {
        let url = self.typed_url(namespace, "replicationcontrollers");
        let list = self
            .replication_controllers(namespace)
            .list(&list_params(selector))
            .await
            .map_err(|err| upstream_error(err, url))?;

        Ok(list.items)
    }

    async fn list_pods(
        &self,
        namespace: &str,
        selector: Option<&str>,
    ) -> Result<Vec<Pod>, K8sError> {
        let url = self.typed_url(namespace, "pods");
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = api
            .list(&list_params(selector))
            .await
            .map_err(|err| upstream_error(err, url))?;

        Ok(list.items)
    }

    async fn list_services(&self, namespace: &str) -> Result<Vec<Service>, K8sError> {
        let url = self.typed_url(namespace, "services");
        let list = self
            .services(namespace)
            .list(&ListParams::default())
            .await
            .map_err(|err| upstream_error(err, url))?;

        Ok(list.items)
    }

    async fn list_resource_quotas(&self, namespace: &str) -> Result<Vec<ResourceQuota>, K8sError> {
        let url = self.typed_url(namespace, "resourcequotas");
        let api: Api<ResourceQuota> = Api::namespaced(self.client.clone(), namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|err| upstream_error(err, url))?;

        Ok(list.items)
    }

    async fn list_raw(
        &self,
        namespace: &str,
        kind: &RawKind,
        allow_missing: bool,
    ) -> Result<Vec<Value>, K8sError> {
        let url = self.raw_url(namespace, kind);
        let list = match self.dynamic(namespace, kind).list(&ListParams::default()).await {
            Ok(list) => list,
            Err(err) if allow_missing && is_not_found(&err) => return Ok(Vec::new()),
            Err(err) => return Err(upstream_error(err, url)),
        };

        list.items
            .into_iter()
            .map(|object| {
                serde_json::to_value(&object)
                    .map_err(|err| K8sError::malformed(format!("{} object: {err}", kind.kind)))
            })
            .collect()
    }

    async fn patch_replication_controller_replicas(
        &self,
        namespace: &str,
        name: &str,
        replicas: i32,
    ) -> Result<(), K8sError> {
        let url = self.typed_url(namespace, "replicationcontrollers");
        let patch = json!({ "spec": { "replicas": replicas } });
        self.replication_controllers(namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|err| upstream_error(err, url))?;

        Ok(())
    }

    async fn delete_replication_controller(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), K8sError> {
        let url = self.typed_url(namespace, "replicationcontrollers");
        self.replication_controllers(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|err| upstream_error(err, url))?;

        Ok(())
    }

    async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), K8sError> {
        let url = self.typed_url(namespace, "services");
        self.services(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|err| upstream_error(err, url))?;

        Ok(())
    }

    async fn delete_raw(
        &self,
        namespace: &str,
        kind: &RawKind,
        name: &str,
    ) -> Result<(), K8sError> {
        let url = self.raw_url(namespace, kind);
        self.dynamic(namespace, kind)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|err| upstream_error(err, url))?;

        Ok(())
    }
}

/// Factory producing request-scoped clients against the configured cluster
/// and metrics backend.
///
/// Every acquisition builds a fresh transport; clients are never pooled or
/// reused across concurrent requests.
pub struct HttpClientFactory {
    cluster: ClusterConfig,
    metrics: MetricsBackendConfig,
}

impl HttpClientFactory {
    pub fn new(cluster: ClusterConfig, metrics: MetricsBackendConfig) -> Self {
        Self { cluster, metrics }
    }
}

#[async_trait]
impl ClientFactory for HttpClientFactory {
    async fn deployments_client(&self) -> Result<DeploymentsClient, K8sError> {
        let api = HttpK8sApi::new(&self.cluster)?;
        let metrics = HttpMetricsApi::new(&self.metrics)?;

        Ok(DeploymentsClient::new(Arc::new(api), Arc::new(metrics)))
    }
}
