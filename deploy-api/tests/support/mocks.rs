use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use deploy_api::directory::{DirectoryError, EnvironmentNamespace, SpaceDirectory, SpaceRef};
use deploy_api::k8s::client::DeploymentsClient;
use deploy_api::k8s::stats::UsagePoint;
use deploy_api::k8s::{ClientFactory, K8sApi, K8sError, MetricsApi, RawKind};
use k8s_openapi::api::core::v1::{
    Container, ContainerStatus, Pod, PodSpec, PodStatus, PodTemplateSpec, ReplicationController,
    ReplicationControllerSpec, ReplicationControllerStatus, ResourceQuota, ResourceQuotaStatus,
    Service, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::{Value, json};
use uuid::Uuid;

/// In-memory cluster state served by the mock resource client.
///
/// Lists honor label selectors so the engine's correlation logic is
/// exercised; mutations are recorded for assertions.
#[derive(Default)]
pub struct MockCluster {
    pub replication_controllers: Vec<ReplicationController>,
    pub pods: Vec<Pod>,
    pub services: Vec<Service>,
    pub routes: Vec<Value>,
    pub quotas: Vec<ResourceQuota>,
    pub scaled: Mutex<Vec<(String, String, i32)>>,
    pub deleted: Mutex<Vec<String>>,
}

fn matches_selector(labels: Option<&BTreeMap<String, String>>, selector: Option<&str>) -> bool {
    let Some(selector) = selector else {
        return true;
    };
    let empty = BTreeMap::new();
    let labels = labels.unwrap_or(&empty);

    selector
        .split(',')
        .filter(|pair| !pair.is_empty())
        .all(|pair| match pair.split_once('=') {
            Some((key, value)) => labels.get(key).map(String::as_str) == Some(value),
            None => false,
        })
}

#[async_trait]
impl K8sApi for MockCluster {
    async fn list_replication_controllers(
        &self,
        _namespace: &str,
        selector: Option<&str>,
    ) -> Result<Vec<ReplicationController>, K8sError> {
        Ok(self
            .replication_controllers
            .iter()
            .filter(|controller| matches_selector(controller.metadata.labels.as_ref(), selector))
            .cloned()
            .collect())
    }

    async fn list_pods(
        &self,
        _namespace: &str,
        selector: Option<&str>,
    ) -> Result<Vec<Pod>, K8sError> {
        Ok(self
            .pods
            .iter()
            .filter(|pod| matches_selector(pod.metadata.labels.as_ref(), selector))
            .cloned()
            .collect())
    }

    async fn list_services(&self, _namespace: &str) -> Result<Vec<Service>, K8sError> {
        Ok(self.services.clone())
    }

    async fn list_resource_quotas(
        &self,
        _namespace: &str,
    ) -> Result<Vec<ResourceQuota>, K8sError> {
        Ok(self.quotas.clone())
    }

    async fn list_raw(
        &self,
        _namespace: &str,
        _kind: &RawKind,
        _allow_missing: bool,
    ) -> Result<Vec<Value>, K8sError> {
        Ok(self.routes.clone())
    }

    async fn patch_replication_controller_replicas(
        &self,
        namespace: &str,
        name: &str,
        replicas: i32,
    ) -> Result<(), K8sError> {
        self.scaled
            .lock()
            .unwrap()
            .push((namespace.to_string(), name.to_string(), replicas));
        Ok(())
    }

    async fn delete_replication_controller(
        &self,
        _namespace: &str,
        name: &str,
    ) -> Result<(), K8sError> {
        self.deleted
            .lock()
            .unwrap()
            .push(format!("replicationcontroller/{name}"));
        Ok(())
    }

    async fn delete_service(&self, _namespace: &str, name: &str) -> Result<(), K8sError> {
        self.deleted.lock().unwrap().push(format!("service/{name}"));
        Ok(())
    }

    async fn delete_raw(
        &self,
        _namespace: &str,
        kind: &RawKind,
        name: &str,
    ) -> Result<(), K8sError> {
        self.deleted
            .lock()
            .unwrap()
            .push(format!("{}/{name}", kind.plural.trim_end_matches('s')));
        Ok(())
    }
}

/// Mock metrics backend with fixed answers.
#[derive(Default)]
pub struct MockMetrics {
    pub point: Option<UsagePoint>,
    pub series: Vec<UsagePoint>,
}

#[async_trait]
impl MetricsApi for MockMetrics {
    async fn usage_at(
        &self,
        _namespace: &str,
        pods: &[String],
        _at_ms: f64,
    ) -> Result<Option<UsagePoint>, K8sError> {
        if pods.is_empty() {
            return Ok(None);
        }
        Ok(self.point)
    }

    async fn usage_range(
        &self,
        _namespace: &str,
        pods: &[String],
        _start_ms: f64,
        _end_ms: f64,
    ) -> Result<Vec<UsagePoint>, K8sError> {
        if pods.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.series.clone())
    }
}

/// Factory handing out clients over the mock cluster and metrics backend.
pub struct MockClientFactory {
    pub cluster: Arc<MockCluster>,
    pub metrics: Arc<MockMetrics>,
}

#[async_trait]
impl ClientFactory for MockClientFactory {
    async fn deployments_client(&self) -> Result<DeploymentsClient, K8sError> {
        Ok(DeploymentsClient::new(
            self.cluster.clone(),
            self.metrics.clone(),
        ))
    }
}

/// Mock space directory with a fixed space mapping and namespace list.
#[derive(Default)]
pub struct MockDirectory {
    pub spaces: Vec<(Uuid, String)>,
    pub namespaces: Vec<EnvironmentNamespace>,
}

#[async_trait]
impl SpaceDirectory for MockDirectory {
    async fn space_by_id(&self, space_id: Uuid) -> Result<Option<SpaceRef>, DirectoryError> {
        Ok(self
            .spaces
            .iter()
            .find(|(id, _)| *id == space_id)
            .map(|(id, name)| SpaceRef {
                id: *id,
                name: name.clone(),
            }))
    }

    async fn environment_namespaces(
        &self,
    ) -> Result<Vec<EnvironmentNamespace>, DirectoryError> {
        Ok(self.namespaces.clone())
    }
}

/// Returns the namespaces of a space with one deployable `run` environment.
pub fn run_environment_namespaces(space: &str) -> Vec<EnvironmentNamespace> {
    vec![
        EnvironmentNamespace {
            name: space.to_string(),
            kind: "user".to_string(),
        },
        EnvironmentNamespace {
            name: format!("{space}-run"),
            kind: "run".to_string(),
        },
    ]
}

/// Labels shared by a generation's pod template and its pods.
pub fn template_labels(space: &str, application: &str) -> BTreeMap<String, String> {
    [
        ("app".to_string(), application.to_string()),
        ("space".to_string(), space.to_string()),
        ("version".to_string(), "1.0".to_string()),
    ]
    .into()
}

/// Builds a replication-controller generation for an application.
pub fn generation(
    space: &str,
    application: &str,
    ordinal: u64,
    replicas: i32,
) -> ReplicationController {
    ReplicationController {
        metadata: ObjectMeta {
            name: Some(format!("{application}-{ordinal}")),
            uid: Some(format!("uid-{application}-{ordinal}")),
            labels: Some([("space".to_string(), space.to_string())].into()),
            annotations: Some(
                [
                    (
                        "openshift.io/deployment-config.name".to_string(),
                        application.to_string(),
                    ),
                    (
                        "openshift.io/deployment-config.latest-version".to_string(),
                        ordinal.to_string(),
                    ),
                ]
                .into(),
            ),
            ..Default::default()
        },
        spec: Some(ReplicationControllerSpec {
            replicas: Some(replicas),
            template: Some(PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(template_labels(space, application)),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        image: Some(format!("registry.local/{space}/{application}:1.0")),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            }),
            ..Default::default()
        }),
        status: Some(ReplicationControllerStatus {
            replicas,
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Builds a running, fully ready pod owned by an application's template.
pub fn running_pod(space: &str, application: &str, name: &str) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(template_labels(space, application)),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container::default()],
            ..Default::default()
        }),
        status: Some(PodStatus {
            phase: Some("Running".to_string()),
            container_statuses: Some(vec![ContainerStatus {
                ready: true,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Builds a service selecting an application's pods.
pub fn service(application: &str) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(application.to_string()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some([("app".to_string(), application.to_string())].into()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Builds an admitted route pointing at a service.
pub fn admitted_route(application: &str, host: &str, admitted_at: &str) -> Value {
    json!({
        "metadata": { "name": format!("{application}-route") },
        "spec": { "to": { "name": application } },
        "status": {
            "ingress": [{
                "host": host,
                "conditions": [{
                    "type": "Admitted",
                    "status": "True",
                    "lastTransitionTime": admitted_at,
                }]
            }]
        }
    })
}

/// Builds a compute resource quota with used amounts.
pub fn compute_quota() -> ResourceQuota {
    let amounts = |cpu: &str, memory: &str| -> BTreeMap<String, Quantity> {
        [
            ("limits.cpu".to_string(), Quantity(cpu.to_string())),
            ("limits.memory".to_string(), Quantity(memory.to_string())),
        ]
        .into()
    };

    ResourceQuota {
        metadata: ObjectMeta {
            name: Some("compute-resources".to_string()),
            ..Default::default()
        },
        status: Some(ResourceQuotaStatus {
            hard: Some(amounts("2", "1Gi")),
            used: Some(amounts("500m", "512Mi")),
        }),
        ..Default::default()
    }
}
