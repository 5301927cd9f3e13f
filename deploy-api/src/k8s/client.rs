use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::join_all;
use k8s_openapi::api::core::v1::Pod;
use tracing::debug;

use crate::directory::{EnvironmentNamespace, deployable_environments};
use crate::k8s::deployment::{
    Generations, SPACE_LABEL, application_name, display_version, label_selector,
    select_generations, template_labels,
};
use crate::k8s::pods::{PodStatusBreakdown, classify_pods};
use crate::k8s::quota::{EnvironmentQuota, summarize_quotas};
use crate::k8s::route::{
    ROUTE_KIND, RouteCandidate, decode_route, matching_services, resolve_route,
};
use crate::k8s::stats::{UsagePoint, UsageSeries, downsample, validate_series_window};
use crate::k8s::{K8sApi, K8sError, MetricsApi};

/// A space with its applications across the deployable environments.
#[derive(Debug, Clone)]
pub struct Space {
    pub name: String,
    pub applications: Vec<Application>,
}

/// One application with its deployments, one per environment where a
/// generation exists.
#[derive(Debug, Clone)]
pub struct Application {
    pub name: String,
    pub deployments: Vec<Deployment>,
}

/// Snapshot of one deployment in one environment.
#[derive(Debug, Clone)]
pub struct Deployment {
    pub application: String,
    /// Environment type tag the deployment runs in, e.g. `run`.
    pub environment: String,
    pub version: String,
    /// Opaque identifier of the current generation.
    pub generation: String,
    /// Name of the previous generation, present only mid-rollout.
    pub previous: Option<String>,
    pub pods: PodStatusBreakdown,
    /// Externally reachable address; absence is a normal state.
    pub url: Option<String>,
}

/// One environment with its quota usage.
#[derive(Debug, Clone)]
pub struct Environment {
    pub name: String,
    pub quota: Option<EnvironmentQuota>,
}

/// Point-in-time usage snapshot of a deployment.
#[derive(Debug, Clone)]
pub struct DeploymentStats {
    pub pods: PodStatusBreakdown,
    pub usage: Option<UsagePoint>,
}

/// A deployment resolved down to its generations and owned pods.
struct ResolvedDeployment {
    generations: Generations,
    labels: std::collections::BTreeMap<String, String>,
    pods: Vec<Pod>,
}

/// Request-scoped client assembling the deployment views.
///
/// One instance serves exactly one request: it is acquired through a
/// [`crate::k8s::ClientFactory`], never shared across requests, and released
/// by [`DeploymentsClient::close`] (or at scope end) on every exit path.
/// All fetch results are snapshots; nothing is cached across requests.
pub struct DeploymentsClient {
    api: Arc<dyn K8sApi>,
    metrics: Arc<dyn MetricsApi>,
}

impl DeploymentsClient {
    pub fn new(api: Arc<dyn K8sApi>, metrics: Arc<dyn MetricsApi>) -> Self {
        Self { api, metrics }
    }

    /// Releases the client.
    ///
    /// Consuming `self` guarantees the release happens at most once; callers
    /// that bail out early release the client implicitly at scope end.
    pub fn close(self) {
        debug!("cluster client released");
    }

    /// Assembles the full view of a space: every application that has a
    /// generation in one of the deployable environments.
    pub async fn get_space(
        &self,
        space: &str,
        environments: &[EnvironmentNamespace],
    ) -> Result<Space, K8sError> {
        let selector = space_selector(space);

        let mut names = BTreeSet::new();
        for environment in deployable_environments(environments) {
            let controllers = self
                .api
                .list_replication_controllers(&environment.name, Some(&selector))
                .await?;
            for controller in &controllers {
                if let Some(application) = application_name(controller) {
                    names.insert(application.to_string());
                }
            }
        }

        let applications = join_all(
            names
                .iter()
                .map(|name| self.get_application(space, name, environments)),
        )
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Space {
            name: space.to_string(),
            applications,
        })
    }

    /// Assembles one application across the deployable environments.
    ///
    /// Environments without a matching generation are simply absent from the
    /// result; only upstream failures abort the view.
    pub async fn get_application(
        &self,
        space: &str,
        application: &str,
        environments: &[EnvironmentNamespace],
    ) -> Result<Application, K8sError> {
        let mut deployments = Vec::new();
        for environment in deployable_environments(environments) {
            match self.get_deployment(space, application, &environment).await {
                Ok(deployment) => deployments.push(deployment),
                Err(K8sError::NotFound(_)) => continue,
                Err(err) => return Err(err),
            }
        }

        Ok(Application {
            name: application.to_string(),
            deployments,
        })
    }

    /// Assembles the snapshot of one deployment: generation summary, pod
    /// status buckets and the resolved route.
    pub async fn get_deployment(
        &self,
        space: &str,
        application: &str,
        environment: &EnvironmentNamespace,
    ) -> Result<Deployment, K8sError> {
        let resolved = self
            .resolve_deployment(space, application, &environment.name)
            .await?;
        let pods = classify_pods(&resolved.pods);

        // Services and routes are independent of each other; fetch them
        // concurrently.
        let (services, raw_routes) = tokio::try_join!(
            self.api.list_services(&environment.name),
            self.api.list_raw(&environment.name, &ROUTE_KIND, true),
        )?;

        let service_names = matching_services(&services, &resolved.labels);
        let routes: Vec<RouteCandidate> = raw_routes.iter().filter_map(decode_route).collect();
        let url = resolve_route(&routes, &service_names).map(|route| route.to_url());

        let current = &resolved.generations.current;
        Ok(Deployment {
            application: application.to_string(),
            environment: environment.kind.clone(),
            version: display_version(current),
            generation: current.metadata.uid.clone().unwrap_or_default(),
            previous: resolved
                .generations
                .previous
                .as_ref()
                .and_then(|controller| controller.metadata.name.clone()),
            pods,
            url,
        })
    }

    /// Scales the current generation and returns the previous replica count.
    pub async fn scale_deployment(
        &self,
        space: &str,
        application: &str,
        environment: &EnvironmentNamespace,
        replicas: i32,
    ) -> Result<i32, K8sError> {
        if replicas < 0 {
            return Err(K8sError::bad_parameter("pod count must not be negative"));
        }

        let generations = self
            .generations_in(space, application, &environment.name)
            .await?;
        let current = generations.current;
        let name = current
            .metadata
            .name
            .clone()
            .ok_or_else(|| K8sError::malformed("replication controller without a name"))?;
        let previous_count = current
            .spec
            .as_ref()
            .and_then(|spec| spec.replicas)
            .unwrap_or(0);

        self.api
            .patch_replication_controller_replicas(&environment.name, &name, replicas)
            .await?;
        debug!(
            application,
            environment = %environment.kind,
            from = previous_count,
            to = replicas,
            "scaled deployment",
        );

        Ok(previous_count)
    }

    /// Removes a deployment: its routes, its services and its generations.
    pub async fn delete_deployment(
        &self,
        space: &str,
        application: &str,
        environment: &EnvironmentNamespace,
    ) -> Result<(), K8sError> {
        let namespace = &environment.name;
        let generations = self.generations_in(space, application, namespace).await?;
        let labels = template_labels(&generations.current);

        let (services, raw_routes) = tokio::try_join!(
            self.api.list_services(namespace),
            self.api.list_raw(namespace, &ROUTE_KIND, true),
        )?;
        let service_names = matching_services(&services, &labels);

        for route in raw_routes.iter().filter_map(decode_route) {
            if service_names.contains(&route.target_service) && !route.name.is_empty() {
                self.api
                    .delete_raw(namespace, &ROUTE_KIND, &route.name)
                    .await?;
            }
        }
        for service in &service_names {
            self.api.delete_service(namespace, service).await?;
        }

        for controller in std::iter::once(&generations.current)
            .chain(generations.previous.iter())
        {
            if let Some(name) = controller.metadata.name.as_deref() {
                self.api
                    .delete_replication_controller(namespace, name)
                    .await?;
            }
        }

        Ok(())
    }

    /// Combines pod classification with one metrics sample.
    ///
    /// `at_ms` bounds the sample instant; without it the sample is taken at
    /// the current time.
    pub async fn get_deployment_stats(
        &self,
        space: &str,
        application: &str,
        environment: &EnvironmentNamespace,
        at_ms: Option<f64>,
    ) -> Result<DeploymentStats, K8sError> {
        let resolved = self
            .resolve_deployment(space, application, &environment.name)
            .await?;
        let pods = classify_pods(&resolved.pods);

        let at = at_ms.unwrap_or_else(now_ms);
        let usage = self
            .metrics
            .usage_at(&environment.name, &pod_names(&resolved.pods), at)
            .await?;

        Ok(DeploymentStats { pods, usage })
    }

    /// Fetches a usage series for the caller's window, downsampled to at
    /// most `limit` samples.
    pub async fn get_deployment_stat_series(
        &self,
        space: &str,
        application: &str,
        environment: &EnvironmentNamespace,
        start_ms: f64,
        end_ms: f64,
        limit: usize,
    ) -> Result<UsageSeries, K8sError> {
        validate_series_window(start_ms, end_ms, limit)?;

        let resolved = self
            .resolve_deployment(space, application, &environment.name)
            .await?;
        let samples = self
            .metrics
            .usage_range(&environment.name, &pod_names(&resolved.pods), start_ms, end_ms)
            .await?;

        Ok(UsageSeries {
            start: start_ms,
            end: end_ms,
            samples: downsample(samples, limit),
        })
    }

    /// Assembles the deployable environments with their quota usage.
    pub async fn get_environments(
        &self,
        environments: &[EnvironmentNamespace],
    ) -> Result<Vec<Environment>, K8sError> {
        let deployable = deployable_environments(environments);

        join_all(
            deployable
                .iter()
                .map(|environment| self.environment_view(environment)),
        )
        .await
        .into_iter()
        .collect()
    }

    /// Assembles one environment by its type tag.
    pub async fn get_environment(
        &self,
        name: &str,
        environments: &[EnvironmentNamespace],
    ) -> Result<Environment, K8sError> {
        let environment = environments
            .iter()
            .find(|environment| environment.kind == name)
            .ok_or_else(|| K8sError::not_found(format!("environment {name}")))?;

        self.environment_view(environment).await
    }

    async fn environment_view(
        &self,
        environment: &EnvironmentNamespace,
    ) -> Result<Environment, K8sError> {
        let quotas = self.api.list_resource_quotas(&environment.name).await?;

        Ok(Environment {
            name: environment.kind.clone(),
            quota: summarize_quotas(&quotas),
        })
    }

    async fn generations_in(
        &self,
        space: &str,
        application: &str,
        namespace: &str,
    ) -> Result<Generations, K8sError> {
        let selector = space_selector(space);
        let controllers = self
            .api
            .list_replication_controllers(namespace, Some(&selector))
            .await?;

        select_generations(controllers, application).ok_or_else(|| {
            K8sError::not_found(format!(
                "application {application} in namespace {namespace}"
            ))
        })
    }

    async fn resolve_deployment(
        &self,
        space: &str,
        application: &str,
        namespace: &str,
    ) -> Result<ResolvedDeployment, K8sError> {
        let generations = self.generations_in(space, application, namespace).await?;
        let labels = template_labels(&generations.current);

        // A template without labels would select every pod in the namespace;
        // treat it as owning none instead.
        let pods = if labels.is_empty() {
            Vec::new()
        } else {
            self.api
                .list_pods(namespace, Some(&label_selector(&labels)))
                .await?
        };

        Ok(ResolvedDeployment {
            generations,
            labels,
            pods,
        })
    }
}

fn space_selector(space: &str) -> String {
    format!("{SPACE_LABEL}={space}")
}

fn pod_names(pods: &[Pod]) -> Vec<String> {
    pods.iter()
        .filter_map(|pod| pod.metadata.name.clone())
        .collect()
}

fn now_ms() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64
}
