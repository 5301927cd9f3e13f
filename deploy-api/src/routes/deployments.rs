use actix_web::{
    HttpResponse, Responder, ResponseError, delete, get,
    http::StatusCode,
    put,
    web::{Data, Json, Path, Query},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::directory::{DirectoryError, EnvironmentNamespace, SpaceDirectory, SpaceRef};
use crate::k8s::client::{Deployment, DeploymentStats};
use crate::k8s::stats::{UsagePoint, UsageSeries};
use crate::k8s::{ClientFactory, K8sError};
use crate::routes::{ErrorMessage, json_error_response, k8s_error_is_public, k8s_status_code};

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("the space {0} was not found")]
    SpaceNotFound(Uuid),

    #[error("the environment {0} was not found")]
    EnvironmentNotFound(String),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    K8s(#[from] K8sError),
}

impl DeploymentError {
    fn to_message(&self) -> String {
        match self {
            // Do not expose transport details in error messages; they are
            // visible through logs.
            DeploymentError::Directory(DirectoryError::Transport(_)) => {
                "internal server error".to_string()
            }
            DeploymentError::K8s(err) if !k8s_error_is_public(err) => {
                "internal server error".to_string()
            }
            err => err.to_string(),
        }
    }
}

impl ResponseError for DeploymentError {
    fn status_code(&self) -> StatusCode {
        match self {
            DeploymentError::SpaceNotFound(_) | DeploymentError::EnvironmentNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            DeploymentError::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DeploymentError::K8s(err) => k8s_status_code(err),
        }
    }

    fn error_response(&self) -> HttpResponse {
        json_error_response(self.status_code(), self.to_message())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadDeploymentResponse {
    #[schema(example = "myapp")]
    pub application: String,
    #[schema(example = "run")]
    pub environment: String,
    #[schema(example = "1.0.2")]
    pub version: String,
    /// Opaque identifier of the current generation.
    pub generation: String,
    /// Name of the previous generation, present only mid-rollout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    /// Pod status buckets as (label, count) pairs in a fixed order.
    pub pods: Vec<(String, String)>,
    #[schema(example = 1)]
    pub pods_total: usize,
    /// Externally reachable URL; absent when no route is admitted.
    #[schema(example = "http://myapp.example.com")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<Deployment> for ReadDeploymentResponse {
    fn from(deployment: Deployment) -> Self {
        Self {
            application: deployment.application,
            environment: deployment.environment,
            version: deployment.version,
            generation: deployment.generation,
            previous: deployment.previous,
            pods: deployment.pods.buckets,
            pods_total: deployment.pods.total,
            url: deployment.url,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetDeploymentRequest {
    /// Desired pod count.
    #[schema(example = 3, required = true)]
    pub pods: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetDeploymentResponse {
    /// Pod count before the scale.
    #[schema(example = 1)]
    pub previous_pods: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GetDeploymentStatsResponse {
    /// Pod status buckets as (label, count) pairs in a fixed order.
    pub pods: Vec<(String, String)>,
    #[schema(example = 1)]
    pub pods_total: usize,
    /// Usage sample, absent when the metrics backend has no data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsagePoint>,
}

impl From<DeploymentStats> for GetDeploymentStatsResponse {
    fn from(stats: DeploymentStats) -> Self {
        Self {
            pods: stats.pods.buckets,
            pods_total: stats.pods.total,
            usage: stats.usage,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GetDeploymentStatSeriesResponse {
    /// Window start, Unix milliseconds.
    pub start: f64,
    /// Window end, Unix milliseconds.
    pub end: f64,
    pub samples: Vec<UsagePoint>,
}

impl From<UsageSeries> for GetDeploymentStatSeriesResponse {
    fn from(series: UsageSeries) -> Self {
        Self {
            start: series.start,
            end: series.end,
            samples: series.samples,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct StatsParams {
    /// Sample instant bound, Unix milliseconds. Defaults to now.
    pub start: Option<f64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct StatSeriesParams {
    /// Window start, Unix milliseconds.
    pub start: f64,
    /// Window end, Unix milliseconds.
    pub end: f64,
    /// Maximum number of samples returned.
    pub limit: usize,
}

/// Resolves the space and the addressed environment for a deployment
/// request.
async fn resolve_context(
    directory: &dyn SpaceDirectory,
    space_id: Uuid,
    environment_name: &str,
) -> Result<(SpaceRef, EnvironmentNamespace), DeploymentError> {
    let space = directory
        .space_by_id(space_id)
        .await?
        .ok_or(DeploymentError::SpaceNotFound(space_id))?;

    let environment = directory
        .environment_namespaces()
        .await?
        .into_iter()
        .find(|environment| environment.kind == environment_name)
        .ok_or_else(|| DeploymentError::EnvironmentNotFound(environment_name.to_string()))?;

    Ok((space, environment))
}

#[utoipa::path(
    summary = "Retrieve a deployment",
    description = "Returns the deployment snapshot of an application in one environment.",
    params(
        ("space_id" = Uuid, Path, description = "Unique ID of the space"),
        ("application_name" = String, Path, description = "Name of the application"),
        ("environment_name" = String, Path, description = "Name of the environment"),
    ),
    responses(
        (status = 200, description = "Deployment retrieved successfully", body = ReadDeploymentResponse),
        (status = 404, description = "Space, environment or deployment not found", body = ErrorMessage),
        (status = 500, description = "Internal server error", body = ErrorMessage),
    ),
    tag = "Deployments"
)]
#[get("/spaces/{space_id}/applications/{application_name}/deployments/{environment_name}")]
pub async fn read_deployment(
    factory: Data<dyn ClientFactory>,
    directory: Data<dyn SpaceDirectory>,
    path: Path<(Uuid, String, String)>,
) -> Result<impl Responder, DeploymentError> {
    let (space_id, application_name, environment_name) = path.into_inner();
    let (space, environment) =
        resolve_context(directory.as_ref(), space_id, &environment_name).await?;

    let client = factory.deployments_client().await?;
    let result = client
        .get_deployment(&space.name, &application_name, &environment)
        .await;
    client.close();

    Ok(Json(ReadDeploymentResponse::from(result?)))
}

#[utoipa::path(
    summary = "Scale a deployment",
    description = "Sets the desired pod count and responds with the previous one.",
    request_body = SetDeploymentRequest,
    params(
        ("space_id" = Uuid, Path, description = "Unique ID of the space"),
        ("application_name" = String, Path, description = "Name of the application"),
        ("environment_name" = String, Path, description = "Name of the environment"),
    ),
    responses(
        (status = 200, description = "Deployment scaled successfully", body = SetDeploymentResponse),
        (status = 400, description = "Bad request", body = ErrorMessage),
        (status = 404, description = "Space, environment or deployment not found", body = ErrorMessage),
        (status = 500, description = "Internal server error", body = ErrorMessage),
    ),
    tag = "Deployments"
)]
#[put("/spaces/{space_id}/applications/{application_name}/deployments/{environment_name}")]
pub async fn set_deployment(
    factory: Data<dyn ClientFactory>,
    directory: Data<dyn SpaceDirectory>,
    path: Path<(Uuid, String, String)>,
    request: Json<SetDeploymentRequest>,
) -> Result<impl Responder, DeploymentError> {
    let (space_id, application_name, environment_name) = path.into_inner();
    let (space, environment) =
        resolve_context(directory.as_ref(), space_id, &environment_name).await?;

    let client = factory.deployments_client().await?;
    let result = client
        .scale_deployment(&space.name, &application_name, &environment, request.pods)
        .await;
    client.close();

    let previous_pods = result?;

    Ok(Json(SetDeploymentResponse { previous_pods }))
}

#[utoipa::path(
    summary = "Delete a deployment",
    description = "Removes a deployment's generations, services and routes.",
    params(
        ("space_id" = Uuid, Path, description = "Unique ID of the space"),
        ("application_name" = String, Path, description = "Name of the application"),
        ("environment_name" = String, Path, description = "Name of the environment"),
    ),
    responses(
        (status = 200, description = "Deployment deleted successfully"),
        (status = 404, description = "Space, environment or deployment not found", body = ErrorMessage),
        (status = 500, description = "Internal server error", body = ErrorMessage),
    ),
    tag = "Deployments"
)]
#[delete("/spaces/{space_id}/applications/{application_name}/deployments/{environment_name}")]
pub async fn delete_deployment(
    factory: Data<dyn ClientFactory>,
    directory: Data<dyn SpaceDirectory>,
    path: Path<(Uuid, String, String)>,
) -> Result<impl Responder, DeploymentError> {
    let (space_id, application_name, environment_name) = path.into_inner();
    let (space, environment) =
        resolve_context(directory.as_ref(), space_id, &environment_name).await?;

    let client = factory.deployments_client().await?;
    let result = client
        .delete_deployment(&space.name, &application_name, &environment)
        .await;
    client.close();
    result?;

    Ok(HttpResponse::Ok().finish())
}

#[utoipa::path(
    summary = "Retrieve deployment statistics",
    description = "Returns the pod status buckets combined with one usage sample.",
    params(
        ("space_id" = Uuid, Path, description = "Unique ID of the space"),
        ("application_name" = String, Path, description = "Name of the application"),
        ("environment_name" = String, Path, description = "Name of the environment"),
        StatsParams,
    ),
    responses(
        (status = 200, description = "Statistics retrieved successfully", body = GetDeploymentStatsResponse),
        (status = 404, description = "Space, environment or deployment not found", body = ErrorMessage),
        (status = 500, description = "Internal server error", body = ErrorMessage),
    ),
    tag = "Deployments"
)]
#[get("/spaces/{space_id}/applications/{application_name}/deployments/{environment_name}/stats")]
pub async fn get_deployment_stats(
    factory: Data<dyn ClientFactory>,
    directory: Data<dyn SpaceDirectory>,
    path: Path<(Uuid, String, String)>,
    params: Query<StatsParams>,
) -> Result<impl Responder, DeploymentError> {
    let (space_id, application_name, environment_name) = path.into_inner();
    let (space, environment) =
        resolve_context(directory.as_ref(), space_id, &environment_name).await?;

    let client = factory.deployments_client().await?;
    let result = client
        .get_deployment_stats(&space.name, &application_name, &environment, params.start)
        .await;
    client.close();

    Ok(Json(GetDeploymentStatsResponse::from(result?)))
}

#[utoipa::path(
    summary = "Retrieve a deployment statistics series",
    description = "Returns usage samples over the requested window, downsampled to the limit.",
    params(
        ("space_id" = Uuid, Path, description = "Unique ID of the space"),
        ("application_name" = String, Path, description = "Name of the application"),
        ("environment_name" = String, Path, description = "Name of the environment"),
        StatSeriesParams,
    ),
    responses(
        (status = 200, description = "Series retrieved successfully", body = GetDeploymentStatSeriesResponse),
        (status = 400, description = "Bad request", body = ErrorMessage),
        (status = 404, description = "Space, environment or deployment not found", body = ErrorMessage),
        (status = 500, description = "Internal server error", body = ErrorMessage),
    ),
    tag = "Deployments"
)]
#[get("/spaces/{space_id}/applications/{application_name}/deployments/{environment_name}/statseries")]
pub async fn get_deployment_stat_series(
    factory: Data<dyn ClientFactory>,
    directory: Data<dyn SpaceDirectory>,
    path: Path<(Uuid, String, String)>,
    params: Query<StatSeriesParams>,
) -> Result<impl Responder, DeploymentError> {
    let (space_id, application_name, environment_name) = path.into_inner();
    let (space, environment) =
        resolve_context(directory.as_ref(), space_id, &environment_name).await?;

    let client = factory.deployments_client().await?;
    let result = client
        .get_deployment_stat_series(
            &space.name,
            &application_name,
            &environment,
            params.start,
            params.end,
            params.limit,
        )
        .await;
    client.close();

    Ok(Json(GetDeploymentStatSeriesResponse::from(result?)))
}
