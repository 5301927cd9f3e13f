use actix_web::{
    HttpResponse, Responder, ResponseError, get,
    http::StatusCode,
    web::{Data, Json, Path},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::directory::{DirectoryError, SpaceDirectory};
use crate::k8s::client::Environment;
use crate::k8s::quota::EnvironmentQuota;
use crate::k8s::{ClientFactory, K8sError};
use crate::routes::{ErrorMessage, json_error_response, k8s_error_is_public, k8s_status_code};

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("the space {0} was not found")]
    SpaceNotFound(Uuid),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    K8s(#[from] K8sError),
}

impl EnvironmentError {
    fn to_message(&self) -> String {
        match self {
            EnvironmentError::Directory(DirectoryError::Transport(_)) => {
                "internal server error".to_string()
            }
            EnvironmentError::K8s(err) if !k8s_error_is_public(err) => {
                "internal server error".to_string()
            }
            err => err.to_string(),
        }
    }
}

impl ResponseError for EnvironmentError {
    fn status_code(&self) -> StatusCode {
        match self {
            EnvironmentError::SpaceNotFound(_) => StatusCode::NOT_FOUND,
            EnvironmentError::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
            EnvironmentError::K8s(err) => k8s_status_code(err),
        }
    }

    fn error_response(&self) -> HttpResponse {
        json_error_response(self.status_code(), self.to_message())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadEnvironmentResponse {
    #[schema(example = "run")]
    pub name: String,
    /// Quota usage of the environment, absent when the namespace defines no
    /// quota.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<EnvironmentQuota>,
}

impl From<Environment> for ReadEnvironmentResponse {
    fn from(environment: Environment) -> Self {
        Self {
            name: environment.name,
            quota: environment.quota,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadEnvironmentsResponse {
    pub environments: Vec<ReadEnvironmentResponse>,
}

#[utoipa::path(
    summary = "List space environments",
    description = "Returns the deployable environments with their quota usage.",
    params(
        ("space_id" = Uuid, Path, description = "Unique ID of the space"),
    ),
    responses(
        (status = 200, description = "Environments listed successfully", body = ReadEnvironmentsResponse),
        (status = 404, description = "Space not found", body = ErrorMessage),
        (status = 500, description = "Internal server error", body = ErrorMessage),
    ),
    tag = "Environments"
)]
#[get("/spaces/{space_id}/environments")]
pub async fn list_space_environments(
    factory: Data<dyn ClientFactory>,
    directory: Data<dyn SpaceDirectory>,
    space_id: Path<Uuid>,
) -> Result<impl Responder, EnvironmentError> {
    let space_id = space_id.into_inner();

    directory
        .space_by_id(space_id)
        .await?
        .ok_or(EnvironmentError::SpaceNotFound(space_id))?;
    let environments = directory.environment_namespaces().await?;

    let client = factory.deployments_client().await?;
    let result = client.get_environments(&environments).await;
    client.close();

    let environments = result?
        .into_iter()
        .map(ReadEnvironmentResponse::from)
        .collect();

    Ok(Json(ReadEnvironmentsResponse { environments }))
}

#[utoipa::path(
    summary = "Retrieve an environment",
    description = "Returns one environment with its quota usage.",
    params(
        ("environment_name" = String, Path, description = "Name of the environment"),
    ),
    responses(
        (status = 200, description = "Environment retrieved successfully", body = ReadEnvironmentResponse),
        (status = 404, description = "Environment not found", body = ErrorMessage),
        (status = 500, description = "Internal server error", body = ErrorMessage),
    ),
    tag = "Environments"
)]
#[get("/environments/{environment_name}")]
pub async fn read_environment(
    factory: Data<dyn ClientFactory>,
    directory: Data<dyn SpaceDirectory>,
    environment_name: Path<String>,
) -> Result<impl Responder, EnvironmentError> {
    let environment_name = environment_name.into_inner();
    let environments = directory.environment_namespaces().await?;

    let client = factory.deployments_client().await?;
    let result = client
        .get_environment(&environment_name, &environments)
        .await;
    client.close();

    Ok(Json(ReadEnvironmentResponse::from(result?)))
}
