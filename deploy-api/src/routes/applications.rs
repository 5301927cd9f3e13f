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
use crate::k8s::client::Application;
use crate::k8s::{ClientFactory, K8sError};
use crate::routes::deployments::ReadDeploymentResponse;
use crate::routes::{ErrorMessage, json_error_response, k8s_error_is_public, k8s_status_code};

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("the space {0} was not found")]
    SpaceNotFound(Uuid),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    K8s(#[from] K8sError),
}

impl ApplicationError {
    fn to_message(&self) -> String {
        match self {
            ApplicationError::Directory(DirectoryError::Transport(_)) => {
                "internal server error".to_string()
            }
            ApplicationError::K8s(err) if !k8s_error_is_public(err) => {
                "internal server error".to_string()
            }
            err => err.to_string(),
        }
    }
}

impl ResponseError for ApplicationError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApplicationError::SpaceNotFound(_) => StatusCode::NOT_FOUND,
            ApplicationError::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApplicationError::K8s(err) => k8s_status_code(err),
        }
    }

    fn error_response(&self) -> HttpResponse {
        json_error_response(self.status_code(), self.to_message())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadApplicationResponse {
    #[schema(example = "myapp")]
    pub name: String,
    /// Deployments of the application, one per environment where a
    /// generation exists.
    pub deployments: Vec<ReadDeploymentResponse>,
}

impl From<Application> for ReadApplicationResponse {
    fn from(application: Application) -> Self {
        Self {
            name: application.name,
            deployments: application
                .deployments
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}

#[utoipa::path(
    summary = "Retrieve an application",
    description = "Returns an application with its deployments across environments.",
    params(
        ("space_id" = Uuid, Path, description = "Unique ID of the space"),
        ("application_name" = String, Path, description = "Name of the application"),
    ),
    responses(
        (status = 200, description = "Application retrieved successfully", body = ReadApplicationResponse),
        (status = 404, description = "Space or application not found", body = ErrorMessage),
        (status = 500, description = "Internal server error", body = ErrorMessage),
    ),
    tag = "Applications"
)]
#[get("/spaces/{space_id}/applications/{application_name}")]
pub async fn read_application(
    factory: Data<dyn ClientFactory>,
    directory: Data<dyn SpaceDirectory>,
    path: Path<(Uuid, String)>,
) -> Result<impl Responder, ApplicationError> {
    let (space_id, application_name) = path.into_inner();

    let space = directory
        .space_by_id(space_id)
        .await?
        .ok_or(ApplicationError::SpaceNotFound(space_id))?;
    let environments = directory.environment_namespaces().await?;

    let client = factory.deployments_client().await?;
    let result = client
        .get_application(&space.name, &application_name, &environments)
        .await;
    client.close();

    Ok(Json(ReadApplicationResponse::from(result?)))
}
