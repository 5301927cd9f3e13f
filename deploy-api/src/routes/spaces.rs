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
use crate::k8s::client::Space;
use crate::k8s::{ClientFactory, K8sError};
use crate::routes::applications::ReadApplicationResponse;
use crate::routes::{ErrorMessage, json_error_response, k8s_error_is_public, k8s_status_code};

#[derive(Debug, Error)]
pub enum SpaceError {
    #[error("the space {0} was not found")]
    SpaceNotFound(Uuid),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    K8s(#[from] K8sError),
}

impl SpaceError {
    fn to_message(&self) -> String {
        match self {
            SpaceError::Directory(DirectoryError::Transport(_)) => {
                "internal server error".to_string()
            }
            SpaceError::K8s(err) if !k8s_error_is_public(err) => {
                "internal server error".to_string()
            }
            err => err.to_string(),
        }
    }
}

impl ResponseError for SpaceError {
    fn status_code(&self) -> StatusCode {
        match self {
            SpaceError::SpaceNotFound(_) => StatusCode::NOT_FOUND,
            SpaceError::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SpaceError::K8s(err) => k8s_status_code(err),
        }
    }

    fn error_response(&self) -> HttpResponse {
        json_error_response(self.status_code(), self.to_message())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadSpaceResponse {
    #[schema(example = "myspace")]
    pub name: String,
    pub applications: Vec<ReadApplicationResponse>,
}

impl From<Space> for ReadSpaceResponse {
    fn from(space: Space) -> Self {
        Self {
            name: space.name,
            applications: space.applications.into_iter().map(Into::into).collect(),
        }
    }
}

#[utoipa::path(
    summary = "Retrieve a space",
    description = "Returns a space with its applications and their deployments.",
    params(
        ("space_id" = Uuid, Path, description = "Unique ID of the space"),
    ),
    responses(
        (status = 200, description = "Space retrieved successfully", body = ReadSpaceResponse),
        (status = 404, description = "Space not found", body = ErrorMessage),
        (status = 500, description = "Internal server error", body = ErrorMessage),
    ),
    tag = "Spaces"
)]
#[get("/spaces/{space_id}")]
pub async fn read_space(
    factory: Data<dyn ClientFactory>,
    directory: Data<dyn SpaceDirectory>,
    space_id: Path<Uuid>,
) -> Result<impl Responder, SpaceError> {
    let space_id = space_id.into_inner();

    let space = directory
        .space_by_id(space_id)
        .await?
        .ok_or(SpaceError::SpaceNotFound(space_id))?;
    let environments = directory.environment_namespaces().await?;

    let client = factory.deployments_client().await?;
    let result = client.get_space(&space.name, &environments).await;
    client.close();

    Ok(Json(ReadSpaceResponse::from(result?)))
}
