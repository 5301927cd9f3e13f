use actix_web::HttpResponse;
use actix_web::http::{StatusCode, header::ContentType};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::k8s::K8sError;

pub mod applications;
pub mod deployments;
pub mod environments;
pub mod health_check;
pub mod metrics;
pub mod spaces;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorMessage {
    #[schema(example = "an error occurred in the api")]
    pub error: String,
}

/// HTTP status for an engine error: not-found and bad-parameter outcomes
/// keep their meaning, everything else is an internal failure.
pub(crate) fn k8s_status_code(err: &K8sError) -> StatusCode {
    match err {
        K8sError::NotFound(_) => StatusCode::NOT_FOUND,
        K8sError::BadParameter(_) => StatusCode::BAD_REQUEST,
        K8sError::UpstreamStatus { .. }
        | K8sError::Upstream(_)
        | K8sError::MetricsTransport(_)
        | K8sError::Malformed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Whether an engine error may be echoed to the caller. Transport errors can
/// carry connection details that should only reach the logs.
pub(crate) fn k8s_error_is_public(err: &K8sError) -> bool {
    !matches!(err, K8sError::Upstream(_) | K8sError::MetricsTransport(_))
}

pub(crate) fn json_error_response(status: StatusCode, message: String) -> HttpResponse {
    let error_message = ErrorMessage { error: message };
    let body = serde_json::to_string(&error_message).expect("failed to serialize error message");
    HttpResponse::build(status)
        .insert_header(ContentType::json())
        .body(body)
}
