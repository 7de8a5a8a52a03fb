use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kiln_staging::WorkflowError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Pricing(e) => AppError::Validation(e.to_string()),
            WorkflowError::NotFound(sku) => AppError::NotFound(format!("No staged price for {}", sku)),
            WorkflowError::InvalidTransition(e) => AppError::Conflict(e.to_string()),
            e @ (WorkflowError::Storage(_) | WorkflowError::Catalog(_)) => AppError::Internal(e.to_string()),
        }
    }
}
