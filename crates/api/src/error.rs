use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::services::PosError;
use domain::store::StoreError;
use serde::Serialize;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::services::catalog_sync::SyncRunError;
use crate::services::orders::OrderServiceError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation error: {}", summarize(.0))]
    InvalidFields(Vec<ValidationDetail>),

    /// Request is well-formed but not allowed in the current state.
    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    /// The POS provider failed or answered with something unusable.
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ValidationDetail>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationDetail {
    pub field: String,
    pub message: String,
}

fn summarize(details: &[ValidationDetail]) -> String {
    match details {
        [] => "Invalid request".to_string(),
        [single] if single.message.is_empty() => format!("Invalid field: {}", single.field),
        [single] => single.message.clone(),
        _ => format!("{} validation errors", details.len()),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            ApiError::InvalidFields(details) => {
                (StatusCode::BAD_REQUEST, "validation_error", summarize(details))
            }
            ApiError::Unprocessable(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "unprocessable",
                msg.clone(),
            ),
            ApiError::Upstream(msg) => {
                tracing::warn!("Upstream error: {}", msg);
                (StatusCode::BAD_GATEWAY, "upstream_error", msg.clone())
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg.clone(),
            ),
        };

        let details = match self {
            ApiError::InvalidFields(details) => Some(details),
            _ => None,
        };
        let body = ErrorBody {
            error: error_code.into(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => ApiError::NotFound(msg),
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Backend(msg) => ApiError::Internal(format!("Database error: {}", msg)),
        }
    }
}

impl From<PosError> for ApiError {
    fn from(err: PosError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

impl From<OrderServiceError> for ApiError {
    fn from(err: OrderServiceError) -> Self {
        match err {
            OrderServiceError::OrganizationNotFound(_)
            | OrderServiceError::OrderNotFound(_)
            | OrderServiceError::ProductNotFound(_) => ApiError::NotFound(err.to_string()),
            OrderServiceError::ProductUnavailable(_) => ApiError::Validation(err.to_string()),
            OrderServiceError::InvalidTransition { .. } => ApiError::Unprocessable(err.to_string()),
            OrderServiceError::Validation(errors) => ApiError::from(errors),
            OrderServiceError::Store(e) => ApiError::from(e),
        }
    }
}

impl From<SyncRunError> for ApiError {
    fn from(err: SyncRunError) -> Self {
        match err {
            SyncRunError::AlreadyRunning => ApiError::Conflict(err.to_string()),
        }
    }
}

/// Flatten nested errors into dotted paths such as `items[0].quantity`.
fn collect_details(prefix: &str, errors: &ValidationErrors, out: &mut Vec<ValidationDetail>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(errors) => {
                out.extend(errors.iter().map(|e| ValidationDetail {
                    field: path.clone(),
                    message: e.message.clone().map(|m| m.to_string()).unwrap_or_default(),
                }));
            }
            ValidationErrorsKind::Struct(nested) => collect_details(&path, nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_details(&format!("{}[{}]", path, index), nested, out);
                }
            }
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut details = Vec::new();
        collect_details("", &errors, &mut details);
        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::InvalidFields(details)
    }
}
