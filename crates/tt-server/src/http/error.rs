//! Mapping of service failures onto HTTP responses.

use std::any::Any;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::service::ServiceError;

/// An error as returned to HTTP clients: a status and `{"error": message}`.
#[derive(Debug)]
pub enum ApiError {
    Service(ServiceError),
    /// The request could not be decoded.
    BadRequest(String),
    /// No route matched.
    RouteNotFound,
    /// Anything unexpected. Details are logged, never returned.
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Service(ServiceError::Validation(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Service(ServiceError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Service(ServiceError::NotFound(_)) | Self::RouteNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Service(err) => err.to_string(),
            Self::BadRequest(message) => message.clone(),
            Self::RouteNotFound => "route not found".to_string(),
            Self::Internal => "internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_client_error() {
            tracing::debug!(status = status.as_u16(), error = %message, "request rejected");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self::Service(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(format!("invalid query: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(format!("invalid path: {}", rejection.body_text()))
    }
}

/// Turns a handler panic into a generic 500.
pub(crate) fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "handler panicked");
    ApiError::Internal.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_core::ValidationError;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(
            ApiError::from(ServiceError::Validation(ValidationError::MissingEnd)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ServiceError::Conflict("busy".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(ServiceError::NotFound("gone".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::Internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_error_hides_details() {
        let response = handle_panic(Box::new("index out of bounds".to_string()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::Internal.message(), "internal server error");
    }
}
