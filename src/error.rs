use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    gateway::GatewayError,
    state::{
        nicknames::NicknameError,
        rotation::{ErrorKind, RosterError},
    },
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// The chat host could not carry out a request.
    #[error("chat gateway failure")]
    Gateway(#[source] GatewayError),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<GatewayError> for ServiceError {
    fn from(err: GatewayError) -> Self {
        ServiceError::Gateway(err)
    }
}

impl From<RosterError> for ServiceError {
    fn from(err: RosterError) -> Self {
        match err.kind() {
            ErrorKind::NotFound => ServiceError::NotFound(err.to_string()),
            ErrorKind::InvalidState => ServiceError::InvalidState(err.to_string()),
        }
    }
}

impl From<NicknameError> for ServiceError {
    fn from(err: NicknameError) -> Self {
        match err {
            NicknameError::Invalid(_) => ServiceError::InvalidInput(err.to_string()),
            NicknameError::AlreadyRegistered(_) => ServiceError::InvalidState(err.to_string()),
            NicknameError::NotRegistered(_) => ServiceError::NotFound(err.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Upstream chat host failed.
    #[error("bad gateway: {0}")]
    BadGateway(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Gateway(source) => AppError::BadGateway(source.to_string()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_errors_map_to_http_classes() {
        let not_found: AppError = ServiceError::from(RosterError::NotListed(3)).into();
        assert!(matches!(not_found, AppError::NotFound(_)));

        let conflict: AppError = ServiceError::from(RosterError::NothingToUndo).into();
        assert!(matches!(conflict, AppError::Conflict(_)));
        assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);

        let invalid: AppError = ServiceError::from(NicknameError::Invalid("x".into())).into();
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);

        let rejected = AppError::Unauthorized("invalid host token".into());
        assert_eq!(rejected.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}
