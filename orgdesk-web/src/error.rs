//! Error types for the web server and API responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use orgdesk_applications::{ApplicationError, DenialReason};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;

/// Error types for the web server
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;

impl From<sqlx::Error> for WebError {
    fn from(error: sqlx::Error) -> Self {
        WebError::Database(error.to_string())
    }
}

impl From<orgdesk_core::OrgdeskError> for WebError {
    fn from(error: orgdesk_core::OrgdeskError) -> Self {
        match error {
            orgdesk_core::OrgdeskError::Config { message, .. } => WebError::Config(message),
            other => WebError::Database(other.to_string()),
        }
    }
}

/// JSON body of every API error
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Stable machine-readable code
    #[schema(example = "NOT_A_MEMBER")]
    pub code: String,
    #[schema(example = "You are not a member of this organization")]
    pub message: String,
}

/// An API failure, mapped onto a status code and an [`ErrorBody`]
#[derive(Debug)]
pub enum ApiError {
    Denied(DenialReason),
    BadRequest { field: String, message: String },
    NotFound(String),
    Conflict(String),
    Internal,
}

/// Status code for a denial on an API route
pub fn denial_status(reason: DenialReason) -> StatusCode {
    match reason {
        DenialReason::Unauthenticated => StatusCode::UNAUTHORIZED,
        DenialReason::Forbidden | DenialReason::NotAMember => StatusCode::FORBIDDEN,
        DenialReason::CannotRemoveOwner => StatusCode::CONFLICT,
        DenialReason::LookupFailed => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Denied(reason) => denial_status(*reason),
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let (code, message) = match self {
            ApiError::Denied(reason) => (reason.code(), reason.message().to_string()),
            ApiError::BadRequest { field, message } => {
                ("VALIDATION_FAILED", format!("{}: {}", field, message))
            }
            ApiError::NotFound(message) => ("NOT_FOUND", message.clone()),
            ApiError::Conflict(message) => ("CONFLICT", message.clone()),
            ApiError::Internal => ("INTERNAL_ERROR", "Internal server error".to_string()),
        };
        ErrorBody {
            code: code.to_string(),
            message,
        }
    }
}

impl From<DenialReason> for ApiError {
    fn from(reason: DenialReason) -> Self {
        ApiError::Denied(reason)
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        match error {
            ApplicationError::Denied(reason) => {
                debug!(reason = %reason, "Request denied");
                ApiError::Denied(reason)
            }
            ApplicationError::Validation { field, message } => {
                ApiError::BadRequest { field, message }
            }
            ApplicationError::NotFound { message } => ApiError::NotFound(message),
            ApplicationError::Conflict { message } => ApiError::Conflict(message),
            ApplicationError::Core(error) => {
                // Details stay in the log, never in the response
                error.log();
                ApiError::Internal
            }
        }
    }
}

impl From<orgdesk_core::OrgdeskError> for ApiError {
    fn from(error: orgdesk_core::OrgdeskError) -> Self {
        ApplicationError::from(error).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal = self {
            error!("Responding with internal server error");
        }
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgdesk_core::storage_error;

    #[test]
    fn denials_map_to_api_statuses() {
        assert_eq!(
            denial_status(DenialReason::Unauthenticated),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(denial_status(DenialReason::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(denial_status(DenialReason::NotAMember), StatusCode::FORBIDDEN);
        assert_eq!(
            denial_status(DenialReason::CannotRemoveOwner),
            StatusCode::CONFLICT
        );
        assert_eq!(
            denial_status(DenialReason::LookupFailed),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn storage_failures_hide_their_details() {
        let error: ApiError =
            ApplicationError::Core(storage_error!("disk /var/db is full", "sqlite")).into();
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = error.body();
        assert_eq!(body.code, "INTERNAL_ERROR");
        assert!(!body.message.contains("/var/db"));
    }

    #[test]
    fn denial_bodies_carry_stable_codes() {
        let body = ApiError::from(DenialReason::NotAMember).body();
        assert_eq!(body.code, "NOT_A_MEMBER");
        assert_eq!(body.message, DenialReason::NotAMember.message());
    }
}
