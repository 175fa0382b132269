use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::VpnctlError;

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Wrapper for API errors to implement IntoResponse
#[derive(Debug)]
pub struct ApiError(pub VpnctlError);

impl From<VpnctlError> for ApiError {
    fn from(err: VpnctlError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            VpnctlError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            VpnctlError::NotFound(_) => StatusCode::NOT_FOUND,
            VpnctlError::Conflict(_)
            | VpnctlError::InvalidState(_)
            | VpnctlError::Cancelled(_) => StatusCode::CONFLICT,
            VpnctlError::InvalidParameter(_) | VpnctlError::ParseError(_) => StatusCode::BAD_REQUEST,
            VpnctlError::ConnectionFailed { .. } => StatusCode::BAD_GATEWAY,
            VpnctlError::NotSupported(_) => StatusCode::NOT_IMPLEMENTED,
            VpnctlError::ConfigError(_) | VpnctlError::ServiceError(_) | VpnctlError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Convert VpnctlError to HTTP response
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, details) = match self.0 {
            VpnctlError::Validation(msg) => ("validation failed".to_string(), Some(msg)),
            VpnctlError::ConnectionFailed { reason } => {
                ("connection failed".to_string(), Some(reason))
            }
            VpnctlError::ParseError(msg) => ("invalid request body".to_string(), Some(msg)),
            VpnctlError::NotFound(msg)
            | VpnctlError::Conflict(msg)
            | VpnctlError::InvalidParameter(msg)
            | VpnctlError::InvalidState(msg)
            | VpnctlError::Cancelled(msg)
            | VpnctlError::NotSupported(msg) => (msg, None),
            VpnctlError::ConfigError(msg) | VpnctlError::ServiceError(msg) => {
                warn!("Internal error: {}", msg);
                ("internal error".to_string(), Some(msg))
            }
            VpnctlError::Io(e) => {
                warn!("I/O error: {}", e);
                ("internal error".to_string(), Some(e.to_string()))
            }
        };

        (status, Json(ErrorResponse { error, details })).into_response()
    }
}
