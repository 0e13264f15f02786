//! HTTP-facing errors of the OpenAI-compatible surface.
//!
//! Every failure is rendered as `{"error": {"message": "..."}}` with a status
//! code that tells the client whether retrying or re-authenticating helps.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::providers::RelayError;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Missing 'model' field. Use: {example}, {prefix}/{example} | Available: {}", .available.join(", "))]
    MissingModel {
        prefix: String,
        example: String,
        available: Vec<String>,
    },

    #[error("Invalid request body: {0}")]
    InvalidRequest(String),

    #[error("Provider '{0}' does not exist in the ClawAPI registry.")]
    UnknownProvider(String),

    #[error("Provider '{0}' has no saved session. Run: clawapi import {0} <FILE>")]
    Unauthenticated(String),

    #[error("Provider '{0}' is not installed. Run: clawapi add {0}, then restart ClawAPI")]
    NotInstalled(String),

    #[error(
        "Provider '{0}' is installed but not currently active. Restart the clawapi-gateway process"
    )]
    NotActive(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MissingModel { .. } | GatewayError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::UnknownProvider(_) => StatusCode::NOT_FOUND,
            GatewayError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            GatewayError::NotInstalled(_) | GatewayError::NotActive(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            GatewayError::Relay(RelayError::NotActive(_)) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Relay(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = json!({ "error": { "message": self.to_string() } });
        (self.status(), Json(body)).into_response()
    }
}
