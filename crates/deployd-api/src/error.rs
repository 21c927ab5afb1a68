//! Error → HTTP response mapping

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use deployd_core::Error;
use serde::Serialize;
use tracing::{error, warn};

/// Body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    /// Stable machine-readable kind
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// A core error on its way out of a handler
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::ConfigMissing => StatusCode::PRECONDITION_FAILED,
            Error::NoDnsRecord(_) | Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Provider { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// DNS failures (`provider_error`, `config_missing`, `no_dns_record`)
    /// are told apart from input failures by this code.
    pub fn code(&self) -> &'static str {
        match &self.0 {
            Error::Validation { .. } => "validation_error",
            Error::NotFound(_) => "not_found",
            Error::ConfigMissing => "config_missing",
            Error::NoDnsRecord(_) => "no_dns_record",
            Error::Conflict(_) => "conflict",
            Error::Provider { .. } => "provider_error",
            _ => "internal_error",
        }
    }

    fn body(&self) -> ErrorBody {
        let (message, field) = match &self.0 {
            Error::Validation { field, message } => (message.clone(), field.clone()),
            Error::NotFound(message) | Error::Conflict(message) => (message.clone(), None),
            Error::Provider { message, .. } => (message.clone(), None),
            other => (other.to_string(), None),
        };

        ErrorBody {
            message,
            code: self.code(),
            field,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed ({}): {}", status, self.0);
        } else if self.0.is_dns_failure() {
            warn!("DNS request rejected ({}): {}", status, self.0);
        }

        (status, Json(self.body())).into_response()
    }
}
