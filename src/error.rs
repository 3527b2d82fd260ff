use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum GatewayError {
    /// Secret store unreachable, timed out, or returned an unusable payload.
    #[error("credential fetch error: {0}")]
    CredentialFetch(String),

    /// Database unreachable, open timed out, or authentication rejected.
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("query source error: {0}")]
    QuerySource(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Stable machine-readable code for the error body.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::CredentialFetch(_) => "CREDENTIAL_ERROR",
            GatewayError::Connection(_) => "DATABASE_UNAVAILABLE",
            GatewayError::QuerySource(_) => "QUERY_SOURCE_ERROR",
            GatewayError::Query(_) => "QUERY_ERROR",
            GatewayError::Config(_) => "CONFIG_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Connection(_) => StatusCode::BAD_GATEWAY,
            GatewayError::CredentialFetch(_)
            | GatewayError::QuerySource(_)
            | GatewayError::Query(_)
            | GatewayError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let message = match self {
            GatewayError::CredentialFetch(_) => "Failed to resolve database credentials.",
            GatewayError::Connection(_) => "Database is unavailable.",
            GatewayError::QuerySource(_) => "Failed to load the query.",
            GatewayError::Query(_) => "Failed to execute the query.",
            GatewayError::Config(_) => "Service is misconfigured.",
        };
        let body = ApiErrorBody {
            code: self.code().to_string(),
            message: message.to_string(),
        };
        (self.status(), Json(ApiErrorResponse { error: body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
