//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del pipeline GPS
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        AppError::Cache(e.to_string())
    }
}

/// Alias de Result para los handlers de la API
pub type AppResult<T> = Result<T, AppError>;

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            AppError::Json(e) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Invalid JSON".to_string(),
                    message: e.to_string(),
                    details: None,
                    code: Some("INVALID_JSON".to_string()),
                },
            ),

            AppError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Validation Error".to_string(),
                    message: "The provided data is invalid".to_string(),
                    details: Some(json!(e)),
                    code: Some("VALIDATION_ERROR".to_string()),
                },
            ),

            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Bad Request".to_string(),
                    message: msg,
                    details: None,
                    code: Some("BAD_REQUEST".to_string()),
                },
            ),

            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: "Not Found".to_string(),
                    message: msg,
                    details: None,
                    code: Some("NOT_FOUND".to_string()),
                },
            ),

            AppError::Cache(msg) => {
                tracing::error!("❌ Error de cache: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse {
                        error: "Cache Error".to_string(),
                        message: "The position cache is unavailable".to_string(),
                        details: Some(json!({ "cache_error": msg })),
                        code: Some("CACHE_ERROR".to_string()),
                    },
                )
            }

            AppError::Broker(msg) => {
                tracing::error!("❌ Error del broker: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse {
                        error: "Broker Error".to_string(),
                        message: "The event broker is unavailable".to_string(),
                        details: Some(json!({ "broker_error": msg })),
                        code: Some("BROKER_ERROR".to_string()),
                    },
                )
            }

            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "Internal Server Error".to_string(),
                    message: msg,
                    details: None,
                    code: Some("INTERNAL_ERROR".to_string()),
                },
            ),

            AppError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse {
                    error: "Service Unavailable".to_string(),
                    message: msg,
                    details: None,
                    code: Some("SERVICE_UNAVAILABLE".to_string()),
                },
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_responds_400() {
        let response = AppError::BadRequest("matrícula vacía".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn cache_error_responds_503() {
        let response = AppError::Cache("connection refused".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
