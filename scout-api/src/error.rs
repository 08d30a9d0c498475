use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use scout_client::{ClientError, SearchError};
use scout_core::CoreError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    ValidationError { field: Option<String>, message: String },
    AccessError(String),
    UpstreamError(String),
    InternalServerError(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::ValidationError {
            field: None,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, field) = match self {
            AppError::ValidationError { field, message } => {
                (StatusCode::BAD_REQUEST, message, field)
            }
            AppError::AccessError(msg) => (StatusCode::FORBIDDEN, msg, None),
            AppError::UpstreamError(msg) => {
                tracing::warn!("Upstream failure: {}", msg);
                (StatusCode::BAD_GATEWAY, msg, None)
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string(), None)
            }
        };

        let body = match field {
            Some(field) => Json(json!({ "error": error_message, "field": field })),
            None => Json(json!({ "error": error_message })),
        };

        (status, body).into_response()
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Validation { field, message } => AppError::ValidationError {
                field: Some(field),
                message,
            },
            SearchError::Network { message } => AppError::UpstreamError(message),
            SearchError::ExpiredAccess => AppError::AccessError(err.to_string()),
        }
    }
}

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::InvalidAccessCode | ClientError::ExpiredAccess => {
                AppError::AccessError(err.to_string())
            }
            ClientError::MissingApiKey => AppError::validation(err.to_string()),
            ClientError::Network(_)
            | ClientError::Status { .. }
            | ClientError::MissingRate { .. } => AppError::UpstreamError(err.to_string()),
            ClientError::Storage(_) | ClientError::Serialization(_) => {
                AppError::InternalServerError(err.to_string())
            }
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(msg) => AppError::validation(msg),
            other => AppError::InternalServerError(other.to_string()),
        }
    }
}
