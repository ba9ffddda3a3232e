use axum::response::IntoResponse;
use reqwest::StatusCode;
use serde::Serialize;

use crate::gateway::{error::GatewayError, mask, payin::ValidationError};

pub mod api;
pub mod interaction_log;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            correlation_id: None,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: String) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

impl<T: Serialize> IntoResponse for SuccessResponse<T> {
    fn into_response(self) -> axum::response::Response {
        tracing::debug!(data = %mask::secure_serializable(&self), "Merchant API response payload");
        axum::Json(self).into_response()
    }
}

/// Every failure the merchant surface can report.
#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    Auth,
    Provider {
        status: StatusCode,
        body: serde_json::Value,
    },
    Network,
    Timeout,
    NotFound,
    MethodNotAllowed,
    Internal,
}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<GatewayError> for ApiError {
    fn from(value: GatewayError) -> Self {
        match value {
            GatewayError::Auth(_) => Self::Auth,
            GatewayError::Provider { status, body } => Self::Provider { status, body },
            GatewayError::Timeout => Self::Timeout,
            GatewayError::RequestError(_) => Self::Network,
            GatewayError::InvalidHeader(_) => Self::Internal,
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            // Only error statuses are mirrored
            Self::Provider { status, .. } if status.is_client_error() || status.is_server_error() => {
                *status
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Validation(text) => text.clone(),
            Self::Auth => "Failed to authenticate with the payment provider".into(),
            Self::Provider { .. } => "Payment provider rejected the request".into(),
            Self::Network => "Payment provider is unreachable".into(),
            Self::Timeout => "Payment provider did not respond in time".into(),
            Self::NotFound => "Route not found".into(),
            Self::MethodNotAllowed => "Method not allowed".into(),
            Self::Internal => "Internal server error".into(),
        }
    }
}

impl std::error::Error for ApiError {}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    success: bool,
    error: String,
    details: serde_json::Value,
    http_status: u16,
}

impl From<&ApiError> for ErrorResponse {
    fn from(value: &ApiError) -> Self {
        let details = match value {
            ApiError::Provider { body, .. } => body.clone(),
            _ => serde_json::Value::Null,
        };
        Self {
            success: false,
            error: value.message(),
            details,
            http_status: value.status().as_u16(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let body = ErrorResponse::from(&self);
        tracing::debug!(data = %mask::secure_serializable(&body), "Merchant API error response payload");
        (status, axum::Json(body)).into_response()
    }
}
