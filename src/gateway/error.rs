use std::fmt::Display;

use axum::http::{StatusCode, header::InvalidHeaderValue};

/// Token acquisition failure. The inner details are logged, never returned to callers.
#[derive(Debug)]
pub enum AuthFailure {
    MissingCredentials,
    /// Key or secret contains bytes that cannot travel in an `Authorization` header
    InvalidCredentials(InvalidHeaderValue),
    Rejected { status: StatusCode, body: String },
    Request(reqwest::Error),
    MalformedResponse(serde_json::Error),
}

impl Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCredentials => f.write_str("consumer key or secret is not configured"),
            Self::InvalidCredentials(e) => {
                write!(f, "consumer credentials are not a valid header value: {e}")
            }
            Self::Rejected { status, body } => {
                write!(f, "identity endpoint answered {status}: {body}")
            }
            Self::Request(e) => write!(f, "identity endpoint request error: {e}"),
            Self::MalformedResponse(e) => write!(f, "token response deserialization: {e}"),
        }
    }
}

#[derive(Debug)]
pub enum GatewayError {
    Auth(AuthFailure),
    /// Provider answered with a non-2xx status
    Provider {
        status: StatusCode,
        body: serde_json::Value,
    },
    Timeout,
    RequestError(reqwest::Error),
    InvalidHeader(InvalidHeaderValue),
}

impl From<reqwest::Error> for GatewayError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            return Self::Timeout;
        }
        Self::RequestError(value)
    }
}

impl From<AuthFailure> for GatewayError {
    fn from(value: AuthFailure) -> Self {
        Self::Auth(value)
    }
}

impl From<InvalidHeaderValue> for GatewayError {
    fn from(value: InvalidHeaderValue) -> Self {
        Self::InvalidHeader(value)
    }
}

impl std::error::Error for GatewayError {}
impl std::error::Error for AuthFailure {}

impl Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Auth(e) => write!(f, "authentication failure: {e}"),
            GatewayError::Provider { status, body } => {
                write!(f, "gateway response {status}: {body}")
            }
            GatewayError::Timeout => f.write_str("gateway request timed out"),
            GatewayError::RequestError(e) => write!(f, "http request error: {e}"),
            GatewayError::InvalidHeader(e) => write!(f, "invalid provider header value: {e}"),
        }
    }
}
