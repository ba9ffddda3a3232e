use std::sync::Arc;

use axum::{
    extract::State,
    http::{Method, Uri},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::instrument;

use crate::{
    config::{Config, Environment},
    gateway::{
        MvolaGateway,
        payin::{self, PaymentRequest, ValidationError},
    },
    merchant::{ApiError, Result, SuccessResponse},
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Text(String),
    Number(serde_json::Number),
}

impl From<Amount> for String {
    fn from(value: Amount) -> Self {
        match value {
            Amount::Text(text) => text,
            Amount::Number(number) => integral(&number).unwrap_or_else(|| number.to_string()),
        }
    }
}

/// Whole floats (`1e3`, `2500.0`) are written without exponent or fraction.
fn integral(number: &serde_json::Number) -> Option<String> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if !number.is_f64() {
        return None;
    }
    number
        .as_f64()
        .filter(|v| v.fract() == 0.0 && v.abs() <= MAX_EXACT)
        .map(|v| (v as i64).to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateBody {
    pub amount: Option<Amount>,
    pub customer_msisdn: Option<String>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub correlation_id: Option<String>,
}

impl TryFrom<InitiateBody> for PaymentRequest {
    type Error = ValidationError;

    fn try_from(body: InitiateBody) -> std::result::Result<Self, Self::Error> {
        PaymentRequest::new(body.amount.map(Into::into), body.customer_msisdn)?
            .with_description(body.description)
            .with_reference(body.reference)
            .with_correlation_id(body.correlation_id)
    }
}

fn checked_id(id: String) -> Result<String> {
    if payin::is_identifier(&id) {
        Ok(id)
    } else {
        Err(ApiError::Validation(
            "id must only contain letters, digits, '-', '_' or '.'".into(),
        ))
    }
}

#[instrument(skip_all)]
pub async fn initiate(
    State(gate): State<MvolaGateway>,
    Json(body): Json<InitiateBody>,
) -> Result<SuccessResponse<serde_json::Value>> {
    let payment = PaymentRequest::try_from(body).inspect_err(|e| {
        tracing::warn!("Rejected payment request: {e}");
    })?;
    match gate.initiate(&payment).await {
        Ok(initiated) => {
            tracing::info!(correlation_id = %initiated.correlation_id, "Initiated merchant payment");
            Ok(SuccessResponse::new(initiated.data).with_correlation_id(initiated.correlation_id))
        }
        Err(e) => {
            tracing::error!("Failed to initiate payment: {e}");
            Err(e.into())
        }
    }
}

#[instrument(skip_all)]
pub async fn status(
    State(gate): State<MvolaGateway>,
    Path(id): Path<String>,
) -> Result<SuccessResponse<serde_json::Value>> {
    let id = checked_id(id)?;
    match gate.status(&id).await {
        Ok(data) => {
            tracing::info!(%id, "Dispatched transaction status");
            Ok(SuccessResponse::new(data))
        }
        Err(e) => {
            tracing::error!(%id, "Failed to fetch transaction status: {e}");
            Err(e.into())
        }
    }
}

#[instrument(skip_all)]
pub async fn details(
    State(gate): State<MvolaGateway>,
    Path(id): Path<String>,
) -> Result<SuccessResponse<serde_json::Value>> {
    let id = checked_id(id)?;
    match gate.details(&id).await {
        Ok(data) => {
            tracing::info!(%id, "Dispatched transaction details");
            Ok(SuccessResponse::new(data))
        }
        Err(e) => {
            tracing::error!(%id, "Failed to fetch transaction details: {e}");
            Err(e.into())
        }
    }
}

/// Non-secret configuration. Credentials are reported as presence flags only.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigView {
    environment: Environment,
    token_url: String,
    api_url: String,
    partner_name: String,
    partner_msisdn: String,
    callback_url: Option<String>,
    has_consumer_key: bool,
    has_consumer_secret: bool,
    port: u16,
    http_timeout_secs: u64,
}

impl From<&Config> for ConfigView {
    fn from(config: &Config) -> Self {
        Self {
            environment: config.environment,
            token_url: config.token_url.clone(),
            api_url: config.api_url.clone(),
            partner_name: config.partner_name.clone(),
            partner_msisdn: config.partner_msisdn.clone(),
            callback_url: config.callback_url.clone(),
            has_consumer_key: config.consumer_key.is_some(),
            has_consumer_secret: config.consumer_secret.is_some(),
            port: config.port,
            http_timeout_secs: config.http_timeout.as_secs(),
        }
    }
}

pub async fn config(State(config): State<Arc<Config>>) -> SuccessResponse<ConfigView> {
    SuccessResponse::new(ConfigView::from(config.as_ref()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPreview {
    token: String,
    token_length: usize,
}

#[instrument(skip_all)]
pub async fn token(State(gate): State<MvolaGateway>) -> Result<SuccessResponse<TokenPreview>> {
    match gate.acquire_token().await {
        Ok(token) => Ok(SuccessResponse::new(TokenPreview {
            token: token.preview(),
            token_length: token.as_str().len(),
        })),
        Err(e) => {
            tracing::error!("Failed to acquire access token: {e}");
            Err(ApiError::Auth)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Health {
    success: bool,
    status: &'static str,
    message: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

pub async fn health() -> axum::Json<Health> {
    axum::Json(Health {
        success: true,
        status: "OK",
        message: "MVola payment gateway",
        timestamp: OffsetDateTime::now_utc(),
    })
}

pub async fn not_found(uri: Uri) -> ApiError {
    tracing::debug!(%uri, "Unmatched route");
    ApiError::NotFound
}

pub async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    tracing::debug!(%method, %uri, "Unsupported method");
    ApiError::MethodNotAllowed
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/initiate", post(initiate))
        .route("/status/{id}", get(status))
        .route("/details/{id}", get(details))
        .route("/config", get(config))
        .route("/token", get(token))
}

/// `Json` extractor wrapper that reports body errors in the merchant error envelope
pub struct Json<T>(pub T);

impl<S, T> axum::extract::FromRequest<S> for Json<T>
where
    T: serde::de::DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(
        req: axum::http::Request<axum::body::Body>,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(e) => Err(ApiError::Validation(e.body_text())),
        }
    }
}

/// `Path` extractor wrapper, same envelope as [`Json`]
pub struct Path<T>(pub T);

impl<S, T> axum::extract::FromRequestParts<S> for Path<T>
where
    T: serde::de::DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        match <axum::extract::Path<T> as axum::extract::FromRequestParts<S>>::from_request_parts(
            parts, state,
        )
        .await
        {
            Ok(axum::extract::Path(value)) => Ok(Self(value)),
            Err(e) => Err(ApiError::Validation(e.body_text())),
        }
    }
}
