use axum::http::{
    HeaderMap, HeaderName, HeaderValue,
    header::{AUTHORIZATION, InvalidHeaderValue},
};
use axum_extra::headers::{self, HeaderMapExt};
use base64::{Engine, prelude::BASE64_STANDARD};

use crate::{
    config::Config,
    gateway::{MvolaGateway, error::AuthFailure, mask},
    merchant::interaction_log::InteractionSpan,
};

const GRANT_TYPE: &str = "client_credentials";
const SCOPE: &str = "EXT_INT_MVOLA_SCOPE";
const API_VERSION: &str = "1.0";

static VERSION: HeaderName = HeaderName::from_static("version");
static CORRELATION_ID: HeaderName = HeaderName::from_static("x-correlationid");
static USER_LANGUAGE: HeaderName = HeaderName::from_static("userlanguage");
static USER_ACCOUNT_IDENTIFIER: HeaderName = HeaderName::from_static("useraccountidentifier");
static PARTNER_NAME: HeaderName = HeaderName::from_static("partnername");
static CALLBACK_URL: HeaderName = HeaderName::from_static("x-callback-url");

/// Short-lived bearer token. Never cached, one per outbound call chain.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    const PREVIEW_LEN: usize = 20;

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters of the token, for manual verification.
    pub fn preview(&self) -> String {
        let prefix: String = self.0.chars().take(Self::PREVIEW_LEN).collect();
        format!("{prefix}...")
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AccessToken").field(&"***").finish()
    }
}

#[derive(Debug, serde::Serialize)]
struct TokenRequest {
    grant_type: &'static str,
    scope: &'static str,
}

#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub fn basic_credential(consumer_key: &str, consumer_secret: &str) -> String {
    BASE64_STANDARD.encode(format!("{consumer_key}:{consumer_secret}"))
}

/// `Authorization: Basic ...` value for the identity endpoint, marked sensitive.
fn basic_authorization(
    consumer_key: &str,
    consumer_secret: &str,
) -> Result<HeaderValue, AuthFailure> {
    let credential = basic_credential(consumer_key, consumer_secret);
    let mut value = HeaderValue::from_str(&format!("Basic {credential}"))
        .map_err(AuthFailure::InvalidCredentials)?;
    value.set_sensitive(true);
    Ok(value)
}

/// Header set shared by every merchant pay call.
pub fn provider_headers(
    config: &Config,
    token: &AccessToken,
    correlation_id: &str,
) -> Result<HeaderMap, InvalidHeaderValue> {
    let mut map = HeaderMap::new();
    map.insert(VERSION.clone(), HeaderValue::from_static(API_VERSION));
    map.insert(CORRELATION_ID.clone(), HeaderValue::from_str(correlation_id)?);
    map.insert(
        USER_LANGUAGE.clone(),
        HeaderValue::from_str(&config.user_language)?,
    );
    map.insert(
        USER_ACCOUNT_IDENTIFIER.clone(),
        HeaderValue::from_str(&format!("msisdn;{}", config.partner_msisdn))?,
    );
    map.insert(PARTNER_NAME.clone(), HeaderValue::from_str(&config.partner_name)?);
    let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token.as_str()))?;
    bearer.set_sensitive(true);
    map.insert(AUTHORIZATION, bearer);
    map.typed_insert(headers::ContentType::json());
    map.typed_insert(headers::CacheControl::new().with_no_cache());
    Ok(map)
}

/// Adds `X-Callback-URL` so the provider pushes the final status to us.
pub fn with_callback(mut map: HeaderMap, callback_url: &str) -> Result<HeaderMap, InvalidHeaderValue> {
    map.insert(CALLBACK_URL.clone(), HeaderValue::from_str(callback_url)?);
    Ok(map)
}

impl MvolaGateway {
    /// Exchanges the consumer credentials for a bearer token (client credentials grant).
    pub async fn acquire_token(&self) -> Result<AccessToken, AuthFailure> {
        let (Some(key), Some(secret)) = (&self.config.consumer_key, &self.config.consumer_secret)
        else {
            return Err(AuthFailure::MissingCredentials);
        };
        let url = &self.config.token_url;
        let request = TokenRequest {
            grant_type: GRANT_TYPE,
            scope: SCOPE,
        };

        let mut map = HeaderMap::new();
        map.insert(AUTHORIZATION, basic_authorization(key, secret)?);
        map.typed_insert(headers::CacheControl::new().with_no_cache());

        let mut span = InteractionSpan::enter("token");
        span.set_request("POST", url.clone(), &request);
        tracing::debug!(%url, "Gateway API token request");

        let res = self
            .client
            .post(url)
            .headers(map)
            .form(&request)
            .send()
            .await
            .map_err(AuthFailure::Request)
            .inspect_err(|e| span.set_error(e))?;
        let status = res.status();
        span.set_response_status(status.as_u16());
        let body = res
            .bytes()
            .await
            .map_err(AuthFailure::Request)
            .inspect_err(|e| span.set_error(e))?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&body).into_owned();
            span.finish();
            return Err(AuthFailure::Rejected { status, body });
        }

        let response = serde_json::from_slice::<serde_json::Value>(&body)
            .map_err(AuthFailure::MalformedResponse)
            .inspect_err(|e| span.set_error(e))?;
        let secured_response = mask::secure_value(&response);
        span.set_response(&secured_response);
        span.finish();
        tracing::debug!(data = %secured_response, "Gateway API token response");

        let TokenResponse { access_token } =
            serde_json::from_value(response).map_err(AuthFailure::MalformedResponse)?;
        Ok(AccessToken(access_token))
    }
}

#[cfg(test)]
impl AccessToken {
    pub fn new(token: &str) -> Self {
        Self(token.to_owned())
    }
}
