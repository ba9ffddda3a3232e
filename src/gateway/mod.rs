use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderMap, Method};

use crate::{
    config::Config,
    gateway::{
        error::GatewayError,
        payin::{MerchantPayRequest, PaymentRequest, RequestBuilder},
    },
    merchant::interaction_log::InteractionSpan,
};

pub mod api;
/// Token provider and provider header set
pub mod auth;
/// Inbound provider notification
mod callback;
mod correlation;
pub mod error;
/// Log masking of secrets and phone numbers
pub mod mask;
/// Merchant pay payload and request builder
pub mod payin;
/// Status and details lookups
mod status;

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Fully shaped provider request, ready to send.
#[derive(Debug)]
pub struct PreparedRequest<'a> {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub correlation_id: String,
    pub body: Option<MerchantPayRequest<'a>>,
}

#[derive(Debug)]
pub struct Initiated {
    pub correlation_id: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct MvolaGateway {
    client: reqwest::Client,
    config: Arc<Config>,
}

impl MvolaGateway {
    pub fn new(config: Arc<Config>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("build http client")?;
        Ok(Self { client, config })
    }

    /// Token, then a single merchant pay call. Nothing is retried.
    pub async fn initiate(&self, payment: &PaymentRequest) -> Result<Initiated> {
        let token = self.acquire_token().await?;
        let request = RequestBuilder::new(&self.config, &token).initiate(payment)?;
        let correlation_id = request.correlation_id.clone();
        let data = self.dispatch(request, "initiate").await?;
        Ok(Initiated {
            correlation_id,
            data,
        })
    }

    async fn dispatch(
        &self,
        request: PreparedRequest<'_>,
        kind: &'static str,
    ) -> Result<serde_json::Value> {
        let PreparedRequest {
            method,
            url,
            headers,
            correlation_id,
            body,
        } = request;
        let mut span = InteractionSpan::enter(kind);
        let secured_request = mask::secure_serializable(&body);
        span.set_request(method.as_str(), url.clone(), &secured_request);
        tracing::debug!(%url, %correlation_id, data = %secured_request, "Gateway API {kind} request");

        let mut builder = self.client.request(method, &url).headers(headers);
        if let Some(body) = &body {
            builder = builder.json(body);
        }
        let res = builder
            .send()
            .await
            .map_err(GatewayError::from)
            .inspect_err(|e| span.set_error(e))?;
        let status = res.status();
        span.set_response_status(status.as_u16());

        let bytes = res
            .bytes()
            .await
            .map_err(GatewayError::from)
            .inspect_err(|e| span.set_error(e))?;
        let response = parse_body(&bytes);
        let secured_response = mask::secure_value(&response);
        span.set_response(&secured_response);
        span.finish();
        tracing::debug!(data = %secured_response, %status, "Gateway API {kind} response");

        if !status.is_success() {
            return Err(GatewayError::Provider {
                status,
                body: response,
            });
        }
        Ok(response)
    }
}

/// Provider bodies are passed through as-is: JSON when it parses, text otherwise.
fn parse_body(bytes: &[u8]) -> serde_json::Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, header, method, path},
    };

    use super::*;
    use crate::test_support;

    #[test]
    fn parses_json_text_and_empty_bodies() {
        assert_eq!(parse_body(br#"{"a":1}"#), json!({ "a": 1 }));
        assert_eq!(parse_body(b"Forbidden"), json!("Forbidden"));
        assert_eq!(parse_body(b""), serde_json::Value::Null);
        assert_eq!(parse_body(b" \n"), serde_json::Value::Null);
    }

    #[tokio::test]
    async fn initiate_posts_payload_with_provider_headers() {
        let server = MockServer::start().await;
        test_support::mount_token(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/mvola/mm/transactions/type/merchantpay/1.0.0/"))
            .and(header("version", "1.0"))
            .and(header("userlanguage", "MG"))
            .and(header("useraccountidentifier", "msisdn;0343500004"))
            .and(header("partnername", "Test Partner"))
            .and(header("authorization", "Bearer test-token"))
            .and(header("cache-control", "no-cache"))
            .and(body_json(json!({
                "amount": "1000",
                "currency": "Ar",
                "descriptionText": "Paiement Demo MVola",
                "requestingOrganisationTransactionReference": "",
                "requestDate": "",
                "originalTransactionReference": "",
                "debitParty": [{ "key": "msisdn", "value": "0343500003" }],
                "creditParty": [{ "key": "msisdn", "value": "0343500004" }],
                "metadata": [
                    { "key": "partnerName", "value": "Test Partner" },
                    { "key": "fc", "value": "USD" },
                    { "key": "amountFc", "value": "1" }
                ]
            })))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "status": "pending",
                "serverCorrelationId": "abc123",
                "notificationMethod": "callback"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gate = test_support::gateway(&server);
        let payment = PaymentRequest::new(Some("1000".into()), Some("0343500003".into())).unwrap();
        let initiated = gate.initiate(&payment).await.unwrap();
        assert_eq!(initiated.data["serverCorrelationId"], "abc123");
        assert!(initiated.correlation_id.parse::<u64>().is_ok());
    }

    #[tokio::test]
    async fn token_is_fetched_for_every_call() {
        let server = MockServer::start().await;
        test_support::mount_token(&server, 2).await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "pending" })))
            .expect(2)
            .mount(&server)
            .await;

        let gate = test_support::gateway(&server);
        gate.status("a1").await.unwrap();
        gate.status("a1").await.unwrap();
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let server = MockServer::start().await;
        test_support::mount_token(&server, 1).await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let mut config = test_support::config_for(&server.uri());
        config.http_timeout = Duration::from_millis(300);
        let gate = MvolaGateway::new(Arc::new(config)).unwrap();
        let logs = test_support::LogCapture::default();
        let _guard = logs.set_default();
        let err = gate.status("slow").await.unwrap_err();
        assert!(matches!(err, GatewayError::Timeout), "{err}");

        let output = logs.contents();
        assert_eq!(logs.count("Gateway interaction finished"), 2, "{output}");
        assert!(output.contains("kind=\"status\""), "{output}");
        assert!(output.contains("error=\"gateway request timed out\""), "{output}");
    }

    #[tokio::test]
    async fn concurrent_initiates_use_distinct_correlation_ids() {
        let server = MockServer::start().await;
        test_support::mount_token(&server, 2).await;
        Mock::given(method("POST"))
            .and(path("/mvola/mm/transactions/type/merchantpay/1.0.0/"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "status": "pending" })))
            .expect(2)
            .mount(&server)
            .await;

        let gate = test_support::gateway(&server);
        let first = PaymentRequest::new(Some("1000".into()), Some("0343500003".into())).unwrap();
        let second = PaymentRequest::new(Some("2500".into()), Some("0343500005".into())).unwrap();
        let (a, b) = tokio::join!(gate.initiate(&first), gate.initiate(&second));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.correlation_id, b.correlation_id);

        let sent: Vec<String> = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter_map(|r| r.headers.get("x-correlationid"))
            .map(|v| v.to_str().unwrap().to_owned())
            .collect();
        assert_eq!(sent.len(), 2);
        assert_ne!(sent[0], sent[1]);
        assert!(sent.contains(&a.correlation_id));
        assert!(sent.contains(&b.correlation_id));
    }
}
