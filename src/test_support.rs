use std::{
    io,
    sync::{Arc, Mutex},
};

use axum::{Router, body::Body, http::Request};
use http_body_util::BodyExt;
use reqwest::StatusCode;
use tower::ServiceExt;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

use crate::{config::Config, gateway::MvolaGateway, state::AppState};

pub const TOKEN: &str = "test-token";

pub fn config_for(base: &str) -> Config {
    Config::from_lookup(|key| match key {
        "MVOLA_API_URL" => Some(base.to_owned()),
        "MVOLA_TOKEN_URL" => Some(format!("{base}/token")),
        "MVOLA_CONSUMER_KEY" => Some("consumer-key".into()),
        "MVOLA_CONSUMER_SECRET" => Some("consumer-secret".into()),
        "PARTNER_MSISDN" => Some("0343500004".into()),
        "PARTNER_NAME" => Some("Test Partner".into()),
        "HTTP_TIMEOUT_SECS" => Some("5".into()),
        _ => None,
    })
    .expect("test configuration is valid")
}

pub fn gateway(server: &MockServer) -> MvolaGateway {
    MvolaGateway::new(std::sync::Arc::new(config_for(&server.uri()))).unwrap()
}

pub fn app_with(config: Config) -> Router {
    crate::app(AppState::new(config).unwrap())
}

pub fn app(server: &MockServer) -> Router {
    app_with(config_for(&server.uri()))
}

/// App whose provider URLs point nowhere.
pub fn offline_app() -> Router {
    app_with(config_for("http://127.0.0.1:1"))
}

pub async fn mount_token(server: &MockServer, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": TOKEN,
            "scope": "EXT_INT_MVOLA_SCOPE",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(expected)
        .mount(server)
        .await;
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// In-memory sink for `tracing` output of the current thread.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn set_default(&self) -> tracing::subscriber::DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.contents().matches(needle).count()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
