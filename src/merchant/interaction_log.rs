use std::{fmt::Display, time::Instant};

use serde::Serialize;
use time::OffsetDateTime;

#[derive(Debug, Serialize)]
struct Request {
    method: String,
    url: String,
    params: serde_json::Value,
}

/// Record of a single outbound exchange with the provider.
#[derive(Debug, Serialize)]
pub struct InteractionLog {
    gateway: &'static str,
    kind: &'static str,
    request: Option<Request>,
    status: Option<u16>,
    response: Option<serde_json::Value>,
    error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: time::OffsetDateTime,
    duration: f32,
}

impl InteractionLog {
    fn emit(&self) {
        let url = self.request.as_ref().map(|r| r.url.as_str()).unwrap_or_default();
        tracing::info!(
            kind = self.kind,
            url,
            status = self.status,
            error = self.error.as_deref(),
            duration = self.duration,
            "Gateway interaction finished"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            if let Ok(json) = serde_json::to_string(self) {
                tracing::trace!(interaction = %json);
            }
        }
    }
}

/// Collects request/response data of an outbound call. Callers pass already masked values.
///
/// The log is emitted once: by [`InteractionSpan::finish`], or on drop when the call
/// bailed out early (transport error, timeout, unreadable body).
#[derive(Debug)]
pub struct InteractionSpan {
    kind: &'static str,
    created: Instant,
    request: Option<Request>,
    response: Option<serde_json::Value>,
    response_status: Option<u16>,
    error: Option<String>,
    emitted: bool,
}

impl InteractionSpan {
    pub fn enter(kind: &'static str) -> Self {
        Self {
            kind,
            created: Instant::now(),
            request: None,
            response: None,
            response_status: None,
            error: None,
            emitted: false,
        }
    }

    pub fn set_request(&mut self, method: &str, url: String, params: &impl Serialize) {
        let params = serde_json::to_value(params).unwrap_or_default();
        self.request = Some(Request {
            method: method.to_owned(),
            url,
            params,
        });
    }

    pub fn set_response(&mut self, res: &impl Serialize) {
        self.response = serde_json::to_value(res).ok();
    }

    pub fn set_response_status(&mut self, status: u16) {
        self.response_status = Some(status);
    }

    pub fn set_error(&mut self, error: &impl Display) {
        self.error = Some(error.to_string());
    }

    fn interaction_log(&mut self) -> InteractionLog {
        self.emitted = true;
        InteractionLog {
            gateway: "mvola",
            kind: self.kind,
            request: self.request.take(),
            status: self.response_status,
            response: self.response.take(),
            error: self.error.take(),
            created_at: OffsetDateTime::now_utc(),
            duration: self.created.elapsed().as_secs_f32(),
        }
    }

    /// Close the span and emit it as a structured event.
    pub fn finish(mut self) -> InteractionLog {
        let log = self.interaction_log();
        log.emit();
        log
    }
}

impl Drop for InteractionSpan {
    fn drop(&mut self) {
        if !self.emitted {
            self.interaction_log().emit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::InteractionSpan;
    use crate::test_support;

    #[test]
    fn log_carries_request_and_response() {
        let mut span = InteractionSpan::enter("status");
        span.set_request("GET", "http://provider/status/1".into(), &serde_json::Value::Null);
        span.set_response_status(200);
        span.set_response(&serde_json::json!({ "status": "completed" }));
        let log = serde_json::to_value(span.finish()).unwrap();
        assert_eq!(log["gateway"], "mvola");
        assert_eq!(log["kind"], "status");
        assert_eq!(log["status"], 200);
        assert_eq!(log["request"]["method"], "GET");
        assert_eq!(log["response"]["status"], "completed");
        assert!(log["error"].is_null());
        assert!(log["created_at"].is_string());
    }

    #[test]
    fn finished_span_is_logged_once() {
        let logs = test_support::LogCapture::default();
        {
            let _guard = logs.set_default();
            let mut span = InteractionSpan::enter("details");
            span.set_response_status(200);
            span.finish();
        }
        assert_eq!(logs.count("Gateway interaction finished"), 1);
    }

    #[test]
    fn dropped_span_is_logged_with_its_error() {
        let logs = test_support::LogCapture::default();
        {
            let _guard = logs.set_default();
            let mut span = InteractionSpan::enter("initiate");
            span.set_request("POST", "http://provider/".into(), &serde_json::Value::Null);
            span.set_error(&"connection reset");
        }
        let output = logs.contents();
        assert_eq!(logs.count("Gateway interaction finished"), 1);
        assert!(output.contains("kind=\"initiate\""), "{output}");
        assert!(output.contains("error=\"connection reset\""), "{output}");
    }
}
