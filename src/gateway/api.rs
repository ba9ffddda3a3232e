use axum::{Json, body::Bytes, routing::put};
use reqwest::StatusCode;
use time::OffsetDateTime;
use tracing::instrument;

use crate::{
    gateway::{callback::CallbackNotification, mask},
    state::AppState,
};

#[derive(Debug, serde::Serialize)]
pub struct CallbackAck {
    success: bool,
    status: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

/// Provider push notification. Acknowledged whatever the body looks like.
#[instrument(skip_all)]
async fn callback_handler(body: Bytes) -> (StatusCode, Json<CallbackAck>) {
    match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(value) => {
            tracing::trace!(
                data = %mask::secure_value(&value),
                "Received callback from external gateway"
            );
            let notification =
                serde_json::from_value::<CallbackNotification>(value).unwrap_or_default();
            tracing::info!(
                server_correlation_id = notification.server_correlation_id.as_deref(),
                status = notification.transaction_status.as_deref(),
                reference = notification.transaction_reference.as_deref(),
                request_date = notification.request_date.as_deref(),
                "Payment notification received"
            );
        }
        Err(e) => {
            tracing::warn!(len = body.len(), "Callback body is not json: {e}");
        }
    }

    let ack = CallbackAck {
        success: true,
        status: "received",
        timestamp: OffsetDateTime::now_utc(),
    };
    (StatusCode::OK, Json(ack))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/callback", put(callback_handler))
}
