//! This project is split in 2 main modules:
//!
//! - [gateway] (MVola merchant pay API client)
//! - [merchant] (HTTP surface exposed to the merchant application)
#![doc = include_str!("../README.md")]

use std::net::{Ipv4Addr, SocketAddrV4};

use anyhow::Context;
use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

mod config;
/// MVola integration
///
/// Token acquisition, request shaping and transport for the provider's merchant pay API.
mod gateway;
/// Merchant facing API
///
/// Normalized success/error envelopes around the gateway calls.
mod merchant;
mod state;
#[cfg(test)]
mod test_support;

fn app(state: state::AppState) -> Router {
    let payment = merchant::api::router()
        .merge(gateway::api::router())
        .method_not_allowed_fallback(merchant::api::method_not_allowed);
    Router::new()
        .route("/health", get(merchant::api::health))
        .nest("/api/payment", payment.clone())
        .nest("/payment", payment)
        .method_not_allowed_fallback(merchant::api::method_not_allowed)
        .fallback(merchant::api::not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .init();

    match dotenv {
        Ok(p) => tracing::info!(path = %p.display(), "Loaded environment variables from .env file"),
        Err(e) => tracing::warn!("Failed to load environment variables from .env: {e}"),
    };
    let config = config::Config::from_env().context("load configuration")?;
    let port = config.port;
    tracing::info!(
        environment = %config.environment,
        api_url = %config.api_url,
        credentials = config.consumer_key.is_some() && config.consumer_secret.is_some(),
        callback = config.callback_url.is_some(),
        "Configuration loaded"
    );
    let state = state::AppState::new(config)?;

    let listener = tokio::net::TcpListener::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))
        .await
        .with_context(|| format!("bind port {port}"))?;

    tracing::info!("Serving on port {port}");
    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("serve")?;
    Ok(())
}
