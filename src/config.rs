use std::{fmt::Display, str::FromStr, time::Duration};

use anyhow::Context;

/// Provider deployment the service talks to. Selects default endpoint URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Sandbox,
    Production,
}

impl Environment {
    fn default_api_url(self) -> &'static str {
        match self {
            Self::Sandbox => "https://devapi.mvola.mg",
            Self::Production => "https://api.mvola.mg",
        }
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sandbox" | "development" | "dev" | "test" => Ok(Self::Sandbox),
            "production" | "prod" => Ok(Self::Production),
            other => anyhow::bail!("unknown environment tag: {other}"),
        }
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sandbox => f.write_str("sandbox"),
            Self::Production => f.write_str("production"),
        }
    }
}

/// Process-wide configuration, built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    /// OAuth2 identity endpoint
    pub token_url: String,
    /// Base URL of the merchant pay API, without trailing slash
    pub api_url: String,
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub partner_msisdn: String,
    pub partner_name: String,
    /// Full URL sent in `X-Callback-URL`
    pub callback_url: Option<String>,
    pub port: u16,
    pub http_timeout: Duration,
    pub user_language: String,
}

impl Config {
    const DEFAULT_PORT: u16 = 3000;
    const DEFAULT_TIMEOUT_SECS: u64 = 30;
    const CALLBACK_PATH: &str = "/api/payment/callback";

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let environment = match get("MVOLA_ENVIRONMENT").or_else(|| get("NODE_ENV")) {
            Some(tag) => tag.parse::<Environment>().context("MVOLA_ENVIRONMENT")?,
            None => Environment::Sandbox,
        };
        let api_url = get("MVOLA_API_URL")
            .unwrap_or_else(|| environment.default_api_url().to_owned())
            .trim_end_matches('/')
            .to_owned();
        let token_url = get("MVOLA_TOKEN_URL")
            .unwrap_or_else(|| format!("{}/token", environment.default_api_url()));
        let port = match get("PORT") {
            Some(port) => port
                .parse::<u16>()
                .with_context(|| format!("invalid PORT: {port}"))?,
            None => Self::DEFAULT_PORT,
        };
        let timeout_secs = match get("HTTP_TIMEOUT_SECS") {
            Some(secs) => secs
                .parse::<u64>()
                .with_context(|| format!("invalid HTTP_TIMEOUT_SECS: {secs}"))?,
            None => Self::DEFAULT_TIMEOUT_SECS,
        };
        anyhow::ensure!(timeout_secs > 0, "HTTP_TIMEOUT_SECS must be positive");
        let callback_url = get("CALLBACK_URL")
            .map(|url| format!("{}{}", url.trim_end_matches('/'), Self::CALLBACK_PATH));

        Ok(Self {
            environment,
            token_url,
            api_url,
            consumer_key: get("MVOLA_CONSUMER_KEY"),
            consumer_secret: get("MVOLA_CONSUMER_SECRET"),
            partner_msisdn: get("PARTNER_MSISDN").unwrap_or_else(|| "0343500004".into()),
            partner_name: get("PARTNER_NAME").unwrap_or_else(|| "MVola Demo".into()),
            callback_url,
            port,
            http_timeout: Duration::from_secs(timeout_secs),
            user_language: get("USER_LANGUAGE").unwrap_or_else(|| "MG".into()),
        })
    }
}
