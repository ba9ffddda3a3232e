use std::sync::Arc;

use crate::{config::Config, gateway::MvolaGateway};

#[derive(Debug, Clone, axum::extract::FromRef)]
pub struct AppState {
    pub gate: MvolaGateway,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let gate = MvolaGateway::new(config.clone())?;
        Ok(Self { gate, config })
    }
}
