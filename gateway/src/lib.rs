pub mod backend;
pub mod config;
pub mod credentials;
pub mod dispatcher;
pub mod envelope;
pub mod errors;
pub mod metrics_defs;
pub mod params;
pub mod render;
pub mod resources;
pub mod service;
pub mod signature;
pub mod translation;

#[cfg(test)]
mod testutils;

pub use backend::BackendClient;

use config::{Config, ValidationError};
use credentials::{CredentialStoreError, StaticCredentialStore};
use dispatcher::{ActionTable, Dispatcher};
use render::JsonRenderer;
use service::GatewayService;
use shared::http::run_http_service;
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum GatewayServerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),
    #[error("could not load credentials: {0}")]
    Credentials(#[from] CredentialStoreError),
    #[error("could not build backend client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Builds the gateway from `config` and serves it until the listener fails.
pub async fn run(config: Config) -> Result<(), GatewayServerError> {
    config.validate()?;

    let credentials = StaticCredentialStore::from_config(&config.credentials.r#type)?;
    tracing::info!(access_keys = credentials.len(), "Loaded credentials");

    let backend = BackendClient::new(config.backend.clone())?;
    tracing::info!(url = %config.backend.url, "Using CloudStack backend");

    let dispatcher = Dispatcher::new(
        ActionTable::standard(),
        Arc::new(credentials),
        backend,
        config.resources.clone(),
    );
    let service = GatewayService::new(dispatcher, Arc::new(JsonRenderer));

    run_http_service(&config.listener.host, config.listener.port, service).await
}
