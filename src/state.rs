use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::llm::{build_embedder, build_generator};
use crate::service::RagService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub service: Arc<RagService>,
    pub http_client: reqwest::Client,
}

impl AppState {
    /// Build the HTTP client and the providers named by `config`.
    pub async fn new(config: Config) -> Result<Self> {
        let http_client = build_http_client()?;
        let embedder = build_embedder(&config, http_client.clone()).await?;
        let generator = build_generator(&config, http_client.clone())?;
        let service = RagService::new(&config, embedder, generator)?;

        Ok(Self {
            config,
            service: Arc::new(service),
            http_client,
        })
    }
}

fn build_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(120))
        .build()
        .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {e}")))
}
