use crate::domain::error::BridgeError;
use crate::infrastructure::config::{get_data_dir, Config};
use crate::infrastructure::network::http::create_client;
use crate::infrastructure::storage::packages::LocalPackageRepository;
use reqwest::Client;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub http_client: Client,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, BridgeError> {
        let http_client = create_client(&config)?;

        Ok(Self {
            config: Arc::new(config),
            http_client,
        })
    }

    /// Open the package repository described by the configuration.
    pub async fn open_repository(&self) -> Result<LocalPackageRepository, BridgeError> {
        LocalPackageRepository::open(
            get_data_dir(&self.config),
            self.config.index_url.as_deref(),
            self.http_client.clone(),
        )
        .await
    }
}
