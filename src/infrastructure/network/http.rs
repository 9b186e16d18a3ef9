// HTTP client utilities
use crate::domain::error::BridgeError;
use crate::infrastructure::config::Config;
use reqwest::Client;
use std::time::Duration;

/// Build the client used for index refreshes and package downloads.
pub fn create_client(config: &Config) -> Result<Client, BridgeError> {
    let mut builder = Client::builder()
        .pool_max_idle_per_host(2)
        .pool_idle_timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(15))
        .timeout(Duration::from_secs(config.download_timeout_secs))
        .user_agent(concat!("mt-bridge/", env!("CARGO_PKG_VERSION")));

    if let Some(proxy) = config.http_proxy.as_deref().filter(|p| !p.is_empty()) {
        builder = builder.proxy(reqwest::Proxy::all(proxy)?);
    }

    Ok(builder.build()?)
}
