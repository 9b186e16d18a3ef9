use crate::domain::error::BridgeError;
use crate::domain::model::AvailablePackage;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where the package index (and package links) live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Remote(String),
    Local(PathBuf),
}

impl Location {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Remote(trimmed.to_string())
        } else {
            let path = trimmed.strip_prefix("file://").unwrap_or(trimmed);
            Self::Local(PathBuf::from(path))
        }
    }
}

/// Fetch the raw index, validate it parses, and replace `dest` atomically.
pub async fn refresh_index(
    client: &Client,
    source: &Location,
    dest: &Path,
) -> Result<usize, BridgeError> {
    let body = match source {
        Location::Remote(url) => {
            info!("Refreshing package index from {}", url);
            let response = client.get(url).send().await?.error_for_status()?;
            response.bytes().await?.to_vec()
        }
        Location::Local(path) => {
            info!("Refreshing package index from {}", path.display());
            tokio::fs::read(path).await?
        }
    };

    let packages = parse_index(&body)?;

    let tmp = dest.with_extension("json.tmp");
    tokio::fs::write(&tmp, &body).await?;
    tokio::fs::rename(&tmp, dest).await?;

    debug!("Index written to {} ({} packages)", dest.display(), packages.len());
    Ok(packages.len())
}

pub fn parse_index(body: &[u8]) -> Result<Vec<AvailablePackage>, BridgeError> {
    Ok(serde_json::from_slice(body)?)
}

/// Read the locally stored index. A missing file is an empty index.
pub async fn read_index(path: &Path) -> Result<Vec<AvailablePackage>, BridgeError> {
    match tokio::fs::read(path).await {
        Ok(body) => parse_index(&body),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}
