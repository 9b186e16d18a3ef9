use crate::domain::error::BridgeError;
use crate::domain::model::AvailablePackage;
use crate::infrastructure::network::index::Location;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

/// Fetch a package archive into `dest_dir`, trying each link in order.
///
/// The declared checksum, if any, is verified per link; a mismatch moves on
/// to the next link like any other failure.
pub async fn fetch_package(
    client: &Client,
    package: &AvailablePackage,
    dest_dir: &Path,
) -> Result<PathBuf, BridgeError> {
    if package.links.is_empty() {
        return Err(BridgeError::Download(format!(
            "Package {} has no download links",
            package.label()
        )));
    }

    let archive = dest_dir.join(format!("{}.zip", Uuid::new_v4()));
    let mut last_error = None;

    for link in &package.links {
        info!("Downloading {} from {}", package.label(), link);
        match fetch_link(client, link, &archive, package.sha256.as_deref()).await {
            Ok(()) => return Ok(archive),
            Err(e) => {
                warn!("Download from {} failed: {}", link, e);
                let _ = tokio::fs::remove_file(&archive).await;
                last_error = Some(e);
            }
        }
    }

    Err(BridgeError::Download(format!(
        "All links failed for {}: {}",
        package.label(),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}

/// One attempt: fetch `link` into `archive`, then check the digest.
async fn fetch_link(
    client: &Client,
    link: &str,
    archive: &Path,
    sha256: Option<&str>,
) -> Result<(), BridgeError> {
    match Location::parse(link) {
        Location::Remote(url) => download_file(client, &url, archive).await?,
        Location::Local(path) => copy_file(&path, archive).await?,
    }
    if let Some(expected) = sha256 {
        verify_checksum(archive, expected).await?;
    }
    Ok(())
}

async fn download_file(client: &Client, url: &str, path: &Path) -> Result<(), BridgeError> {
    let res = client.get(url).send().await?.error_for_status()?;
    let total_size = res.content_length().unwrap_or(0);

    // 进度条画在 stderr，非终端时自动隐藏
    let pb = ProgressBar::new(total_size);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }

    let mut file = File::create(path).await?;
    let mut stream = res.bytes_stream();

    while let Some(item) = stream.next().await {
        let chunk = item?;
        file.write_all(&chunk).await?;
        pb.inc(chunk.len() as u64);
    }
    file.flush().await?;

    pb.finish_and_clear();
    info!("Downloaded {} bytes", pb.position());
    Ok(())
}

async fn copy_file(source: &Path, path: &Path) -> Result<(), BridgeError> {
    let bytes = tokio::fs::copy(source, path).await?;
    info!("Copied {} bytes from {}", bytes, source.display());
    Ok(())
}

async fn verify_checksum(path: &Path, expected: &str) -> Result<(), BridgeError> {
    let data = tokio::fs::read(path).await?;
    let actual = hex::encode(Sha256::digest(&data));
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(BridgeError::Checksum {
            file: path.display().to_string(),
            expected: expected.to_string(),
            actual,
        })
    }
}
