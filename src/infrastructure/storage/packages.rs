use crate::domain::error::BridgeError;
use crate::domain::model::{
    AvailablePackage, InstalledPackage, Language, LanguagePair, PackageMetadata,
};
use crate::domain::traits::{PackageRepository, Translator};
use crate::infrastructure::network::{download, index};
use crate::infrastructure::storage::archive::{self, METADATA_FILE};
use crate::infrastructure::storage::phrases::{PhraseTableTranslator, PHRASES_FILE};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

const INDEX_FILE: &str = "index.json";
const PACKAGES_DIR: &str = "packages";
const DOWNLOADS_DIR: &str = "downloads";
/// Scratch entries untouched this long belong to an interrupted run.
const STALE_SCRATCH: Duration = Duration::from_secs(60 * 60);

/// Package repository rooted at a local data directory.
///
/// ```text
/// <data_dir>/index.json            last refreshed package index
/// <data_dir>/packages/<from>_<to>/  metadata.json + phrases.db
/// <data_dir>/downloads/             archives and extraction staging
/// ```
pub struct LocalPackageRepository {
    data_dir: PathBuf,
    index_source: Option<index::Location>,
    client: Client,
}

impl LocalPackageRepository {
    /// Create the directory layout. Failing here means no package can ever
    /// be installed or bound.
    pub async fn open(
        data_dir: PathBuf,
        index_url: Option<&str>,
        client: Client,
    ) -> Result<Self, BridgeError> {
        tokio::fs::create_dir_all(data_dir.join(PACKAGES_DIR)).await?;
        tokio::fs::create_dir_all(data_dir.join(DOWNLOADS_DIR)).await?;
        sweep_scratch(&data_dir.join(DOWNLOADS_DIR), STALE_SCRATCH).await;

        Ok(Self {
            index_source: index_url
                .filter(|u| !u.trim().is_empty())
                .map(index::Location::parse),
            data_dir,
            client,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn packages_dir(&self) -> PathBuf {
        self.data_dir.join(PACKAGES_DIR)
    }

    fn downloads_dir(&self) -> PathBuf {
        self.data_dir.join(DOWNLOADS_DIR)
    }

    fn index_path(&self) -> PathBuf {
        self.data_dir.join(INDEX_FILE)
    }

    /// Installed packages sorted by directory name. Broken entries are
    /// skipped with a warning.
    pub async fn installed_packages(&self) -> Result<Vec<InstalledPackage>, BridgeError> {
        let mut packages = Vec::new();
        let mut entries = tokio::fs::read_dir(self.packages_dir()).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            match read_metadata(&path).await {
                Ok(metadata) => packages.push(InstalledPackage { metadata, path }),
                Err(e) => warn!("Ignoring package at {}: {}", path.display(), e),
            }
        }

        packages.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(packages)
    }
}

/// Remove archives and staging directories left by interrupted runs.
///
/// Only entries older than `max_age` go, so a concurrent bridge sharing the
/// data dir keeps its in-flight download.
async fn sweep_scratch(downloads: &Path, max_age: Duration) {
    let mut entries = match tokio::fs::read_dir(downloads).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot scan {}: {}", downloads.display(), e);
            return;
        }
    };
    let now = SystemTime::now();

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        let age = meta
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age < max_age {
            continue;
        }

        let removed = if meta.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else if path.extension().is_some_and(|ext| ext == "zip") {
            tokio::fs::remove_file(&path).await
        } else {
            continue;
        };
        match removed {
            Ok(()) => debug!("Removed stale {}", path.display()),
            Err(e) => warn!("Cannot remove stale {}: {}", path.display(), e),
        }
    }
}

async fn read_metadata(package_dir: &Path) -> Result<PackageMetadata, BridgeError> {
    let body = tokio::fs::read(package_dir.join(METADATA_FILE)).await?;
    Ok(serde_json::from_slice(&body)?)
}

fn push_language(languages: &mut Vec<Language>, code: &str, name: Option<&String>) {
    if languages.iter().any(|l| l.code == code) {
        return;
    }
    languages.push(Language {
        code: code.to_string(),
        name: name.cloned(),
    });
}

#[async_trait]
impl PackageRepository for LocalPackageRepository {
    async fn installed_languages(&self) -> Result<Vec<Language>, BridgeError> {
        let mut languages = Vec::new();
        for package in self.installed_packages().await? {
            let meta = &package.metadata;
            push_language(&mut languages, &meta.from_code, meta.from_name.as_ref());
            push_language(&mut languages, &meta.to_code, meta.to_name.as_ref());
        }
        Ok(languages)
    }

    async fn bind(&self, pair: &LanguagePair) -> Result<Option<Box<dyn Translator>>, BridgeError> {
        let installed = self.installed_packages().await?;
        let Some(package) = installed.iter().find(|p| p.metadata.serves(pair)) else {
            debug!("No installed package serves {}", pair);
            return Ok(None);
        };

        info!("Binding {} from {}", pair, package.path.display());
        let engine = PhraseTableTranslator::open(&package.path, &package.metadata).await?;
        Ok(Some(Box::new(engine)))
    }

    async fn update_package_index(&self) -> Result<(), BridgeError> {
        match &self.index_source {
            Some(source) => {
                let count = index::refresh_index(&self.client, source, &self.index_path()).await?;
                info!("Package index refreshed: {} packages", count);
            }
            None => warn!(
                "No index_url configured, using local index at {}",
                self.index_path().display()
            ),
        }
        Ok(())
    }

    async fn available_packages(&self) -> Result<Vec<AvailablePackage>, BridgeError> {
        index::read_index(&self.index_path()).await
    }

    async fn download(&self, package: &AvailablePackage) -> Result<PathBuf, BridgeError> {
        download::fetch_package(&self.client, package, &self.downloads_dir()).await
    }

    async fn install_from_path(&self, archive_path: &Path) -> Result<InstalledPackage, BridgeError> {
        let staging = self.downloads_dir().join(Uuid::new_v4().to_string());
        let result = install_staged(archive_path, &staging, &self.packages_dir()).await;

        if staging.exists() {
            let _ = tokio::fs::remove_dir_all(&staging).await;
        }
        if result.is_ok() && archive_path.starts_with(self.downloads_dir()) {
            let _ = tokio::fs::remove_file(archive_path).await;
        }
        result
    }
}

async fn install_staged(
    archive_path: &Path,
    staging: &Path,
    packages_dir: &Path,
) -> Result<InstalledPackage, BridgeError> {
    let files = archive::extract_zip(archive_path, staging).await?;
    debug!("Extracted {} files into {}", files, staging.display());

    let root = archive::find_package_root(staging)?;
    let mut metadata = read_metadata(&root).await?;
    let pair = metadata.pair()?;

    if !root.join(PHRASES_FILE).is_file() {
        return Err(BridgeError::Package(format!(
            "Package for {} has no {}",
            pair, PHRASES_FILE
        )));
    }

    // 安装回执：记录安装时间
    metadata.installed_at = Some(Utc::now().timestamp());
    tokio::fs::write(
        root.join(METADATA_FILE),
        serde_json::to_vec_pretty(&metadata)?,
    )
    .await?;

    let target = packages_dir.join(pair.slug());
    if target.exists() {
        info!("Replacing existing package at {}", target.display());
        tokio::fs::remove_dir_all(&target).await?;
    }
    tokio::fs::rename(&root, &target).await?;

    info!("Installed {} into {}", pair, target.display());
    Ok(InstalledPackage {
        metadata,
        path: target,
    })
}
