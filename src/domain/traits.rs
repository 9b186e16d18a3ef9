use crate::domain::error::{BridgeError, EngineError};
use crate::domain::model::{AvailablePackage, InstalledPackage, Language, LanguagePair, StatusEvent};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A translation engine bound to exactly one language pair.
///
/// Calls are awaited one at a time by the protocol loop and must not
/// mutate engine state.
#[async_trait]
pub trait Translator: Send + Sync {
    fn pair(&self) -> &LanguagePair;

    async fn translate(&self, text: &str) -> Result<String, EngineError>;
}

/// Source of installable language packages.
///
/// Implementations own the index, downloads and the on-disk install
/// location. The provisioner only sequences these calls.
#[async_trait]
pub trait PackageRepository: Send + Sync {
    /// Languages covered by installed packages, deduplicated by code.
    async fn installed_languages(&self) -> Result<Vec<Language>, BridgeError>;

    /// Open the installed package serving exactly `pair`, if any.
    async fn bind(&self, pair: &LanguagePair) -> Result<Option<Box<dyn Translator>>, BridgeError>;

    /// Refresh the local copy of the package index.
    async fn update_package_index(&self) -> Result<(), BridgeError>;

    /// Packages in the local index, in index order.
    async fn available_packages(&self) -> Result<Vec<AvailablePackage>, BridgeError>;

    /// Fetch a package archive and return its local path.
    async fn download(&self, package: &AvailablePackage) -> Result<PathBuf, BridgeError>;

    async fn install_from_path(&self, archive: &Path) -> Result<InstalledPackage, BridgeError>;
}

/// Sink for status events emitted while the engine is being provisioned.
#[async_trait]
pub trait StatusReporter: Send {
    async fn report(&mut self, event: StatusEvent) -> Result<(), BridgeError>;
}
