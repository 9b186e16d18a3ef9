use crate::domain::error::ProvisionError;
use crate::domain::model::{AvailablePackage, LanguagePair, StatusEvent};
use crate::domain::traits::{PackageRepository, StatusReporter, Translator};
use std::fmt;
use tracing::info;

/// Provisioning progress for one language pair.
///
/// `Probing` is the entry point; `Bound` and `NotFound` are terminal.
pub enum ProvisionState {
    Probing,
    Uninstalled,
    Downloading(AvailablePackage),
    Installed,
    Bound(Box<dyn Translator>),
    NotFound,
}

impl ProvisionState {
    #[cfg(test)]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Bound(_) | Self::NotFound)
    }
}

impl fmt::Debug for ProvisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Probing => write!(f, "Probing"),
            Self::Uninstalled => write!(f, "Uninstalled"),
            Self::Downloading(pkg) => write!(f, "Downloading({})", pkg.label()),
            Self::Installed => write!(f, "Installed"),
            Self::Bound(engine) => write!(f, "Bound({})", engine.pair()),
            Self::NotFound => write!(f, "NotFound"),
        }
    }
}

/// Ensures an engine for a fixed language pair is installed and bound.
pub struct Provisioner<R> {
    repository: R,
    pair: LanguagePair,
}

impl<R: PackageRepository> Provisioner<R> {
    pub fn new(repository: R, pair: LanguagePair) -> Self {
        Self { repository, pair }
    }

    /// Run the state machine to a terminal state.
    ///
    /// An installed pair is bound without touching the index and without
    /// any status event.
    pub async fn acquire(
        &self,
        events: &mut dyn StatusReporter,
    ) -> Result<Box<dyn Translator>, ProvisionError> {
        let mut state = ProvisionState::Probing;
        loop {
            state = self.advance(state, events).await?;
            match state {
                ProvisionState::Bound(engine) => return Ok(engine),
                ProvisionState::NotFound => return Err(ProvisionError::NotFound),
                _ => {}
            }
        }
    }

    /// Perform exactly one transition.
    pub async fn advance(
        &self,
        state: ProvisionState,
        events: &mut dyn StatusReporter,
    ) -> Result<ProvisionState, ProvisionError> {
        let next = match state {
            ProvisionState::Probing => match self.bind_installed().await? {
                Some(engine) => ProvisionState::Bound(engine),
                None => ProvisionState::Uninstalled,
            },
            ProvisionState::Uninstalled => {
                events.report(StatusEvent::DownloadingModel).await?;
                self.repository.update_package_index().await?;
                // 同一语言对有多个包时取索引中的第一个
                let available = self.repository.available_packages().await?;
                match available.into_iter().find(|p| p.serves(&self.pair)) {
                    Some(package) => ProvisionState::Downloading(package),
                    None => ProvisionState::NotFound,
                }
            }
            ProvisionState::Downloading(package) => {
                let archive = self.repository.download(&package).await?;
                self.repository.install_from_path(&archive).await?;
                ProvisionState::Installed
            }
            ProvisionState::Installed => match self.bind_installed().await? {
                Some(engine) => ProvisionState::Bound(engine),
                None => ProvisionState::NotFound,
            },
            terminal => terminal,
        };

        info!("Provisioning {}: {:?}", self.pair, next);
        Ok(next)
    }

    /// Bind when both languages are installed and a package serves the pair.
    async fn bind_installed(&self) -> Result<Option<Box<dyn Translator>>, ProvisionError> {
        let languages = self.repository.installed_languages().await?;
        let has = |code: &str| languages.iter().any(|l| l.code == code);
        if !(has(&self.pair.source) && has(&self.pair.target)) {
            return Ok(None);
        }
        Ok(self.repository.bind(&self.pair).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::{BridgeError, EngineError};
    use crate::domain::model::{InstalledPackage, Language, PackageMetadata};
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Echo(LanguagePair);

    #[async_trait]
    impl Translator for Echo {
        fn pair(&self) -> &LanguagePair {
            &self.0
        }

        async fn translate(&self, text: &str) -> Result<String, EngineError> {
            Ok(text.to_string())
        }
    }

    #[derive(Default)]
    struct FakeRepository {
        installed: Mutex<Vec<(String, String)>>,
        index: Vec<AvailablePackage>,
        // install succeeds but leaves nothing bindable
        install_is_noop: bool,
        fail_download: bool,
        index_refreshes: AtomicUsize,
        downloads: Mutex<Vec<String>>,
        installs: AtomicUsize,
    }

    impl FakeRepository {
        fn with_installed(pairs: &[(&str, &str)]) -> Self {
            Self {
                installed: Mutex::new(
                    pairs
                        .iter()
                        .map(|(f, t)| (f.to_string(), t.to_string()))
                        .collect(),
                ),
                ..Self::default()
            }
        }

        fn network_calls(&self) -> usize {
            self.index_refreshes.load(Ordering::SeqCst)
                + self.downloads.lock().unwrap().len()
                + self.installs.load(Ordering::SeqCst)
        }
    }

    fn entry(from: &str, to: &str, version: &str) -> AvailablePackage {
        AvailablePackage {
            name: None,
            from_code: from.to_string(),
            from_name: None,
            to_code: to.to_string(),
            to_name: None,
            package_version: Some(version.to_string()),
            links: vec![format!("{}_{}-{}.zip", from, to, version)],
            sha256: None,
        }
    }

    #[async_trait]
    impl PackageRepository for FakeRepository {
        async fn installed_languages(&self) -> Result<Vec<Language>, BridgeError> {
            let mut languages: Vec<Language> = Vec::new();
            for (from, to) in self.installed.lock().unwrap().iter() {
                for code in [from, to] {
                    if !languages.iter().any(|l| &l.code == code) {
                        languages.push(Language {
                            code: code.clone(),
                            name: None,
                        });
                    }
                }
            }
            Ok(languages)
        }

        async fn bind(
            &self,
            pair: &LanguagePair,
        ) -> Result<Option<Box<dyn Translator>>, BridgeError> {
            let installed = self.installed.lock().unwrap();
            let found = installed
                .iter()
                .any(|(f, t)| f == &pair.source && t == &pair.target);
            Ok(found.then(|| Box::new(Echo(pair.clone())) as Box<dyn Translator>))
        }

        async fn update_package_index(&self) -> Result<(), BridgeError> {
            self.index_refreshes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn available_packages(&self) -> Result<Vec<AvailablePackage>, BridgeError> {
            Ok(self.index.clone())
        }

        async fn download(&self, package: &AvailablePackage) -> Result<PathBuf, BridgeError> {
            if self.fail_download {
                return Err(BridgeError::Download("connection reset".to_string()));
            }
            let link = package.links[0].clone();
            self.downloads.lock().unwrap().push(link.clone());
            Ok(PathBuf::from(link))
        }

        async fn install_from_path(&self, archive: &Path) -> Result<InstalledPackage, BridgeError> {
            self.installs.fetch_add(1, Ordering::SeqCst);
            let pkg = self
                .index
                .iter()
                .find(|p| Path::new(&p.links[0]) == archive)
                .cloned()
                .ok_or_else(|| BridgeError::Package("unknown archive".to_string()))?;
            if !self.install_is_noop {
                self.installed
                    .lock()
                    .unwrap()
                    .push((pkg.from_code.clone(), pkg.to_code.clone()));
            }
            Ok(InstalledPackage {
                metadata: PackageMetadata {
                    from_code: pkg.from_code,
                    from_name: None,
                    to_code: pkg.to_code,
                    to_name: None,
                    package_version: pkg.package_version,
                    max_phrase_words: None,
                    installed_at: None,
                },
                path: archive.to_path_buf(),
            })
        }
    }

    #[derive(Default)]
    struct Events(Vec<StatusEvent>);

    #[async_trait]
    impl StatusReporter for Events {
        async fn report(&mut self, event: StatusEvent) -> Result<(), BridgeError> {
            self.0.push(event);
            Ok(())
        }
    }

    fn en_zh() -> LanguagePair {
        LanguagePair::default()
    }

    #[tokio::test]
    async fn installed_pair_binds_without_network_or_events() {
        let provisioner = Provisioner::new(FakeRepository::with_installed(&[("en", "zh")]), en_zh());
        let mut events = Events::default();

        let engine = provisioner.acquire(&mut events).await.unwrap();

        assert_eq!(engine.pair(), &en_zh());
        assert!(events.0.is_empty());
        assert_eq!(provisioner.repository.network_calls(), 0);
    }

    #[tokio::test]
    async fn acquire_twice_never_downloads_again() {
        let repo = FakeRepository {
            index: vec![entry("en", "zh", "1.0")],
            ..FakeRepository::default()
        };
        let provisioner = Provisioner::new(repo, en_zh());
        let mut events = Events::default();

        provisioner.acquire(&mut events).await.unwrap();
        provisioner.acquire(&mut events).await.unwrap();

        assert_eq!(events.0, vec![StatusEvent::DownloadingModel]);
        assert_eq!(provisioner.repository.downloads.lock().unwrap().len(), 1);
        assert_eq!(provisioner.repository.index_refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn probing_moves_to_uninstalled_when_a_language_is_missing() {
        let provisioner = Provisioner::new(FakeRepository::with_installed(&[("en", "de")]), en_zh());
        let mut events = Events::default();

        let next = provisioner
            .advance(ProvisionState::Probing, &mut events)
            .await
            .unwrap();
        assert!(matches!(next, ProvisionState::Uninstalled));
        assert!(events.0.is_empty());
    }

    #[tokio::test]
    async fn both_languages_without_exact_pair_is_uninstalled() {
        let provisioner = Provisioner::new(
            FakeRepository::with_installed(&[("en", "de"), ("fr", "zh")]),
            en_zh(),
        );
        let next = provisioner
            .advance(ProvisionState::Probing, &mut Events::default())
            .await
            .unwrap();
        assert!(matches!(next, ProvisionState::Uninstalled));
    }

    #[tokio::test]
    async fn uninstalled_reports_and_picks_first_listed_match() {
        let repo = FakeRepository {
            index: vec![
                entry("en", "de", "1.0"),
                entry("en", "zh", "1.1"),
                entry("en", "zh", "2.0"),
            ],
            ..FakeRepository::default()
        };
        let provisioner = Provisioner::new(repo, en_zh());
        let mut events = Events::default();

        let next = provisioner
            .advance(ProvisionState::Uninstalled, &mut events)
            .await
            .unwrap();

        assert_eq!(events.0, vec![StatusEvent::DownloadingModel]);
        assert_eq!(provisioner.repository.index_refreshes.load(Ordering::SeqCst), 1);
        match next {
            ProvisionState::Downloading(pkg) => {
                assert_eq!(pkg.package_version.as_deref(), Some("1.1"))
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn uninstalled_without_match_is_not_found() {
        let repo = FakeRepository {
            index: vec![entry("zh", "en", "1.0")],
            ..FakeRepository::default()
        };
        let provisioner = Provisioner::new(repo, en_zh());
        let next = provisioner
            .advance(ProvisionState::Uninstalled, &mut Events::default())
            .await
            .unwrap();
        assert!(matches!(next, ProvisionState::NotFound));
    }

    #[tokio::test]
    async fn downloading_installs_the_package() {
        let pkg = entry("en", "zh", "1.0");
        let repo = FakeRepository {
            index: vec![pkg.clone()],
            ..FakeRepository::default()
        };
        let provisioner = Provisioner::new(repo, en_zh());

        let next = provisioner
            .advance(ProvisionState::Downloading(pkg), &mut Events::default())
            .await
            .unwrap();

        assert!(matches!(next, ProvisionState::Installed));
        assert_eq!(provisioner.repository.installs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn installed_without_bindable_engine_is_not_found() {
        let provisioner = Provisioner::new(FakeRepository::default(), en_zh());
        let next = provisioner
            .advance(ProvisionState::Installed, &mut Events::default())
            .await
            .unwrap();
        assert!(matches!(next, ProvisionState::NotFound));
    }

    #[tokio::test]
    async fn install_that_does_not_stick_ends_in_not_found() {
        let repo = FakeRepository {
            index: vec![entry("en", "zh", "1.0")],
            install_is_noop: true,
            ..FakeRepository::default()
        };
        let provisioner = Provisioner::new(repo, en_zh());
        let mut events = Events::default();

        let err = provisioner.acquire(&mut events).await.err().unwrap();

        assert!(matches!(err, ProvisionError::NotFound));
        assert_eq!(err.to_string(), "Model not found");
        assert_eq!(events.0, vec![StatusEvent::DownloadingModel]);
    }

    #[tokio::test]
    async fn repository_failures_are_terminal() {
        let repo = FakeRepository {
            index: vec![entry("en", "zh", "1.0")],
            fail_download: true,
            ..FakeRepository::default()
        };
        let provisioner = Provisioner::new(repo, en_zh());

        let err = provisioner
            .acquire(&mut Events::default())
            .await
            .err()
            .unwrap();

        assert!(matches!(err, ProvisionError::Repository(_)));
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn terminal_states_do_not_move() {
        let provisioner = Provisioner::new(FakeRepository::default(), en_zh());
        let next = provisioner
            .advance(ProvisionState::NotFound, &mut Events::default())
            .await
            .unwrap();
        assert!(next.is_terminal());
        assert_eq!(provisioner.repository.network_calls(), 0);
    }
}
