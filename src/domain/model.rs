use crate::domain::error::BridgeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_SOURCE: &str = "en";
pub const DEFAULT_TARGET: &str = "zh";

// 语言对，进程启动后不可变
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

impl LanguagePair {
    pub fn new(source: &str, target: &str) -> Result<Self, BridgeError> {
        let source = source.trim().to_lowercase();
        let target = target.trim().to_lowercase();
        validate_code(&source)?;
        validate_code(&target)?;
        if source == target {
            return Err(BridgeError::Config(format!(
                "Source and target language are both '{}'",
                source
            )));
        }
        Ok(Self { source, target })
    }

    /// Directory name used for the installed package of this pair.
    pub fn slug(&self) -> String {
        format!("{}_{}", self.source, self.target)
    }
}

impl Default for LanguagePair {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            target: DEFAULT_TARGET.to_string(),
        }
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

fn validate_code(code: &str) -> Result<(), BridgeError> {
    let valid = !code.is_empty()
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(BridgeError::Config(format!(
            "Invalid language code: '{}'",
            code
        )))
    }
}

// 已安装的语言
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    pub code: String,
    pub name: Option<String>,
}

// 包索引中的条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailablePackage {
    #[serde(default)]
    pub name: Option<String>,
    pub from_code: String,
    #[serde(default)]
    pub from_name: Option<String>,
    pub to_code: String,
    #[serde(default)]
    pub to_name: Option<String>,
    #[serde(default)]
    pub package_version: Option<String>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub sha256: Option<String>,
}

impl AvailablePackage {
    pub fn serves(&self, pair: &LanguagePair) -> bool {
        self.from_code == pair.source && self.to_code == pair.target
    }

    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("translate-{}_{}", self.from_code, self.to_code),
        }
    }
}

// 包内的 metadata.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub from_code: String,
    #[serde(default)]
    pub from_name: Option<String>,
    pub to_code: String,
    #[serde(default)]
    pub to_name: Option<String>,
    #[serde(default)]
    pub package_version: Option<String>,
    #[serde(default)]
    pub max_phrase_words: Option<usize>,
    #[serde(default)]
    pub installed_at: Option<i64>,
}

impl PackageMetadata {
    pub fn serves(&self, pair: &LanguagePair) -> bool {
        self.from_code == pair.source && self.to_code == pair.target
    }

    pub fn pair(&self) -> Result<LanguagePair, BridgeError> {
        LanguagePair::new(&self.from_code, &self.to_code)
    }
}

#[derive(Debug, Clone)]
pub struct InstalledPackage {
    pub metadata: PackageMetadata,
    pub path: PathBuf,
}

/// Provisioning and readiness signals sent to the parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    DownloadingModel,
    Ready,
    Error(String),
}

/// A translation request. `None` and `Some("")` both take the empty fast path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Request {
    pub text: Option<String>,
}

impl Request {
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}
