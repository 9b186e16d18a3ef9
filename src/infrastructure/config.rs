use crate::domain::error::BridgeError;
use crate::domain::model::{LanguagePair, DEFAULT_SOURCE, DEFAULT_TARGET};
use crate::interfaces::cli::Cli;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_from")]
    pub from: String,
    #[serde(default = "default_to")]
    pub to: String,
    pub index_url: Option<String>,
    pub data_dir: Option<String>,
    pub http_proxy: Option<String>,
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
    #[serde(default)]
    pub logging: Logging,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Logging {
    #[serde(default = "default_enable")]
    pub enable: bool,
    pub path: Option<String>,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            enable: true,
            path: None,
            level: "WARN".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            from: default_from(),
            to: default_to(),
            index_url: None,
            data_dir: None,
            http_proxy: None,
            download_timeout_secs: default_download_timeout_secs(),
            logging: Logging::default(),
        }
    }
}

impl Config {
    /// Command line values win over the file.
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(from) = &cli.from {
            self.from = from.clone();
        }
        if let Some(to) = &cli.to {
            self.to = to.clone();
        }
        if let Some(index_url) = &cli.index_url {
            self.index_url = Some(index_url.clone());
        }
        if let Some(data_dir) = &cli.data_dir {
            self.data_dir = Some(data_dir.display().to_string());
        }
        self
    }

    pub fn language_pair(&self) -> Result<LanguagePair, BridgeError> {
        LanguagePair::new(&self.from, &self.to)
    }
}

// Defaults
fn default_from() -> String {
    DEFAULT_SOURCE.to_string()
}
fn default_to() -> String {
    DEFAULT_TARGET.to_string()
}
fn default_download_timeout_secs() -> u64 {
    300
}
fn default_enable() -> bool {
    true
}
fn default_log_level() -> String {
    "WARN".to_string()
}

pub fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("mt-bridge").join("config.toml"))
}

/// Package data directory: config value, else `<data_dir>/mt-bridge`.
pub fn get_data_dir(config: &Config) -> PathBuf {
    match config.data_dir.as_deref() {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mt-bridge"),
    }
}

/// Load configuration from `explicit` or the default location.
///
/// A missing default file yields defaults; a missing explicit file is an error.
/// A file that fails to parse yields defaults with a warning on stderr.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, BridgeError> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(BridgeError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            Some(path.to_path_buf())
        }
        None => get_config_path().filter(|p| p.exists()),
    };

    if let Some(path) = path {
        let content = fs::read_to_string(&path)?;
        return Ok(parse_config(&content));
    }

    Ok(Config::default())
}

fn parse_config(content: &str) -> Config {
    match toml::from_str::<Config>(content) {
        Ok(config) => config,
        Err(e) => {
            // 日志尚未初始化，直接写 stderr
            eprintln!(
                "Warning: Failed to parse config file: {}. Using defaults.",
                e
            );
            Config::default()
        }
    }
}

pub fn generate_config_sample(explicit: Option<&Path>) -> Result<PathBuf, BridgeError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => get_config_path().ok_or_else(|| {
            BridgeError::Config("Cannot determine config directory".to_string())
        })?,
    };

    if path.exists() {
        eprintln!("Config file already exists at: {}", path.display());
        return Ok(path);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let sample = Config::default();
    let toml_content = toml::to_string_pretty(&sample)
        .map_err(|e| BridgeError::Config(format!("Failed to serialize config: {}", e)))?;
    fs::write(&path, toml_content)
        .map_err(|e| BridgeError::Config(format!("Failed to write config file: {}", e)))?;
    Ok(path)
}
