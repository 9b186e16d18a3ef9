use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Checksum mismatch for {file}: expected {expected}, got {actual}")]
    Checksum {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Package error: {0}")]
    Package(String),

    #[error("Download failed: {0}")]
    Download(String),
}

/// Terminal outcome of provisioning. Neither variant is retried.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Model not found")]
    NotFound,

    #[error("{0}")]
    Repository(#[from] BridgeError),
}

/// A single translation call failed. Only the current turn is affected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<tokio_rusqlite::Error> for EngineError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        Self::new(format!("Phrase table lookup failed: {}", err))
    }
}

/// Why an input line did not produce a request.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Not JSON at all. Framing noise, dropped without a reply.
    #[error("Line is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Request must be a JSON object")]
    NotAnObject,

    #[error("Field \"text\" must be a string")]
    InvalidText,
}

impl ParseError {
    pub fn is_noise(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}
