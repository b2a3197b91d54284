use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Journal error: {0}")]
    Journal(#[from] rusqlite::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Scan rejected by backend: {0}")]
    Rejected(String),

    #[error("Invalid scan scope: {0}")]
    InvalidScope(String),

    #[error("No duplicates selected")]
    EmptySelection,

    #[error("{0}")]
    Other(String),
}
