//! Crate error type
//!
//! Compile and runtime failures of user code are not errors: they come back as
//! an `ExecutionResult`. Everything here is a failure of the machinery itself.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid base64 in judge field `{field}`: {source}")]
    Base64 {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("failed to start sandbox worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("invalid config file {path}: {source}")]
    Config {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, Error>;
