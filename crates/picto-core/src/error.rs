use thiserror::Error;

use crate::classify::ClassifyError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifyError),

    #[error("In-flight sync failed: {0}")]
    SyncFailed(String),

    #[error("{0}")]
    Other(String),
}
