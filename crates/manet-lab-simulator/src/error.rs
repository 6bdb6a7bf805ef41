use manet_lab_abstract::{ConfigurationError, SetupError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("setup error: {0}")]
    Setup(#[from] SetupError),

    #[error("result log: {0}")]
    ResultLog(#[from] csv::Error),

    #[error("failed to access {path}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
