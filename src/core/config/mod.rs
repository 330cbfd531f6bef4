pub mod paths;
pub mod service;
pub mod settings;
pub mod validation;

use std::path::PathBuf;

use thiserror::Error;

pub use paths::AppPaths;
pub use service::ConfigService;
pub use settings::{AppConfig, VectorStoreConnection};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration value: {0}")]
    Missing(&'static str),

    #[error("{0}")]
    Invalid(String),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}
