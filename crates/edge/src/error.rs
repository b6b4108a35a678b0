use thiserror::Error;

#[derive(Debug, Error)]
pub enum EdgeError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid gate configuration: {0}")]
    Gate(#[from] portal_http::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EdgeError>;
