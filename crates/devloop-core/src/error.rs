use thiserror::Error;

#[derive(Debug, Error)]
pub enum DevloopError {
    #[error("invalid hook payload: {0}")]
    InvalidPayload(String),

    #[error("invalid whitelist entry: {0}")]
    InvalidWhitelistEntry(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DevloopError>;
