use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatlineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for StatlineError {
    fn from(err: serde_json::Error) -> Self {
        StatlineError::Serialize(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StatlineError>;
