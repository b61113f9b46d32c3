use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No fitted snapshot is available")]
    NotReady,

    #[error("Cannot fit on an empty catalog")]
    EmptyCatalog,

    #[error("No classifier ensemble members configured")]
    NoScorersConfigured,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown model name: {0}")]
    UnknownModel(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Duplicate product id in catalog: {0}")]
    DuplicateProduct(String),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Scorer '{model}' failed: {reason}")]
    Scorer { model: String, reason: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
