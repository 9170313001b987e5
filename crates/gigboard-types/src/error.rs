use thiserror::Error;

/// Error taxonomy shared by the registry, the ledger and the API layer.
///
/// Every operation fails with exactly one of these; the node maps them onto
/// HTTP statuses (Validation/InvalidTransition -> 400, Permission -> 403,
/// NotFound -> 404, Storage -> 500, ExternalService -> 502).
#[derive(Error, Debug)]
pub enum MarketError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for MarketError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MarketError>;
