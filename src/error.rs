use thiserror::Error;

/// Everything that can go wrong while refreshing or reading the flag cache.
///
/// None of these reach callers of [`crate::Client::is_enabled`]; they are
/// logged and the cached answer (or `false`) is served instead.
#[derive(Debug, Error)]
pub enum FlagsError {
    #[error("{0} is required")]
    AuthConfiguration(&'static str),

    #[error("failed to execute request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),

    #[error("failed to decode body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("cache storage error: {0}")]
    Storage(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl FlagsError {
    /// Missing credentials can't be fixed by retrying.
    pub fn is_auth(&self) -> bool {
        matches!(self, FlagsError::AuthConfiguration(_))
    }
}

impl From<sled::Error> for FlagsError {
    fn from(e: sled::Error) -> Self {
        FlagsError::Storage(e.to_string())
    }
}

impl From<sled::transaction::TransactionError<FlagsError>> for FlagsError {
    fn from(e: sled::transaction::TransactionError<FlagsError>) -> Self {
        match e {
            sled::transaction::TransactionError::Abort(inner) => inner,
            sled::transaction::TransactionError::Storage(e) => FlagsError::Storage(e.to_string()),
        }
    }
}
