use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    /// Indexer or RPC unreachable, timed out, rate limited or non-2xx
    #[error("Network error: {0}")]
    Network(String),

    /// Wallet rejected, signing failed, or the chain rejected the transaction
    #[error("Submission error: {0}")]
    Submission(String),

    /// Submitted but not confirmed within the confirmation window
    #[error("Confirmation timeout: {0}")]
    ConfirmationTimeout(String),

    /// JSON-RPC error object returned by the node
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Response parsed but did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type ChainResult<T> = Result<T, ChainError>;

impl ChainError {
    /// Whether this error belongs to the network family, i.e. the remote
    /// source could not be used at all
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            ChainError::Network(_)
                | ChainError::Request(_)
                | ChainError::Rpc { .. }
                | ChainError::InvalidResponse(_)
                | ChainError::Serialization(_)
        )
    }
}

impl From<url::ParseError> for ChainError {
    fn from(err: url::ParseError) -> Self {
        ChainError::Configuration(format!("Invalid endpoint URL: {}", err))
    }
}

/// Map a transport failure to a network error with a readable cause
pub fn map_reqwest_error(err: reqwest::Error) -> ChainError {
    if err.is_timeout() {
        ChainError::Network("Request timed out".to_string())
    } else if err.is_connect() {
        ChainError::Network(format!("Connection error: {}", err))
    } else if err.is_decode() {
        ChainError::InvalidResponse(format!("Failed to decode response: {}", err))
    } else {
        ChainError::Request(err)
    }
}

/// Map a non-2xx status to a network error
pub fn status_error(context: &str, status: reqwest::StatusCode, body: &str) -> ChainError {
    match status.as_u16() {
        401 | 403 => ChainError::Network(format!(
            "{}: not authorized (HTTP {}): {}",
            context, status, body
        )),
        429 => ChainError::Network(format!("{}: rate limited (HTTP {})", context, status)),
        _ => ChainError::Network(format!("{}: HTTP {}: {}", context, status, body)),
    }
}
