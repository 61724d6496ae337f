//! Error types for the payout wallet manager

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the payout wallet manager
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    // Input validation errors (rejected before any network call)
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    // Transport-level errors (transient, retried with bounded backoff)
    #[error("Network error: {0}")]
    Network(String),

    // Definitive provider-side errors on reads
    #[error("RPC error: {0}")]
    Rpc(String),

    // Transfer errors
    #[error("Insufficient funds: {available} nanoton available, {required} nanoton required")]
    InsufficientFunds { available: u64, required: u64 },

    #[error("Sequence conflict: {0}")]
    SequenceConflict(String),

    #[error("Message rejected by provider: {0}")]
    MessageRejected(String),

    /// Submission outcome could not be determined (timeout after the
    /// message may have reached the network). Never coerced into
    /// success or failure.
    #[error("Transfer outcome unknown: {0}")]
    UnknownOutcome(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is retryable (transient)
    ///
    /// `SequenceConflict` is deliberately excluded: it is retried at
    /// most once, after a fresh sequence-number fetch, by the issuer
    /// itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::Network("connection reset".into()).is_retryable());
        assert!(!Error::SequenceConflict("seqno consumed".into()).is_retryable());
        assert!(!Error::UnknownOutcome("timeout".into()).is_retryable());
        assert!(!Error::Validation("zero amount".into()).is_retryable());
    }
}
