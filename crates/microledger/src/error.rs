//! Error types for Microledger.

use microledger_core::{ChainIntegrityError, CoreError};
use microledger_store::{AppendRejection, TransportError};
use thiserror::Error;

/// Errors that can occur during Microledger operations.
#[derive(Debug, Error)]
pub enum MicroledgerError {
    /// Building or signing a block failed.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// A chain or block failed verification.
    #[error("integrity error: {0}")]
    Integrity(#[from] ChainIntegrityError),

    /// The ledger could not be reached, or the request timed out.
    #[error("transport error: {0}")]
    Transport(TransportError),

    /// The ledger refused the block. Never retried.
    #[error("ledger rejected block: {0}")]
    Rejected(AppendRejection),

    /// The signing key could not be loaded or persisted.
    #[error("key store error: {0}")]
    KeyStore(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TransportError> for MicroledgerError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Rejected(rejection) => Self::Rejected(rejection),
            other => Self::Transport(other),
        }
    }
}

/// Result type for Microledger operations.
pub type Result<T> = std::result::Result<T, MicroledgerError>;
