//! Error types for the ledger collaborator.

use microledger_core::Fingerprint;
use thiserror::Error;

/// Errors from talking to a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No ledger with the requested id.
    #[error("ledger not found")]
    NotFound,

    /// The ledger could not be reached.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The request did not complete within the configured duration.
    #[error("ledger request timed out")]
    Timeout,

    /// The ledger refused the block.
    #[error("append rejected: {0}")]
    Rejected(#[from] AppendRejection),
}

/// Why a ledger refused to append a block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppendRejection {
    /// The block was not built on the ledger's current tip.
    #[error(
        "conflict: ledger expects block {expected_number} linked to {}, got block {got_number} linked to {}",
        display_link(.expected_link),
        display_link(.got_link)
    )]
    Conflict {
        expected_number: u64,
        expected_link: Option<Fingerprint>,
        got_number: u64,
        got_link: Option<Fingerprint>,
    },

    /// The block could not be decoded.
    #[error("malformed block: {0}")]
    Malformed(String),

    /// Fingerprint or signatures did not verify.
    #[error("verification failed: {0}")]
    VerificationFailed(String),
}

fn display_link(link: &Option<Fingerprint>) -> String {
    match link {
        Some(fp) => fp.to_hex(),
        None => "nothing".to_string(),
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, TransportError>;
