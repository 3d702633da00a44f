//! Error types for Microledger Core.

use std::fmt;

use thiserror::Error;

use crate::types::Fingerprint;

/// Core errors that can occur while building or signing blocks.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The block fields cannot be canonicalized (a bug upstream of the builder).
    #[error("canonicalization error: {0}")]
    Canonicalization(String),

    /// The signing key is unusable.
    #[error("signing error: {0}")]
    Signing(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("decoding error: {0}")]
    Decoding(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Why a signature did not verify.
///
/// Verification failures are expected outcomes, not faults: they are
/// returned as values and never panic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationFailure {
    #[error("public key is malformed or weak")]
    MalformedPublicKey,

    #[error("signature value is malformed")]
    MalformedSignature,

    #[error("signature algorithm does not match the signer key")]
    AlgorithmMismatch,

    #[error("signature does not match fingerprint")]
    SignatureMismatch,

    #[error("no signer paired with signature")]
    MissingSigner,
}

/// Why a chain failed validation.
///
/// `reason()` yields the stable short reason; `Display` adds the diagnostic
/// detail (expected vs actual values).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    /// The first block carries a predecessor link.
    UnexpectedPredecessor { link: Fingerprint },

    /// `previousLink` does not match the recomputed fingerprint of the prior block.
    BrokenChainLink {
        expected: Fingerprint,
        actual: Option<Fingerprint>,
    },

    /// The stored fingerprint does not match the one recomputed from the fields.
    FingerprintMismatch {
        computed: Fingerprint,
        stored: Fingerprint,
    },

    /// Signature at `position` failed to verify.
    SignatureFailed {
        position: usize,
        failure: VerificationFailure,
    },

    /// The block carries no signature at all.
    MissingSignature,

    /// A signer at `position` has no signature paired with it.
    UnpairedSigner { position: usize },

    /// The block number is not the successor of its predecessor.
    ///
    /// `expected` is `None` when the predecessor already holds the largest
    /// representable number.
    UnexpectedBlockNumber { expected: Option<u64>, actual: u64 },
}

impl InvalidReason {
    /// The stable short reason string.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::UnexpectedPredecessor { .. } => "unexpected predecessor link",
            Self::BrokenChainLink { .. } => "broken chain link",
            Self::FingerprintMismatch { .. } => "fingerprint mismatch",
            Self::SignatureFailed { .. } => "signature verification failed",
            Self::MissingSignature => "missing signature",
            Self::UnpairedSigner { .. } => "unpaired signer",
            Self::UnexpectedBlockNumber { .. } => "unexpected block number",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason())?;
        match self {
            Self::UnexpectedPredecessor { link } => {
                write!(f, " (previousLink {} on genesis block)", link.to_hex())
            }
            Self::BrokenChainLink { expected, actual } => match actual {
                Some(actual) => write!(
                    f,
                    " (previousLink expected {}, got {})",
                    expected.to_hex(),
                    actual.to_hex()
                ),
                None => write!(f, " (previousLink expected {}, got none)", expected.to_hex()),
            },
            Self::FingerprintMismatch { computed, stored } => write!(
                f,
                " (fingerprint computed {}, stored {})",
                computed.to_hex(),
                stored.to_hex()
            ),
            Self::SignatureFailed { position, failure } => {
                write!(f, " (signature {}: {})", position, failure)
            }
            Self::MissingSignature => Ok(()),
            Self::UnpairedSigner { position } => {
                write!(f, " (signer {} has no signature)", position)
            }
            Self::UnexpectedBlockNumber { expected, actual } => match expected {
                Some(expected) => {
                    write!(f, " (blockNumber expected {}, got {})", expected, actual)
                }
                None => write!(f, " (no blockNumber follows the predecessor, got {})", actual),
            },
        }
    }
}

/// A chain integrity violation at a specific block index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("chain invalid at block index {index}: {reason}")]
pub struct ChainIntegrityError {
    /// Zero-based position of the offending block in the validated sequence.
    pub index: usize,
    pub reason: InvalidReason,
}
