//! Chain validation: link, fingerprint and signature checks.
//!
//! Walks a chain once, in order, and stops at the first failure.

use crate::block::{Block, GENESIS_BLOCK_NUMBER};
use crate::error::{ChainIntegrityError, InvalidReason, VerificationFailure};
use crate::types::{ChainTip, Fingerprint};

/// Outcome of validating a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainVerdict {
    Valid,
    Invalid { index: usize, reason: InvalidReason },
}

impl ChainVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Index and stable reason string of the first failure.
    pub fn invalid_at(&self) -> Option<(usize, &'static str)> {
        match self {
            Self::Valid => None,
            Self::Invalid { index, reason } => Some((*index, reason.reason())),
        }
    }

    pub fn into_result(self) -> Result<(), ChainIntegrityError> {
        match self {
            Self::Valid => Ok(()),
            Self::Invalid { index, reason } => Err(ChainIntegrityError { index, reason }),
        }
    }
}

impl From<ChainIntegrityError> for ChainVerdict {
    fn from(err: ChainIntegrityError) -> Self {
        Self::Invalid {
            index: err.index,
            reason: err.reason,
        }
    }
}

/// Validate an ordered chain, starting from its genesis block.
///
/// An empty chain is valid.
pub fn validate(blocks: &[Block]) -> ChainVerdict {
    let mut predecessor: Option<Fingerprint> = None;

    for (index, block) in blocks.iter().enumerate() {
        let expected_number = GENESIS_BLOCK_NUMBER + index as u64;
        match check_block(block, index, predecessor.as_ref(), Some(expected_number)) {
            Ok(fingerprint) => predecessor = Some(fingerprint),
            Err(err) => return err.into(),
        }
    }

    ChainVerdict::Valid
}

/// Validate a single candidate block against a trusted tip.
///
/// `tip` is `None` when the ledger is empty, in which case the candidate
/// must be a genesis block.
pub fn validate_successor(
    tip: Option<&ChainTip>,
    block: &Block,
) -> Result<Fingerprint, ChainIntegrityError> {
    match tip {
        Some(tip) => check_block(
            block,
            tip.block_number as usize,
            Some(&tip.fingerprint),
            tip.next_block_number(),
        ),
        None => check_block(block, 0, None, Some(GENESIS_BLOCK_NUMBER)),
    }
}

/// Check one block. Returns its recomputed fingerprint.
///
/// Order:
/// 1. Genesis carries no link
/// 2. Link matches the predecessor fingerprint
/// 3. Stored fingerprint matches the recomputed one
/// 4. At least one signature
/// 5. Every signature verifies with its paired signer, and every signer
///    has a signature
/// 6. Block number is the successor's number
///
/// `expected_number` is `None` when no number can follow the predecessor.
fn check_block(
    block: &Block,
    index: usize,
    predecessor: Option<&Fingerprint>,
    expected_number: Option<u64>,
) -> Result<Fingerprint, ChainIntegrityError> {
    let fail = |reason| ChainIntegrityError { index, reason };

    // 1-2. Link
    match (predecessor, block.previous_link()) {
        (None, Some(link)) => {
            return Err(fail(InvalidReason::UnexpectedPredecessor { link: *link }));
        }
        (Some(expected), actual) if actual != Some(expected) => {
            return Err(fail(InvalidReason::BrokenChainLink {
                expected: *expected,
                actual: actual.copied(),
            }));
        }
        _ => {}
    }

    // 3. Fingerprint
    let computed = block.recompute_fingerprint();
    if computed != block.fingerprint {
        return Err(fail(InvalidReason::FingerprintMismatch {
            computed,
            stored: block.fingerprint,
        }));
    }

    // 4. At least one signature
    if block.signatures.is_empty() {
        return Err(fail(InvalidReason::MissingSignature));
    }

    // 5. Signatures, checked against the recomputed fingerprint
    for (position, signature) in block.signatures.iter().enumerate() {
        let result = match block.signers.get(position) {
            Some(signer) => signature.verify_with(signer, &computed),
            None => Err(VerificationFailure::MissingSigner),
        };
        if let Err(failure) = result {
            return Err(fail(InvalidReason::SignatureFailed { position, failure }));
        }
    }
    if block.signers.len() > block.signatures.len() {
        return Err(fail(InvalidReason::UnpairedSigner {
            position: block.signatures.len(),
        }));
    }

    // 6. Position
    if Some(block.block_number()) != expected_number {
        return Err(fail(InvalidReason::UnexpectedBlockNumber {
            expected: expected_number,
            actual: block.block_number(),
        }));
    }

    Ok(computed)
}
