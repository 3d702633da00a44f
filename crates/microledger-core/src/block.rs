//! Block: one signed, linked entry in a ledger.
//!
//! A block is immutable once signed. Its fingerprint is computed exactly
//! once from the canonical header, before any signature exists; every
//! signature commits to that fingerprint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::canonicalize;
use crate::crypto::{try_verify, KeyProvider, PublicKey, SignatureAlgorithm};
use crate::error::{CoreError, Result, VerificationFailure};
use crate::types::{ChainTip, Fingerprint};

/// Block number of the first block in every ledger.
pub const GENESIS_BLOCK_NUMBER: u64 = 1;

/// Seal type for a SHA-256 digest of external data.
pub const SHA256_SEAL_TYPE: &str = "SHA-256";

/// An opaque attestation carried by a block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seal {
    pub seal_type: String,
    pub seal_value: String,
}

impl Seal {
    pub fn new(seal_type: impl Into<String>, seal_value: impl Into<String>) -> Self {
        Self {
            seal_type: seal_type.into(),
            seal_value: seal_value.into(),
        }
    }

    /// Seal external data by its SHA-256 digest (lowercase hex).
    pub fn sha256(data: &[u8]) -> Self {
        Self::new(SHA256_SEAL_TYPE, hex::encode(Sha256::digest(data)))
    }
}

/// A signature over a block fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSignature {
    /// Algorithm label (`Ed25519` or `ES256K`).
    pub algorithm: String,

    /// Hex of the raw signature bytes.
    pub value: String,
}

impl BlockSignature {
    pub fn new(algorithm: SignatureAlgorithm, raw: &[u8]) -> Self {
        Self {
            algorithm: algorithm.as_str().to_string(),
            value: hex::encode(raw),
        }
    }

    /// Verify against `fingerprint` with the key embedded in `signer`.
    ///
    /// Fails closed: unknown labels, undecodable values and keys that do
    /// not match the label are all failures.
    pub fn verify_with(
        &self,
        signer: &ControllingIdentifier,
        fingerprint: &Fingerprint,
    ) -> std::result::Result<(), VerificationFailure> {
        let algorithm: SignatureAlgorithm = self
            .algorithm
            .parse()
            .map_err(|_| VerificationFailure::AlgorithmMismatch)?;
        let public_key = signer.public_key_for(algorithm)?;
        let raw = hex::decode(&self.value).map_err(|_| VerificationFailure::MalformedSignature)?;
        try_verify(&public_key, fingerprint, &raw)
    }
}

/// Who signed a block, with the public key needed to check the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllingIdentifier {
    pub identifier_type: String,
    pub identifier_value: String,

    /// SPKI PEM public key.
    pub public_key: String,
}

impl ControllingIdentifier {
    /// Parse the embedded key as `algorithm`.
    pub fn public_key_for(
        &self,
        algorithm: SignatureAlgorithm,
    ) -> std::result::Result<PublicKey, VerificationFailure> {
        match PublicKey::from_pem(algorithm, &self.public_key) {
            Ok(key) => Ok(key),
            Err(_) => {
                let other = match algorithm {
                    SignatureAlgorithm::Ed25519 => SignatureAlgorithm::Es256k,
                    SignatureAlgorithm::Es256k => SignatureAlgorithm::Ed25519,
                };
                if PublicKey::from_pem(other, &self.public_key).is_ok() {
                    Err(VerificationFailure::AlgorithmMismatch)
                } else {
                    Err(VerificationFailure::MalformedPublicKey)
                }
            }
        }
    }
}

/// How a signer names itself in the blocks it signs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerIdentity {
    pub identifier_type: String,
    pub identifier_value: String,
}

impl SignerIdentity {
    pub fn new(identifier_type: impl Into<String>, identifier_value: impl Into<String>) -> Self {
        Self {
            identifier_type: identifier_type.into(),
            identifier_value: identifier_value.into(),
        }
    }

    /// Pair this identity with the public key of `keys`.
    pub fn controlling_identifier<K: KeyProvider + ?Sized>(
        &self,
        keys: &K,
    ) -> Result<ControllingIdentifier> {
        Ok(ControllingIdentifier {
            identifier_type: self.identifier_type.clone(),
            identifier_value: self.identifier_value.clone(),
            public_key: keys.public_key_pem()?,
        })
    }
}

/// The identity-bearing fields of a block: exactly what is canonicalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    /// Position in the chain, starting at 1.
    pub block_number: u64,

    /// Fingerprint of the predecessor (None only for genesis).
    #[serde(
        rename = "previousBlockHash",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub previous_link: Option<Fingerprint>,

    /// Creation instant. Advisory, not cryptographically ordered.
    #[serde(rename = "timeImprint")]
    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub seals: Vec<Seal>,
}

/// A complete block: header, fingerprint, signatures and their signers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(flatten)]
    pub header: BlockHeader,

    #[serde(rename = "digitalFingerprint")]
    pub fingerprint: Fingerprint,

    #[serde(default)]
    pub signatures: Vec<BlockSignature>,

    /// Paired with `signatures` by position.
    #[serde(rename = "controllingIdentifiers", default)]
    pub signers: Vec<ControllingIdentifier>,
}

impl Block {
    /// Canonical bytes of the header.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonicalize(&self.header)
    }

    /// Fingerprint derived from the current header fields.
    pub fn recompute_fingerprint(&self) -> Fingerprint {
        Fingerprint::compute(&self.canonical_bytes())
    }

    pub fn block_number(&self) -> u64 {
        self.header.block_number
    }

    pub fn previous_link(&self) -> Option<&Fingerprint> {
        self.header.previous_link.as_ref()
    }

    pub fn is_genesis(&self) -> bool {
        self.header.block_number == GENESIS_BLOCK_NUMBER && self.header.previous_link.is_none()
    }

    /// This block as the predecessor state of its successor.
    pub fn tip(&self) -> ChainTip {
        ChainTip {
            block_number: self.header.block_number,
            fingerprint: self.fingerprint,
        }
    }

    /// Add another signature over the existing fingerprint.
    ///
    /// Only valid before the block is submitted.
    pub fn cosign<K: KeyProvider + ?Sized>(
        &mut self,
        keys: &K,
        identity: &SignerIdentity,
    ) -> Result<()> {
        let signer = identity.controlling_identifier(keys)?;
        let raw = keys.sign_fingerprint(&self.fingerprint)?;
        self.signatures.push(BlockSignature::new(keys.algorithm(), &raw));
        self.signers.push(signer);
        Ok(())
    }
}

/// Builder for creating blocks.
///
/// Consumed by [`BlockBuilder::sign`], which runs canonicalize, fingerprint
/// and sign exactly once, in that order.
#[derive(Debug, Clone)]
pub struct BlockBuilder {
    /// `None` when the predecessor has no successor number.
    block_number: Option<u64>,
    previous_link: Option<Fingerprint>,
    timestamp: Option<DateTime<Utc>>,
    seals: Vec<Seal>,
}

impl BlockBuilder {
    /// Start the first block of a ledger.
    pub fn genesis() -> Self {
        Self::with_position(GENESIS_BLOCK_NUMBER, None)
    }

    /// Start the successor of `tip`.
    pub fn after(tip: &ChainTip) -> Self {
        Self {
            block_number: tip.next_block_number(),
            previous_link: Some(tip.fingerprint),
            timestamp: None,
            seals: Vec::new(),
        }
    }

    /// Start from the ledger's current state: genesis when there is no tip.
    pub fn from_tip(tip: Option<&ChainTip>) -> Self {
        match tip {
            Some(tip) => Self::after(tip),
            None => Self::genesis(),
        }
    }

    /// Start at an explicit position. Inconsistent positions are rejected
    /// by `sign`.
    pub fn with_position(block_number: u64, previous_link: Option<Fingerprint>) -> Self {
        Self {
            block_number: Some(block_number),
            previous_link,
            timestamp: None,
            seals: Vec::new(),
        }
    }

    /// Set the timestamp (defaults to now).
    pub fn timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.timestamp = Some(ts);
        self
    }

    /// Append a seal.
    pub fn seal(mut self, seal: Seal) -> Self {
        self.seals.push(seal);
        self
    }

    /// Append several seals, keeping their order.
    pub fn seals(mut self, seals: impl IntoIterator<Item = Seal>) -> Self {
        self.seals.extend(seals);
        self
    }

    /// Finish the header, checking number/link consistency.
    pub fn build_header(self) -> Result<BlockHeader> {
        let block_number = self.block_number.ok_or_else(|| {
            CoreError::Canonicalization("predecessor holds the last block number".into())
        })?;
        match (block_number, &self.previous_link) {
            (0, _) => {
                return Err(CoreError::Canonicalization(
                    "block number must be at least 1".into(),
                ))
            }
            (GENESIS_BLOCK_NUMBER, Some(_)) => {
                return Err(CoreError::Canonicalization(
                    "genesis block cannot link to a predecessor".into(),
                ))
            }
            (n, None) if n > GENESIS_BLOCK_NUMBER => {
                return Err(CoreError::Canonicalization(format!(
                    "block {} requires a predecessor link",
                    n
                )))
            }
            _ => {}
        }

        Ok(BlockHeader {
            block_number,
            previous_link: self.previous_link,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            seals: self.seals,
        })
    }

    /// Build, fingerprint and sign the block.
    pub fn sign<K: KeyProvider + ?Sized>(self, keys: &K, identity: &SignerIdentity) -> Result<Block> {
        let header = self.build_header()?;

        let fingerprint = Fingerprint::compute(&canonicalize(&header));
        let raw = keys.sign_fingerprint(&fingerprint)?;
        let signer = identity.controlling_identifier(keys)?;

        Ok(Block {
            header,
            fingerprint,
            signatures: vec![BlockSignature::new(keys.algorithm(), &raw)],
            signers: vec![signer],
        })
    }
}
