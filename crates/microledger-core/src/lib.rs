//! # Microledger Core
//!
//! Pure primitives for Microledger: blocks, canonical form, fingerprints,
//! signatures and chain validation.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over cryptographic data structures.
//!
//! ## Key Types
//!
//! - [`Block`] - One signed, linked entry in a ledger
//! - [`Fingerprint`] - Domain-separated SHA-256 of a block's canonical form
//! - [`BlockBuilder`] - Assigns position, fingerprints and signs a new block
//! - [`ChainVerdict`] - Outcome of [`validate`]
//!
//! ## Canonicalization
//!
//! Block headers are encoded using deterministic CBOR. See [`canonical`] module.

pub mod block;
pub mod canonical;
pub mod crypto;
pub mod error;
pub mod types;
pub mod validation;

pub use block::{
    Block, BlockBuilder, BlockHeader, BlockSignature, ControllingIdentifier, Seal,
    SignerIdentity, GENESIS_BLOCK_NUMBER,
};
pub use canonical::{canonicalize, CANONICAL_VERSION};
pub use crypto::{KeyProvider, PublicKey, SignatureAlgorithm, SigningKeypair};
pub use error::{ChainIntegrityError, CoreError, InvalidReason, VerificationFailure};
pub use types::{ChainTip, Fingerprint};
pub use validation::{validate, validate_successor, ChainVerdict};
