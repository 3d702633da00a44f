//! # Microledger
//!
//! The unified API for Microledger: tamper-evident, append-only chains of
//! signed blocks.
//!
//! ## Overview
//!
//! - **Blocks**: Immutable, signed entries linked to their predecessor by fingerprint
//! - **Ledgers**: Append-only chains of blocks held by a single authoritative store
//! - **Verification**: Any reader can re-derive every fingerprint and check every signature
//!
//! ## Usage
//!
//! ```rust,no_run
//! use microledger::{ClientConfig, FileKeyProvider, LedgerClient};
//! use microledger::store::MemoryLedger;
//!
//! async fn example() -> microledger::Result<()> {
//!     let config = ClientConfig::default();
//!     let keys = FileKeyProvider::from_config(&config)?;
//!     let client = LedgerClient::new(MemoryLedger::new(), keys, config);
//!
//!     let ledger_id = client.create_ledger().await?;
//!     let block = client.append_data(&ledger_id, b"invoice #1").await?;
//!     println!("appended block {} ({})", block.block_number(), block.fingerprint.to_hex());
//!
//!     let chain = client.fetch_verified(&ledger_id).await?;
//!     assert_eq!(chain.len(), 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `microledger::core` - Core primitives (Block, Fingerprint, validation)
//! - `microledger::store` - Ledger trait and in-memory ledger

pub mod client;
pub mod config;
pub mod error;
pub mod keystore;

// Re-export component crates
pub use microledger_core as core;
pub use microledger_store as store;

// Re-export main types for convenience
pub use client::LedgerClient;
pub use config::ClientConfig;
pub use error::{MicroledgerError, Result};
pub use keystore::FileKeyProvider;

// Re-export commonly used core types
pub use microledger_core::{
    validate, Block, BlockBuilder, ChainIntegrityError, ChainVerdict, Fingerprint, KeyProvider,
    Seal, SignatureAlgorithm, SignerIdentity, SigningKeypair,
};
pub use microledger_store::{AppendRejection, Ledger, LedgerId, TransportError};
