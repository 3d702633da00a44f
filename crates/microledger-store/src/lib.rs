//! # Microledger Store
//!
//! The ledger collaborator contract for Microledger. Provides a trait-based
//! interface to an append-only ledger and an in-memory reference ledger.
//!
//! ## Key Types
//!
//! - [`Ledger`] - The async trait for create / read / append
//! - [`MemoryLedger`] - In-memory ledger with server-side append checks
//! - [`TransportError`] - Failures talking to a ledger
//! - [`AppendRejection`] - Structured reasons a ledger refuses a block
//!
//! ## Design Notes
//!
//! - **Serialized appends**: a block that does not extend the current tip
//!   is rejected with `Conflict`
//! - **Server-side verification**: fingerprint and signatures are checked
//!   before a block is accepted

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{AppendRejection, Result, TransportError};
pub use memory::MemoryLedger;
pub use traits::{Ledger, LedgerId, LedgerView};
