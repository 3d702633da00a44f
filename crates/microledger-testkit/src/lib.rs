//! # Microledger Testkit
//!
//! Testing utilities for Microledger.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known blocks with expected canonical bytes, fingerprints and signatures
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Helper structs for setting up test scenarios
//!
//! ## Golden Vectors
//!
//! ```rust
//! use microledger_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, fingerprint) in verify_all_vectors() {
//!     println!("{}: {} ({})", name, matches, fingerprint);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use microledger_testkit::generators::{block_from_params, BlockParams};
//!
//! proptest! {
//!     #[test]
//!     fn fingerprint_is_deterministic(params: BlockParams) {
//!         let b1 = block_from_params(&params);
//!         let b2 = block_from_params(&params);
//!         prop_assert_eq!(b1.fingerprint, b2.fingerprint);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use microledger_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let chain = fixture.make_chain(3);
//! assert_eq!(chain[2].block_number(), 3);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, TestFixture};
pub use generators::{block_from_params, BlockParams};
pub use vectors::{
    all_vectors, generate_golden_chain, vectors_json, verify_all_vectors, GoldenVector,
};
