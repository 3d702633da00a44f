//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use microledger::{ClientConfig, LedgerClient};
use microledger_core::{Block, BlockBuilder, Seal, SignatureAlgorithm, SignerIdentity, SigningKeypair};
use microledger_store::MemoryLedger;

/// A test fixture with a keypair and an in-memory ledger.
pub struct TestFixture {
    pub keypair: SigningKeypair,
    pub identity: SignerIdentity,
    pub ledger: Arc<MemoryLedger>,
}

impl TestFixture {
    /// Create a new test fixture with a random Ed25519 keypair.
    pub fn new() -> Self {
        Self::with_keypair(SigningKeypair::generate(SignatureAlgorithm::Ed25519))
    }

    /// Create with a deterministic Ed25519 keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::with_keypair(SigningKeypair::ed25519_from_seed(&seed))
    }

    pub fn with_keypair(keypair: SigningKeypair) -> Self {
        Self {
            keypair,
            identity: SignerIdentity::new("Custodian", "fixture"),
            ledger: Arc::new(MemoryLedger::new()),
        }
    }

    /// A client over this fixture's ledger and key.
    pub fn client(&self) -> LedgerClient<Arc<MemoryLedger>, SigningKeypair> {
        let config = ClientConfig {
            algorithm: self.keypair.algorithm(),
            identifier_type: self.identity.identifier_type.clone(),
            identifier_value: self.identity.identifier_value.clone(),
            ..ClientConfig::default()
        };
        LedgerClient::new(Arc::clone(&self.ledger), self.keypair.clone(), config)
    }

    /// Create a genesis block.
    pub fn make_genesis(&self, seals: Vec<Seal>) -> Block {
        self.sign(BlockBuilder::genesis().timestamp(fixed_time(0)).seals(seals))
    }

    /// Create the successor of `prev`.
    pub fn make_successor(&self, prev: &Block, seals: Vec<Seal>) -> Block {
        let secs = prev.block_number() as i64;
        self.sign(BlockBuilder::after(&prev.tip()).timestamp(fixed_time(secs)).seals(seals))
    }

    /// Create a valid chain of `len` blocks, each sealing its own index.
    pub fn make_chain(&self, len: usize) -> Vec<Block> {
        let mut blocks: Vec<Block> = Vec::with_capacity(len);
        for i in 0..len {
            let seals = vec![Seal::sha256(format!("block {}", i + 1).as_bytes())];
            let block = match blocks.last() {
                Some(prev) => self.make_successor(prev, seals),
                None => self.make_genesis(seals),
            };
            blocks.push(block);
        }
        blocks
    }

    fn sign(&self, builder: BlockBuilder) -> Block {
        builder
            .sign(&self.keypair, &self.identity)
            .expect("fixture positions are always consistent")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple test fixtures for multi-signer tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            TestFixture::with_seed(seed)
        })
        .collect()
}

/// Deterministic timestamps: 2024-01-01T00:00:00Z plus `secs`.
pub fn fixed_time(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .map(|t| t + Duration::seconds(secs))
        .expect("2024-01-01 is unambiguous in UTC")
}

#[cfg(test)]
mod tests {
    use super::*;
    use microledger_core::{validate, ChainVerdict};
    use microledger_store::Ledger;

    #[test]
    fn test_fixture_chain() {
        let fixture = TestFixture::new();
        let chain = fixture.make_chain(4);

        assert_eq!(chain.len(), 4);
        assert_eq!(chain[3].block_number(), 4);
        assert_eq!(chain[2].previous_link(), Some(&chain[1].fingerprint));
        assert_eq!(validate(&chain), ChainVerdict::Valid);
    }

    #[test]
    fn test_seeded_fixture_is_deterministic() {
        let a = TestFixture::with_seed([7; 32]).make_chain(3);
        let b = TestFixture::with_seed([7; 32]).make_chain(3);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_fixture_chain_accepted_by_ledger() {
        let fixture = TestFixture::new();
        let id = fixture.ledger.create().await.unwrap();
        for block in fixture.make_chain(3) {
            fixture.ledger.append(&id, &block).await.unwrap();
        }
        assert_eq!(fixture.ledger.read(&id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_fixture_client() {
        let fixture = TestFixture::with_seed([9; 32]);
        let client = fixture.client();
        let id = client.create_ledger().await.unwrap();
        let block = client.append_data(&id, b"hello").await.unwrap();
        assert_eq!(block.signers[0].identifier_value, "fixture");
    }

    #[test]
    fn test_multi_party_cosign() {
        let parties = multi_party_fixtures(3);
        let mut genesis = parties[0].make_genesis(Vec::new());
        for party in &parties[1..] {
            genesis.cosign(&party.keypair, &party.identity).unwrap();
        }
        assert_eq!(genesis.signatures.len(), 3);
        assert_eq!(validate(&[genesis]), ChainVerdict::Valid);
    }
}
