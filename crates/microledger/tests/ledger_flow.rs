//! End-to-end flows: client, key file and in-memory ledger together.

use std::sync::Arc;

use async_trait::async_trait;
use microledger::store::{MemoryLedger, Result as LedgerResult};
use microledger::{
    AppendRejection, Block, ClientConfig, FileKeyProvider, KeyProvider, Ledger, LedgerClient,
    LedgerId, MicroledgerError, Seal, SignatureAlgorithm,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Serves a tampered copy of the chain: the last block's number is bumped.
struct TamperingLedger {
    inner: MemoryLedger,
}

#[async_trait]
impl Ledger for TamperingLedger {
    async fn create(&self) -> LedgerResult<LedgerId> {
        self.inner.create().await
    }

    async fn read(&self, id: &LedgerId) -> LedgerResult<Vec<Block>> {
        let mut blocks = self.inner.read(id).await?;
        if let Some(last) = blocks.last_mut() {
            last.header.block_number += 1;
        }
        Ok(blocks)
    }

    async fn append(&self, id: &LedgerId, block: &Block) -> LedgerResult<()> {
        self.inner.append(id, block).await
    }
}

#[tokio::test]
async fn test_key_file_bootstrap_and_append() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let config = ClientConfig {
        key_path: dir.path().join("private_key.pem"),
        identifier_value: "flow-test".to_string(),
        ..ClientConfig::default()
    };

    let keys = FileKeyProvider::from_config(&config)?;
    let public_pem = keys.public_key_pem()?;
    let ledger = Arc::new(MemoryLedger::new());
    let client = LedgerClient::new(Arc::clone(&ledger), keys, config.clone());

    let id = client.create_ledger().await?;
    let genesis = client
        .append_block(&id, vec![Seal::new("SHA-256", "abcd1234")])
        .await?;
    assert_eq!(genesis.signers[0].public_key, public_pem);
    assert_eq!(genesis.signers[0].identifier_value, "flow-test");

    // A restarted process reloads the same key and keeps extending the chain.
    drop(client);
    let keys = FileKeyProvider::from_config(&config)?;
    assert_eq!(keys.public_key_pem()?, public_pem);
    let client = LedgerClient::new(Arc::clone(&ledger), keys, config);
    let next = client.append_data(&id, b"after restart").await?;
    assert_eq!(next.block_number(), 2);

    assert_eq!(client.fetch_verified(&id).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_fetch_verified_reports_tampering() {
    init_tracing();
    let client = LedgerClient::new(
        TamperingLedger {
            inner: MemoryLedger::new(),
        },
        microledger::SigningKeypair::generate(SignatureAlgorithm::Ed25519),
        ClientConfig {
            verify_on_fetch: true,
            ..ClientConfig::default()
        },
    );
    let id = client.create_ledger().await.unwrap();

    // Empty chains are trivially valid, so the first append succeeds.
    client.append_data(&id, b"one").await.unwrap();

    match client.fetch_verified(&id).await {
        Err(MicroledgerError::Integrity(err)) => {
            assert_eq!(err.index, 0);
            assert_eq!(err.reason.reason(), "fingerprint mismatch");
        }
        other => panic!("unexpected result: {:?}", other),
    }

    // With verify_on_fetch, building on a tampered chain is refused locally.
    let err = client.append_data(&id, b"two").await.unwrap_err();
    assert!(matches!(err, MicroledgerError::Integrity(_)));
}

#[tokio::test]
async fn test_unchecked_fetch_then_conflict() {
    init_tracing();
    let client = LedgerClient::new(
        TamperingLedger {
            inner: MemoryLedger::new(),
        },
        microledger::SigningKeypair::generate(SignatureAlgorithm::Es256k),
        ClientConfig {
            verify_on_fetch: false,
            verify_before_submit: false,
            ..ClientConfig::default()
        },
    );
    let id = client.create_ledger().await.unwrap();
    client.append_data(&id, b"one").await.unwrap();

    // The tampered tip claims block 2, so the client builds block 3, which
    // the authoritative ledger refuses.
    let err = client.append_data(&id, b"two").await.unwrap_err();
    assert!(matches!(
        err,
        MicroledgerError::Rejected(AppendRejection::Conflict {
            expected_number: 2,
            got_number: 3,
            ..
        })
    ));
}
