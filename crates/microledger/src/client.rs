//! The ledger client: unified API for building and submitting blocks.
//!
//! Brings together a ledger, a key provider and the block builder. Every
//! append re-fetches the predecessor state; nothing is cached between
//! calls, and nothing is retried.

use std::future::Future;

use tracing::{debug, info, warn};

use microledger_core::{
    validate, validate_successor, Block, BlockBuilder, KeyProvider, PublicKey, Seal,
    SignerIdentity,
};
use microledger_store::{Ledger, LedgerId, TransportError};

use crate::config::ClientConfig;
use crate::error::{MicroledgerError, Result};

/// Client for one ledger collaborator, signing with one key.
pub struct LedgerClient<L: Ledger, K: KeyProvider> {
    /// The ledger blocks are read from and appended to.
    ledger: L,
    /// The signing key.
    keys: K,
    /// Configuration.
    config: ClientConfig,
    /// Identity recorded in every block this client signs.
    identity: SignerIdentity,
}

impl<L: Ledger, K: KeyProvider> LedgerClient<L, K> {
    /// Create a new client.
    pub fn new(ledger: L, keys: K, config: ClientConfig) -> Self {
        let identity = config.signer_identity();
        Self {
            ledger,
            keys,
            config,
            identity,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The public key embedded in every block this client signs.
    pub fn public_key(&self) -> PublicKey {
        self.keys.public_key()
    }

    /// Create a new, empty ledger.
    pub async fn create_ledger(&self) -> Result<LedgerId> {
        let id = self.request("create", self.ledger.create()).await?;
        info!(ledger = %id, "created ledger");
        Ok(id)
    }

    /// Fetch a ledger's blocks without checking them.
    pub async fn fetch_chain(&self, id: &LedgerId) -> Result<Vec<Block>> {
        let blocks = self.request("read", self.ledger.read(id)).await?;
        debug!(ledger = %id, blocks = blocks.len(), "fetched chain");
        Ok(blocks)
    }

    /// Fetch a ledger's blocks and validate the whole chain.
    pub async fn fetch_verified(&self, id: &LedgerId) -> Result<Vec<Block>> {
        let blocks = self.fetch_chain(id).await?;
        if let Err(err) = validate(&blocks).into_result() {
            warn!(ledger = %id, index = err.index, reason = err.reason.reason(), "chain failed validation");
            return Err(err.into());
        }
        Ok(blocks)
    }

    /// Build, sign and submit the next block carrying `seals`.
    ///
    /// Returns the block as accepted by the ledger.
    pub async fn append_block(&self, id: &LedgerId, seals: Vec<Seal>) -> Result<Block> {
        let blocks = if self.config.verify_on_fetch {
            self.fetch_verified(id).await?
        } else {
            self.fetch_chain(id).await?
        };
        let tip = blocks.last().map(Block::tip);

        let block = BlockBuilder::from_tip(tip.as_ref())
            .seals(seals)
            .sign(&self.keys, &self.identity)?;
        debug!(
            ledger = %id,
            block_number = block.block_number(),
            fingerprint = %block.fingerprint.to_hex(),
            "signed block"
        );

        if self.config.verify_before_submit {
            validate_successor(tip.as_ref(), &block)?;
        }

        match self.request("append", self.ledger.append(id, &block)).await {
            Ok(()) => {
                info!(ledger = %id, block_number = block.block_number(), "appended block");
                Ok(block)
            }
            Err(MicroledgerError::Rejected(rejection)) => {
                warn!(ledger = %id, block_number = block.block_number(), %rejection, "ledger rejected block");
                Err(MicroledgerError::Rejected(rejection))
            }
            Err(err) => Err(err),
        }
    }

    /// Append a block sealing `data` by its SHA-256 digest.
    pub async fn append_data(&self, id: &LedgerId, data: &[u8]) -> Result<Block> {
        self.append_block(id, vec![Seal::sha256(data)]).await
    }

    /// Run one ledger request under the configured timeout.
    async fn request<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = std::result::Result<T, TransportError>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.config.request_timeout(), fut).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.config.request_timeout_ms,
                    "ledger request timed out"
                );
                Err(TransportError::Timeout.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use microledger_core::{ChainTip, SigningKeypair};
    use microledger_store::{AppendRejection, MemoryLedger};

    fn keypair() -> SigningKeypair {
        SigningKeypair::ed25519_from_seed(&[0x42; 32])
    }

    fn client() -> LedgerClient<Arc<MemoryLedger>, SigningKeypair> {
        LedgerClient::new(
            Arc::new(MemoryLedger::new()),
            keypair(),
            ClientConfig::default(),
        )
    }

    /// Ledger that never answers.
    struct StalledLedger;

    #[async_trait]
    impl Ledger for StalledLedger {
        async fn create(&self) -> microledger_store::Result<LedgerId> {
            std::future::pending().await
        }

        async fn read(&self, _id: &LedgerId) -> microledger_store::Result<Vec<Block>> {
            std::future::pending().await
        }

        async fn append(&self, _id: &LedgerId, _block: &Block) -> microledger_store::Result<()> {
            std::future::pending().await
        }
    }

    /// Ledger that counts appends and rejects every one of them.
    struct RejectingLedger {
        appends: AtomicUsize,
    }

    #[async_trait]
    impl Ledger for RejectingLedger {
        async fn create(&self) -> microledger_store::Result<LedgerId> {
            Ok(LedgerId::from("rejecting"))
        }

        async fn read(&self, _id: &LedgerId) -> microledger_store::Result<Vec<Block>> {
            Ok(Vec::new())
        }

        async fn append(&self, _id: &LedgerId, _block: &Block) -> microledger_store::Result<()> {
            self.appends.fetch_add(1, Ordering::SeqCst);
            Err(AppendRejection::VerificationFailed("nope".into()).into())
        }
    }

    #[tokio::test]
    async fn test_append_builds_chain() {
        let client = client();
        let id = client.create_ledger().await.unwrap();

        let first = client.append_data(&id, b"first").await.unwrap();
        let second = client.append_data(&id, b"second").await.unwrap();

        assert_eq!(first.block_number(), 1);
        assert!(first.previous_link().is_none());
        assert_eq!(second.block_number(), 2);
        assert_eq!(second.previous_link(), Some(&first.fingerprint));

        let chain = client.fetch_verified(&id).await.unwrap();
        assert_eq!(chain, vec![first, second]);
    }

    #[tokio::test]
    async fn test_append_to_unknown_ledger() {
        let client = client();
        let err = client
            .append_block(&LedgerId::from("missing"), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MicroledgerError::Transport(TransportError::NotFound)));
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let config = ClientConfig {
            request_timeout_ms: 20,
            ..ClientConfig::default()
        };
        let client = LedgerClient::new(StalledLedger, keypair(), config);

        let err = client.fetch_chain(&LedgerId::from("any")).await.unwrap_err();
        assert!(matches!(err, MicroledgerError::Transport(TransportError::Timeout)));

        let err = client.create_ledger().await.unwrap_err();
        assert!(matches!(err, MicroledgerError::Transport(TransportError::Timeout)));
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let ledger = Arc::new(RejectingLedger {
            appends: AtomicUsize::new(0),
        });
        let client = LedgerClient::new(Arc::clone(&ledger), keypair(), ClientConfig::default());

        let err = client
            .append_block(&LedgerId::from("rejecting"), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MicroledgerError::Rejected(AppendRejection::VerificationFailed(_))
        ));
        assert_eq!(ledger.appends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shared_ledger_mixed_algorithms() {
        let ledger = Arc::new(MemoryLedger::new());
        let client = LedgerClient::new(Arc::clone(&ledger), keypair(), ClientConfig::default());
        let id = client.create_ledger().await.unwrap();
        client.append_data(&id, b"a").await.unwrap();
        client.append_data(&id, b"b").await.unwrap();

        // A second client, signing with secp256k1, extends the same chain.
        let other = LedgerClient::new(
            Arc::clone(&ledger),
            SigningKeypair::generate(microledger_core::SignatureAlgorithm::Es256k),
            ClientConfig::default(),
        );
        let third = other.append_data(&id, b"c").await.unwrap();
        assert_eq!(third.block_number(), 3);
        assert_eq!(other.fetch_verified(&id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_stale_tip_surfaces_conflict() {
        // A ledger whose reads lag one block behind its appends.
        struct LaggingLedger {
            inner: MemoryLedger,
        }

        #[async_trait]
        impl Ledger for LaggingLedger {
            async fn create(&self) -> microledger_store::Result<LedgerId> {
                self.inner.create().await
            }

            async fn read(&self, id: &LedgerId) -> microledger_store::Result<Vec<Block>> {
                let mut blocks = self.inner.read(id).await?;
                blocks.pop();
                Ok(blocks)
            }

            async fn append(&self, id: &LedgerId, block: &Block) -> microledger_store::Result<()> {
                self.inner.append(id, block).await
            }

            async fn tip(&self, id: &LedgerId) -> microledger_store::Result<Option<ChainTip>> {
                self.inner.tip(id).await
            }
        }

        let client = LedgerClient::new(
            LaggingLedger {
                inner: MemoryLedger::new(),
            },
            keypair(),
            ClientConfig::default(),
        );
        let id = client.create_ledger().await.unwrap();
        client.append_data(&id, b"genesis").await.unwrap();

        let err = client.append_data(&id, b"stale").await.unwrap_err();
        match err {
            MicroledgerError::Rejected(AppendRejection::Conflict {
                expected_number,
                got_number,
                ..
            }) => {
                assert_eq!(expected_number, 2);
                assert_eq!(got_number, 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
