//! In-memory implementation of the Ledger trait.
//!
//! Mirrors the behaviour of a ledger server: appends are serialized by a
//! write lock, a block must extend the current tip, and its fingerprint
//! and signatures are checked before it is accepted.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use microledger_core::{validate_successor, Block, ChainTip, GENESIS_BLOCK_NUMBER};

use crate::error::{AppendRejection, Result, TransportError};
use crate::traits::{Ledger, LedgerId};

/// In-memory ledger.
///
/// All data is lost when the ledger is dropped. Thread-safe via RwLock.
pub struct MemoryLedger {
    inner: RwLock<MemoryLedgerInner>,
}

struct MemoryLedgerInner {
    /// Blocks per ledger, in chain order.
    ledgers: HashMap<LedgerId, Vec<Block>>,
}

impl MemoryLedger {
    /// Create a new ledger store with no ledgers.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryLedgerInner {
                ledgers: HashMap::new(),
            }),
        }
    }

    /// Ids of every ledger, sorted.
    pub async fn list(&self) -> Vec<LedgerId> {
        let inner = self.inner.read().await;
        let mut ids: Vec<LedgerId> = inner.ledgers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Append a block received as JSON.
    ///
    /// Undecodable input is rejected as [`AppendRejection::Malformed`].
    pub async fn append_json(&self, id: &LedgerId, body: &str) -> Result<Block> {
        let block: Block = serde_json::from_str(body)
            .map_err(|e| AppendRejection::Malformed(e.to_string()))?;
        self.append(id, &block).await?;
        Ok(block)
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject a block that does not extend `tip`.
fn check_position(tip: Option<&ChainTip>, block: &Block) -> std::result::Result<(), AppendRejection> {
    let expected_number = match tip {
        Some(tip) => tip.next_block_number().ok_or_else(|| {
            AppendRejection::Malformed(format!(
                "ledger tip {} holds the last block number",
                tip.block_number
            ))
        })?,
        None => GENESIS_BLOCK_NUMBER,
    };
    let expected_link = tip.map(|t| t.fingerprint);

    if block.block_number() != expected_number || block.previous_link() != expected_link.as_ref() {
        return Err(AppendRejection::Conflict {
            expected_number,
            expected_link,
            got_number: block.block_number(),
            got_link: block.previous_link().copied(),
        });
    }
    Ok(())
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn create(&self) -> Result<LedgerId> {
        let id = LedgerId(Uuid::new_v4().to_string());
        let mut inner = self.inner.write().await;
        inner.ledgers.insert(id.clone(), Vec::new());
        info!(ledger = %id, "created ledger");
        Ok(id)
    }

    async fn read(&self, id: &LedgerId) -> Result<Vec<Block>> {
        let inner = self.inner.read().await;
        let blocks = inner.ledgers.get(id).ok_or(TransportError::NotFound)?;
        debug!(ledger = %id, blocks = blocks.len(), "read ledger");
        Ok(blocks.clone())
    }

    async fn append(&self, id: &LedgerId, block: &Block) -> Result<()> {
        let mut inner = self.inner.write().await;
        let blocks = inner.ledgers.get_mut(id).ok_or(TransportError::NotFound)?;
        let tip = blocks.last().map(Block::tip);

        if let Err(rejection) = check_position(tip.as_ref(), block) {
            warn!(ledger = %id, block_number = block.block_number(), %rejection, "append conflict");
            return Err(rejection.into());
        }

        if let Err(err) = validate_successor(tip.as_ref(), block) {
            warn!(ledger = %id, block_number = block.block_number(), %err, "append failed verification");
            return Err(AppendRejection::VerificationFailed(err.to_string()).into());
        }

        debug!(
            ledger = %id,
            block_number = block.block_number(),
            fingerprint = %block.fingerprint.to_hex(),
            "block verified"
        );
        blocks.push(block.clone());
        info!(ledger = %id, block_number = block.block_number(), "appended block");
        Ok(())
    }

    async fn tip(&self, id: &LedgerId) -> Result<Option<ChainTip>> {
        let inner = self.inner.read().await;
        let blocks = inner.ledgers.get(id).ok_or(TransportError::NotFound)?;
        Ok(blocks.last().map(Block::tip))
    }
}
