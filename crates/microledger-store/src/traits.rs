//! Ledger trait: the abstract interface to an append-only ledger.
//!
//! The ledger is the sole authority that assigns a block its durable
//! position. Implementations include the in-memory reference ledger; a
//! network client for a remote ledger server implements the same trait.

use std::fmt;

use async_trait::async_trait;
use microledger_core::{Block, ChainTip};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Opaque ledger identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerId(pub String);

impl LedgerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LedgerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LedgerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A ledger and its blocks in chain order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerView {
    pub id: LedgerId,
    pub blocks: Vec<Block>,
}

impl LedgerView {
    /// Predecessor state for the next block, `None` for an empty ledger.
    pub fn tip(&self) -> Option<ChainTip> {
        self.blocks.last().map(Block::tip)
    }
}

/// The Ledger trait: async interface to an append-only block chain store.
///
/// # Design Notes
///
/// - **Append-only**: accepted blocks are never modified or removed.
/// - **Serialized appends**: a block is accepted only if it extends the
///   current tip; anything else is rejected with
///   [`AppendRejection::Conflict`](crate::AppendRejection::Conflict).
/// - **No retries**: callers surface rejections and transport failures as-is.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Create a new, empty ledger.
    async fn create(&self) -> Result<LedgerId>;

    /// Read every block of a ledger, in chain order.
    ///
    /// Returns an empty vec for a fresh ledger and
    /// [`TransportError::NotFound`](crate::TransportError::NotFound) for an
    /// unknown id.
    async fn read(&self, id: &LedgerId) -> Result<Vec<Block>>;

    /// Append a signed block.
    async fn append(&self, id: &LedgerId, block: &Block) -> Result<()>;

    /// Read a ledger together with its id.
    async fn view(&self, id: &LedgerId) -> Result<LedgerView> {
        Ok(LedgerView {
            id: id.clone(),
            blocks: self.read(id).await?,
        })
    }

    /// The ledger's latest block as predecessor state.
    async fn tip(&self, id: &LedgerId) -> Result<Option<ChainTip>> {
        Ok(self.read(id).await?.last().map(Block::tip))
    }
}

#[async_trait]
impl<L: Ledger + ?Sized> Ledger for std::sync::Arc<L> {
    async fn create(&self) -> Result<LedgerId> {
        (**self).create().await
    }

    async fn read(&self, id: &LedgerId) -> Result<Vec<Block>> {
        (**self).read(id).await
    }

    async fn append(&self, id: &LedgerId, block: &Block) -> Result<()> {
        (**self).append(id, block).await
    }

    async fn tip(&self, id: &LedgerId) -> Result<Option<ChainTip>> {
        (**self).tip(id).await
    }
}
