//! Point-in-time book snapshots for market data consumers.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::OrderBookError;
use crate::types::{Price, Quantity};

/// Maximum levels per side included in engine snapshots.
pub const MAX_DEPTH_LEVELS: usize = 10;

/// Aggregate of all resting entries at a single price on one side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthLevel {
    /// Level price.
    pub price: Price,
    /// Total resting quantity.
    pub total_quantity: Quantity,
    /// Number of live orders.
    pub order_count: usize,
}

/// The most recent execution in a book.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LastTrade {
    /// Execution price.
    pub price: Price,
    /// Trade sequence number within the book.
    pub seq: u64,
}

/// A snapshot of the order book state at a specific point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSnapshot {
    /// The symbol this snapshot belongs to.
    pub symbol: String,

    /// When the snapshot was created, epoch millis.
    pub timestamp: u64,

    /// Bid levels, best-first.
    pub bids: Vec<DepthLevel>,

    /// Ask levels, best-first.
    pub asks: Vec<DepthLevel>,

    /// Last trade info, absent before the first execution.
    pub last_trade: Option<LastTrade>,
}

impl BookSnapshot {
    /// Best bid price and quantity.
    pub fn best_bid(&self) -> Option<(Price, Quantity)> {
        self.bids
            .first()
            .map(|level| (level.price, level.total_quantity))
    }

    /// Best ask price and quantity.
    pub fn best_ask(&self) -> Option<(Price, Quantity)> {
        self.asks
            .first()
            .map(|level| (level.price, level.total_quantity))
    }

    /// `best_ask - best_bid`.
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some(ask.saturating_sub(bid)),
            _ => None,
        }
    }

    /// Midpoint of best bid and best ask.
    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some(bid.midpoint(ask)),
            _ => None,
        }
    }

    /// Total quantity across the included bid levels.
    pub fn total_bid_quantity(&self) -> Quantity {
        self.bids
            .iter()
            .fold(Quantity::ZERO, |acc, l| acc.saturating_add(l.total_quantity))
    }

    /// Total quantity across the included ask levels.
    pub fn total_ask_quantity(&self) -> Quantity {
        self.asks
            .iter()
            .fold(Quantity::ZERO, |acc, l| acc.saturating_add(l.total_quantity))
    }
}

/// Snapshot layouts a persistence collaborator may encounter.
///
/// The tag travels with every sealed snapshot so readers can refuse
/// layouts they do not understand instead of misparsing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSchema {
    /// Depth levels per side plus last-trade info.
    DepthV1,
}

/// A [`BookSnapshot`] sealed for handoff to persistence collaborators.
///
/// Sealing digests a canonical byte encoding of the book contents (raw
/// fixed-point values, not serialized text), so the digest survives
/// re-serialization, field reordering and whitespace changes in storage.
/// [`SealedSnapshot::open`] refuses a payload whose digest no longer
/// matches its contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedSnapshot {
    schema: SnapshotSchema,
    digest: String,
    snapshot: BookSnapshot,
}

impl SealedSnapshot {
    /// Seal a snapshot under the current schema.
    pub fn seal(snapshot: BookSnapshot) -> Self {
        let digest = content_digest(&snapshot);
        Self {
            schema: SnapshotSchema::DepthV1,
            digest,
            snapshot,
        }
    }

    /// The schema this snapshot was sealed under.
    pub fn schema(&self) -> SnapshotSchema {
        self.schema
    }

    /// Hex-encoded SHA-256 over the canonical content encoding.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Verify the seal and hand back the snapshot.
    ///
    /// # Errors
    /// [`OrderBookError::ChecksumMismatch`] when the contents no longer
    /// match the digest they were sealed with.
    pub fn open(self) -> Result<BookSnapshot, OrderBookError> {
        let actual = content_digest(&self.snapshot);
        if actual != self.digest {
            return Err(OrderBookError::ChecksumMismatch {
                expected: self.digest,
                actual,
            });
        }
        Ok(self.snapshot)
    }

    /// Read the sealed snapshot without consuming the seal. The digest is
    /// not rechecked; use [`Self::open`] for untrusted payloads.
    pub fn peek(&self) -> &BookSnapshot {
        &self.snapshot
    }

    /// Serialize for transport or storage.
    pub fn encode(&self) -> Result<String, OrderBookError> {
        serde_json::to_string(self).map_err(|e| OrderBookError::Serialization(e.to_string()))
    }

    /// Deserialize a sealed snapshot. Unknown schema tags fail here; the
    /// digest is checked on [`Self::open`].
    pub fn decode(data: &str) -> Result<Self, OrderBookError> {
        serde_json::from_str(data).map_err(|e| OrderBookError::Serialization(e.to_string()))
    }
}

/// Digest the canonical content encoding: length-prefixed symbol, then per
/// side a tag, level count and each level's raw price, quantity and order
/// count in big-endian, then the last trade if any. The snapshot timestamp
/// is deliberately excluded so re-taking an identical book yields an
/// identical digest.
fn content_digest(snapshot: &BookSnapshot) -> String {
    let mut hasher = Sha256::new();
    hasher.update((snapshot.symbol.len() as u32).to_be_bytes());
    hasher.update(snapshot.symbol.as_bytes());
    for (tag, levels) in [(b"B", &snapshot.bids), (b"A", &snapshot.asks)] {
        hasher.update(tag);
        hasher.update((levels.len() as u32).to_be_bytes());
        for level in levels {
            hasher.update(level.price.raw().to_be_bytes());
            hasher.update(level.total_quantity.raw().to_be_bytes());
            hasher.update((level.order_count as u64).to_be_bytes());
        }
    }
    match &snapshot.last_trade {
        Some(last) => {
            hasher.update(b"T");
            hasher.update(last.price.raw().to_be_bytes());
            hasher.update(last.seq.to_be_bytes());
        }
        None => hasher.update(b"-"),
    }

    use std::fmt::Write;
    let mut out = String::with_capacity(64);
    for byte in hasher.finalize() {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
