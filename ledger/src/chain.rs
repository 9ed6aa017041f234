//! # The Provenance Chain
//!
//! A [`Chain`] is an in-memory, append-only sequence of hash-linked blocks:
//!
//! ```text
//! [genesis] <- [block 1] <- [block 2] <- ... <- [tip]
//! ```
//!
//! Each block stores its parent's digest, and its own digest covers that
//! field. Editing any sealed block therefore breaks the recomputed digest at
//! that position, and re-sealing the edited block instead breaks the link
//! stored by its successor. Either way [`Chain::is_valid`] turns false.
//!
//! The chain lives for the lifetime of the owning process. There is no
//! persistence and no recovery: a restart begins a fresh ledger from a new
//! genesis block. Callers that need durable records keep them in their own
//! store and treat the chain as the integrity layer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::block::{current_timestamp_ms, Block};
use crate::payload::{Payload, PayloadError};

/// An append-only hash-linked ledger.
///
/// All mutation goes through [`Chain::append`], which takes `&mut self`.
/// That makes single-owner use race-free by construction; services sharing
/// one chain across tasks wrap it in a lock so the read-tip, seal, push
/// sequence stays a single critical section. The node uses
/// `tokio::sync::RwLock` for exactly this.
#[derive(Debug, Clone)]
pub struct Chain {
    blocks: Vec<Block>,
    /// Full hex digest -> position in `blocks`. Keeps lookups O(1) while
    /// the authoritative order stays in the vector.
    by_hash: HashMap<String, usize>,
}

/// Point-in-time summary of the chain, as reported to operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainStatus {
    /// Number of blocks, genesis included.
    pub length: u64,
    /// Result of a full revalidation performed for this status call.
    pub is_valid: bool,
    /// Digest of the tip block.
    pub latest_hash: String,
}

impl Chain {
    /// Creates a chain holding exactly the genesis block.
    pub fn new() -> Self {
        let genesis = Block::genesis();
        let mut by_hash = HashMap::new();
        by_hash.insert(genesis.hash.clone(), 0);
        Self {
            blocks: vec![genesis],
            by_hash,
        }
    }

    /// Seals `payload` into a new block on the tip and returns it.
    ///
    /// The block is fully constructed, hash included, before the chain is
    /// touched. A payload that fails canonical encoding leaves the chain
    /// exactly as it was: same length, same tip, still valid.
    pub fn append(&mut self, payload: Payload) -> Result<&Block, PayloadError> {
        let index = self.blocks.len() as u64;
        let previous_hash = self.tip().hash.clone();
        let block = Block::new(index, current_timestamp_ms(), payload, previous_hash)?;

        let position = self.blocks.len();
        // A repeated digest would mean an identical submission landing in
        // the same millisecond (or a SHA-256 collision). The index keeps
        // the first position it saw; the vector keeps every block.
        self.by_hash.entry(block.hash.clone()).or_insert(position);
        self.blocks.push(block);
        Ok(&self.blocks[position])
    }

    /// Looks up a block by its full hex digest. Exact and case-sensitive:
    /// digests are stored lowercase, and `"AB..."` is not `"ab..."`.
    ///
    /// `None` is the normal miss result, not a failure.
    pub fn find_by_hash(&self, hash: &str) -> Option<&Block> {
        self.by_hash.get(hash).map(|&position| &self.blocks[position])
    }

    /// Revalidates the entire chain from scratch.
    ///
    /// Nothing is cached: every call recomputes every digest, so the answer
    /// reflects the blocks as they are right now, however they got that way.
    pub fn is_valid(&self) -> bool {
        validate_blocks(&self.blocks)
    }

    /// Summarizes the chain. Runs a full revalidation, so this costs O(n).
    pub fn status(&self) -> ChainStatus {
        ChainStatus {
            length: self.len(),
            is_valid: self.is_valid(),
            latest_hash: self.tip().hash.clone(),
        }
    }

    /// The most recently appended block.
    pub fn tip(&self) -> &Block {
        // A chain holds at least the genesis block from construction on.
        &self.blocks[self.blocks.len() - 1]
    }

    /// The genesis block.
    pub fn genesis(&self) -> &Block {
        &self.blocks[0]
    }

    /// Number of blocks, genesis included.
    pub fn len(&self) -> u64 {
        self.blocks.len() as u64
    }

    /// Returns the block at `index`, if any.
    pub fn get(&self, index: u64) -> Option<&Block> {
        self.blocks.get(index as usize)
    }

    /// All blocks in chain order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Iterates blocks from genesis to tip.
    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

/// Validates a slice of blocks as a custody chain.
///
/// For every block after the first, two checks must hold:
///
/// 1. the digest recomputed from the block's current fields equals its
///    stored `hash`, and
/// 2. its `previous_hash` equals the stored `hash` of the block before it.
///
/// The first block is the trust anchor and is taken as-is. An empty slice
/// is vacuously valid. Verdicts are boolean: validation is an expected
/// outcome, not an error condition.
pub fn validate_blocks(blocks: &[Block]) -> bool {
    for i in 1..blocks.len() {
        let current = &blocks[i];
        if !current.verify() {
            return false;
        }
        if current.previous_hash != blocks[i - 1].hash {
            return false;
        }
    }
    true
}
