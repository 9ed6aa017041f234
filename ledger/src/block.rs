//! # Blocks
//!
//! A [`Block`] is one sealed entry in the provenance ledger. Its hash is
//! computed exactly once, at construction, over a fixed preimage:
//!
//! ```text
//! index          8 bytes, little-endian u64
//! timestamp      8 bytes, little-endian u64 (milliseconds since epoch)
//! payload        canonical payload bytes (see payload module)
//! previous_hash  UTF-8 bytes of the parent's hex digest (or "0" sentinel)
//! ```
//!
//! The preimage layout is frozen. Any scanner, auditor or re-implementation
//! that concatenates these fields and runs SHA-256 over them arrives at the
//! same lowercase hex digest, with no ledger code in the loop.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config;
use crate::payload::{Payload, PayloadError};

/// One sealed ledger entry.
///
/// Fields are public and plain on purpose: a block is data, and tamper
/// evidence comes from hashing, not from access control. Mutating a stored
/// block is exactly the attack [`Block::verify`] exists to catch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain. Genesis is 0.
    pub index: u64,
    /// Seal time, milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Application payload, opaque to the ledger core.
    pub payload: Payload,
    /// Hex digest of the parent block, or the genesis sentinel `"0"`.
    pub previous_hash: String,
    /// This block's own digest over the preimage above.
    pub hash: String,
}

impl Block {
    /// Seals a new block over the given fields.
    ///
    /// The timestamp is a caller-supplied parameter rather than sampled
    /// here, so the same inputs always seal to the same hash. [`Chain`]
    /// stamps the current time on append; tests pass fixed values.
    ///
    /// [`Chain`]: crate::chain::Chain
    pub fn new(
        index: u64,
        timestamp: u64,
        payload: Payload,
        previous_hash: String,
    ) -> Result<Self, PayloadError> {
        let hash = seal_hash(index, timestamp, &payload, &previous_hash)?;
        Ok(Self {
            index,
            timestamp,
            payload,
            previous_hash,
            hash,
        })
    }

    /// Creates the genesis block: index 0, sentinel parent, fixed message
    /// payload, stamped with the current time.
    pub fn genesis() -> Self {
        let payload = Payload::new().with(
            config::GENESIS_PAYLOAD_KEY,
            config::GENESIS_PAYLOAD_MESSAGE,
        );
        // A single string entry under a fixed key. Encoding it cannot hit
        // the duplicate-key or non-finite paths.
        Self::new(
            0,
            current_timestamp_ms(),
            payload,
            config::GENESIS_PREVIOUS_HASH.to_string(),
        )
        .expect("genesis payload is canonically encodable")
    }

    /// Recomputes the digest from the block's current field values.
    ///
    /// For an untampered block this equals [`Block::hash`]. After any field
    /// edit it will not, which is the whole point.
    pub fn compute_hash(&self) -> Result<String, PayloadError> {
        seal_hash(self.index, self.timestamp, &self.payload, &self.previous_hash)
    }

    /// Checks that the stored hash still matches the stored fields.
    ///
    /// Returns `false` both for a mismatching digest and for a payload that
    /// no longer encodes at all; either way the block is not the one that
    /// was sealed.
    pub fn verify(&self) -> bool {
        match self.compute_hash() {
            Ok(expected) => expected == self.hash,
            Err(_) => false,
        }
    }

    /// First [`config::SHORT_ID_LENGTH`] hex characters of the hash, the
    /// form shown on labels and dashboards.
    pub fn short_id(&self) -> &str {
        let end = config::SHORT_ID_LENGTH.min(self.hash.len());
        &self.hash[..end]
    }
}

/// Computes the digest over the frozen preimage layout.
fn seal_hash(
    index: u64,
    timestamp: u64,
    payload: &Payload,
    previous_hash: &str,
) -> Result<String, PayloadError> {
    let payload_bytes = payload.canonical_bytes()?;

    let mut preimage =
        Vec::with_capacity(8 + 8 + payload_bytes.len() + previous_hash.len());
    preimage.extend_from_slice(&index.to_le_bytes());
    preimage.extend_from_slice(&timestamp.to_le_bytes());
    preimage.extend_from_slice(&payload_bytes);
    preimage.extend_from_slice(previous_hash.as_bytes());

    let digest = Sha256::digest(&preimage);
    Ok(hex::encode(digest))
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn current_timestamp_ms() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}
