//! # Ledger Configuration & Constants
//!
//! Every magic number in VERDANT lives here. Found one hardcoded somewhere
//! else? Congratulations, you found a bug.
//!
//! These values define the identity of every block ever sealed. Changing the
//! genesis sentinel or hash parameters after records are in the wild breaks
//! external verification, so treat this file as write-once.

// -- Version -------------------------------------------------------------

/// The ledger format version. Bumped only when the hash preimage layout or
/// the canonical payload encoding changes.
pub const LEDGER_VERSION: &str = "0.1.0";

// -- Genesis -------------------------------------------------------------

/// Sentinel `previous_hash` carried by the genesis block. A literal `"0"`,
/// not 64 zero nibbles: the field holds either a real digest or this
/// sentinel, and the two must never be confusable.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Key of the single entry in the genesis payload.
pub const GENESIS_PAYLOAD_KEY: &str = "message";

/// Message embedded in the genesis block payload.
/// (Satoshi had "The Times 03/Jan/2009"; we have this.)
pub const GENESIS_PAYLOAD_MESSAGE: &str = "VERDANT/2026: every herb has a history";

// -- Hashing -------------------------------------------------------------

/// The hash function sealing every block. SHA-256, so external verifiers
/// (auditors, QR scanners, the curious) can recompute digests with stock
/// tooling instead of linking against us.
pub const HASH_FUNCTION: &str = "SHA-256";

/// Digest length in bytes.
pub const HASH_OUTPUT_LENGTH: usize = 32;

/// Digest length as lowercase hex, the form every block stores and every
/// API surface exchanges.
pub const HASH_HEX_LENGTH: usize = 64;

/// Number of leading hex characters shown as a record's short id.
/// Display sugar only: lookups are always full-hash, exact-match.
pub const SHORT_ID_LENGTH: usize = 8;

// -- Node defaults -------------------------------------------------------

/// Default HTTP API port. 8373 is "VERD" typed on a phone keypad.
/// Nobody on the team regrets this.
pub const DEFAULT_API_PORT: u16 = 8373;

/// Default port for the Prometheus exposition.
pub const DEFAULT_METRICS_PORT: u16 = 8374;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_lengths_are_consistent() {
        // Hex doubles the byte length. If this fails, one of the two
        // constants was edited without the other.
        assert_eq!(HASH_HEX_LENGTH, HASH_OUTPUT_LENGTH * 2);
        assert!(SHORT_ID_LENGTH < HASH_HEX_LENGTH);
    }

    #[test]
    fn genesis_sentinel_cannot_be_a_digest() {
        assert_ne!(GENESIS_PREVIOUS_HASH.len(), HASH_HEX_LENGTH);
        assert!(!GENESIS_PAYLOAD_MESSAGE.is_empty());
    }

    #[test]
    fn default_ports_are_distinct() {
        assert_ne!(DEFAULT_API_PORT, DEFAULT_METRICS_PORT);
    }
}
