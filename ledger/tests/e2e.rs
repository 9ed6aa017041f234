//! End-to-end integration tests for the VERDANT ledger.
//!
//! These tests exercise the full provenance lifecycle: a farmer submits
//! harvest records, each becomes a sealed block, labels carry block hashes,
//! and auditors verify them later. Blocks are also exported and tampered
//! with the way a hostile storage layer would, and `validate_blocks` is
//! expected to notice every time.
//!
//! Each test stands alone with its own chain. No shared state, no test
//! ordering dependencies, no flaky failures.

use sha2::{Digest, Sha256};

use verdant_ledger::{config, validate_blocks, Block, Chain, Payload};

// -- Fixtures ------------------------------------------------------------

/// Builds the payload a harvest submission form produces.
fn submission(farmer: &str, herb: &str, cost: f64) -> Payload {
    Payload::new()
        .with("farmer_name", farmer)
        .with("herb_type", herb)
        .with("location", "Karnataka")
        .with("season", "monsoon")
        .with("cost_per_kg", cost)
}

// -- 1. Fresh ledger -----------------------------------------------------

#[test]
fn fresh_ledger_starts_at_genesis() {
    let chain = Chain::new();

    assert_eq!(chain.len(), 1);
    let genesis = chain.genesis();
    assert_eq!(genesis.index, 0);
    assert_eq!(genesis.previous_hash, config::GENESIS_PREVIOUS_HASH);
    assert!(genesis.verify());

    let status = chain.status();
    assert_eq!(status.length, 1);
    assert!(status.is_valid);
    assert_eq!(status.latest_hash, genesis.hash);
}

// -- 2. Single submission lifecycle --------------------------------------

#[test]
fn single_submission_lifecycle() {
    let mut chain = Chain::new();
    let genesis_hash = chain.genesis().hash.clone();

    let sealed = chain.append(submission("A", "Tulsi", 10.0)).unwrap().clone();

    assert_eq!(sealed.index, 1);
    assert_eq!(sealed.previous_hash, genesis_hash);
    assert_eq!(sealed.hash.len(), config::HASH_HEX_LENGTH);
    assert!(chain.is_valid());

    // The hash printed on the label leads back to the exact record.
    let found = chain.find_by_hash(&sealed.hash).unwrap();
    assert_eq!(found, &sealed);
    assert_eq!(found.payload.get("herb_type").unwrap().to_string(), "Tulsi");

    let status = chain.status();
    assert_eq!(status.length, 2);
    assert!(status.is_valid);
    assert_eq!(status.latest_hash, sealed.hash);
}

// -- 3. A season of submissions ------------------------------------------

#[test]
fn chain_of_custody_across_many_submissions() {
    let mut chain = Chain::new();
    let mut label_hashes = Vec::new();

    for i in 0..10 {
        let farmer = format!("farmer-{}", i % 3);
        let sealed = chain
            .append(submission(&farmer, "Ashwagandha", 12.5 + i as f64))
            .unwrap();
        label_hashes.push(sealed.hash.clone());
    }

    assert_eq!(chain.len(), 11);
    assert!(chain.is_valid());

    // Every block points at its predecessor's digest, all the way down.
    for i in 1..chain.len() {
        let block = chain.get(i).unwrap();
        assert_eq!(block.index, i);
        assert_eq!(block.previous_hash, chain.get(i - 1).unwrap().hash);
    }

    // Every label still resolves to the right block.
    for (i, hash) in label_hashes.iter().enumerate() {
        let block = chain.find_by_hash(hash).unwrap();
        assert_eq!(block.index, (i + 1) as u64);
    }
}

#[test]
fn status_tracks_every_append() {
    let mut chain = Chain::new();
    for i in 0..5 {
        let sealed_hash = chain
            .append(submission("A", "Brahmi", 8.0 + i as f64))
            .unwrap()
            .hash
            .clone();
        let status = chain.status();
        assert_eq!(status.length, i + 2);
        assert!(status.is_valid);
        assert_eq!(status.latest_hash, sealed_hash);
    }
}

// -- 4. An auditor recomputes a digest by hand ---------------------------

#[test]
fn digest_is_reproducible_from_the_documented_preimage() {
    let payload = submission("Asha", "Tulsi", 10.0);
    let previous_hash = "ab".repeat(32);
    let block = Block::new(3, 1_764_000_123_456, payload.clone(), previous_hash).unwrap();

    // index LE, timestamp LE, canonical payload bytes, parent digest bytes.
    let mut preimage = Vec::new();
    preimage.extend_from_slice(&3_u64.to_le_bytes());
    preimage.extend_from_slice(&1_764_000_123_456_u64.to_le_bytes());
    preimage.extend_from_slice(&payload.canonical_bytes().unwrap());
    preimage.extend_from_slice(block.previous_hash.as_bytes());

    let recomputed = hex::encode(Sha256::digest(&preimage));
    assert_eq!(block.hash, recomputed);
}

#[test]
fn identical_submissions_seal_identically() {
    let a = Block::new(1, 1_764_000_000_000, submission("A", "Tulsi", 10.0), "0".into()).unwrap();
    let b = Block::new(1, 1_764_000_000_000, submission("A", "Tulsi", 10.0), "0".into()).unwrap();
    assert_eq!(a.hash, b.hash);
}

// -- 5. Someone edits history --------------------------------------------

#[test]
fn payload_tamper_in_exported_blocks_is_detected() {
    let mut chain = Chain::new();
    chain.append(submission("A", "Tulsi", 10.0)).unwrap();
    chain.append(submission("B", "Neem", 6.0)).unwrap();

    let mut blocks = chain.blocks().to_vec();
    assert!(validate_blocks(&blocks));

    // Flip one character of the stored herb name in block 1.
    blocks[1].payload = submission("A", "Xulsi", 10.0);
    assert!(!validate_blocks(&blocks));

    // The ledger itself was never touched.
    assert!(chain.is_valid());
}

#[test]
fn resealed_history_is_caught_by_stale_links() {
    let mut chain = Chain::new();
    chain.append(submission("A", "Tulsi", 10.0)).unwrap();
    chain.append(submission("B", "Neem", 6.0)).unwrap();

    let mut blocks = chain.blocks().to_vec();

    // The attacker rewrites block 1 and re-seals it, producing a block that
    // is internally consistent on its own.
    let doctored = Block::new(
        blocks[1].index,
        blocks[1].timestamp,
        submission("A", "Tulsi", 99.0),
        blocks[1].previous_hash.clone(),
    )
    .unwrap();
    assert!(doctored.verify());
    blocks[1] = doctored;

    // Block 2 still records the original digest, so the chain fails.
    assert!(!validate_blocks(&blocks));
}

#[test]
fn link_rewiring_is_detected() {
    let mut chain = Chain::new();
    chain.append(submission("A", "Tulsi", 10.0)).unwrap();
    chain.append(submission("B", "Neem", 6.0)).unwrap();

    let mut blocks = chain.blocks().to_vec();
    blocks[2].previous_hash = blocks[0].hash.clone();
    assert!(!validate_blocks(&blocks));
}

// -- 6. Bad submissions and bad lookups ----------------------------------

#[test]
fn rejected_submission_has_no_side_effects() {
    let mut chain = Chain::new();
    chain.append(submission("A", "Tulsi", 10.0)).unwrap();
    let status_before = chain.status();

    let poisoned = submission("B", "Neem", f64::INFINITY);
    assert!(chain.append(poisoned).is_err());

    assert_eq!(chain.status(), status_before);
}

#[test]
fn lookups_are_exact_matches_only() {
    let mut chain = Chain::new();
    let sealed_hash = chain
        .append(submission("A", "Tulsi", 10.0))
        .unwrap()
        .hash
        .clone();

    assert!(chain.find_by_hash(&sealed_hash).is_some());
    assert!(chain.find_by_hash(&sealed_hash.to_uppercase()).is_none());
    assert!(chain
        .find_by_hash(&sealed_hash[..config::SHORT_ID_LENGTH])
        .is_none());
    assert!(chain
        .find_by_hash(&"f".repeat(config::HASH_HEX_LENGTH))
        .is_none());
}

#[test]
fn independent_ledgers_share_no_history() {
    let mut a = Chain::new();
    let b = Chain::new();

    let sealed_hash = a
        .append(submission("A", "Tulsi", 10.0))
        .unwrap()
        .hash
        .clone();

    assert!(a.find_by_hash(&sealed_hash).is_some());
    assert!(b.find_by_hash(&sealed_hash).is_none());
    assert_eq!(b.len(), 1);
}
