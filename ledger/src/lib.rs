// Copyright (c) 2026 Verdant Labs. MIT License.
// See LICENSE for details.

//! # VERDANT Ledger - Core Library
//!
//! The tamper-evident heart of VERDANT: a minimal, hash-linked, append-only
//! ledger for herb provenance. Every submission a farmer makes becomes a
//! block; every block seals its parent's digest into its own; and anyone
//! with the hash on a label can ask the ledger whether the story still
//! holds together.
//!
//! This crate is deliberately small. It does consensus-free custody
//! tracking and nothing else: no proof-of-work, no peers, no forks, no
//! database. The chain lives in memory for the lifetime of its owner, and
//! services that need durability or HTTP live in their own crates on top.
//!
//! ## Layout
//!
//! - **payload** - Ordered `key -> value` record bodies and the canonical
//!   byte encoding that feeds every hash.
//! - **block** - The sealed ledger entry. Hash computed once, at
//!   construction, over a frozen preimage layout.
//! - **chain** - The append-only chain itself: genesis, append, lookup,
//!   full revalidation.
//! - **config** - Ledger constants. The genesis sentinel lives here and
//!   nowhere else.
//!
//! ## Ground rules
//!
//! 1. Verification must be possible with stock tooling. SHA-256 over a
//!    documented preimage, lowercase hex, no custom crypto.
//! 2. Tampering is expected, not exceptional. Validity is a boolean you
//!    ask for, never an error that gets thrown at you.
//! 3. A failed append leaves no trace. The chain is either extended by one
//!    sealed block or untouched.

pub mod block;
pub mod chain;
pub mod config;
pub mod payload;

pub use block::{current_timestamp_ms, Block};
pub use chain::{validate_blocks, Chain, ChainStatus};
pub use payload::{Payload, PayloadError, PayloadValue};
