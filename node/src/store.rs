//! # Record Store
//!
//! The persistent mirror of every record this node has sealed, built on
//! sled's embedded key-value store.
//!
//! The chain itself is deliberately in-memory and restarts from a fresh
//! genesis with the process. This store is the operational memory that
//! survives: the submitted fields, the block hash printed on the label,
//! and the generated QR code, so operators can browse history and reprint
//! labels after a restart. It is a mirror, not a source of truth. Chain
//! membership of a hash is always answered by the chain.
//!
//! ## Trees
//!
//! | Tree            | Key              | Value                  |
//! |-----------------|------------------|------------------------|
//! | `records`       | `seq` (8B BE)    | `bincode(StoredRecord)`|
//! | `record_hashes` | `hash` (UTF-8)   | `seq` (8B BE)          |
//!
//! Sequence numbers are stored as big-endian u64 so that sled's
//! lexicographic ordering matches numeric ordering, which makes "newest
//! first" scans a reverse iteration.

use sled::{Db, Tree};
use std::path::Path;

// -- Errors -----------------------------------------------------------------

/// Everything that can go wrong while mirroring or reading rows.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled: {0}")]
    Sled(#[from] sled::Error),

    #[error("row codec: {0}")]
    Codec(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// -- Row type ---------------------------------------------------------------

/// One mirrored submission, exactly as it was sealed.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StoredRecord {
    pub farmer_name: String,
    pub herb_type: String,
    pub location: String,
    pub season: String,
    pub cost_per_kg: f64,
    /// RFC 3339 time stamped by the node when the submission arrived.
    pub submission_time: String,
    /// Index of the block this record was sealed into.
    pub block_index: u64,
    /// Full hex digest of that block, the value printed on labels.
    pub block_hash: String,
    /// The generated QR code, as a `data:image/svg+xml;base64,...` URL.
    pub qr_code: String,
}

// -- Store handle -----------------------------------------------------------

/// Persistent mirror of sealed records.
///
/// Typed accessors over two sled trees, with rows encoded as bincode.
/// sled serializes writes internally, so an `Arc<RecordStore>` can be
/// shared across tasks without any extra locking.
#[derive(Debug, Clone)]
pub struct RecordStore {
    /// Owning handle, kept for `generate_id` and flushes.
    db: Db,
    /// Records keyed by sequence number (big-endian u64).
    records: Tree,
    /// Reverse index: block hash (UTF-8 hex) -> sequence (8 bytes BE).
    record_hashes: Tree,
}

impl RecordStore {
    /// Open or create a record store at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::with_trees(sled::open(path)?)
    }

    /// A throwaway store backed by a temp file sled deletes on drop.
    #[cfg(test)]
    pub fn open_temporary() -> StoreResult<Self> {
        Self::with_trees(sled::Config::new().temporary(true).open()?)
    }

    /// Opens the named trees on an already-open handle.
    fn with_trees(db: Db) -> StoreResult<Self> {
        let records = db.open_tree("records")?;
        let record_hashes = db.open_tree("record_hashes")?;

        Ok(Self {
            db,
            records,
            record_hashes,
        })
    }

    // -- Writing and reading rows -------------------------------------------

    /// Mirror a sealed record. Returns the assigned sequence number.
    ///
    /// Block indexes restart from zero with the process while mirror rows
    /// accumulate across runs, so rows get their own monotonic sequence
    /// instead of being keyed by block index.
    pub fn insert(&self, record: &StoredRecord) -> StoreResult<u64> {
        let seq = self.db.generate_id()?;
        let seq_key = seq.to_be_bytes();
        let bytes =
            bincode::serialize(record).map_err(|e| StoreError::Codec(e.to_string()))?;

        self.records.insert(seq_key, bytes)?;
        self.record_hashes
            .insert(record.block_hash.as_bytes(), &seq_key)?;

        // Flush so a mirrored row survives an immediate crash.
        self.db.flush()?;

        Ok(seq)
    }

    /// Retrieve a record by the block hash it was sealed under.
    ///
    /// Performs a two-step lookup: hash -> sequence (from `record_hashes`),
    /// then sequence -> record (from `records`). Returns `None` for a hash
    /// this node never mirrored.
    pub fn get_by_hash(&self, hash: &str) -> StoreResult<Option<StoredRecord>> {
        match self.record_hashes.get(hash.as_bytes())? {
            Some(seq_bytes) => match self.records.get(&seq_bytes)? {
                Some(bytes) => {
                    let record: StoredRecord = bincode::deserialize(&bytes)
                        .map_err(|e| StoreError::Codec(e.to_string()))?;
                    Ok(Some(record))
                }
                None => Ok(None),
            },
            None => Ok(None),
        }
    }

    /// The most recently mirrored records, newest first.
    pub fn recent(&self, limit: usize) -> StoreResult<Vec<StoredRecord>> {
        let mut out = Vec::with_capacity(limit.min(64));
        for entry in self.records.iter().rev().take(limit) {
            let (_seq, value) = entry?;
            let record: StoredRecord = bincode::deserialize(&value)
                .map_err(|e| StoreError::Codec(e.to_string()))?;
            out.push(record);
        }
        Ok(out)
    }

    // -- Housekeeping -------------------------------------------------------

    /// Number of mirrored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(i: u64) -> StoredRecord {
        StoredRecord {
            farmer_name: format!("farmer-{i}"),
            herb_type: "Tulsi".to_string(),
            location: "Karnataka".to_string(),
            season: "monsoon".to_string(),
            cost_per_kg: 10.0 + i as f64,
            submission_time: "2026-08-22T09:30:00+00:00".to_string(),
            block_index: i + 1,
            block_hash: format!("{i:064x}"),
            qr_code: "data:image/svg+xml;base64,...".to_string(),
        }
    }

    #[test]
    fn open_temporary_store() {
        let store = RecordStore::open_temporary().expect("should create temp store");
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn insert_and_retrieve_by_hash() {
        let store = RecordStore::open_temporary().unwrap();
        let record = make_record(1);

        store.insert(&record).unwrap();

        let retrieved = store
            .get_by_hash(&record.block_hash)
            .unwrap()
            .expect("record should exist");
        assert_eq!(retrieved, record);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unknown_hash_returns_none() {
        let store = RecordStore::open_temporary().unwrap();
        assert!(store.get_by_hash("not-a-mirrored-hash").unwrap().is_none());
    }

    #[test]
    fn recent_returns_newest_first() {
        let store = RecordStore::open_temporary().unwrap();
        for i in 0..3 {
            store.insert(&make_record(i)).unwrap();
        }

        let recent = store.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].farmer_name, "farmer-2");
        assert_eq!(recent[1].farmer_name, "farmer-1");

        // Asking for more than exists returns everything.
        let all = store.recent(100).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].farmer_name, "farmer-0");
    }

    #[test]
    fn rows_survive_reopen() {
        let dir = tempfile::tempdir().expect("temp dir");
        let record = make_record(7);

        // First session: mirror a record.
        {
            let store = RecordStore::open(dir.path()).expect("open store");
            store.insert(&record).unwrap();
            store.flush().unwrap();
        }
        // store is dropped here.

        // Second session: the row is still there.
        {
            let store = RecordStore::open(dir.path()).expect("reopen store");
            assert_eq!(store.len(), 1);
            let retrieved = store
                .get_by_hash(&record.block_hash)
                .unwrap()
                .expect("row should survive reopen");
            assert_eq!(retrieved, record);
        }
    }

    #[test]
    fn sequence_numbers_keep_insertion_order() {
        let store = RecordStore::open_temporary().unwrap();
        let first = store.insert(&make_record(0)).unwrap();
        let second = store.insert(&make_record(1)).unwrap();
        assert!(second > first);
    }
}
