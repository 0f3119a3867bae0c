//! Common test utilities for coinledger store integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use coinledger_core::{Transaction, TransactionId, UserId};
use coinledger_store::{FileFormat, StoreConfig, TransactionStore};
use tempfile::TempDir;

/// A store in a fresh temporary directory.
pub struct TestStore {
    /// The store under test.
    pub store: TransactionStore,
    /// Temporary directory for the files (kept alive for test duration).
    pub dir: TempDir,
}

impl TestStore {
    /// Create an initialized, empty store using the given file format.
    pub fn new(format: FileFormat) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let file = match format {
            FileFormat::Csv => "ledger.csv",
            FileFormat::Cbor => "ledger.db",
        };
        let store = TransactionStore::open_or_initialize(Self::config_in(&dir, file))
            .expect("Failed to initialize store");
        Self { store, dir }
    }

    /// Create an initialized CSV-backed store.
    pub fn csv() -> Self {
        Self::new(FileFormat::Csv)
    }

    /// The configuration the store was opened with.
    pub fn config(&self) -> StoreConfig {
        self.store.config().clone()
    }

    /// Open a second store instance over the same files.
    pub fn reopen(&self) -> TransactionStore {
        TransactionStore::open(self.config()).expect("Failed to reopen store")
    }

    fn config_in(dir: &TempDir, file: &str) -> StoreConfig {
        StoreConfig::new(dir.path().join(file))
    }
}

/// A minimal trade.
pub fn trade(id: u64, user: u64, symbol: &str) -> Transaction {
    Transaction::new(TransactionId::new(id), UserId::new(user), symbol, "buy", 0.5)
}

/// Sorted keys of a result set.
pub fn ids(records: &[&Transaction]) -> Vec<u64> {
    records.iter().map(|r| r.transaction_id.get()).collect()
}
