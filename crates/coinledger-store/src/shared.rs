//! Thread-safe handle to a store.
//!
//! Create, update, and delete each touch the primary collection and every
//! index. A single mutex guards the whole store so that no reader can observe
//! one of those changes half done.

use std::sync::{Arc, Mutex};

use crate::backend::{Backend, FileBackend};
use crate::error::{Result, StoreError};
use crate::store::TransactionStore;

/// A cloneable, mutex-guarded `TransactionStore`.
pub struct SharedStore<B: Backend = FileBackend> {
    inner: Arc<Mutex<TransactionStore<B>>>,
}

impl<B: Backend> SharedStore<B> {
    /// Wrap a store for shared use.
    #[must_use]
    pub fn new(store: TransactionStore<B>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Run `f` with exclusive access to the store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Poisoned` if another holder panicked, otherwise
    /// whatever `f` returns.
    pub fn write<T>(&self, f: impl FnOnce(&mut TransactionStore<B>) -> Result<T>) -> Result<T> {
        let mut guard = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        f(&mut guard)
    }

    /// Run `f` with shared access to the store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Poisoned` if another holder panicked.
    pub fn read<T>(&self, f: impl FnOnce(&TransactionStore<B>) -> T) -> Result<T> {
        let guard = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&guard))
    }
}

impl<B: Backend> Clone for SharedStore<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use coinledger_core::{Field, Transaction, TransactionId, UserId};
    use tempfile::TempDir;

    #[test]
    fn concurrent_creates_keep_indexes_consistent() {
        let dir = TempDir::new().unwrap();
        let store = TransactionStore::open_or_initialize(StoreConfig::new(
            dir.path().join("shared.csv"),
        ))
        .unwrap();
        let shared = SharedStore::new(store);

        let handles: Vec<_> = (0..4u64)
            .map(|worker| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    for n in 0..10u64 {
                        let id = TransactionId::new(worker * 100 + n);
                        let tx = Transaction::new(id, UserId::new(worker), "BTC", "buy", 1.0);
                        shared.write(|s| s.create(tx)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let (len, consistent, btc) = shared
            .read(|s| {
                (
                    s.len(),
                    s.indexes_consistent(),
                    s.search_by_field(Field::CryptoSymbol, &"BTC".into())
                        .map(|found| found.len()),
                )
            })
            .unwrap();
        assert_eq!(len, 40);
        assert!(consistent);
        assert_eq!(btc.unwrap(), 40);

        let reopened =
            TransactionStore::open(StoreConfig::new(dir.path().join("shared.csv"))).unwrap();
        assert_eq!(reopened.len(), 40);
    }
}
