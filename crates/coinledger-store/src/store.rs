//! The indexed record store.
//!
//! `TransactionStore` owns the primary collection and its secondary indexes
//! and persists through a `Backend` after every mutation.
//!
//! # Consistency
//!
//! Mutations are applied in memory, saved, and undone in memory if the save
//! fails, so a caller that sees an error also sees the store as it was before
//! the call. After every successful mutation the indexes equal a full rebuild
//! from the primary collection.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;

use coinledger_core::{Field, FieldValue, RecordError, Transaction, TransactionId, TransactionPatch};

use crate::backend::{Backend, FileBackend};
use crate::codec::{self, Records};
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::index::{FieldIndex, IndexSet};
use crate::observer::{Operation, OperationEvent, OperationObserver};

/// In-memory transaction collection with secondary indexes and durable backing.
pub struct TransactionStore<B: Backend = FileBackend> {
    backend: B,
    records: Records,
    indexes: IndexSet,
    observer: Option<Box<dyn OperationObserver>>,
}

impl TransactionStore<FileBackend> {
    /// Create an empty store over the configured files. Nothing is read.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let fields = config.indexed_fields.clone();
        Self::with_backend(FileBackend::new(config), &fields)
    }

    /// Open an existing backing store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StoreNotFound` if the data file does not exist.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let mut store = Self::new(config)?;
        store.load()?;
        Ok(store)
    }

    /// Open the backing store, creating an empty one first if it is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or read.
    pub fn open_or_initialize(config: StoreConfig) -> Result<Self> {
        let mut store = Self::new(config)?;
        if store.backend.exists() {
            store.load()?;
        } else {
            store.initialize()?;
        }
        Ok(store)
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        self.backend.config()
    }
}

impl<B: Backend> TransactionStore<B> {
    /// Create an empty store over an arbitrary backend.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotIndexable` if a listed field cannot be indexed.
    pub fn with_backend(backend: B, indexed_fields: &[Field]) -> Result<Self> {
        if let Some(field) = indexed_fields.iter().find(|f| !f.is_indexable()) {
            return Err(RecordError::NotIndexable(*field).into());
        }
        Ok(Self {
            backend,
            records: Records::new(),
            indexes: IndexSet::new(indexed_fields),
            observer: None,
        })
    }

    /// Attach an observer that is told about every operation.
    #[must_use]
    pub fn with_observer(mut self, observer: impl OperationObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// The backend in use.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Create an empty backing store and empty the in-memory collection.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if a backing store exists; nothing
    /// is overwritten and memory is untouched.
    pub fn initialize(&mut self) -> Result<()> {
        let started = Instant::now();
        let result = self.backend.initialize().map(|()| {
            self.records.clear();
            self.indexes.clear();
        });
        if let Err(err) = &result {
            tracing::warn!(error = %err, "Initialize rejected");
        }
        self.notify(Operation::Initialize, started, &result);
        result
    }

    /// Replace the in-memory collection with the backing store's contents.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StoreNotFound` if there is no backing store.
    pub fn load(&mut self) -> Result<()> {
        let started = Instant::now();
        let result = self.backend.load().map(|records| {
            self.replace_all(records);
            tracing::info!(records = self.records.len(), "Store loaded");
        });
        self.notify(Operation::Load, started, &result);
        result
    }

    /// Write the in-memory collection to the backing store.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn save(&mut self) -> Result<()> {
        let started = Instant::now();
        let result = self.backend.save(&self.records);
        self.notify(Operation::Save, started, &result);
        result
    }

    /// Remove every record and persist the empty collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the save fails; the records are kept in that case.
    pub fn clear(&mut self) -> Result<()> {
        let started = Instant::now();
        let previous = std::mem::take(&mut self.records);
        let result = match self.backend.save(&self.records) {
            Ok(()) => {
                self.indexes.clear();
                tracing::info!(removed = previous.len(), "Store cleared");
                Ok(())
            }
            Err(err) => {
                self.records = previous;
                Err(err)
            }
        };
        self.notify(Operation::Clear, started, &result);
        result
    }

    /// Copy the backing store to the backup location.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StoreNotFound` if there is no backing store.
    pub fn backup(&mut self) -> Result<()> {
        let started = Instant::now();
        let result = self.backend.backup();
        self.notify(Operation::Backup, started, &result);
        result
    }

    /// Replace the backing store with the backup and reload from it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::BackupNotFound` if there is no backup.
    pub fn restore(&mut self) -> Result<()> {
        let started = Instant::now();
        let result = self.backend.restore().map(|records| {
            self.replace_all(records);
        });
        self.notify(Operation::Restore, started, &result);
        result
    }

    /// Remove the backing store and empty the in-memory collection.
    ///
    /// Deleting a store that does not exist is not an error. The backup is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn delete_store(&mut self) -> Result<()> {
        let started = Instant::now();
        let result = self.backend.delete().map(|()| {
            self.records.clear();
            self.indexes.clear();
        });
        self.notify(Operation::DeleteStore, started, &result);
        result
    }

    // =========================================================================
    // Record Operations
    // =========================================================================

    /// Insert a new record.
    ///
    /// # Errors
    ///
    /// - `StoreError::DuplicateKey` if the `TransactionID` is taken; the store
    ///   is unchanged.
    /// - An I/O error if the save fails; the record is not kept.
    pub fn create(&mut self, record: Transaction) -> Result<()> {
        let started = Instant::now();
        let result = self.create_record(record);
        self.notify(Operation::Create, started, &result);
        result
    }

    /// Remove the record with `transaction_id` and return it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::TransactionNotFound` if there is no such record.
    pub fn delete(&mut self, transaction_id: TransactionId) -> Result<Transaction> {
        let started = Instant::now();
        let result = self.delete_record(transaction_id);
        self.notify(Operation::Delete, started, &result);
        result
    }

    /// Remove every record whose `field` equals `value` and return how many went.
    ///
    /// No match is a zero count, not an error.
    ///
    /// # Errors
    ///
    /// - `RecordError::TypeMismatch` if `value` does not fit `field`.
    /// - An I/O error if the save fails; every matched record is kept.
    pub fn delete_by_field(&mut self, field: Field, value: &FieldValue) -> Result<usize> {
        let started = Instant::now();
        let result = self.delete_matching(field, value);
        self.notify(Operation::DeleteByField, started, &result);
        result
    }

    /// Apply `patch` to the record with `transaction_id`.
    ///
    /// # Errors
    ///
    /// - `StoreError::TransactionNotFound` if there is no such record.
    /// - An I/O error if the save fails; the record keeps its old values.
    pub fn update(&mut self, transaction_id: TransactionId, patch: &TransactionPatch) -> Result<()> {
        let started = Instant::now();
        let result = self.update_record(transaction_id, patch);
        self.notify(Operation::Update, started, &result);
        result
    }

    /// Every record whose `field` equals `value`, in ascending `TransactionID` order.
    ///
    /// Indexed fields are answered from their bucket; other fields by a full scan.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::TypeMismatch` if `value` does not fit `field`.
    pub fn search_by_field(&self, field: Field, value: &FieldValue) -> Result<Vec<&Transaction>> {
        let started = Instant::now();
        let result = field.check(value).map_err(StoreError::from).map(|()| {
            self.matching_ids(field, value)
                .into_iter()
                .filter_map(|id| self.records.get(&id))
                .collect::<Vec<_>>()
        });
        if let Ok(found) = &result {
            tracing::debug!(field = %field, value = %value, found = found.len(), "Search finished");
        }
        self.notify(Operation::Search, started, &result);
        result
    }

    /// Write a spreadsheet-compatible CSV of every record to `path`.
    ///
    /// Returns the number of rows written, excluding the header.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn export_csv(&self, path: impl AsRef<Path>) -> Result<usize> {
        let started = Instant::now();
        let path = path.as_ref();
        let result = File::create(path)
            .map_err(|e| StoreError::io(path, e))
            .and_then(|file| codec::write_csv(BufWriter::new(file), self.records.values()))
            .map(|()| self.records.len());
        if let Ok(rows) = &result {
            tracing::info!(path = %path.display(), rows, "Export written");
        }
        self.notify(Operation::Export, started, &result);
        result
    }

    // =========================================================================
    // Read-only Views
    // =========================================================================

    /// The record with `transaction_id`, if stored.
    #[must_use]
    pub fn get(&self, transaction_id: TransactionId) -> Option<&Transaction> {
        self.records.get(&transaction_id)
    }

    /// Whether a record with `transaction_id` is stored.
    #[must_use]
    pub fn contains(&self, transaction_id: TransactionId) -> bool {
        self.records.contains_key(&transaction_id)
    }

    /// Every record, in ascending `TransactionID` order.
    pub fn records(&self) -> impl ExactSizeIterator<Item = &Transaction> {
        self.records.values()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The index for `field`, if it is indexed.
    #[must_use]
    pub fn index(&self, field: Field) -> Option<&FieldIndex> {
        self.indexes.get(field)
    }

    /// The indexed fields.
    #[must_use]
    pub fn indexed_fields(&self) -> Vec<Field> {
        self.indexes.fields().collect()
    }

    /// Whether every index equals a full rebuild from the primary collection.
    #[must_use]
    pub fn indexes_consistent(&self) -> bool {
        let mut rebuilt = self.indexes.clone();
        rebuilt.rebuild(self.records.values());
        rebuilt == self.indexes
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn create_record(&mut self, record: Transaction) -> Result<()> {
        let transaction_id = record.transaction_id;
        if self.records.contains_key(&transaction_id) {
            tracing::warn!(%transaction_id, "Create rejected: duplicate TransactionID");
            return Err(StoreError::DuplicateKey { transaction_id });
        }

        self.insert_entry(record);
        if let Err(err) = self.backend.save(&self.records) {
            self.remove_entry(transaction_id);
            return Err(err);
        }
        tracing::debug!(%transaction_id, "Record created");
        Ok(())
    }

    fn delete_record(&mut self, transaction_id: TransactionId) -> Result<Transaction> {
        let Some(removed) = self.remove_entry(transaction_id) else {
            tracing::warn!(%transaction_id, "Delete rejected: not found");
            return Err(StoreError::TransactionNotFound { transaction_id });
        };
        if let Err(err) = self.backend.save(&self.records) {
            self.insert_entry(removed);
            return Err(err);
        }
        tracing::debug!(%transaction_id, "Record deleted");
        Ok(removed)
    }

    fn delete_matching(&mut self, field: Field, value: &FieldValue) -> Result<usize> {
        field.check(value)?;
        let ids = self.matching_ids(field, value);
        if ids.is_empty() {
            return Ok(0);
        }

        let removed: Vec<Transaction> = ids
            .into_iter()
            .filter_map(|id| self.remove_entry(id))
            .collect();
        if let Err(err) = self.backend.save(&self.records) {
            for record in removed {
                self.insert_entry(record);
            }
            return Err(err);
        }
        tracing::debug!(field = %field, value = %value, removed = removed.len(), "Records deleted by field");
        Ok(removed.len())
    }

    fn update_record(&mut self, transaction_id: TransactionId, patch: &TransactionPatch) -> Result<()> {
        let Some(current) = self.records.get(&transaction_id) else {
            tracing::warn!(%transaction_id, "Update rejected: not found");
            return Err(StoreError::TransactionNotFound { transaction_id });
        };
        if patch.is_empty() {
            return Ok(());
        }

        let mut updated = current.clone();
        patch.apply(&mut updated);
        if let Some(previous) = self.replace_entry(updated) {
            if let Err(err) = self.backend.save(&self.records) {
                self.replace_entry(previous);
                return Err(err);
            }
        }
        tracing::debug!(%transaction_id, "Record updated");
        Ok(())
    }

    /// Keys of records whose `field` equals `value`, ascending.
    fn matching_ids(&self, field: Field, value: &FieldValue) -> Vec<TransactionId> {
        if let (Field::TransactionId, FieldValue::Id(id)) = (field, value) {
            return self.records.get_key_value(id).map(|(id, _)| *id).into_iter().collect();
        }
        match self.indexes.get(field) {
            Some(index) => index
                .lookup(value)
                .map(|bucket| bucket.iter().copied().collect())
                .unwrap_or_default(),
            None => self
                .records
                .values()
                .filter(|record| record.matches(field, value))
                .map(|record| record.transaction_id)
                .collect(),
        }
    }

    fn insert_entry(&mut self, record: Transaction) {
        self.indexes.insert(&record);
        self.records.insert(record.transaction_id, record);
    }

    fn remove_entry(&mut self, transaction_id: TransactionId) -> Option<Transaction> {
        let removed = self.records.remove(&transaction_id)?;
        self.indexes.remove(&removed);
        Some(removed)
    }

    /// Swap in a new version of a stored record and return the old one.
    fn replace_entry(&mut self, record: Transaction) -> Option<Transaction> {
        let slot = self.records.get_mut(&record.transaction_id)?;
        let previous = std::mem::replace(slot, record);
        self.indexes.update(&previous, slot);
        Some(previous)
    }

    fn replace_all(&mut self, records: Records) {
        self.records = records;
        self.indexes.rebuild(self.records.values());
    }

    fn notify<T>(&self, operation: Operation, started: Instant, result: &Result<T>) {
        if let Some(observer) = &self.observer {
            observer.record(&OperationEvent {
                operation,
                elapsed: started.elapsed(),
                succeeded: result.is_ok(),
            });
        }
    }
}

impl<B: Backend + std::fmt::Debug> std::fmt::Debug for TransactionStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionStore")
            .field("backend", &self.backend)
            .field("records", &self.records.len())
            .field("indexed_fields", &self.indexed_fields())
            .field("observed", &self.observer.is_some())
            .finish()
    }
}
