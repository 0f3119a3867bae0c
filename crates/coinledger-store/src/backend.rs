//! Persistence adapter.
//!
//! The `Backend` trait is the seam between the in-memory store and durable
//! storage. `FileBackend` is the flat-file implementation; tests substitute
//! their own to inject failures.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::codec::{self, Records};
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};

/// Durable storage for the primary collection.
///
/// Implementations never touch in-memory store state; the store decides what
/// to do with the records they return.
pub trait Backend {
    /// Whether a backing store currently exists.
    fn exists(&self) -> bool;

    /// Create an empty backing store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` without writing if one exists.
    fn initialize(&mut self) -> Result<()>;

    /// Read every record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StoreNotFound` if there is no backing store.
    fn load(&self) -> Result<Records>;

    /// Replace the backing store with `records`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails; the previous contents
    /// remain in place in that case.
    fn save(&mut self, records: &Records) -> Result<()>;

    /// Copy the backing store to the backup location, replacing any earlier backup.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StoreNotFound` if there is nothing to back up.
    fn backup(&mut self) -> Result<()>;

    /// Replace the backing store with the backup and return its records.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::BackupNotFound` if no backup exists.
    fn restore(&mut self) -> Result<Records>;

    /// Remove the backing store. Succeeds if it is already gone.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    fn delete(&mut self) -> Result<()>;
}

/// Flat-file backend driven by a `StoreConfig`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    config: StoreConfig,
}

impl FileBackend {
    /// Create a backend for the configured paths. No file is touched.
    #[must_use]
    pub const fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| StoreError::io(path, e))
    }

    /// Write `bytes` to `path` through a sibling temp file, so a failed write
    /// never leaves a truncated store behind.
    fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
        tmp.write_all(bytes).map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
        Ok(())
    }
}

impl Backend for FileBackend {
    fn exists(&self) -> bool {
        self.config.data_path.is_file()
    }

    fn initialize(&mut self) -> Result<()> {
        let path = &self.config.data_path;
        if self.exists() {
            return Err(StoreError::AlreadyExists { path: path.clone() });
        }
        let bytes = codec::encode(self.config.format, &Records::new())?;
        Self::write_atomic(path, &bytes)?;
        tracing::info!(path = %path.display(), format = %self.config.format, "Backing store created");
        Ok(())
    }

    fn load(&self) -> Result<Records> {
        let path = &self.config.data_path;
        if !self.exists() {
            return Err(StoreError::StoreNotFound { path: path.clone() });
        }
        let bytes = self.read(path)?;
        codec::decode(self.config.format, &bytes, path)
    }

    fn save(&mut self, records: &Records) -> Result<()> {
        let bytes = codec::encode(self.config.format, records)?;
        Self::write_atomic(&self.config.data_path, &bytes)?;
        tracing::debug!(
            path = %self.config.data_path.display(),
            records = records.len(),
            bytes = bytes.len(),
            "Backing store saved"
        );
        Ok(())
    }

    fn backup(&mut self) -> Result<()> {
        let (data, backup) = (&self.config.data_path, &self.config.backup_path);
        if !self.exists() {
            return Err(StoreError::StoreNotFound { path: data.clone() });
        }
        let bytes = self.read(data)?;
        Self::write_atomic(backup, &bytes)?;
        tracing::info!(from = %data.display(), to = %backup.display(), "Backup written");
        Ok(())
    }

    fn restore(&mut self) -> Result<Records> {
        let (data, backup) = (&self.config.data_path, &self.config.backup_path);
        if !backup.is_file() {
            return Err(StoreError::BackupNotFound {
                path: backup.clone(),
            });
        }
        let bytes = self.read(backup)?;
        // Decode first: an unreadable backup must not replace a good store.
        let records = codec::decode(self.config.format, &bytes, backup)?;
        Self::write_atomic(data, &bytes)?;
        tracing::info!(from = %backup.display(), to = %data.display(), records = records.len(), "Backing store restored");
        Ok(records)
    }

    fn delete(&mut self) -> Result<()> {
        let path = &self.config.data_path;
        match fs::remove_file(path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Backing store deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Backing store already absent");
                Ok(())
            }
            Err(e) => Err(StoreError::io(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinledger_core::{Transaction, TransactionId, UserId};
    use tempfile::TempDir;

    use crate::config::FileFormat;

    fn create_test_backend(file: &str) -> (FileBackend, TempDir) {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::new(StoreConfig::new(dir.path().join(file)));
        (backend, dir)
    }

    fn one_record() -> Records {
        let tx = Transaction::new(TransactionId::new(1), UserId::new(10), "BTC", "buy", 0.5);
        Records::from([(tx.transaction_id, tx)])
    }

    #[test]
    fn initialize_refuses_to_overwrite() {
        let (mut backend, _dir) = create_test_backend("db.csv");
        backend.initialize().unwrap();
        backend.save(&one_record()).unwrap();

        let err = backend.initialize().unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
        assert_eq!(backend.load().unwrap().len(), 1);
    }

    #[test]
    fn load_missing_store_is_not_found() {
        let (backend, _dir) = create_test_backend("db.csv");
        assert!(matches!(
            backend.load(),
            Err(StoreError::StoreNotFound { .. })
        ));
    }

    #[test]
    fn save_then_load_both_formats() {
        for file in ["db.csv", "db.bin"] {
            let (mut backend, _dir) = create_test_backend(file);
            backend.save(&one_record()).unwrap();
            assert_eq!(backend.load().unwrap(), one_record(), "{file}");
        }
        let (backend, _dir) = create_test_backend("db.bin");
        assert_eq!(backend.config().format, FileFormat::Cbor);
    }

    #[test]
    fn backup_and_restore() {
        let (mut backend, _dir) = create_test_backend("db.csv");
        backend.save(&one_record()).unwrap();
        backend.backup().unwrap();
        backend.save(&Records::new()).unwrap();

        let restored = backend.restore().unwrap();
        assert_eq!(restored, one_record());
        assert_eq!(backend.load().unwrap(), one_record());
    }

    #[test]
    fn backup_requires_store_and_restore_requires_backup() {
        let (mut backend, _dir) = create_test_backend("db.csv");
        assert!(matches!(
            backend.backup(),
            Err(StoreError::StoreNotFound { .. })
        ));
        assert!(matches!(
            backend.restore(),
            Err(StoreError::BackupNotFound { .. })
        ));
    }

    #[test]
    fn corrupt_backup_leaves_store_untouched() {
        let (mut backend, _dir) = create_test_backend("db.csv");
        backend.save(&one_record()).unwrap();
        fs::write(&backend.config().backup_path, "TransactionID,UserID\n1\n").unwrap();

        assert!(backend.restore().is_err());
        assert_eq!(backend.load().unwrap(), one_record());
    }

    #[test]
    fn delete_is_idempotent() {
        let (mut backend, _dir) = create_test_backend("db.csv");
        backend.initialize().unwrap();
        backend.delete().unwrap();
        assert!(!backend.exists());
        backend.delete().unwrap();
    }
}
