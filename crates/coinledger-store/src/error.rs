//! Error types for coinledger storage.

use std::path::{Path, PathBuf};

use coinledger_core::{RecordError, TransactionId};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A record with this key is already stored.
    #[error("duplicate TransactionID: {transaction_id}")]
    DuplicateKey {
        /// The key that collided.
        transaction_id: TransactionId,
    },

    /// No record with this key is stored.
    #[error("transaction not found: {transaction_id}")]
    TransactionNotFound {
        /// The key that was looked up.
        transaction_id: TransactionId,
    },

    /// The backing store file does not exist.
    #[error("backing store not found: {}", path.display())]
    StoreNotFound {
        /// Configured location of the backing store.
        path: PathBuf,
    },

    /// The backup file does not exist.
    #[error("backup not found: {}", path.display())]
    BackupNotFound {
        /// Configured location of the backup.
        path: PathBuf,
    },

    /// `initialize` found an existing backing store and left it alone.
    #[error("backing store already exists: {}", path.display())]
    AlreadyExists {
        /// Location of the existing file.
        path: PathBuf,
    },

    /// Reading or writing a file failed.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        /// The file being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Encoding or decoding records failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The file decoded but violates a store invariant.
    #[error("corrupt backing store {}: {reason}", path.display())]
    Corrupt {
        /// The offending file.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// A field or value was rejected.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Configuration is invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Another thread panicked while holding the store lock.
    #[error("store lock poisoned")]
    Poisoned,
}

/// The coarse outcome categories a front end reports to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Create with a key that already exists.
    DuplicateKey,
    /// Missing record, backing store, or backup.
    NotFound,
    /// Initialize over an existing store.
    AlreadyExists,
    /// Input that does not fit the record schema.
    MalformedInput,
    /// Filesystem or encoding failure.
    IoFailure,
}

impl StoreError {
    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            Self::TransactionNotFound { .. }
            | Self::StoreNotFound { .. }
            | Self::BackupNotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::Record(_) | Self::Configuration(_) => ErrorKind::MalformedInput,
            Self::Io { .. } | Self::Serialization(_) | Self::Corrupt { .. } | Self::Poisoned => {
                ErrorKind::IoFailure
            }
        }
    }

    /// Wrap an I/O error with the path it happened on.
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
