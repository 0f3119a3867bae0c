//! Store configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use coinledger_core::{Field, RecordError};

use crate::error::{Result, StoreError};

/// Default backing store location.
pub const DEFAULT_DATA_FILE: &str = "transactions.csv";

/// Suffix appended to the data path to derive the backup path.
pub const BACKUP_SUFFIX: &str = ".bak";

/// Fields indexed when nothing else is configured.
pub const DEFAULT_INDEXED_FIELDS: [Field; 2] = [Field::UserId, Field::CryptoSymbol];

/// On-disk representation of the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Header row plus one comma-separated row per record.
    Csv,
    /// A single CBOR map from `TransactionID` to record.
    Cbor,
}

impl FileFormat {
    /// Pick a format from a file extension: `.csv` is tabular, everything else CBOR.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Cbor,
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => f.write_str("csv"),
            Self::Cbor => f.write_str("cbor"),
        }
    }
}

impl FromStr for FileFormat {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "cbor" | "blob" => Ok(Self::Cbor),
            other => Err(StoreError::Configuration(format!(
                "unknown file format `{other}`; expected csv|cbor"
            ))),
        }
    }
}

/// Configuration for a single store instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Path to the backing store file.
    pub data_path: PathBuf,

    /// Path to the single-generation backup.
    pub backup_path: PathBuf,

    /// Encoding of both files.
    pub format: FileFormat,

    /// Fields that carry a secondary index.
    pub indexed_fields: Vec<Field>,
}

impl StoreConfig {
    /// Configuration for a data file, with the backup beside it and the
    /// format inferred from the extension.
    #[must_use]
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        let data_path = data_path.into();
        Self {
            backup_path: default_backup_path(&data_path),
            format: FileFormat::from_path(&data_path),
            indexed_fields: DEFAULT_INDEXED_FIELDS.to_vec(),
            data_path,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | variable | default |
    /// |---|---|
    /// | `COINLEDGER_DATA_FILE` | `transactions.csv` |
    /// | `COINLEDGER_BACKUP_FILE` | data file + `.bak` |
    /// | `COINLEDGER_FORMAT` | inferred from the data file extension |
    /// | `COINLEDGER_INDEXED_FIELDS` | `UserID,CryptoSymbol` |
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds an unknown format or field.
    pub fn from_env() -> Result<Self> {
        let data_path =
            std::env::var("COINLEDGER_DATA_FILE").unwrap_or_else(|_| DEFAULT_DATA_FILE.into());
        let mut config = Self::new(data_path);

        if let Ok(backup) = std::env::var("COINLEDGER_BACKUP_FILE") {
            config.backup_path = backup.into();
        }
        if let Ok(format) = std::env::var("COINLEDGER_FORMAT") {
            config.format = format.parse()?;
        }
        if let Ok(fields) = std::env::var("COINLEDGER_INDEXED_FIELDS") {
            config.indexed_fields = parse_field_list(&fields)?;
        }

        config.validate()?;
        tracing::debug!(
            data_path = %config.data_path.display(),
            backup_path = %config.backup_path.display(),
            format = %config.format,
            "Store configuration loaded from environment"
        );
        Ok(config)
    }

    /// Override the backup location.
    #[must_use]
    pub fn with_backup_path(mut self, backup_path: impl Into<PathBuf>) -> Self {
        self.backup_path = backup_path.into();
        self
    }

    /// Override the file format.
    #[must_use]
    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = format;
        self
    }

    /// Override the indexed fields.
    #[must_use]
    pub fn with_indexed_fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.indexed_fields = fields.into_iter().collect();
        self
    }

    /// Check that the configuration is usable.
    ///
    /// # Errors
    ///
    /// - `RecordError::NotIndexable` if a decimal field is listed for indexing.
    /// - `StoreError::Configuration` if the backup path equals the data path.
    pub fn validate(&self) -> Result<()> {
        if let Some(field) = self.indexed_fields.iter().find(|f| !f.is_indexable()) {
            return Err(RecordError::NotIndexable(*field).into());
        }
        if self.backup_path == self.data_path {
            return Err(StoreError::Configuration(
                "backup path must differ from data path".into(),
            ));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_FILE)
    }
}

fn default_backup_path(data_path: &Path) -> PathBuf {
    let mut backup = data_path.as_os_str().to_owned();
    backup.push(BACKUP_SUFFIX);
    PathBuf::from(backup)
}

fn parse_field_list(list: &str) -> Result<Vec<Field>> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| name.parse::<Field>().map_err(StoreError::from))
        .collect()
}
