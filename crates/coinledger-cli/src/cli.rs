//! Command-line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// coinledger - an indexed flat-file store for crypto transactions.
#[derive(Debug, Parser)]
#[command(name = "coinledger")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Backing store file (overrides `COINLEDGER_DATA_FILE`).
    #[arg(long, global = true)]
    pub data_file: Option<PathBuf>,

    /// Backup file (overrides `COINLEDGER_BACKUP_FILE`).
    #[arg(long, global = true)]
    pub backup_file: Option<PathBuf>,

    /// File format: csv or cbor (overrides `COINLEDGER_FORMAT`).
    #[arg(long, global = true)]
    pub format: Option<String>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an empty backing store.
    Init,

    /// List every transaction.
    List,

    /// Add a transaction.
    Add(AddArgs),

    /// Delete a transaction by TransactionID.
    Delete {
        /// The TransactionID to delete.
        id: String,
    },

    /// Delete every transaction whose field equals a value.
    DeleteBy {
        /// Field name, e.g. UserID or CryptoSymbol.
        field: String,

        /// Value to match.
        value: String,
    },

    /// Change fields of a transaction.
    Update {
        /// The TransactionID to update.
        id: String,

        /// Changes as `Field=value` pairs.
        #[arg(required = true)]
        changes: Vec<String>,
    },

    /// Find transactions whose field equals a value.
    Search {
        /// Field name, e.g. UserID or CryptoSymbol.
        field: String,

        /// Value to match.
        value: String,
    },

    /// Remove every transaction.
    Clear,

    /// Copy the backing store to the backup file.
    Backup,

    /// Replace the backing store with the backup file.
    Restore,

    /// Delete the backing store file.
    Drop,

    /// Write every transaction to a CSV file.
    Export {
        /// Destination path.
        path: PathBuf,
    },
}

/// Fields of a new transaction, as typed on the command line.
#[derive(Debug, Clone, Args)]
pub struct AddArgs {
    /// TransactionID (non-negative integer, unique).
    #[arg(long)]
    pub id: String,

    /// UserID (non-negative integer).
    #[arg(long)]
    pub user: String,

    /// Asset ticker, e.g. BTC.
    #[arg(long)]
    pub symbol: String,

    /// Transaction kind, e.g. buy or sell.
    #[arg(long = "type")]
    pub kind: String,

    /// Quantity of the asset.
    #[arg(long)]
    pub amount: String,

    /// Date as YYYY-MM-DD.
    #[arg(long)]
    pub date: Option<String>,

    /// Value in USD.
    #[arg(long)]
    pub usd: Option<String>,
}
