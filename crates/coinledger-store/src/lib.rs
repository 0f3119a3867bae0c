//! Indexed flat-file storage for coinledger.
//!
//! This crate keeps a collection of `Transaction` records in memory, keyed by
//! `TransactionID`, with secondary indexes over selected fields, and persists
//! the whole collection to a single flat file after every change.
//!
//! # Architecture
//!
//! - `store`: `TransactionStore`, the record store and its operations
//! - `index`: per-field secondary indexes (value → set of `TransactionID`s)
//! - `backend`: the `Backend` persistence trait and its flat-file implementation
//! - `codec`: CSV (tabular) and CBOR (opaque blob) file encodings
//! - `config`: paths, file format, and indexed fields for one store instance
//! - `observer`: optional per-operation timing hook
//! - `shared`: a mutex-guarded handle for multi-threaded callers
//!
//! # Example
//!
//! ```no_run
//! use coinledger_core::{Field, Transaction, TransactionId, UserId};
//! use coinledger_store::{StoreConfig, TransactionStore};
//!
//! let mut store = TransactionStore::open_or_initialize(StoreConfig::new("ledger.csv")).unwrap();
//!
//! let trade = Transaction::new(TransactionId::new(1), UserId::new(10), "BTC", "buy", 0.5);
//! store.create(trade).unwrap();
//!
//! let btc = store.search_by_field(Field::CryptoSymbol, &"BTC".into()).unwrap();
//! assert_eq!(btc.len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod backend;
pub mod codec;
pub mod config;
pub mod error;
pub mod index;
pub mod observer;
pub mod shared;
pub mod store;

pub use backend::{Backend, FileBackend};
pub use codec::Records;
pub use config::{FileFormat, StoreConfig};
pub use error::{ErrorKind, Result, StoreError};
pub use index::{FieldIndex, IndexSet};
pub use observer::{Operation, OperationEvent, OperationObserver, TracingObserver};
pub use shared::SharedStore;
pub use store::TransactionStore;
