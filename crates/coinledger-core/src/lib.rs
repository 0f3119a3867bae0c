//! Core record types for coinledger.
//!
//! This crate provides the data model shared by the store and its front ends:
//!
//! - **Identifiers**: `TransactionId`, `UserId`
//! - **Records**: `Transaction`, `TransactionPatch`
//! - **Schema**: `Field`, `FieldValue`, `IndexKey`
//!
//! # Untyped input
//!
//! Front ends collect text. `Field::parse_value` turns that text into a typed
//! `FieldValue` or rejects it with `RecordError::MalformedValue`, so the store
//! only ever sees well-typed records.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod field;
pub mod ids;
pub mod transaction;

pub use error::{RecordError, Result};
pub use field::{Field, FieldValue, IndexKey, DATE_FORMAT};
pub use ids::{IdError, TransactionId, UserId};
pub use transaction::{Transaction, TransactionPatch};
