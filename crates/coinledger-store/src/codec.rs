//! File encodings for the backing store.
//!
//! Both forms carry the full primary collection and are read and written
//! wholesale.
//!
//! - **Csv**: a header row in `Field::ALL` order, then one row per record in
//!   ascending `TransactionID`. Unset optional fields are empty cells.
//! - **Cbor**: a single CBOR map from `TransactionID` to record.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use coinledger_core::{Field, Transaction, TransactionId};

use crate::config::FileFormat;
use crate::error::{Result, StoreError};

/// The primary collection as persisted.
pub type Records = BTreeMap<TransactionId, Transaction>;

/// Encode `records` in `format`.
///
/// # Errors
///
/// Returns `StoreError::Serialization` if encoding fails.
pub fn encode(format: FileFormat, records: &Records) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    match format {
        FileFormat::Csv => write_csv(&mut buf, records.values())?,
        FileFormat::Cbor => ciborium::into_writer(records, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
    }
    Ok(buf)
}

/// Decode a backing store read from `path`.
///
/// # Errors
///
/// - `StoreError::Serialization` if the bytes are not valid for `format`.
/// - `StoreError::Corrupt` if a `TransactionID` repeats or a CSV header lacks
///   a required column.
pub fn decode(format: FileFormat, data: &[u8], path: &Path) -> Result<Records> {
    match format {
        FileFormat::Csv => read_csv(data, path),
        FileFormat::Cbor => read_cbor(data, path),
    }
}

/// Write a header row and one row per record, in iteration order.
///
/// The header is written even when there are no records, so an empty store
/// still describes its schema.
///
/// # Errors
///
/// Returns `StoreError::Serialization` if a row cannot be written.
pub fn write_csv<'a, W: Write>(
    writer: W,
    records: impl IntoIterator<Item = &'a Transaction>,
) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer
        .write_record(Field::ALL.iter().map(|field| field.name()))
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    for record in records {
        csv_writer
            .serialize(record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
    }
    csv_writer
        .flush()
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

fn read_csv(data: &[u8], path: &Path) -> Result<Records> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| StoreError::Serialization(e.to_string()))?
        .clone();
    if headers.is_empty() {
        return Ok(Records::new());
    }
    if let Some(missing) = Field::ALL
        .iter()
        .filter(|field| !field.is_optional())
        .find(|field| !headers.iter().any(|h| h == field.name()))
    {
        return Err(StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: format!("missing column {missing}"),
        });
    }

    let mut records = Records::new();
    for row in reader.deserialize::<Transaction>() {
        let record = row.map_err(|e| StoreError::Serialization(e.to_string()))?;
        insert_unique(&mut records, record, path)?;
    }
    Ok(records)
}

fn read_cbor(data: &[u8], path: &Path) -> Result<Records> {
    if data.is_empty() {
        return Ok(Records::new());
    }
    let decoded: Records =
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))?;

    if let Some((key, record)) = decoded
        .iter()
        .find(|(key, record)| **key != record.transaction_id)
    {
        return Err(StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: format!(
                "entry {key} holds record with TransactionID {}",
                record.transaction_id
            ),
        });
    }
    Ok(decoded)
}

fn insert_unique(records: &mut Records, record: Transaction, path: &Path) -> Result<()> {
    let id = record.transaction_id;
    if records.insert(id, record).is_some() {
        return Err(StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: format!("duplicate TransactionID {id}"),
        });
    }
    Ok(())
}
