//! Conversion of command-line text into typed records.
//!
//! Nothing reaches the store before it has been parsed here, so malformed
//! input is always reported before any file is touched.

use coinledger_core::{Field, FieldValue, RecordError, Result, Transaction, TransactionId, TransactionPatch};

use crate::cli::AddArgs;

/// Parse a `TransactionID`.
pub fn transaction_id(raw: &str) -> Result<TransactionId> {
    match Field::TransactionId.parse_value(raw)? {
        FieldValue::Id(id) => Ok(id),
        other => Err(mismatch(Field::TransactionId, &other)),
    }
}

/// Parse a field name and a value for it.
pub fn field_value(field: &str, raw: &str) -> Result<(Field, FieldValue)> {
    let field: Field = field.parse()?;
    let value = field.parse_value(raw)?;
    Ok((field, value))
}

/// Build a new record from `add` arguments.
pub fn transaction(args: &AddArgs) -> Result<Transaction> {
    let transaction_id = transaction_id(&args.id)?;
    let user_id = match Field::UserId.parse_value(&args.user)? {
        FieldValue::User(user) => user,
        other => return Err(mismatch(Field::UserId, &other)),
    };
    let symbol = text(Field::CryptoSymbol, &args.symbol)?;
    let kind = text(Field::TransactionType, &args.kind)?;
    let amount = decimal(Field::Amount, &args.amount)?;

    let mut record = Transaction::new(transaction_id, user_id, symbol, kind, amount);
    if let Some(raw) = &args.date {
        match Field::TransactionDate.parse_value(raw)? {
            FieldValue::Date(date) => record = record.with_date(date),
            other => return Err(mismatch(Field::TransactionDate, &other)),
        }
    }
    if let Some(raw) = &args.usd {
        record = record.with_usd_value(decimal(Field::UsdValue, raw)?);
    }
    Ok(record)
}

/// Build a patch from `Field=value` pairs.
///
/// A field named twice takes its last value.
pub fn patch(changes: &[String]) -> Result<TransactionPatch> {
    let mut patch = TransactionPatch::new();
    for change in changes {
        let Some((field, raw)) = change.split_once('=') else {
            return Err(RecordError::MalformedValue {
                field: change.trim().parse()?,
                value: change.clone(),
                reason: "expected Field=value".into(),
            });
        };
        let (field, value) = field_value(field.trim(), raw)?;
        patch.set(field, value)?;
    }
    Ok(patch)
}

fn text(field: Field, raw: &str) -> Result<String> {
    match field.parse_value(raw)? {
        FieldValue::Text(text) => Ok(text),
        other => Err(mismatch(field, &other)),
    }
}

fn decimal(field: Field, raw: &str) -> Result<f64> {
    match field.parse_value(raw)? {
        FieldValue::Decimal(number) => Ok(number),
        other => Err(mismatch(field, &other)),
    }
}

fn mismatch(field: Field, value: &FieldValue) -> RecordError {
    RecordError::TypeMismatch {
        field,
        found: value.type_name(),
    }
}
