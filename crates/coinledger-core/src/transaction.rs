//! Transaction records and partial updates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{RecordError, Result};
use crate::field::{Field, FieldValue};
use crate::{TransactionId, UserId};

/// A single crypto trade.
///
/// Serialized field names match the tabular column headers, so the same
/// derive drives both the CSV and the CBOR file forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique, immutable primary key.
    #[serde(rename = "TransactionID")]
    pub transaction_id: TransactionId,

    /// The user who made the trade.
    #[serde(rename = "UserID")]
    pub user_id: UserId,

    /// Ticker symbol of the asset.
    #[serde(rename = "CryptoSymbol")]
    pub crypto_symbol: String,

    /// Kind of trade (`buy`, `sell`, ...).
    #[serde(rename = "TransactionType")]
    pub transaction_type: String,

    /// Quantity traded.
    #[serde(rename = "Amount")]
    pub amount: f64,

    /// Trade date, if recorded.
    #[serde(rename = "TransactionDate", default)]
    pub transaction_date: Option<NaiveDate>,

    /// Dollar value of the trade, if recorded.
    #[serde(rename = "USDValue", default)]
    pub usd_value: Option<f64>,
}

impl Transaction {
    /// Create a record with the required fields set and the optional ones empty.
    #[must_use]
    pub fn new(
        transaction_id: TransactionId,
        user_id: UserId,
        crypto_symbol: impl Into<String>,
        transaction_type: impl Into<String>,
        amount: f64,
    ) -> Self {
        Self {
            transaction_id,
            user_id,
            crypto_symbol: crypto_symbol.into(),
            transaction_type: transaction_type.into(),
            amount,
            transaction_date: None,
            usd_value: None,
        }
    }

    /// Set the trade date.
    #[must_use]
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.transaction_date = Some(date);
        self
    }

    /// Set the dollar value.
    #[must_use]
    pub fn with_usd_value(mut self, usd_value: f64) -> Self {
        self.usd_value = Some(usd_value);
        self
    }

    /// Read a field as a typed value. Unset optional fields yield `None`.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::TransactionId => Some(FieldValue::Id(self.transaction_id)),
            Field::UserId => Some(FieldValue::User(self.user_id)),
            Field::CryptoSymbol => Some(FieldValue::Text(self.crypto_symbol.clone())),
            Field::TransactionType => Some(FieldValue::Text(self.transaction_type.clone())),
            Field::Amount => Some(FieldValue::Decimal(self.amount)),
            Field::TransactionDate => self.transaction_date.map(FieldValue::Date),
            Field::UsdValue => self.usd_value.map(FieldValue::Decimal),
        }
    }

    /// Whether the field holds exactly `value`.
    #[must_use]
    pub fn matches(&self, field: Field, value: &FieldValue) -> bool {
        self.get(field).as_ref() == Some(value)
    }
}

/// A set of field changes for an existing record.
///
/// There is no slot for `TransactionID`: the key of a record cannot change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionPatch {
    /// New owner.
    pub user_id: Option<UserId>,
    /// New symbol.
    pub crypto_symbol: Option<String>,
    /// New kind.
    pub transaction_type: Option<String>,
    /// New amount.
    pub amount: Option<f64>,
    /// New trade date.
    pub transaction_date: Option<NaiveDate>,
    /// New dollar value.
    pub usd_value: Option<f64>,
}

impl TransactionPatch {
    /// Create an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the owning user.
    #[must_use]
    pub fn user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Change the symbol.
    #[must_use]
    pub fn crypto_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.crypto_symbol = Some(symbol.into());
        self
    }

    /// Change the kind.
    #[must_use]
    pub fn transaction_type(mut self, kind: impl Into<String>) -> Self {
        self.transaction_type = Some(kind.into());
        self
    }

    /// Change the amount.
    #[must_use]
    pub fn amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Change the trade date.
    #[must_use]
    pub fn transaction_date(mut self, date: NaiveDate) -> Self {
        self.transaction_date = Some(date);
        self
    }

    /// Change the dollar value.
    #[must_use]
    pub fn usd_value(mut self, usd_value: f64) -> Self {
        self.usd_value = Some(usd_value);
        self
    }

    /// Set a field from a typed value, for callers that work field-by-field.
    ///
    /// # Errors
    ///
    /// - `RecordError::ImmutableKey` for `TransactionID`.
    /// - `RecordError::TypeMismatch` if the value does not fit the field.
    pub fn set(&mut self, field: Field, value: FieldValue) -> Result<()> {
        field.check(&value)?;
        match (field, value) {
            (Field::TransactionId, _) => return Err(RecordError::ImmutableKey),
            (Field::UserId, FieldValue::User(user)) => self.user_id = Some(user),
            (Field::CryptoSymbol, FieldValue::Text(text)) => self.crypto_symbol = Some(text),
            (Field::TransactionType, FieldValue::Text(text)) => {
                self.transaction_type = Some(text);
            }
            (Field::Amount, FieldValue::Decimal(number)) => self.amount = Some(number),
            (Field::TransactionDate, FieldValue::Date(date)) => {
                self.transaction_date = Some(date);
            }
            (Field::UsdValue, FieldValue::Decimal(number)) => self.usd_value = Some(number),
            (field, value) => {
                return Err(RecordError::TypeMismatch {
                    field,
                    found: value.type_name(),
                })
            }
        }
        Ok(())
    }

    /// Whether the patch changes `field`.
    #[must_use]
    pub const fn touches(&self, field: Field) -> bool {
        match field {
            Field::TransactionId => false,
            Field::UserId => self.user_id.is_some(),
            Field::CryptoSymbol => self.crypto_symbol.is_some(),
            Field::TransactionType => self.transaction_type.is_some(),
            Field::Amount => self.amount.is_some(),
            Field::TransactionDate => self.transaction_date.is_some(),
            Field::UsdValue => self.usd_value.is_some(),
        }
    }

    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !Field::ALL.into_iter().any(|field| self.touches(field))
    }

    /// Write the changes into `record`.
    pub fn apply(&self, record: &mut Transaction) {
        if let Some(user_id) = self.user_id {
            record.user_id = user_id;
        }
        if let Some(symbol) = &self.crypto_symbol {
            record.crypto_symbol.clone_from(symbol);
        }
        if let Some(kind) = &self.transaction_type {
            record.transaction_type.clone_from(kind);
        }
        if let Some(amount) = self.amount {
            record.amount = amount;
        }
        if let Some(date) = self.transaction_date {
            record.transaction_date = Some(date);
        }
        if let Some(usd_value) = self.usd_value {
            record.usd_value = Some(usd_value);
        }
    }
}
