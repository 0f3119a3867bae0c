//! Record schema: field names, typed values, and index keys.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{RecordError, Result};
use crate::{TransactionId, UserId};

/// Date format accepted for `TransactionDate`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A field of a transaction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    /// Primary key.
    #[serde(rename = "TransactionID")]
    TransactionId,
    /// Owning user.
    #[serde(rename = "UserID")]
    UserId,
    /// Ticker symbol, e.g. `BTC`.
    CryptoSymbol,
    /// Free-form kind, e.g. `buy` or `sell`.
    TransactionType,
    /// Quantity of the asset.
    Amount,
    /// Optional trade date.
    TransactionDate,
    /// Optional value in US dollars.
    #[serde(rename = "USDValue")]
    UsdValue,
}

impl Field {
    /// Every field, in the fixed column order used by tabular files.
    pub const ALL: [Self; 7] = [
        Self::TransactionId,
        Self::UserId,
        Self::CryptoSymbol,
        Self::TransactionType,
        Self::Amount,
        Self::TransactionDate,
        Self::UsdValue,
    ];

    /// Column name of the field.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TransactionId => "TransactionID",
            Self::UserId => "UserID",
            Self::CryptoSymbol => "CryptoSymbol",
            Self::TransactionType => "TransactionType",
            Self::Amount => "Amount",
            Self::TransactionDate => "TransactionDate",
            Self::UsdValue => "USDValue",
        }
    }

    /// Whether a record may leave the field unset.
    #[must_use]
    pub const fn is_optional(self) -> bool {
        matches!(self, Self::TransactionDate | Self::UsdValue)
    }

    /// Whether the field's values can key a secondary index.
    ///
    /// Decimal fields are excluded: floating point values have no total
    /// equality that would make a bucket lookup meaningful.
    #[must_use]
    pub const fn is_indexable(self) -> bool {
        !matches!(self, Self::Amount | Self::UsdValue)
    }

    /// Convert untyped text into a value of this field's type.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::MalformedValue` if the text does not parse.
    pub fn parse_value(self, raw: &str) -> Result<FieldValue> {
        let text = raw.trim();
        let malformed = |reason: String| RecordError::MalformedValue {
            field: self,
            value: raw.to_string(),
            reason,
        };

        match self {
            Self::TransactionId => text
                .parse::<TransactionId>()
                .map(FieldValue::Id)
                .map_err(|e| malformed(e.to_string())),
            Self::UserId => text
                .parse::<UserId>()
                .map(FieldValue::User)
                .map_err(|e| malformed(e.to_string())),
            Self::CryptoSymbol | Self::TransactionType => {
                if text.is_empty() {
                    Err(malformed("value must not be empty".into()))
                } else {
                    Ok(FieldValue::Text(text.to_string()))
                }
            }
            Self::Amount | Self::UsdValue => {
                let number = text
                    .parse::<f64>()
                    .map_err(|e| malformed(e.to_string()))?;
                if number.is_finite() {
                    Ok(FieldValue::Decimal(number))
                } else {
                    Err(malformed("value must be finite".into()))
                }
            }
            Self::TransactionDate => NaiveDate::parse_from_str(text, DATE_FORMAT)
                .map(FieldValue::Date)
                .map_err(|e| malformed(e.to_string())),
        }
    }

    /// Check that a typed value belongs to this field.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::TypeMismatch` if the value has the wrong type.
    pub fn check(self, value: &FieldValue) -> Result<()> {
        let fits = matches!(
            (self, value),
            (Self::TransactionId, FieldValue::Id(_))
                | (Self::UserId, FieldValue::User(_))
                | (
                    Self::CryptoSymbol | Self::TransactionType,
                    FieldValue::Text(_)
                )
                | (Self::Amount | Self::UsdValue, FieldValue::Decimal(_))
                | (Self::TransactionDate, FieldValue::Date(_))
        );
        if fits {
            Ok(())
        } else {
            Err(RecordError::TypeMismatch {
                field: self,
                found: value.type_name(),
            })
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|field| field.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| RecordError::UnknownField(wanted.to_string()))
    }
}

/// A typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A `TransactionID`.
    Id(TransactionId),
    /// A `UserID`.
    User(UserId),
    /// A string field.
    Text(String),
    /// A decimal field.
    Decimal(f64),
    /// A calendar date.
    Date(NaiveDate),
}

impl FieldValue {
    /// Project the value onto an index key.
    ///
    /// Returns `None` for decimal values, which are never indexed.
    #[must_use]
    pub fn index_key(&self) -> Option<IndexKey> {
        match self {
            Self::Id(id) => Some(IndexKey::Int(id.get())),
            Self::User(user) => Some(IndexKey::Int(user.get())),
            Self::Text(text) => Some(IndexKey::Text(text.clone())),
            Self::Date(date) => Some(IndexKey::Date(*date)),
            Self::Decimal(_) => None,
        }
    }

    /// Short name of the value's type, used in mismatch errors.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Id(_) => "transaction id",
            Self::User(_) => "user id",
            Self::Text(_) => "text",
            Self::Decimal(_) => "decimal",
            Self::Date(_) => "date",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::User(user) => write!(f, "{user}"),
            Self::Text(text) => f.write_str(text),
            Self::Decimal(number) => write!(f, "{number}"),
            Self::Date(date) => write!(f, "{}", date.format(DATE_FORMAT)),
        }
    }
}

impl From<TransactionId> for FieldValue {
    fn from(id: TransactionId) -> Self {
        Self::Id(id)
    }
}

impl From<UserId> for FieldValue {
    fn from(user: UserId) -> Self {
        Self::User(user)
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<f64> for FieldValue {
    fn from(number: f64) -> Self {
        Self::Decimal(number)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(date: NaiveDate) -> Self {
        Self::Date(date)
    }
}

/// The hashable, totally ordered key of a secondary index bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexKey {
    /// Integer identifiers.
    Int(u64),
    /// String fields.
    Text(String),
    /// Dates.
    Date(NaiveDate),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_follow_schema_order() {
        let names: Vec<_> = Field::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(
            names,
            [
                "TransactionID",
                "UserID",
                "CryptoSymbol",
                "TransactionType",
                "Amount",
                "TransactionDate",
                "USDValue"
            ]
        );
    }

    #[test]
    fn field_parse_is_case_insensitive() {
        assert_eq!("userid".parse::<Field>().unwrap(), Field::UserId);
        assert_eq!(" USDValue ".parse::<Field>().unwrap(), Field::UsdValue);
        assert_eq!(
            "Price".parse::<Field>(),
            Err(RecordError::UnknownField("Price".into()))
        );
    }

    #[test]
    fn parse_value_types_input() {
        assert_eq!(
            Field::UserId.parse_value("10").unwrap(),
            FieldValue::User(UserId::new(10))
        );
        assert_eq!(
            Field::Amount.parse_value("0.5").unwrap(),
            FieldValue::Decimal(0.5)
        );
        assert_eq!(
            Field::CryptoSymbol.parse_value(" BTC ").unwrap(),
            FieldValue::Text("BTC".into())
        );
        assert_eq!(
            Field::TransactionDate.parse_value("2024-03-01").unwrap(),
            FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );
    }

    #[test]
    fn parse_value_rejects_malformed_numbers() {
        for (field, raw) in [
            (Field::UserId, "ten"),
            (Field::TransactionId, "1.5"),
            (Field::Amount, "lots"),
            (Field::Amount, "inf"),
            (Field::TransactionDate, "01/03/2024"),
            (Field::CryptoSymbol, "  "),
        ] {
            let err = field.parse_value(raw).unwrap_err();
            assert!(
                matches!(err, RecordError::MalformedValue { field: f, .. } if f == field),
                "{field} accepted {raw:?}"
            );
        }
    }

    #[test]
    fn check_rejects_wrong_type() {
        assert!(Field::UserId.check(&FieldValue::User(UserId::new(1))).is_ok());
        assert_eq!(
            Field::UserId.check(&FieldValue::Text("1".into())),
            Err(RecordError::TypeMismatch {
                field: Field::UserId,
                found: "text"
            })
        );
    }

    #[test]
    fn decimals_have_no_index_key() {
        assert!(FieldValue::Decimal(1.0).index_key().is_none());
        assert!(!Field::Amount.is_indexable());
        assert!(Field::CryptoSymbol.is_indexable());
    }

    #[test]
    fn user_and_transaction_ids_share_integer_keys() {
        assert_eq!(
            FieldValue::User(UserId::new(5)).index_key(),
            Some(IndexKey::Int(5))
        );
    }
}
