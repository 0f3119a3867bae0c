//! Error types for coinledger records.

use crate::field::Field;

/// Result type for record-level operations.
pub type Result<T> = std::result::Result<T, RecordError>;

/// Errors raised while interpreting fields and values.
///
/// These cover untyped input coming from a front end: a record that makes it
/// into the store has already passed through these checks.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    /// The field name is not part of the record schema.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// The text could not be converted to the field's type.
    #[error("malformed value for {field}: {value:?} ({reason})")]
    MalformedValue {
        /// The field being parsed.
        field: Field,
        /// The raw input.
        value: String,
        /// Why the conversion failed.
        reason: String,
    },

    /// A typed value was supplied for a field of a different type.
    #[error("value of type {found} does not fit field {field}")]
    TypeMismatch {
        /// The target field.
        field: Field,
        /// The type name of the supplied value.
        found: &'static str,
    },

    /// The field cannot carry a secondary index.
    #[error("field {0} cannot be indexed")]
    NotIndexable(Field),

    /// The primary key cannot be changed.
    #[error("TransactionID is immutable")]
    ImmutableKey,
}
