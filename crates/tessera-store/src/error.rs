//! Error types for the tessera store.
//!
//! Failures fall into two classes. Storage failures (opening, reading, or
//! writing the SQLite file) are recoverable from the caller's point of view:
//! the store does not retry them, but the caller may. Faults are not: they
//! mark a programming error in the schema declaration or in a [`Record`]
//! implementation, and retrying cannot fix them. [`StoreError::is_fault`]
//! distinguishes the two.
//!
//! [`Record`]: crate::record::Record

use thiserror::Error;

use crate::schema::FieldKind;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Main error type for store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Storage engine failures
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Filesystem failures preparing the database location
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// More than one row holds the same identity value. The table declares
    /// the identity column as a replace-on-conflict primary key, so this can
    /// only happen when the backing file was written by something else.
    #[error("identity corruption: key '{key}' matched {matches} rows")]
    CorruptIdentity { key: String, matches: usize },

    /// Non-recoverable configuration faults
    #[error(transparent)]
    Fault(#[from] Fault),
}

impl StoreError {
    /// True for the non-recoverable class: a fault marks a bug in the type
    /// descriptor or the `Record` wiring and must not be retried.
    pub fn is_fault(&self) -> bool {
        matches!(self, StoreError::Fault(_))
    }
}

/// Configuration and internal-consistency faults
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    #[error("type '{type_name}' declares a field with an empty name")]
    EmptyFieldName { type_name: &'static str },

    #[error("field name '{field}' collides with the identity column")]
    ReservedFieldName { field: &'static str },

    #[error("field '{field}' is declared more than once")]
    DuplicateFieldName { field: &'static str },

    #[error("field '{field}' is declared as {expected:?} but its accessor yielded {actual:?}")]
    KindMismatch {
        field: &'static str,
        expected: FieldKind,
        actual: FieldKind,
    },

    #[error("accessor for type '{type_name}' does not recognize field '{field}'")]
    MissingField {
        type_name: &'static str,
        field: &'static str,
    },

    #[error("setter for type '{type_name}' rejected field '{field}'")]
    FieldRejected {
        type_name: &'static str,
        field: &'static str,
    },

    #[error("stored key '{raw}' does not parse as a key for type '{type_name}'")]
    KeyUnparseable { type_name: &'static str, raw: String },

    #[error("column '{0}' is not part of the derived schema")]
    UnknownField(String),
}
