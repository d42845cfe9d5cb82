//! The contract a type must satisfy to be stored.

use std::fmt;

use crate::schema::TypeDescriptor;
use crate::value::FieldValue;

/// A value that an [`ObjectStore`](crate::store::ObjectStore) can persist.
///
/// Implementations declare their persisted attributes once, in a `'static`
/// [`TypeDescriptor`], and expose uniform get/set access to each declared
/// field. The identity key lives outside the descriptor: the store reads it
/// through [`Record::key`], stores its `Display` form in the identity
/// column, and restores it through [`Record::parse_key`] on decode.
///
/// The descriptor and the accessors must agree. An accessor that does not
/// recognize a declared name, or yields a value of a different kind than
/// declared, is reported as a non-recoverable [`Fault`](crate::error::Fault).
pub trait Record: Default {
    /// Identity type; its `Display` form is the primary-key text.
    type Key: fmt::Display;

    /// Declared attribute table for this type. Must return the same table
    /// on every call.
    fn descriptor() -> &'static TypeDescriptor;

    /// The value's own identity key.
    fn key(&self) -> Self::Key;

    /// Parses a key from its stored text. `None` marks stored text this
    /// type cannot interpret as a key.
    fn parse_key(raw: &str) -> Option<Self::Key>;

    /// Replaces the identity key, used when rebuilding a value from a row.
    fn set_key(&mut self, key: Self::Key);

    /// Reads one declared field by name. `None` marks a name the
    /// implementation does not recognize.
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Writes one declared field by name. Returns false when the name is
    /// unknown or the value's kind does not match the declaration.
    fn set_field(&mut self, name: &str, value: FieldValue) -> bool;
}
