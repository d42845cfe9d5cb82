//! Object/row marshalling against a derived schema.
//!
//! The codec is pure conversion: it never touches storage and holds no state
//! beyond a borrowed [`Schema`]. Encoding produces the positional parameter
//! list for the insert statement; decoding consumes a result row by
//! position, both in the schema's derived column order with the identity
//! column first.

use rusqlite::types::Value as SqlValue;
use rusqlite::Row;

use crate::error::{Fault, Result};
use crate::record::Record;
use crate::schema::{FieldKind, Schema};
use crate::value::{FieldValue, StringSet};

pub(crate) struct RowCodec<'a> {
    schema: &'a Schema,
}

impl<'a> RowCodec<'a> {
    pub(crate) fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Encodes one object as positional SQL parameters: identity first, then
    /// one slot per column in schema order. Booleans are stored as 0/1,
    /// string sets as their delimited text.
    pub(crate) fn encode<T: Record>(&self, obj: &T) -> Result<Vec<SqlValue>> {
        let mut slots = Vec::with_capacity(self.schema.columns().len() + 1);
        slots.push(SqlValue::Text(obj.key().to_string()));

        for column in self.schema.columns() {
            let value = obj.field(column.name).ok_or(Fault::MissingField {
                type_name: T::descriptor().type_name,
                field: column.name,
            })?;
            if value.kind() != column.kind {
                return Err(Fault::KindMismatch {
                    field: column.name,
                    expected: column.kind,
                    actual: value.kind(),
                }
                .into());
            }
            slots.push(match value {
                FieldValue::Text(text) => SqlValue::Text(text),
                FieldValue::Integer(n) => SqlValue::Integer(n as i64),
                FieldValue::Long(n) => SqlValue::Integer(n),
                FieldValue::Boolean(flag) => SqlValue::Integer(flag as i64),
                FieldValue::StringSet(set) => SqlValue::Text(set.to_delimited()),
            });
        }

        Ok(slots)
    }

    /// Decodes one result row into a fresh default-constructed object. The
    /// identity column (position 0) is restored through the type's own
    /// key-parsing capability; every other column is read by position in
    /// schema order.
    pub(crate) fn decode<T: Record>(&self, row: &Row<'_>) -> Result<T> {
        let mut obj = T::default();

        let raw_key: String = row.get(0)?;
        match T::parse_key(&raw_key) {
            Some(key) => obj.set_key(key),
            None => {
                return Err(Fault::KeyUnparseable {
                    type_name: T::descriptor().type_name,
                    raw: raw_key,
                }
                .into())
            }
        }

        for (position, column) in self.schema.columns().iter().enumerate() {
            let index = position + 1;
            let value = match column.kind {
                FieldKind::Text => FieldValue::Text(row.get(index)?),
                FieldKind::Integer => FieldValue::Integer(row.get(index)?),
                FieldKind::Long => FieldValue::Long(row.get(index)?),
                FieldKind::Boolean => FieldValue::Boolean(row.get::<_, i64>(index)? != 0),
                FieldKind::StringSet => {
                    let text: String = row.get(index)?;
                    FieldValue::StringSet(StringSet::from_delimited(&text))
                }
            };
            if !obj.set_field(column.name, value) {
                return Err(Fault::FieldRejected {
                    type_name: T::descriptor().type_name,
                    field: column.name,
                }
                .into());
            }
        }

        Ok(obj)
    }
}
