//! Tessera Store - schema-deriving keyed object persistence over SQLite
//!
//! Tessera persists plain values whose attributes come from a small fixed
//! set of kinds (text, 32/64-bit integers, booleans, and delimited string
//! sets). A stored type declares its attributes once in a static
//! [`TypeDescriptor`]; the store derives the table schema from it at
//! construction and marshals objects to and from rows for every operation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   ObjectStore<T>                     │
//! ├──────────────────────────────────────────────────────┤
//! │  Schema (derived once)  │  RowCodec (per operation)  │
//! └──────────────────────────────────────────────────────┘
//!          ↓ per-instance lock: one operation at a time
//!            SQLite (WAL), one table, identity-keyed
//! ```
//!
//! Operations: [`ObjectStore::get_all`], [`ObjectStore::get_by_id`],
//! [`ObjectStore::get_by_field`], [`ObjectStore::put`], and
//! [`ObjectStore::put_all`]. Inserts replace any prior row with the same
//! key. Everything is synchronous; the calling thread blocks until the
//! operation completes.
//!
//! # Example
//!
//! ```
//! use tessera_store::{
//!     FieldDescriptor, FieldKind, FieldValue, ObjectStore, Record, TypeDescriptor,
//! };
//!
//! #[derive(Debug, Default, Clone, PartialEq)]
//! struct Counter {
//!     name: String,
//!     count: i32,
//! }
//!
//! const COUNTER_FIELDS: &[FieldDescriptor] =
//!     &[FieldDescriptor::persisted("count", FieldKind::Integer)];
//! static COUNTER_DESCRIPTOR: TypeDescriptor = TypeDescriptor::new("Counter", COUNTER_FIELDS);
//!
//! impl Record for Counter {
//!     type Key = String;
//!
//!     fn descriptor() -> &'static TypeDescriptor {
//!         &COUNTER_DESCRIPTOR
//!     }
//!     fn key(&self) -> String {
//!         self.name.clone()
//!     }
//!     fn parse_key(raw: &str) -> Option<String> {
//!         Some(raw.to_string())
//!     }
//!     fn set_key(&mut self, key: String) {
//!         self.name = key;
//!     }
//!     fn field(&self, name: &str) -> Option<FieldValue> {
//!         match name {
//!             "count" => Some(FieldValue::Integer(self.count)),
//!             _ => None,
//!         }
//!     }
//!     fn set_field(&mut self, name: &str, value: FieldValue) -> bool {
//!         match (name, value) {
//!             ("count", FieldValue::Integer(n)) => {
//!                 self.count = n;
//!                 true
//!             }
//!             _ => false,
//!         }
//!     }
//! }
//!
//! # fn main() -> tessera_store::Result<()> {
//! let store = ObjectStore::<Counter>::open(":memory:")?;
//! store.put(&Counter { name: "hits".into(), count: 3 })?;
//! assert_eq!(store.get_by_id(&"hits".to_string())?.map(|c| c.count), Some(3));
//! # Ok(())
//! # }
//! ```

mod codec;
pub mod error;
pub mod record;
pub mod schema;
pub mod store;
pub mod value;

pub use error::{Fault, Result, StoreError};
pub use record::Record;
pub use schema::{
    ColumnDescriptor, FieldDescriptor, FieldKind, Schema, TypeDescriptor, IDENTITY_COLUMN,
};
pub use store::ObjectStore;
pub use value::{FieldValue, StringSet};
