//! Schema derivation from statically declared type descriptors.
//!
//! Every stored type carries a [`TypeDescriptor`]: an ordered, `'static`
//! table of its attributes and their kinds. At store construction the
//! descriptor is turned into a [`Schema`], the ordered column list that
//! drives DDL generation, query projection, and positional row decoding.
//! Derivation runs once per store instance and the result never changes.

use serde::Serialize;

use crate::error::Fault;

/// Name of the synthetic primary-key column present in every table.
pub const IDENTITY_COLUMN: &str = "tessera_id";

/// Name of the single table owned by a store instance.
pub(crate) const TABLE_NAME: &str = "objects";

/// The supported attribute kinds.
///
/// The set is closed: a field can only ever be declared as one of these, so
/// an unsupported declaration is unrepresentable. What remains possible is a
/// mismatch between a declaration and what the accessor actually yields,
/// which the codec reports as a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Integer,
    Long,
    Boolean,
    StringSet,
}

impl FieldKind {
    /// SQLite column type for this kind.
    pub fn sql_type(self) -> &'static str {
        match self {
            FieldKind::Text | FieldKind::StringSet => "TEXT",
            FieldKind::Integer | FieldKind::Long | FieldKind::Boolean => "INTEGER",
        }
    }
}

/// One declared attribute of a stored type.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Transient attributes are skipped by derivation and never persisted.
    pub transient: bool,
}

impl FieldDescriptor {
    /// A persisted attribute.
    pub const fn persisted(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            transient: false,
        }
    }

    /// An attribute excluded from persistence.
    pub const fn transient(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            transient: true,
        }
    }
}

/// Static description of a stored type: its name plus the ordered attribute
/// table. The identity key is not listed here; the store reaches it through
/// the [`Record`](crate::record::Record) key accessors instead.
#[derive(Debug, Clone, Copy)]
pub struct TypeDescriptor {
    pub type_name: &'static str,
    pub fields: &'static [FieldDescriptor],
}

impl TypeDescriptor {
    pub const fn new(type_name: &'static str, fields: &'static [FieldDescriptor]) -> Self {
        Self { type_name, fields }
    }
}

/// One derived column: persisted attribute name plus storage kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// The derived column list for one store instance. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<ColumnDescriptor>,
}

impl Schema {
    /// Derives the column list from a type descriptor, skipping transient
    /// attributes and preserving declaration order. Same descriptor, same
    /// columns, every time.
    pub fn derive(descriptor: &'static TypeDescriptor) -> Result<Self, Fault> {
        let mut columns: Vec<ColumnDescriptor> = Vec::new();

        for field in descriptor.fields.iter().filter(|f| !f.transient) {
            if field.name.is_empty() {
                return Err(Fault::EmptyFieldName {
                    type_name: descriptor.type_name,
                });
            }
            if field.name == IDENTITY_COLUMN {
                return Err(Fault::ReservedFieldName { field: field.name });
            }
            if columns.iter().any(|c| c.name == field.name) {
                return Err(Fault::DuplicateFieldName { field: field.name });
            }
            columns.push(ColumnDescriptor {
                name: field.name,
                kind: field.kind,
            });
        }

        Ok(Self { columns })
    }

    /// The derived columns, in declaration order.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Whether `name` is a queryable column: the identity column or one of
    /// the derived columns.
    pub fn has_column(&self, name: &str) -> bool {
        name == IDENTITY_COLUMN || self.columns.iter().any(|c| c.name == name)
    }

    /// The table-creation statement. The identity column is the primary key
    /// with replace-on-conflict, so plain inserts carry upsert semantics.
    pub(crate) fn create_table_sql(&self) -> String {
        let mut sql = format!(
            "CREATE TABLE IF NOT EXISTS {TABLE_NAME} ({IDENTITY_COLUMN} TEXT PRIMARY KEY ON CONFLICT REPLACE"
        );
        for column in &self.columns {
            sql.push_str(", ");
            sql.push_str(column.name);
            sql.push(' ');
            sql.push_str(column.kind.sql_type());
        }
        sql.push(')');
        sql
    }

    /// Full-table scan projecting identity plus every column, in derived
    /// order. Decoding relies on this order.
    pub(crate) fn select_sql(&self) -> String {
        format!("SELECT {} FROM {TABLE_NAME}", self.projection())
    }

    /// Equality-filtered scan. The caller must have validated `column`
    /// against [`Schema::has_column`]; names never reach SQL unchecked.
    pub(crate) fn select_where_sql(&self, column: &str) -> String {
        format!("{} WHERE {column} = ?1", self.select_sql())
    }

    /// Positional insert statement matching the projection order.
    pub(crate) fn insert_sql(&self) -> String {
        let placeholders: Vec<String> = (1..=self.columns.len() + 1)
            .map(|i| format!("?{i}"))
            .collect();
        format!(
            "INSERT INTO {TABLE_NAME} ({}) VALUES ({})",
            self.projection(),
            placeholders.join(", ")
        )
    }

    fn projection(&self) -> String {
        let mut projection = String::from(IDENTITY_COLUMN);
        for column in &self.columns {
            projection.push_str(", ");
            projection.push_str(column.name);
        }
        projection
    }
}
