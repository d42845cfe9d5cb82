//! The object store: a schema-owning CRUD surface over one SQLite table.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::codec::RowCodec;
use crate::error::{Fault, Result, StoreError};
use crate::record::Record;
use crate::schema::{Schema, IDENTITY_COLUMN};

/// Store format version, stamped into `PRAGMA user_version` on creation.
const STORE_VERSION: i32 = 1;

/// A persistent collection of one [`Record`] type, keyed by identity and
/// backed by a single SQLite table.
///
/// Construction derives the schema; the database itself is opened lazily on
/// the first operation and the connection is then reused for the life of the
/// instance. Every public operation is serialized behind an internal lock,
/// so on one instance reads and writes never interleave; a long
/// [`put_all`](ObjectStore::put_all) blocks all other access until it
/// completes. Two instances over different paths are fully independent.
pub struct ObjectStore<T: Record> {
    path: PathBuf,
    schema: Schema,
    backend: Mutex<Backend>,
    _record: PhantomData<T>,
}

/// Lazily opened connection slot. Lives behind the instance lock.
#[derive(Default)]
struct Backend {
    conn: Option<Connection>,
}

impl Backend {
    /// Returns the connection, opening it on first use: parent directory,
    /// PRAGMA setup, then schema materialization.
    fn connection(&mut self, path: &Path, schema: &Schema) -> Result<&Connection> {
        match self.conn {
            Some(ref conn) => Ok(conn),
            None => {
                let conn = open_connection(path, schema)?;
                Ok(self.conn.insert(conn))
            }
        }
    }
}

/// Opens the SQLite file in WAL mode and runs the first-use schema hook.
fn open_connection(path: &Path, schema: &Schema) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;

    // WAL mode: concurrent readers elsewhere, serialized writers
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = 5000;",
    )?;

    ensure_schema(&conn, schema)?;
    Ok(conn)
}

/// First-use hook: materializes the object table and stamps the store
/// version on a fresh database. `CREATE TABLE IF NOT EXISTS` keeps the hook
/// idempotent across instances over the same file.
fn ensure_schema(conn: &Connection, schema: &Schema) -> Result<()> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version != 0 && version != STORE_VERSION {
        on_version_change(conn, version, STORE_VERSION);
    }

    let ddl = schema.create_table_sql();
    debug!(%ddl, "materializing object table");
    conn.execute_batch(&ddl)?;

    if version == 0 {
        conn.pragma_update(None, "user_version", STORE_VERSION)?;
    }
    Ok(())
}

/// Version-change hook. Deliberately inert for now: a future version must
/// detect the mismatch, discard the stored data, and rebuild the table.
fn on_version_change(_conn: &Connection, old: i32, new: i32) {
    warn!(old, new, "store version mismatch; keeping data as-is");
}

impl<T: Record> ObjectStore<T> {
    /// Creates a store over the database at `path`, deriving the schema from
    /// `T`'s descriptor. No I/O happens here; the file is opened on the
    /// first operation.
    ///
    /// Descriptor validation failures (duplicate, empty, or reserved field
    /// names) surface as faults.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let schema = Schema::derive(T::descriptor())?;
        Ok(Self {
            path: path.into(),
            schema,
            backend: Mutex::new(Backend::default()),
            _record: PhantomData,
        })
    }

    /// The derived schema, stable for the life of this instance.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn lock(&self) -> MutexGuard<'_, Backend> {
        // A poisoned lock means another thread panicked mid-operation. The
        // backend holds no partial in-memory state (the database file is the
        // source of truth), so re-enter rather than propagate the panic.
        self.backend
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Loads every stored object. The collection is finite and fully
    /// materialized before the lock is released.
    pub fn get_all(&self) -> Result<Vec<T>> {
        let mut backend = self.lock();
        let conn = backend.connection(&self.path, &self.schema)?;
        let codec = RowCodec::new(&self.schema);

        let mut stmt = conn.prepare(&self.schema.select_sql())?;
        let mut rows = stmt.query([])?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            result.push(codec.decode(row)?);
        }
        Ok(result)
    }

    /// Loads the object stored under `key`, or `None` if absent. Multiple
    /// rows under one key mean the backing file lost the identity
    /// invariant; that surfaces as [`StoreError::CorruptIdentity`] rather
    /// than being masked as absence.
    pub fn get_by_id(&self, key: &T::Key) -> Result<Option<T>> {
        let key_text = key.to_string();
        let mut matches = self.filter(IDENTITY_COLUMN, &key_text)?;
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            n => Err(StoreError::CorruptIdentity {
                key: key_text,
                matches: n,
            }),
        }
    }

    /// Loads every object whose `column` equals `value` in its stored string
    /// form. Result order is storage-engine-determined.
    pub fn get_by_field(&self, column: &str, value: &str) -> Result<Vec<T>> {
        self.filter(column, value)
    }

    fn filter(&self, column: &str, value: &str) -> Result<Vec<T>> {
        // Filter names never reach SQL unchecked.
        if !self.schema.has_column(column) {
            return Err(Fault::UnknownField(column.to_string()).into());
        }

        let mut backend = self.lock();
        let conn = backend.connection(&self.path, &self.schema)?;
        let codec = RowCodec::new(&self.schema);

        let mut stmt = conn.prepare(&self.schema.select_where_sql(column))?;
        let mut rows = stmt.query(rusqlite::params![value])?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            result.push(codec.decode(row)?);
        }
        Ok(result)
    }

    /// Stores `obj`, replacing any existing row with the same key.
    pub fn put(&self, obj: &T) -> Result<()> {
        let mut backend = self.lock();
        let conn = backend.connection(&self.path, &self.schema)?;
        let codec = RowCodec::new(&self.schema);

        let slots = codec.encode(obj)?;
        conn.execute(&self.schema.insert_sql(), rusqlite::params_from_iter(slots))?;
        Ok(())
    }

    /// Stores every object under one lock acquisition and one prepared
    /// statement. Fail-fast: the first failing item aborts the remainder,
    /// and rows already written stay (the batch is not atomic). Returns the
    /// number of rows written.
    pub fn put_all<'a, I>(&self, objects: I) -> Result<usize>
    where
        T: 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let mut backend = self.lock();
        let conn = backend.connection(&self.path, &self.schema)?;
        let codec = RowCodec::new(&self.schema);

        let mut stmt = conn.prepare(&self.schema.insert_sql())?;
        let mut written = 0;
        for obj in objects {
            let slots = codec.encode(obj)?;
            stmt.execute(rusqlite::params_from_iter(slots))?;
            written += 1;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDescriptor, FieldKind, TypeDescriptor};
    use crate::value::{FieldValue, StringSet};

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Thing {
        key: String,
        count: i32,
        tags: StringSet,
    }

    impl Thing {
        fn new(key: &str, count: i32, tags: &[&str]) -> Self {
            Self {
                key: key.to_string(),
                count,
                tags: tags.iter().copied().collect(),
            }
        }
    }

    const THING_FIELDS: &[FieldDescriptor] = &[
        FieldDescriptor::persisted("count", FieldKind::Integer),
        FieldDescriptor::persisted("tags", FieldKind::StringSet),
    ];

    static THING_DESCRIPTOR: TypeDescriptor = TypeDescriptor::new("Thing", THING_FIELDS);

    impl Record for Thing {
        type Key = String;

        fn descriptor() -> &'static TypeDescriptor {
            &THING_DESCRIPTOR
        }

        fn key(&self) -> String {
            self.key.clone()
        }

        fn parse_key(raw: &str) -> Option<String> {
            Some(raw.to_string())
        }

        fn set_key(&mut self, key: String) {
            self.key = key;
        }

        fn field(&self, name: &str) -> Option<FieldValue> {
            match name {
                "count" => Some(FieldValue::Integer(self.count)),
                "tags" => Some(FieldValue::StringSet(self.tags.clone())),
                _ => None,
            }
        }

        fn set_field(&mut self, name: &str, value: FieldValue) -> bool {
            match (name, value) {
                ("count", FieldValue::Integer(v)) => self.count = v,
                ("tags", FieldValue::StringSet(v)) => self.tags = v,
                _ => return false,
            }
            true
        }
    }

    fn temp_store() -> ObjectStore<Thing> {
        ObjectStore::open(":memory:").expect("in-memory store should open")
    }

    #[test]
    fn get_by_id_returns_latest_put() {
        let store = temp_store();
        store.put(&Thing::new("a", 1, &["x", "y"])).unwrap();

        let loaded = store.get_by_id(&"a".to_string()).unwrap();
        assert_eq!(loaded, Some(Thing::new("a", 1, &["x", "y"])));

        assert_eq!(store.get_by_id(&"missing".to_string()).unwrap(), None);
    }

    #[test]
    fn put_is_an_upsert() {
        let store = temp_store();
        let thing = Thing::new("a", 1, &["x"]);
        store.put(&thing).unwrap();
        store.put(&thing).unwrap();
        assert_eq!(store.get_all().unwrap().len(), 1);

        store.put(&Thing::new("a", 2, &["y"])).unwrap();
        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], Thing::new("a", 2, &["y"]));
    }

    #[test]
    fn get_by_field_returns_all_matches() {
        let store = temp_store();
        let things = vec![
            Thing::new("a", 7, &["x"]),
            Thing::new("b", 7, &[]),
            Thing::new("c", 9, &["z"]),
        ];
        assert_eq!(store.put_all(&things).unwrap(), 3);

        let mut matched = store.get_by_field("count", "7").unwrap();
        matched.sort_by(|l, r| l.key.cmp(&r.key));
        assert_eq!(matched, vec![things[0].clone(), things[1].clone()]);

        assert!(store.get_by_field("count", "8").unwrap().is_empty());
    }

    #[test]
    fn unknown_filter_column_is_a_fault() {
        let store = temp_store();
        let err = store.get_by_field("nope", "1").unwrap_err();
        assert!(err.is_fault());
    }

    #[test]
    fn concrete_scenario() {
        let store = temp_store();
        store.put(&Thing::new("a", 1, &["x", "y"])).unwrap();
        store.put(&Thing::new("b", 2, &[])).unwrap();

        assert_eq!(store.get_all().unwrap().len(), 2);
        assert_eq!(
            store.get_by_id(&"a".to_string()).unwrap(),
            Some(Thing::new("a", 1, &["x", "y"]))
        );
        assert_eq!(
            store.get_by_field("count", "2").unwrap(),
            vec![Thing::new("b", 2, &[])]
        );
    }

    /// Yields a wrong-kind value for `count` when poisoned, so encoding
    /// fails mid-batch.
    #[derive(Debug, Default, Clone)]
    struct Flaky {
        key: String,
        count: i32,
        poisoned: bool,
    }

    const FLAKY_FIELDS: &[FieldDescriptor] =
        &[FieldDescriptor::persisted("count", FieldKind::Integer)];
    static FLAKY_DESCRIPTOR: TypeDescriptor = TypeDescriptor::new("Flaky", FLAKY_FIELDS);

    impl Record for Flaky {
        type Key = String;

        fn descriptor() -> &'static TypeDescriptor {
            &FLAKY_DESCRIPTOR
        }

        fn key(&self) -> String {
            self.key.clone()
        }

        fn parse_key(raw: &str) -> Option<String> {
            Some(raw.to_string())
        }

        fn set_key(&mut self, key: String) {
            self.key = key;
        }

        fn field(&self, name: &str) -> Option<FieldValue> {
            match name {
                "count" if self.poisoned => Some(FieldValue::Text("poisoned".to_string())),
                "count" => Some(FieldValue::Integer(self.count)),
                _ => None,
            }
        }

        fn set_field(&mut self, name: &str, value: FieldValue) -> bool {
            match (name, value) {
                ("count", FieldValue::Integer(v)) => {
                    self.count = v;
                    true
                }
                _ => false,
            }
        }
    }

    #[test]
    fn put_all_fails_fast_and_keeps_the_prefix() {
        let store: ObjectStore<Flaky> = ObjectStore::open(":memory:").unwrap();
        let batch: Vec<Flaky> = (1..=5)
            .map(|i| Flaky {
                key: format!("k{i}"),
                count: i,
                poisoned: i == 3,
            })
            .collect();

        let err = store.put_all(&batch).unwrap_err();
        assert!(err.is_fault());

        let mut stored = store.get_all().unwrap();
        stored.sort_by(|l, r| l.key.cmp(&r.key));
        let keys: Vec<&str> = stored.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["k1", "k2"]);
    }

    #[test]
    fn duplicate_identity_rows_surface_as_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.db");

        // Build the table by hand without the primary-key constraint, the
        // way a foreign writer could leave it.
        {
            let conn = rusqlite::Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE objects (tessera_id TEXT, count INTEGER, tags TEXT);
                 INSERT INTO objects VALUES ('a', 1, '');
                 INSERT INTO objects VALUES ('a', 2, '');",
            )
            .unwrap();
        }

        let store: ObjectStore<Thing> = ObjectStore::open(&path).unwrap();
        let err = store.get_by_id(&"a".to_string()).unwrap_err();
        assert!(matches!(
            err,
            StoreError::CorruptIdentity { matches: 2, .. }
        ));
    }

    #[test]
    fn schema_is_stable_across_instances() {
        let first = temp_store();
        let second = temp_store();
        assert_eq!(first.schema().columns(), second.schema().columns());
    }
}
