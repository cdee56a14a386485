//! SQLite-backed record store.
//!
//! All coercion between field text and typed SQL values happens at this
//! boundary; the rest of the application only ever sees strings. The
//! connection is owned by the single foreground task for the whole session.

use std::fmt;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use rusqlite::types::{Value, ValueRef};
use rusqlite::Connection;

use crate::schema::{integer_prefix, real_prefix, Field, FieldType};

/// Sort direction for the active sort column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggle(&mut self) {
        *self = match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        };
    }

    fn as_sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// One column of the target table as declared in its schema.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    pub declared: String,
    pub notnull: bool,
    pub pk: bool,
}

/// One row of the target table: the opaque identifier plus the rendered
/// value of every field, in field order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: i64,
    pub values: Vec<String>,
}

pub struct RecordStore {
    conn: Connection,
    table: String,
    id_column: String,
    has_labels: bool,
    has_meta: bool,
}

impl RecordStore {
    /// Open a data source and locate its primary table.
    ///
    /// The primary table is the first user table that is not one of the
    /// auxiliary `labels`/`meta` tables, and it must carry a single-column
    /// integer primary key.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .wrap_err_with(|| format!("cannot open data source {}", path.display()))?;

        let table: String = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' \
                 AND name NOT IN ('labels', 'meta') AND name NOT LIKE 'sqlite_%' \
                 ORDER BY rowid LIMIT 1",
                [],
                |row| row.get(0),
            )
            .wrap_err_with(|| format!("no primary table in {}", path.display()))?;

        let has_labels = table_exists(&conn, "labels")?;
        let has_meta = table_exists(&conn, "meta")?;

        let mut store = Self {
            conn,
            table,
            id_column: String::new(),
            has_labels,
            has_meta,
        };
        store.id_column = store.find_id_column()?;
        log::info!(
            "opened {} (table '{}', id column '{}')",
            path.display(),
            store.table,
            store.id_column
        );
        Ok(store)
    }

    /// In-memory store for tests and dry runs.
    pub fn open_in_memory(setup_sql: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(setup_sql)?;
        let table: String = conn.query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' \
             AND name NOT IN ('labels', 'meta') AND name NOT LIKE 'sqlite_%' \
             ORDER BY rowid LIMIT 1",
            [],
            |row| row.get(0),
        )?;
        let has_labels = table_exists(&conn, "labels")?;
        let has_meta = table_exists(&conn, "meta")?;
        let mut store = Self {
            conn,
            table,
            id_column: String::new(),
            has_labels,
            has_meta,
        };
        store.id_column = store.find_id_column()?;
        Ok(store)
    }

    fn find_id_column(&self) -> Result<String> {
        let columns = self.introspect_schema()?;
        let mut pk_columns = columns.iter().filter(|c| c.pk);
        let id = pk_columns
            .next()
            .ok_or_else(|| eyre!("table '{}' has no primary key", self.table))?;
        if pk_columns.next().is_some() {
            return Err(eyre!(
                "table '{}' has a composite primary key; a single integer key is required",
                self.table
            ));
        }
        if FieldType::from_declared(&id.declared)? != FieldType::Integer {
            return Err(eyre!(
                "primary key '{}' of table '{}' is not an integer",
                id.name,
                self.table
            ));
        }
        Ok(id.name.clone())
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// Column metadata in schema order.
    pub fn introspect_schema(&self) -> Result<Vec<ColumnInfo>> {
        let sql = format!("PRAGMA table_info({})", quote_ident(&self.table));
        let mut stmt = self.conn.prepare(&sql)?;
        let columns = stmt
            .query_map([], |row| {
                Ok(ColumnInfo {
                    name: row.get(1)?,
                    declared: row.get(2)?,
                    notnull: row.get::<_, i64>(3)? != 0,
                    pk: row.get::<_, i64>(5)? != 0,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    /// Label override for a column, if the optional labels table has one.
    pub fn lookup_label(&self, column: &str) -> Result<Option<String>> {
        if !self.has_labels {
            return Ok(None);
        }
        let mut stmt = self
            .conn
            .prepare("SELECT label FROM labels WHERE name = ?1")?;
        let mut rows = stmt.query([column])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Short display name from the optional metadata table, falling back to
    /// the table name.
    pub fn display_name(&self) -> Result<String> {
        if self.has_meta {
            let mut stmt = self.conn.prepare("SELECT name FROM meta LIMIT 1")?;
            let mut rows = stmt.query([])?;
            if let Some(row) = rows.next()? {
                return Ok(row.get(0)?);
            }
        }
        Ok(self.table.clone())
    }

    /// Length of the longest rendered value in a column: string length for
    /// text, decimal digit count for integers, and digit count plus three
    /// (".XX") for reals.
    pub fn max_rendered_length(&self, column: &str, ftype: FieldType) -> Result<u16> {
        let column = quote_ident(column);
        let sql = match ftype {
            FieldType::Text => {
                format!(
                    "SELECT COALESCE(MAX(LENGTH({column})), 0) FROM {}",
                    quote_ident(&self.table)
                )
            }
            FieldType::Integer => {
                format!(
                    "SELECT COALESCE(MAX(LENGTH(CAST({column} AS TEXT))), 0) FROM {}",
                    quote_ident(&self.table)
                )
            }
            FieldType::Real => {
                format!(
                    "SELECT COALESCE(MAX(LENGTH(CAST(CAST({column} AS INTEGER) AS TEXT))), 0) \
                     FROM {}",
                    quote_ident(&self.table)
                )
            }
        };
        let longest: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        let extra = if ftype == FieldType::Real { 3 } else { 0 };
        Ok(longest as u16 + extra)
    }

    pub fn count(&self) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(&self.table));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// All records, pre-sorted by `sort_column`. The renderer never sorts.
    pub fn query_all_sorted(
        &self,
        fields: &[Field],
        sort_column: &str,
        direction: SortDirection,
    ) -> Result<Vec<Record>> {
        let sql = format!(
            "SELECT {}, {} FROM {} ORDER BY {} {}",
            quote_ident(&self.id_column),
            column_list(fields),
            quote_ident(&self.table),
            quote_ident(sort_column),
            direction.as_sql()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                let mut values = Vec::with_capacity(fields.len());
                for (i, field) in fields.iter().enumerate() {
                    values.push(render_value(row.get_ref(i + 1)?, field.ftype));
                }
                Ok(Record { id, values })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// One record by identifier, values in field order.
    pub fn query_one(&self, fields: &[Field], id: i64) -> Result<Record> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            column_list(fields),
            quote_ident(&self.table),
            quote_ident(&self.id_column)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let record = stmt.query_row([id], |row| {
            let mut values = Vec::with_capacity(fields.len());
            for (i, field) in fields.iter().enumerate() {
                values.push(render_value(row.get_ref(i)?, field.ftype));
            }
            Ok(Record { id, values })
        })?;
        Ok(record)
    }

    /// Insert a new record from the in-progress field values.
    pub fn insert(&self, fields: &[Field]) -> Result<i64> {
        let placeholders: Vec<String> = (1..=fields.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(&self.table),
            column_list(fields),
            placeholders.join(", ")
        );
        let values = coerce_values(fields);
        self.conn
            .execute(&sql, rusqlite::params_from_iter(values))?;
        let id = self.conn.last_insert_rowid();
        log::info!("inserted record {id}");
        Ok(id)
    }

    /// Update an existing record from the in-progress field values.
    pub fn update(&self, fields: &[Field], id: i64) -> Result<()> {
        let assignments: Vec<String> = fields
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{} = ?{}", quote_ident(&f.name), i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            quote_ident(&self.table),
            assignments.join(", "),
            quote_ident(&self.id_column),
            fields.len() + 1
        );
        let mut values = coerce_values(fields);
        values.push(Value::Integer(id));
        self.conn
            .execute(&sql, rusqlite::params_from_iter(values))?;
        log::info!("updated record {id}");
        Ok(())
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1",
            quote_ident(&self.table),
            quote_ident(&self.id_column)
        );
        self.conn.execute(&sql, [id])?;
        log::info!("deleted record {id}");
        Ok(())
    }
}

/// Locate the data source in `dir`: exactly one file with the expected
/// extension must exist.
pub fn discover(dir: &Path, extension: &str) -> Result<PathBuf> {
    let mut matches: Vec<PathBuf> = std::fs::read_dir(dir)
        .wrap_err_with(|| format!("cannot read directory {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case(extension))
                    .unwrap_or(false)
        })
        .collect();
    matches.sort();
    match matches.len() {
        0 => Err(eyre!(
            "no *.{} data source found in {}",
            extension,
            dir.display()
        )),
        1 => Ok(matches.remove(0)),
        n => Err(eyre!(
            "ambiguous data source: {} *.{} files in {}",
            n,
            extension,
            dir.display()
        )),
    }
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_list(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| quote_ident(&f.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a stored value to field text: reals always carry two decimals,
/// absent values become empty text.
fn render_value(value: ValueRef<'_>, ftype: FieldType) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => match ftype {
            FieldType::Real => format!("{:.2}", i as f64),
            _ => i.to_string(),
        },
        ValueRef::Real(f) => format!("{f:.2}"),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(_) => String::new(),
    }
}

/// Coerce in-progress field text to typed SQL values, in field order.
/// Empty optional fields become NULL; numeric noise collapses to the
/// prefix value the inline warning already showed.
fn coerce_values(fields: &[Field]) -> Vec<Value> {
    fields
        .iter()
        .map(|field| {
            if field.value.is_empty() && field.optional {
                return Value::Null;
            }
            match field.ftype {
                FieldType::Text => Value::Text(field.value.clone()),
                FieldType::Integer => Value::Integer(integer_prefix(&field.value)),
                FieldType::Real => Value::Real(real_prefix(&field.value)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::introspect;

    const FIXTURE: &str = "
        CREATE TABLE albums (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            rating INTEGER,
            price REAL
        );
        CREATE TABLE labels (name TEXT, label TEXT);
        INSERT INTO labels VALUES ('title', 'Album Title');
        CREATE TABLE meta (name TEXT);
        INSERT INTO meta VALUES ('Record Shelf');
        INSERT INTO albums (title, rating, price) VALUES ('Kind of Blue', 10, 9.99);
        INSERT INTO albums (title, rating, price) VALUES ('Aja', 8, 12.5);
        INSERT INTO albums (title, rating, price) VALUES ('Hounds of Love', 9, NULL);
    ";

    fn fixture() -> RecordStore {
        RecordStore::open_in_memory(FIXTURE).unwrap()
    }

    #[test]
    fn test_open_discovers_table_and_id() {
        let store = fixture();
        assert_eq!(store.table_name(), "albums");
        assert_eq!(store.id_column(), "id");
    }

    #[test]
    fn test_introspect_schema_order_and_flags() {
        let store = fixture();
        let columns = store.introspect_schema().unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["id", "title", "rating", "price"]);
        assert!(columns[0].pk);
        assert!(columns[1].notnull);
        assert!(!columns[2].notnull);
    }

    #[test]
    fn test_labels_and_display_name() {
        let store = fixture();
        assert_eq!(
            store.lookup_label("title").unwrap().as_deref(),
            Some("Album Title")
        );
        assert_eq!(store.lookup_label("rating").unwrap(), None);
        assert_eq!(store.display_name().unwrap(), "Record Shelf");
    }

    #[test]
    fn test_max_rendered_length() {
        let store = fixture();
        // "Hounds of Love" is 14 chars.
        assert_eq!(
            store
                .max_rendered_length("title", FieldType::Text)
                .unwrap(),
            14
        );
        assert_eq!(
            store
                .max_rendered_length("rating", FieldType::Integer)
                .unwrap(),
            2
        );
        // Integer part of 12.5 is 2 digits, plus ".XX".
        assert_eq!(
            store
                .max_rendered_length("price", FieldType::Real)
                .unwrap(),
            5
        );
    }

    #[test]
    fn test_query_all_sorted() {
        let store = fixture();
        let fields = introspect(&store).unwrap();
        let records = store
            .query_all_sorted(&fields, "rating", SortDirection::Descending)
            .unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].values[0], "Kind of Blue");
        assert_eq!(records[0].values[1], "10");
        assert_eq!(records[0].values[2], "9.99");
        // NULL price renders as empty text; reals carry two decimals.
        assert_eq!(records[1].values[2], "");
        assert_eq!(records[2].values[2], "12.50");
    }

    #[test]
    fn test_insert_round_trip() {
        let store = fixture();
        let mut fields = introspect(&store).unwrap();
        fields[0].value = "Blue Train".to_string();
        fields[1].value = "12a".to_string(); // coerces to 12
        fields[2].value = "7.5".to_string();
        let id = store.insert(&fields).unwrap();

        let record = store.query_one(&fields, id).unwrap();
        assert_eq!(record.values[0], "Blue Train");
        assert_eq!(record.values[1], "12");
        assert_eq!(record.values[2], "7.50");
    }

    #[test]
    fn test_update_and_optional_null() {
        let store = fixture();
        let mut fields = introspect(&store).unwrap();
        let records = store
            .query_all_sorted(&fields, "title", SortDirection::Ascending)
            .unwrap();
        let id = records[0].id;

        fields[0].value = "Aja (Remaster)".to_string();
        fields[1].value = String::new(); // optional -> NULL
        fields[2].value = "11".to_string();
        store.update(&fields, id).unwrap();

        let record = store.query_one(&fields, id).unwrap();
        assert_eq!(record.values[0], "Aja (Remaster)");
        assert_eq!(record.values[1], "");
        assert_eq!(record.values[2], "11.00");
    }

    #[test]
    fn test_delete_decrements_count() {
        let store = fixture();
        let fields = introspect(&store).unwrap();
        let before = store.count().unwrap();
        let records = store
            .query_all_sorted(&fields, "title", SortDirection::Ascending)
            .unwrap();
        let id = records[0].id;
        store.delete(id).unwrap();
        assert_eq!(store.count().unwrap(), before - 1);
        let remaining = store
            .query_all_sorted(&fields, "title", SortDirection::Ascending)
            .unwrap();
        assert!(remaining.iter().all(|r| r.id != id));
    }

    #[test]
    fn test_unsupported_type_is_fatal() {
        let store = RecordStore::open_in_memory(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, payload BLOB);",
        )
        .unwrap();
        assert!(introspect(&store).is_err());
    }

    #[test]
    fn test_discover() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover(dir.path(), "db").is_err());

        std::fs::write(dir.path().join("one.db"), b"").unwrap();
        let found = discover(dir.path(), "db").unwrap();
        assert!(found.ends_with("one.db"));

        std::fs::write(dir.path().join("two.db"), b"").unwrap();
        assert!(discover(dir.path(), "db").is_err());
    }
}
