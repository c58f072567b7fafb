//! SQLite-backed table store. Every column is stored as TEXT so values
//! round-trip exactly as they were read from the CSV.

use std::path::Path;

use rusqlite::{params_from_iter, Connection};
use tracing::info;

use crate::error::{CleanError, Result};
use crate::input::DataTable;

use super::TableStore;

/// Table store over a SQLite database file (or an in-memory database).
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        Ok(Self { conn })
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }
}

/// Quote an SQL identifier, doubling embedded quotes.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl TableStore for SqliteStore {
    fn load_table(&mut self, name: &str, table: &DataTable) -> Result<()> {
        if table.headers.is_empty() {
            return Err(CleanError::Store(format!("table '{}' has no columns", name)));
        }

        let quoted = quote_ident(name);
        let columns = table
            .headers
            .iter()
            .map(|h| format!("{} TEXT", quote_ident(h)))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=table.column_count())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");

        let tx = self.conn.transaction()?;
        tx.execute(&format!("DROP TABLE IF EXISTS {}", quoted), [])?;
        tx.execute(&format!("CREATE TABLE {} ({})", quoted, columns), [])?;
        {
            let insert = format!("INSERT INTO {} VALUES ({})", quoted, placeholders);
            let mut stmt = tx.prepare(&insert)?;
            for row in &table.rows {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;

        info!("Loaded {} records into {} table.", table.row_count(), name);
        Ok(())
    }

    fn query_all(&self, name: &str) -> Result<DataTable> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {}", quote_ident(name)))?;
        let headers: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = headers.len();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Option<String>>(i).map(Option::unwrap_or_default))
                    .collect::<rusqlite::Result<Vec<String>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(DataTable::new(headers, rows, b','))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> DataTable {
        DataTable::new(
            vec!["user_id".into(), "device".into(), "odd \"name\"".into()],
            vec![
                vec!["1".into(), "Laptop".into(), "".into()],
                vec!["2".into(), "Smart TV".into(), "x".into()],
            ],
            b',',
        )
    }

    #[test]
    fn test_round_trip() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.load_table("watch_history", &history()).unwrap();

        let back = store.query_all("watch_history").unwrap();
        assert_eq!(back, history());
    }

    #[test]
    fn test_load_replaces_existing_table() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.load_table("users", &history()).unwrap();

        let smaller = DataTable::new(vec!["user_id".into()], vec![vec!["9".into()]], b',');
        store.load_table("users", &smaller).unwrap();

        assert_eq!(store.query_all("users").unwrap(), smaller);
    }

    #[test]
    fn test_unknown_table_is_an_error() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(matches!(store.query_all("nope"), Err(CleanError::Sqlite(_))));
    }

    #[test]
    fn test_file_backed_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watch_history.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.load_table("users", &history()).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.query_all("users").unwrap().row_count(), 2);
    }
}
