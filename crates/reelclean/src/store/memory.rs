//! In-process table store.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{CleanError, Result};
use crate::input::DataTable;

use super::TableStore;

/// Keeps tables in a map. Used when no database path is configured.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: HashMap<String, DataTable>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the loaded tables.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl TableStore for MemoryStore {
    fn load_table(&mut self, name: &str, table: &DataTable) -> Result<()> {
        debug!("Loaded {} records into table {}", table.row_count(), name);
        self.tables.insert(name.to_string(), table.clone());
        Ok(())
    }

    fn query_all(&self, name: &str) -> Result<DataTable> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| CleanError::Store(format!("no such table: {}", name)))
    }
}
