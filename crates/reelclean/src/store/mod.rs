//! Table stores used for the watch-history cross-check.
//!
//! The cleaning rules never talk to a store directly; the pipeline loads
//! tables into one and reads them back whole.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::input::DataTable;

/// Minimal data-access interface: bulk replace and read-all.
pub trait TableStore {
    /// Replace the table `name` with the contents of `table`.
    fn load_table(&mut self, name: &str, table: &DataTable) -> Result<()>;

    /// Read every row of the table `name`.
    fn query_all(&self, name: &str) -> Result<DataTable>;
}
