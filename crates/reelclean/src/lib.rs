//! reelclean: record cleaning for a streaming catalogue's tabular exports.
//!
//! Four datasets are handled, each by its own rule set:
//!
//! - **users**: age bounds with median fill, email syntax, country allow-list
//! - **ratings**: range checks, reference checks and one rating per
//!   (user, movie) pair, by recency or by mean
//! - **subscriptions**: date and amount validation, then per-user merging of
//!   overlapping periods
//! - **watch history**: device and user-id cross-checks through a table store
//!
//! Every run produces a [`CleaningReport`] listing what was dropped, rewritten
//! or flagged.
//!
//! # Example
//!
//! ```no_run
//! use reelclean::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::default().with_output_dir("cleaned");
//! let pipeline = Pipeline::with_config(config).unwrap();
//! let report = pipeline.clean_subscriptions("subscriptions.csv").unwrap();
//!
//! println!("{} rows in, {} rows out", report.rows_in, report.rows_out);
//! ```

pub mod clean;
pub mod config;
pub mod error;
pub mod input;
pub mod output;
pub mod store;
pub mod validation;

mod pipeline;

pub use crate::pipeline::{
    Pipeline, HISTORY_TABLE, RATINGS_OUTPUT, SUBSCRIPTIONS_OUTPUT, USERS_OUTPUT, USERS_TABLE,
};
pub use clean::{CleaningOutcome, CleaningReport, HistoryFindings, RowAudit};
pub use config::PipelineConfig;
pub use error::{CleanError, Result};
pub use input::{DataTable, SourceMetadata};
pub use store::{MemoryStore, SqliteStore, TableStore};
pub use validation::{Observation, ObservationType, Severity};
