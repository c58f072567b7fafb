//! The `Pipeline` ties parsing, cleaning and output together.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::clean::columns::{MOVIE_ID, USER_ID};
use crate::clean::{
    CleaningOutcome, CleaningReport, HistoryFindings, RatingResolver, ReferentialValidator,
    SubscriptionCleaner, UserSanitizer,
};
use crate::config::PipelineConfig;
use crate::error::{CleanError, Result};
use crate::input::{DataTable, Parser, SourceMetadata};
use crate::output::write_csv;
use crate::store::TableStore;

/// File written by [`Pipeline::clean_users`].
pub const USERS_OUTPUT: &str = "cleaned_users.csv";
/// File written by [`Pipeline::clean_ratings`].
pub const RATINGS_OUTPUT: &str = "ratings_cleaned.csv";
/// File written by [`Pipeline::clean_subscriptions`].
pub const SUBSCRIPTIONS_OUTPUT: &str = "subscriptions_cleaned.csv";

/// Store table names used by [`Pipeline::validate_history`].
pub const HISTORY_TABLE: &str = "watch_history";
pub const USERS_TABLE: &str = "users";

/// Runs one dataset at a time: load, clean, then write.
///
/// Nothing is written until the cleaned table is final, so a failed run
/// leaves the output directory untouched.
pub struct Pipeline {
    config: PipelineConfig,
    parser: Parser,
    users: UserSanitizer,
    ratings: RatingResolver,
    subscriptions: SubscriptionCleaner,
    history: ReferentialValidator,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Create a pipeline with default rules writing to the current directory.
    pub fn new() -> Self {
        let config = PipelineConfig::default();
        Self {
            parser: Parser::with_config(config.parser.clone()),
            users: UserSanitizer::new(),
            ratings: RatingResolver::with_rules(config.ratings.clone()),
            subscriptions: SubscriptionCleaner::new(),
            history: ReferentialValidator::with_rules(config.history.clone()),
            config,
        }
    }

    /// Create a pipeline from a configuration.
    ///
    /// Fails if the configuration is inconsistent or the email pattern
    /// does not compile.
    pub fn with_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            parser: Parser::with_config(config.parser.clone()),
            users: UserSanitizer::with_rules(config.users.clone())?,
            ratings: RatingResolver::with_rules(config.ratings.clone()),
            subscriptions: SubscriptionCleaner::new(),
            history: ReferentialValidator::with_rules(config.history.clone()),
            config,
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Where a named output lands.
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.config.output_dir.join(file_name)
    }

    /// Clean a user profile file into `cleaned_users.csv`.
    pub fn clean_users(&self, path: impl AsRef<Path>) -> Result<CleaningReport> {
        let (table, source) = self.load(path.as_ref())?;
        let outcome = self.users.sanitize(table);
        self.persist(outcome, source, USERS_OUTPUT)
    }

    /// Clean a ratings file into `ratings_cleaned.csv`.
    ///
    /// When `users` or `movies` files are given, ratings that reference an
    /// id absent from them are dropped.
    pub fn clean_ratings(
        &self,
        path: impl AsRef<Path>,
        users: Option<&Path>,
        movies: Option<&Path>,
    ) -> Result<CleaningReport> {
        let (table, source) = self.load(path.as_ref())?;

        let known_users = users
            .map(|p| self.reference_keys(p, USER_ID))
            .transpose()?
            .flatten();
        let known_movies = movies
            .map(|p| self.reference_keys(p, MOVIE_ID))
            .transpose()?
            .flatten();

        let outcome = self
            .ratings
            .resolve(table, known_users.as_ref(), known_movies.as_ref())?;
        self.persist(outcome, source, RATINGS_OUTPUT)
    }

    /// Clean a subscriptions file into `subscriptions_cleaned.csv`.
    pub fn clean_subscriptions(&self, path: impl AsRef<Path>) -> Result<CleaningReport> {
        let (table, source) = self.load(path.as_ref())?;
        let outcome = self.subscriptions.clean(table)?;
        self.persist(outcome, source, SUBSCRIPTIONS_OUTPUT)
    }

    /// Cross-check watch history against the users file through `store`.
    ///
    /// Both files are loaded into the store and read back before checking.
    /// Anomaly tables are written only when non-empty.
    pub fn validate_history(
        &self,
        history_path: impl AsRef<Path>,
        users_path: impl AsRef<Path>,
        store: &mut dyn TableStore,
    ) -> Result<HistoryFindings> {
        let (history, source) = self.load(history_path.as_ref())?;
        let (users, _) = self.load(users_path.as_ref())?;

        store.load_table(HISTORY_TABLE, &history)?;
        store.load_table(USERS_TABLE, &users)?;

        let history = store.query_all(HISTORY_TABLE)?;
        let known_users = store
            .query_all(USERS_TABLE)?
            .key_set(USER_ID)
            .ok_or_else(|| CleanError::missing_columns(USERS_TABLE, &[USER_ID]))?;

        let mut findings = self.history.validate(history, &known_users);

        let outputs: Vec<PathBuf> = findings
            .tables()
            .map(|(name, table)| {
                let path = self.output_path(&format!("{}.csv", name));
                write_csv(table, &path).map(|_| path)
            })
            .collect::<Result<_>>()?;

        if outputs.is_empty() {
            info!("No inconsistencies found in watch history");
        }

        findings.report.source = Some(source);
        findings.report.outputs = outputs;
        self.save_report(&findings.report)?;

        Ok(findings)
    }

    fn load(&self, path: &Path) -> Result<(DataTable, SourceMetadata)> {
        info!("Loading data from {}...", path.display());
        self.parser.parse_file(path)
    }

    /// Keys of `column` in a reference file, or `None` (with a warning)
    /// when the file lacks that column.
    fn reference_keys(&self, path: &Path, column: &str) -> Result<Option<HashSet<String>>> {
        let (table, _) = self.load(path)?;
        let keys = table.key_set(column);
        match &keys {
            Some(keys) => info!("Loaded {} reference keys from {}", keys.len(), path.display()),
            None => warn!(
                "{} has no '{}' column; skipping that reference check",
                path.display(),
                column
            ),
        }
        Ok(keys)
    }

    fn persist(
        &self,
        outcome: CleaningOutcome,
        source: SourceMetadata,
        file_name: &str,
    ) -> Result<CleaningReport> {
        let CleaningOutcome { table, mut report } = outcome;

        let path = self.output_path(file_name);
        write_csv(&table, &path)?;

        report.source = Some(source);
        report.outputs.push(path);
        self.save_report(&report)?;

        Ok(report)
    }

    fn save_report(&self, report: &CleaningReport) -> Result<()> {
        let path = report.default_path(&self.config.output_dir);
        report.save(&path)?;
        info!("Report written to {}", path.display());
        Ok(())
    }
}
