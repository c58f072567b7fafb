//! Pipeline configuration, loadable from TOML.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clean::{HistoryRules, RatingRules, UserRules};
use crate::error::{CleanError, Result};
use crate::input::ParserConfig;

/// Everything a [`Pipeline`](crate::Pipeline) needs to know.
///
/// Every section is optional in the TOML file:
///
/// ```toml
/// output_dir = "cleaned"
///
/// [users]
/// max_age = 110
/// countries = ["USA", "Canada"]
///
/// [ratings]
/// max_rating = 10.0
///
/// [history]
/// devices = ["Laptop", "Smart TV"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Input parsing.
    pub parser: ParserConfig,
    /// User profile sanitizing rules.
    pub users: UserRules,
    /// Rating bounds.
    pub ratings: RatingRules,
    /// Watch-history allow-lists.
    pub history: HistoryRules,
    /// Directory that receives cleaned files and reports.
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parser: ParserConfig::default(),
            users: UserRules::default(),
            ratings: RatingRules::default(),
            history: HistoryRules::default(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| CleanError::io(path, e))?;
        let config = Self::from_toml(&text)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no rule could honour.
    pub fn validate(&self) -> Result<()> {
        if self.users.min_age > self.users.max_age {
            return Err(CleanError::Config(format!(
                "users.min_age ({}) exceeds users.max_age ({})",
                self.users.min_age, self.users.max_age
            )));
        }
        if self.ratings.min_rating > self.ratings.max_rating {
            return Err(CleanError::Config(format!(
                "ratings.min_rating ({}) exceeds ratings.max_rating ({})",
                self.ratings.min_rating, self.ratings.max_rating
            )));
        }
        if self.history.devices.is_empty() {
            return Err(CleanError::Config(
                "history.devices must list at least one device".to_string(),
            ));
        }
        Ok(())
    }

    /// Replace the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}
