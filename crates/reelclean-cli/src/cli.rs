//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// reelclean: validate and repair streaming-catalogue exports
#[derive(Parser)]
#[command(name = "reelclean")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Pipeline configuration file (TOML)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean user profiles (ages, emails, countries)
    Users {
        /// Path to the users file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Directory for cleaned_users.csv and the report
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Resolve duplicate ratings to one per user and movie
    Ratings {
        /// Path to the ratings file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Users file; ratings by unknown users are dropped
        #[arg(long)]
        users: Option<PathBuf>,

        /// Movies file; ratings of unknown movies are dropped
        #[arg(long)]
        movies: Option<PathBuf>,

        /// Directory for ratings_cleaned.csv and the report
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Validate subscriptions and merge overlapping periods
    Subscriptions {
        /// Path to the subscriptions file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Directory for subscriptions_cleaned.csv and the report
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Cross-check watch history against known users and devices
    History {
        /// Path to the watch-history file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Users file providing the known user ids
        #[arg(long)]
        users: PathBuf,

        /// SQLite database to stage the tables in (in-memory when omitted)
        #[arg(long)]
        database: Option<PathBuf>,

        /// Directory for the anomaly tables and the report
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}
