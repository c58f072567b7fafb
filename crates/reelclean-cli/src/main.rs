//! reelclean CLI - clean user, rating, subscription and watch-history exports.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "reelclean=debug" } else { "reelclean=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Users { file, output_dir } => {
            commands::users::run(file, output_dir, cli.config, cli.verbose)
        }

        Commands::Ratings {
            file,
            users,
            movies,
            output_dir,
        } => commands::ratings::run(file, users, movies, output_dir, cli.config, cli.verbose),

        Commands::Subscriptions { file, output_dir } => {
            commands::subscriptions::run(file, output_dir, cli.config, cli.verbose)
        }

        Commands::History {
            file,
            users,
            database,
            output_dir,
        } => commands::history::run(file, users, database, output_dir, cli.config, cli.verbose),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
