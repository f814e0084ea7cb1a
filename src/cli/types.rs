//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::commands::clean::CleanArgs;
use crate::cli::commands::migrate::MigrateArgs;
use crate::cli::commands::status::StatusArgs;

#[derive(Parser, Debug)]
#[command(name = "testshift")]
#[command(about = "testshift - iterative UI test migration", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .testshift/config.yaml + local.yaml)
    #[arg(short, long, global = true, env = "TESTSHIFT_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Migrate test files through the generate, execute and repair loop
    Migrate(MigrateArgs),

    /// Show the retained workspace of each file
    Status(StatusArgs),

    /// Remove retained workspaces
    Clean(CleanArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_migrate_flags() {
        let cli = Cli::try_parse_from([
            "testshift",
            "--json",
            "migrate",
            "a.test.tsx",
            "b.test.tsx",
            "--retry",
            "--max-retries",
            "5",
            "--skip-lint",
        ])
        .unwrap();

        assert!(cli.json);
        let Commands::Migrate(args) = cli.command else {
            panic!("expected migrate");
        };
        assert_eq!(args.files.len(), 2);
        assert!(args.retry);
        assert_eq!(args.max_retries, Some(5));
        assert!(args.skip_lint);
        assert!(!args.skip_type_check);
    }

    #[test]
    fn migrate_requires_files() {
        assert!(Cli::try_parse_from(["testshift", "migrate"]).is_err());
    }
}
