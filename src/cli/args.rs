use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::models::FactWritePolicy;

#[derive(Parser)]
#[command(name = "weather-etl")]
#[command(about = "Load Open-Meteo forecasts into a PostgreSQL star schema")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Hide the progress spinner and run summary")]
    pub quiet: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(
        short,
        long,
        global = true,
        help = "Configuration file [default: weather-etl.toml if present]"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load the configured hourly window through per-key upserts
    Hourly {
        #[arg(long, help = "Load into an in-memory warehouse instead of PostgreSQL")]
        dry_run: bool,

        #[arg(long, value_enum, help = "Override the configured fact write policy")]
        fact_policy: Option<FactWritePolicy>,
    },

    /// Stage the daily forecast and rebuild the fact table from it
    Daily {
        #[arg(long, help = "Load into an in-memory warehouse instead of PostgreSQL")]
        dry_run: bool,
    },

    /// Print the effective configuration with passwords redacted
    ShowConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_hourly_with_policy() {
        let cli = Cli::parse_from([
            "weather-etl",
            "--verbose",
            "hourly",
            "--dry-run",
            "--fact-policy",
            "replace-by-key",
        ]);

        assert!(cli.verbose);
        match cli.command {
            Commands::Hourly {
                dry_run,
                fact_policy,
            } => {
                assert!(dry_run);
                assert_eq!(fact_policy, Some(FactWritePolicy::ReplaceByKey));
            }
            _ => panic!("expected hourly subcommand"),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::parse_from(["weather-etl", "daily", "--config", "etl.toml", "-q"]);

        assert!(cli.quiet);
        assert_eq!(cli.config, Some(PathBuf::from("etl.toml")));
        assert!(matches!(cli.command, Commands::Daily { dry_run: false }));
    }
}
