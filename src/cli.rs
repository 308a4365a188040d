//! CLI command definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Solver operator
#[derive(Parser, Debug)]
#[command(name = "solver-operator")]
#[command(version)]
#[command(about = "Reconciles Solver resources into dependency-resolution Jobs")]
pub struct Cli {
    /// Config file (TOML, or JSON if it ends in .json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of reconcile workers (overrides config and environment)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Commands {
    /// Run the controller until Ctrl+C (default)
    #[default]
    Run,

    /// Print the effective configuration as TOML and exit
    PrintConfig,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_run() {
        let cli = Cli::try_parse_from(["solver-operator"]).unwrap();
        assert_eq!(cli.command.unwrap_or_default(), Commands::Run);
        assert_eq!(cli.log_level, "info");
        assert!(cli.config.is_none());
        assert!(cli.workers.is_none());
    }

    #[test]
    fn test_parses_flags_and_subcommand() {
        let cli = Cli::try_parse_from([
            "solver-operator",
            "--config",
            "operator.toml",
            "--workers",
            "4",
            "--log-level",
            "debug",
            "print-config",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("operator.toml")));
        assert_eq!(cli.workers, Some(4));
        assert_eq!(cli.log_level, "debug");
        assert_eq!(cli.command, Some(Commands::PrintConfig));
    }

    #[test]
    fn test_rejects_non_numeric_workers() {
        assert!(Cli::try_parse_from(["solver-operator", "--workers", "many"]).is_err());
    }
}
