//! CLI argument definitions for `breadth`.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `run` | Fetch prices, compute breadth, persist the snapshot |
//! | `sectors` | Print the configured sector universe |
//! | `history` | Read saved runs and their series |
//! | `sql` | Read-only SQL against the local DuckDB warehouse |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--config` | none | JSON config file |
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings as errors (exit code 5) |
//! | `--log-level` | `info` | Log filter when `RUST_LOG` is unset |
//! | `--log-json` | `false` | JSON log lines on stderr |
//!
//! # Examples
//!
//! ```bash
//! breadth run --pretty
//! breadth run --fixture prices.json --sector XLK --sector XLF --no-persist
//! breadth history --limit 5
//! breadth sql "SELECT * FROM vw_market_extremes ORDER BY date DESC"
//! ```

use std::path::PathBuf;

use breadth_core::MissingPolicy;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Sector market breadth: how many stocks close above their 20-day average.
#[derive(Debug, Parser)]
#[command(
    name = "breadth",
    author,
    version,
    about = "Sector market breadth from daily closes",
    long_about = "Computes, per sector, the share of constituents closing above their 20-day \
moving average and sums the sectors into one market breadth series.\n\
\n\
Use 'breadth <command> --help' for command-specific help."
)]
pub struct Cli {
    /// JSON configuration file; environment variables and flags override it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings and errors as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[arg(long, global = true, default_value_t = false)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Key/value summary for terminals.
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Missing members count as below their average.
    Zero,
    /// Missing members leave the denominator.
    Exclude,
}

impl From<PolicyArg> for MissingPolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Zero => Self::TreatAsZero,
            PolicyArg::Exclude => Self::Exclude,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch daily closes and compute sector and market breadth.
    ///
    /// # Examples
    ///
    ///   breadth run
    ///   breadth run --fixture prices.json --no-persist
    ///   breadth run --sector XLK --policy exclude --timezone America/New_York
    Run(RunArgs),

    /// Print the configured sector universe.
    Sectors,

    /// Read saved runs from the warehouse.
    ///
    /// # Examples
    ///
    ///   breadth history
    ///   breadth history --run-id 0b6f... --with-sectors
    History(HistoryArgs),

    /// Run a read-only SQL query against the warehouse.
    ///
    /// Only single SELECT/WITH/EXPLAIN/SHOW/DESCRIBE statements are accepted.
    Sql(SqlArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Read prices from a JSON fixture instead of the Schwab API.
    #[arg(long)]
    pub fixture: Option<PathBuf>,

    /// Restrict the run to these sectors (repeatable).
    #[arg(long = "sector", value_name = "ID")]
    pub sectors: Vec<String>,

    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,

    /// IANA time zone for the date axis.
    #[arg(long)]
    pub timezone: Option<String>,

    #[arg(long)]
    pub max_concurrency: Option<usize>,

    #[arg(long)]
    pub ma_window: Option<usize>,

    /// Schwab bearer token; defaults to `SCHWAB_ACCESS_TOKEN`.
    #[arg(long)]
    pub access_token: Option<String>,

    /// Also write the full report as pretty JSON to this file.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Skip saving the snapshot to the warehouse.
    #[arg(long, default_value_t = false)]
    pub no_persist: bool,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Run to load; defaults to the latest run.
    #[arg(long)]
    pub run_id: Option<String>,

    /// Number of recent runs to list.
    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    /// Include the sector matrix of the selected run.
    #[arg(long, default_value_t = false)]
    pub with_sectors: bool,
}

#[derive(Debug, Args)]
pub struct SqlArgs {
    pub query: String,

    #[arg(long, default_value_t = 10_000)]
    pub max_rows: usize,

    #[arg(long, default_value_t = 5_000)]
    pub query_timeout_ms: u64,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_repeated_sectors() {
        let cli = Cli::try_parse_from([
            "breadth",
            "--format",
            "table",
            "run",
            "--sector",
            "XLK",
            "--sector",
            "xlf",
            "--policy",
            "exclude",
            "--no-persist",
        ])
        .expect("valid arguments");

        assert_eq!(cli.format, OutputFormat::Table);
        let Command::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.sectors, vec!["XLK", "xlf"]);
        assert_eq!(args.policy.map(MissingPolicy::from), Some(MissingPolicy::Exclude));
        assert!(args.no_persist);
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["breadth", "sql", "SELECT 1", "--pretty", "--strict"])
            .expect("valid arguments");
        assert!(cli.pretty);
        assert!(cli.strict);
        assert_eq!(cli.log_level, "info");
    }
}
