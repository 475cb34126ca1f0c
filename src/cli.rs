//! CLI argument parsing for perfdigest

use crate::timeline::ConflictPolicy;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for digests
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One HTML report per test in the output directory (default)
    Html,
    /// Human-readable intervals on stdout
    Text,
    /// JSON document on stdout
    Json,
}

/// Handling of conflicting deltas for one platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// The later notification wins
    LastWriteWins,
    /// The later notification is skipped
    Reject,
}

impl From<PolicyArg> for ConflictPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::LastWriteWins => ConflictPolicy::LastWriteWins,
            PolicyArg::Reject => ConflictPolicy::Reject,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "perfdigest")]
#[command(version)]
#[command(about = "Summarize performance-regression notifications per test", long_about = None)]
pub struct Cli {
    /// mbox file holding the notification e-mails
    #[arg(value_name = "MBOX")]
    pub mbox: PathBuf,

    /// Send dates to digest, as DD/MM/YYYY-DD/MM/YYYY
    #[arg(value_name = "DATE_RANGE")]
    pub date_range: String,

    /// Configuration file (TOML); built-in defaults when omitted
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Test to digest (repeatable); all configured tests when omitted
    #[arg(short, long = "test", value_name = "NAME")]
    pub tests: Vec<String>,

    /// Directory receiving the HTML reports
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Push-log lookup cache
    #[arg(long, value_name = "FILE", default_value = "pushlog-cache.json")]
    pub cache: PathBuf,

    /// Resolve changeset ranges from the cache only
    #[arg(long)]
    pub offline: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "html")]
    pub format: OutputFormat,

    /// Override the configured conflict policy
    #[arg(long, value_enum, value_name = "POLICY")]
    pub conflict_policy: Option<PolicyArg>,

    /// Enable debug tracing output to stderr
    #[arg(long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_positional_arguments() {
        let cli = Cli::parse_from(["perfdigest", "notifications.mbox", "01/03/2012-07/03/2012"]);
        assert_eq!(cli.mbox, PathBuf::from("notifications.mbox"));
        assert_eq!(cli.date_range, "01/03/2012-07/03/2012");
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["perfdigest", "a.mbox", "01/03/2012-07/03/2012"]);
        assert_eq!(cli.format, OutputFormat::Html);
        assert_eq!(cli.output_dir, PathBuf::from("."));
        assert_eq!(cli.cache, PathBuf::from("pushlog-cache.json"));
        assert!(cli.tests.is_empty());
        assert!(cli.config.is_none());
        assert!(cli.conflict_policy.is_none());
        assert!(!cli.offline);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_repeated_tests() {
        let cli = Cli::parse_from([
            "perfdigest",
            "a.mbox",
            "01/03/2012-07/03/2012",
            "--test",
            "Ts, Paint",
            "-t",
            "V8",
        ]);
        assert_eq!(cli.tests, vec!["Ts, Paint", "V8"]);
    }

    #[test]
    fn test_cli_format_and_policy() {
        let cli = Cli::parse_from([
            "perfdigest",
            "a.mbox",
            "01/03/2012-07/03/2012",
            "--format",
            "json",
            "--conflict-policy",
            "reject",
            "--offline",
        ]);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.conflict_policy, Some(PolicyArg::Reject));
        assert!(cli.offline);
        assert_eq!(
            ConflictPolicy::from(PolicyArg::LastWriteWins),
            ConflictPolicy::LastWriteWins
        );
    }

    #[test]
    fn test_cli_requires_date_range() {
        assert!(Cli::try_parse_from(["perfdigest", "a.mbox"]).is_err());
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(
            Cli::try_parse_from(["perfdigest", "a.mbox", "range", "--format", "csv"]).is_err()
        );
    }
}
