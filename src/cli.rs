use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "spoolbox")]
#[command(about = "Fiber spool consumption ledger", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $SPOOLBOX_CONFIG or config/spoolbox.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API
    Server(ServerArgs),
    /// Load spools, audits and closures from a JSON dataset into the store
    Import(ImportArgs),
    /// Print the remaining length of one or more spools
    Remaining(RemainingArgs),
    /// Print per-spool usage for one local day
    DailyReport(DailyReportArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to (overrides server.bind_addr)
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Dataset file
    pub file: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct RemainingArgs {
    #[arg(required = true)]
    pub serials: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct DailyReportArgs {
    /// Local calendar day, YYYY-MM-DD
    #[arg(long)]
    pub date: NaiveDate,
    /// Only closures recorded by this crew
    #[arg(long)]
    pub team: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_remaining_with_config() {
        let cli = Cli::parse_from([
            "spoolbox",
            "remaining",
            "CAR-001",
            "CAR-002",
            "--config",
            "/etc/spoolbox.toml",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/spoolbox.toml")));
        match cli.command {
            Commands::Remaining(args) => assert_eq!(args.serials, vec!["CAR-001", "CAR-002"]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_daily_report() {
        let cli = Cli::parse_from(["spoolbox", "daily-report", "--date", "2026-01-06"]);
        match cli.command {
            Commands::DailyReport(args) => {
                assert_eq!(args.date, NaiveDate::from_ymd_opt(2026, 1, 6).unwrap());
                assert!(args.team.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_remaining_requires_serial() {
        assert!(Cli::try_parse_from(["spoolbox", "remaining"]).is_err());
    }
}
