mod cli;

use clap::Parser;
use cli::{Cli, Commands, DailyReportArgs, ImportArgs, RemainingArgs};
use serde::Serialize;
use tracing::info;

use spoolbox::config::Config;
use spoolbox::ledger::{ReportWindow, SpoolLedger};
use spoolbox::observability::init_tracing;
use spoolbox::store::{Dataset, FjallStore};

type AnyError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    let cli = Cli::parse();

    let config = Config::load_or_default_path(cli.config)?;
    init_tracing(&config.telemetry);

    match cli.command {
        Commands::Server(args) => spoolbox::api::run(config, args.address).await?,
        Commands::Import(args) => import(&config, args)?,
        Commands::Remaining(args) => remaining(&config, args).await?,
        Commands::DailyReport(args) => daily_report(&config, args).await?,
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AnyError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn import(config: &Config, args: ImportArgs) -> Result<(), AnyError> {
    let dataset = Dataset::from_path(&args.file)?;
    let store = FjallStore::open(&config.store.fjall_path)?;
    let stats = store.import(&dataset)?;
    info!(file = %args.file.display(), ?stats, "Import finished");
    print_json(&stats)
}

async fn remaining(config: &Config, args: RemainingArgs) -> Result<(), AnyError> {
    let ledger = SpoolLedger::new(FjallStore::open(&config.store.fjall_path)?);
    let outcomes = ledger.batch_remaining(&args.serials).await?;
    print_json(&outcomes)
}

async fn daily_report(config: &Config, args: DailyReportArgs) -> Result<(), AnyError> {
    let window = ReportWindow::for_day(args.date, config.report.utc_offset_minutes)
        .ok_or_else(|| format!("date {} cannot be reported", args.date))?;
    let ledger = SpoolLedger::new(FjallStore::open(&config.store.fjall_path)?);
    let report = ledger.daily_report(window, args.team.as_deref()).await?;
    print_json(&report)
}
