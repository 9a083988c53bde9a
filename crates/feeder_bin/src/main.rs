use backend_api::BackendAPI;
use chrono::{Datelike, Local, NaiveDate};
use clap::Parser;
use log::{error, info};
use std::process::exit;
use yahoo_api::YahooAPI;

use config::Config;
use error::FeederError;
use feeder::Feeder;
use mode::{FeedMode, FeedRequest};

mod config;
mod error;
mod feeder;
mod mapping;
mod mode;
mod payload;
mod reconcile;
mod source;
mod store;
#[cfg(test)]
mod testing;
mod utils;

/// Equity feeder for the equities/dividends backend.
#[derive(Debug, Parser)]
#[command(name = "equity_feeder", version)]
struct Cli {
    /// What to import.
    #[arg(long = "type", value_enum)]
    mode: FeedMode,

    /// Ticker symbol, e.g. MSFT.
    #[arg(long)]
    ticker: String,

    /// First day of the bar range (YYYY-MM-DD). Defaults to the previous business day.
    #[arg(long = "sdate", visible_alias = "start", value_parser = parse_date)]
    start: Option<NaiveDate>,

    /// Last day of the bar range (YYYY-MM-DD). Defaults to the previous business day.
    #[arg(long = "edate", visible_alias = "end", value_parser = parse_date)]
    end: Option<NaiveDate>,

    /// Year of the ex-dividend dates to import. Defaults to the current year.
    #[arg(
        long = "exdivyear",
        visible_alias = "year",
        value_parser = clap::value_parser!(i32).range(1000..=9999)
    )]
    year: Option<i32>,

    /// Look up and reconcile, but do not write to the backend.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD, got {}: {}", value, e))
}

impl Cli {
    fn into_request(self, today: NaiveDate) -> Result<FeedRequest, FeederError> {
        let default_day = utils::previous_business_day(today);
        FeedRequest::new(
            self.mode,
            utils::sanitize_ticker(&self.ticker),
            self.start.unwrap_or(default_day),
            self.end.unwrap_or(default_day),
            self.year.unwrap_or(today.year()),
        )
    }
}

fn run(cli: Cli) -> Result<(), FeederError> {
    let now = Local::now();
    let dry_run = cli.dry_run;
    let request = cli.into_request(now.date_naive())?;

    let config = Config::new()?;
    info!(
        "run | backend: {} | provider: {}",
        config.backend.base, config.provider_url
    );

    let market = YahooAPI::new(&config.provider_url)?;
    let store = BackendAPI::new(config.backend)?;

    let outcome = Feeder::new(&market, &store)
        .dry_run(dry_run)
        .run(&request, now)?;

    match outcome.status {
        Some(status) => info!("done | {} | HTTP {}", outcome.action, status),
        None => info!("done | {} | nothing written", outcome.action),
    }
    Ok(())
}

fn main() {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            exit(FeederError::Usage(e.kind().to_string()).exit_code());
        }
    };

    if let Err(e) = run(cli) {
        error!("{}", e);
        exit(e.exit_code());
    }
}
