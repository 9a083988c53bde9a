use crate::error::FeederError;
use chrono::NaiveDate;
use clap::ValueEnum;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FeedMode {
    /// Daily OHLC bars over a date range.
    #[value(name = "EQHIST")]
    HistoricalBars,
    /// Today's quote plus one tick observation.
    #[value(name = "EQMKT")]
    LiveMarket,
    /// Dividends paid during one year.
    #[value(name = "EQDVD")]
    Dividends,
}

impl fmt::Display for FeedMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FeedMode::HistoricalBars => write!(f, "EQHIST"),
            FeedMode::LiveMarket => write!(f, "EQMKT"),
            FeedMode::Dividends => write!(f, "EQDVD"),
        }
    }
}

/// Everything one invocation needs, after CLI defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    pub mode: FeedMode,
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub year: i32,
}

impl FeedRequest {
    pub fn new(
        mode: FeedMode,
        ticker: String,
        start: NaiveDate,
        end: NaiveDate,
        year: i32,
    ) -> Result<Self, FeederError> {
        if ticker.is_empty() {
            return Err(FeederError::Usage("--ticker must name a symbol".to_string()));
        }
        if start > end {
            return Err(FeederError::Usage(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        Ok(FeedRequest {
            mode,
            ticker,
            start,
            end,
            year,
        })
    }

    /// The store keeps the year as a four character string.
    pub fn year_label(&self) -> String {
        format!("{:04}", self.year)
    }
}
