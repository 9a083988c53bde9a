use crate::error::FeederError;
use crate::mode::{FeedMode, FeedRequest};
use chrono::NaiveDate;
use log::info;
use std::collections::BTreeMap;
use yahoo_api::{RawRecord, YahooAPI};

/// External market-data provider as the feeder sees it.
pub trait MarketData {
    fn ticker_info(&self, ticker: &str) -> Result<Option<RawRecord>, FeederError>;

    fn historical_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawRecord>, FeederError>;

    fn dividends(&self, ticker: &str) -> Result<BTreeMap<NaiveDate, f64>, FeederError>;
}

impl MarketData for YahooAPI {
    fn ticker_info(&self, ticker: &str) -> Result<Option<RawRecord>, FeederError> {
        Ok(self.get_ticker_info(ticker)?)
    }

    fn historical_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawRecord>, FeederError> {
        Ok(self.get_history(ticker, start, end)?)
    }

    fn dividends(&self, ticker: &str) -> Result<BTreeMap<NaiveDate, f64>, FeederError> {
        Ok(self.get_dividends(ticker)?)
    }
}

/// Provider data for one invocation, before any reshaping.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    HistoricalBars { info: RawRecord, bars: Vec<RawRecord> },
    LiveMarket { info: RawRecord },
    Dividends { series: BTreeMap<NaiveDate, f64> },
}

pub fn fetch(market: &impl MarketData, request: &FeedRequest) -> Result<RawPayload, FeederError> {
    let ticker = request.ticker.as_str();

    match request.mode {
        FeedMode::HistoricalBars => {
            info!(
                "fetch | {} | bars from {} to {}",
                ticker, request.start, request.end
            );
            let bars = market.historical_bars(ticker, request.start, request.end)?;
            if bars.is_empty() {
                return Err(FeederError::NoDataAvailable(format!(
                    "no historical data for {} between {} and {}",
                    ticker, request.start, request.end
                )));
            }
            let info = require_info(market, ticker)?;
            Ok(RawPayload::HistoricalBars { info, bars })
        }
        FeedMode::LiveMarket => {
            info!("fetch | {} | live quote", ticker);
            let info = require_info(market, ticker)?;
            Ok(RawPayload::LiveMarket { info })
        }
        FeedMode::Dividends => {
            info!("fetch | {} | dividend history", ticker);
            let series = market.dividends(ticker)?;
            if series.is_empty() {
                return Err(FeederError::NoDataAvailable(format!(
                    "no dividends for {}",
                    ticker
                )));
            }
            Ok(RawPayload::Dividends { series })
        }
    }
}

fn require_info(market: &impl MarketData, ticker: &str) -> Result<RawRecord, FeederError> {
    market
        .ticker_info(ticker)?
        .ok_or_else(|| FeederError::NoDataAvailable(format!("no data found for symbol {}", ticker)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeMarket, msft_bar, msft_info, request};

    #[test]
    fn fetch_historical_bars() {
        let market = FakeMarket::new().with_info(msft_info()).with_bars(vec![msft_bar()]);
        let raw = fetch(&market, &request(FeedMode::HistoricalBars)).unwrap();
        assert!(matches!(raw, RawPayload::HistoricalBars { ref bars, .. } if bars.len() == 1));
    }

    #[test]
    fn fetch_historical_without_bars_is_no_data() {
        let market = FakeMarket::new().with_info(msft_info());
        let result = fetch(&market, &request(FeedMode::HistoricalBars));
        assert!(matches!(result, Err(FeederError::NoDataAvailable(_))));
    }

    #[test]
    fn fetch_live_without_info_is_no_data() {
        let market = FakeMarket::new();
        let result = fetch(&market, &request(FeedMode::LiveMarket));
        assert!(matches!(result, Err(FeederError::NoDataAvailable(_))));
    }

    #[test]
    fn fetch_without_dividends_is_no_data() {
        let market = FakeMarket::new().with_info(msft_info());
        let result = fetch(&market, &request(FeedMode::Dividends));
        assert!(matches!(result, Err(FeederError::NoDataAvailable(_))));
    }
}
