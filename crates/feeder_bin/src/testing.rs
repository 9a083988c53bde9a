//! In-memory provider and store used by the unit tests.

use crate::error::FeederError;
use crate::mode::{FeedMode, FeedRequest};
use crate::source::MarketData;
use crate::store::RecordStore;
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use equity_model::{DividendRecord, EquitySnapshot, RecordId, Stored, TickObservation};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::BTreeMap;
use yahoo_api::RawRecord;

fn record(value: Value) -> RawRecord {
    match value {
        Value::Object(map) => map,
        _ => panic!("fixture must be an object"),
    }
}

pub fn msft_info() -> RawRecord {
    record(json!({
        "symbol": "MSFT",
        "longName": "Microsoft Corporation",
        "industry": "Software - Infrastructure",
        "country": "United States",
        "currency": "USD",
        "market": "us_market",
        "exchange": "NMS",
        "marketCap": 3088000000000i64,
        "regularMarketOpen": 411.27,
        "regularMarketDayHigh": 415.87,
        "regularMarketDayLow": 410.46,
        "regularMarketPreviousClose": 413.64,
        "currentPrice": 415.5
    }))
}

pub fn msft_bar() -> RawRecord {
    record(json!({
        "Date": "2024-03-04",
        "Open": 409.89,
        "High": 410.09,
        "Low": 402.33,
        "Close": 414.92,
        "Volume": 22580900
    }))
}

pub fn request(mode: FeedMode) -> FeedRequest {
    let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
    FeedRequest::new(mode, "MSFT".to_string(), day, day, 2023).unwrap()
}

pub fn now() -> DateTime<Local> {
    Utc.with_ymd_and_hms(2024, 3, 6, 15, 30, 0)
        .unwrap()
        .with_timezone(&Local)
}

pub fn tick(hour: u32, cents: i64) -> TickObservation {
    TickObservation {
        date_time: Utc.with_ymd_and_hms(2024, 3, 4, hour, 0, 0).unwrap(),
        price: Decimal::new(cents, 2),
    }
}

/// MSFT on 2024-03-04 with the given ticks.
pub fn snapshot(tickdata: Vec<TickObservation>) -> EquitySnapshot {
    EquitySnapshot {
        label: "MSFT".to_string(),
        description: Some("Microsoft Corporation".to_string()),
        industry: None,
        country: None,
        currency: Some("USD".to_string()),
        market: None,
        exchange: None,
        md_date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
        date_time: Utc.with_ymd_and_hms(2024, 3, 4, 21, 0, 0).unwrap(),
        p_open: Decimal::new(409_890_000, 6),
        p_high: Decimal::new(410_090_000, 6),
        p_low: Decimal::new(402_330_000, 6),
        p_close: Decimal::new(414_920_000, 6),
        p_market: None,
        market_cap: None,
        tickdata,
    }
}

#[derive(Default)]
pub struct FakeMarket {
    info: Option<RawRecord>,
    bars: Vec<RawRecord>,
    dividends: BTreeMap<NaiveDate, f64>,
}

impl FakeMarket {
    pub fn new() -> Self {
        FakeMarket::default()
    }

    pub fn with_info(mut self, info: RawRecord) -> Self {
        self.info = Some(info);
        self
    }

    pub fn with_bars(mut self, bars: Vec<RawRecord>) -> Self {
        self.bars = bars;
        self
    }

    pub fn with_dividends(mut self, dividends: BTreeMap<NaiveDate, f64>) -> Self {
        self.dividends = dividends;
        self
    }
}

impl MarketData for FakeMarket {
    fn ticker_info(&self, _ticker: &str) -> Result<Option<RawRecord>, FeederError> {
        Ok(self.info.clone())
    }

    fn historical_bars(
        &self,
        _ticker: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<RawRecord>, FeederError> {
        Ok(self.bars.clone())
    }

    fn dividends(&self, _ticker: &str) -> Result<BTreeMap<NaiveDate, f64>, FeederError> {
        Ok(self.dividends.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FindEquities(String, Option<NaiveDate>),
    FindDividends(RecordId, String),
    CreateEquity(EquitySnapshot),
    UpdateEquity(RecordId, EquitySnapshot),
    CreateDividends(DividendRecord),
    UpdateDividends(RecordId, DividendRecord),
}

impl Call {
    pub fn is_write(&self) -> bool {
        !matches!(self, Call::FindEquities(..) | Call::FindDividends(..))
    }
}

/// Records every call; writes answer `write_status`, or fail like a
/// non-2xx response when it is not a success code. An `unfiltered` store
/// ignores the query parameters and lists everything, like a backend
/// without filter support.
pub struct FakeStore {
    equities: Vec<Stored<EquitySnapshot>>,
    dividends: Vec<Stored<DividendRecord>>,
    write_status: u16,
    filtered: bool,
    calls: RefCell<Vec<Call>>,
}

impl FakeStore {
    pub fn new() -> Self {
        FakeStore {
            equities: vec![],
            dividends: vec![],
            write_status: 201,
            filtered: true,
            calls: RefCell::new(vec![]),
        }
    }

    pub fn with_equity(mut self, id: RecordId, record: EquitySnapshot) -> Self {
        self.equities.push(Stored { id, record });
        self
    }

    pub fn with_dividends(mut self, id: RecordId, record: DividendRecord) -> Self {
        self.dividends.push(Stored { id, record });
        self
    }

    pub fn unfiltered(mut self) -> Self {
        self.filtered = false;
        self
    }

    pub fn with_write_status(mut self, status: u16) -> Self {
        self.write_status = status;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    fn write(&self, call: Call) -> Result<u16, FeederError> {
        self.calls.borrow_mut().push(call);
        if (200..300).contains(&self.write_status) {
            Ok(self.write_status)
        } else {
            Err(FeederError::Transport(format!("HTTP {}", self.write_status)))
        }
    }
}

impl RecordStore for FakeStore {
    fn find_equities(
        &self,
        label: &str,
        md_date: Option<NaiveDate>,
    ) -> Result<Vec<Stored<EquitySnapshot>>, FeederError> {
        self.calls
            .borrow_mut()
            .push(Call::FindEquities(label.to_string(), md_date));
        Ok(self
            .equities
            .iter()
            .filter(|e| !self.filtered || e.record.label == label)
            .filter(|e| !self.filtered || md_date.is_none_or(|d| e.record.md_date == d))
            .cloned()
            .collect())
    }

    fn find_dividends(
        &self,
        equity: RecordId,
        year: &str,
    ) -> Result<Vec<Stored<DividendRecord>>, FeederError> {
        self.calls
            .borrow_mut()
            .push(Call::FindDividends(equity, year.to_string()));
        Ok(self
            .dividends
            .iter()
            .filter(|d| !self.filtered || (d.record.equity == equity && d.record.year == year))
            .cloned()
            .collect())
    }

    fn create_equity(&self, snapshot: &EquitySnapshot) -> Result<u16, FeederError> {
        self.write(Call::CreateEquity(snapshot.clone()))
    }

    fn update_equity(&self, id: RecordId, snapshot: &EquitySnapshot) -> Result<u16, FeederError> {
        self.write(Call::UpdateEquity(id, snapshot.clone()))
    }

    fn create_dividends(&self, record: &DividendRecord) -> Result<u16, FeederError> {
        self.write(Call::CreateDividends(record.clone()))
    }

    fn update_dividends(&self, id: RecordId, record: &DividendRecord) -> Result<u16, FeederError> {
        self.write(Call::UpdateDividends(id, record.clone()))
    }
}
