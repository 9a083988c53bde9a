use chrono::{DateTime, Days, NaiveDate};
use log::{debug, warn};
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;
use thiserror::Error;

pub const YAHOO_BASE_API_URL: &str = "https://query2.finance.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
/// Hands out the session cookie the crumb is bound to.
const COOKIE_URL: &str = "https://fc.yahoo.com";
const QUOTE_MODULES: [&str; 3] = ["price", "assetProfile", "financialData"];
const NOT_FOUND_CODE: &str = "Not Found";

/// Chart `meta` fields kept in the ticker info, renamed to the quote
/// summary names. Earlier entries win.
const META_FIELDS: [(&str, &str); 8] = [
    ("symbol", "symbol"),
    ("longName", "longName"),
    ("currency", "currency"),
    ("exchangeName", "exchange"),
    ("regularMarketPrice", "currentPrice"),
    ("regularMarketDayHigh", "regularMarketDayHigh"),
    ("regularMarketDayLow", "regularMarketDayLow"),
    ("chartPreviousClose", "regularMarketPreviousClose"),
];

/// Flat provider record keyed by the provider's own field names.
pub type RawRecord = Map<String, Value>;

#[derive(Debug, Error)]
pub enum YahooError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(String),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("symbol not found: {0}")]
    NotFound(String),
    #[error("provider error {code}: {description}")]
    Provider { code: String, description: String },
    #[error("unexpected response format: {0}")]
    Format(String),
}

#[derive(Debug, Deserialize)]
struct ErrorJSON {
    code: String,
    #[serde(default)]
    description: String,
}

/// `{"finance":{"error":{...}}}`, sent with 401/429 and friends.
#[derive(Debug, Deserialize)]
struct FinanceErrorJSON {
    finance: FinanceError,
}

#[derive(Debug, Deserialize)]
struct FinanceError {
    error: ErrorJSON,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryJSON {
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    result: Option<Vec<Map<String, Value>>>,
    error: Option<ErrorJSON>,
}

#[derive(Debug, Deserialize)]
struct ChartJSON {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartData>>,
    error: Option<ErrorJSON>,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    events: ChartEvents,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartEvents {
    #[serde(default)]
    dividends: HashMap<String, DividendEvent>,
}

#[derive(Debug, Deserialize)]
struct DividendEvent {
    amount: f64,
    date: i64,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

/// Blocking client for the Yahoo Finance chart and quote summary endpoints.
pub struct YahooAPI {
    base_url: String,
    client: Client,
    crumb: OnceLock<String>,
}

impl YahooAPI {
    pub fn new(base_url: &str) -> Result<Self, YahooError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()?;
        Ok(YahooAPI {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            crumb: OnceLock::new(),
        })
    }

    /// Descriptive and live market fields of a ticker. `None` when the
    /// provider does not know the symbol.
    ///
    /// Prices come from the chart endpoint, which needs no session. The
    /// quote summary only adds profile fields (industry, country, market
    /// cap) and is skipped with a warning when Yahoo refuses it.
    pub fn get_ticker_info(&self, ticker: &str) -> Result<Option<RawRecord>, YahooError> {
        let mut url = self.endpoint(&["v8", "finance", "chart", ticker])?;
        url.query_pairs_mut()
            .append_pair("range", "1d")
            .append_pair("interval", "1d");

        let json = self.get_json::<ChartJSON>(url)?;
        let mut record = match parse_chart_quote(ticker, json) {
            Ok(Some(record)) => record,
            Ok(None) | Err(YahooError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        match self.get_quote_summary(ticker) {
            Ok(Some(profile)) => {
                for (key, value) in profile {
                    record.entry(key).or_insert(value);
                }
            }
            Ok(None) => {}
            Err(e) => warn!(
                "get_ticker_info | {} | no quote summary, using chart data only: {}",
                ticker, e
            ),
        }
        Ok(Some(record))
    }

    /// Flattened quote summary modules of a ticker.
    pub fn get_quote_summary(&self, ticker: &str) -> Result<Option<RawRecord>, YahooError> {
        let crumb = self.crumb()?;
        let mut url = self.endpoint(&["v10", "finance", "quoteSummary", ticker])?;
        url.query_pairs_mut()
            .append_pair("modules", &QUOTE_MODULES.join(","))
            .append_pair("crumb", crumb);

        let json = self.get_json::<QuoteSummaryJSON>(url)?;
        match parse_quote_summary(ticker, json) {
            Err(YahooError::NotFound(_)) => Ok(None),
            other => other,
        }
    }

    /// Daily bars between `start` and `end`, both inclusive, by exchange date.
    pub fn get_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawRecord>, YahooError> {
        let (period1, period2) = history_window(start, end)?;
        let mut url = self.endpoint(&["v8", "finance", "chart", ticker])?;
        url.query_pairs_mut()
            .append_pair("period1", &period1.to_string())
            .append_pair("period2", &period2.to_string())
            .append_pair("interval", "1d")
            .append_pair("includePrePost", "false");

        let json = self.get_json::<ChartJSON>(url)?;
        Ok(bars_between(parse_history(ticker, json)?, start, end))
    }

    /// Complete dividend history, ex-dividend date to amount.
    pub fn get_dividends(&self, ticker: &str) -> Result<BTreeMap<NaiveDate, f64>, YahooError> {
        let mut url = self.endpoint(&["v8", "finance", "chart", ticker])?;
        url.query_pairs_mut()
            .append_pair("range", "max")
            .append_pair("interval", "1mo")
            .append_pair("events", "div");

        let json = self.get_json::<ChartJSON>(url)?;
        parse_dividends(ticker, json)
    }

    fn crumb(&self) -> Result<&str, YahooError> {
        if let Some(crumb) = self.crumb.get() {
            return Ok(crumb.as_str());
        }

        // answers 404, the cookie is all we want
        let response = self.client.get(COOKIE_URL).send()?;
        debug!("crumb | cookie status: {}", response.status());

        let url = self.endpoint(&["v1", "test", "getcrumb"])?;
        debug!("crumb | url: {}", url);
        let response = self.client.get(url.clone()).send()?;
        let status = response.status();
        let body = response.text()?;
        let crumb = parse_crumb(status, &url, &body)?;

        Ok(self.crumb.get_or_init(|| crumb).as_str())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, YahooError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| YahooError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| YahooError::Url(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, YahooError> {
        debug!("get_json | url: {}", url);

        let response = self.client.get(url.clone()).send()?;
        let status = response.status();
        let body = response.text()?;

        debug!("get_json | status: {} | {} bytes", status, body.len());
        decode_body(status, &url, &body)
    }
}

/// Unknown symbols come back as 404 with an envelope worth reading, so the
/// body is tried before the status.
fn decode_body<T: DeserializeOwned>(
    status: StatusCode,
    url: &Url,
    body: &str,
) -> Result<T, YahooError> {
    match serde_json::from_str::<T>(body) {
        Ok(parsed) => Ok(parsed),
        Err(_) if !status.is_success() => Err(refusal(status, url, body)),
        Err(e) => Err(finance_error(body).unwrap_or(YahooError::Format(e.to_string()))),
    }
}

fn parse_crumb(status: StatusCode, url: &Url, body: &str) -> Result<String, YahooError> {
    if !status.is_success() {
        return Err(refusal(status, url, body));
    }
    let crumb = body.trim();
    if crumb.is_empty() || crumb.starts_with('{') || crumb.contains(char::is_whitespace) {
        return Err(YahooError::Format(format!("unexpected crumb: {}", crumb)));
    }
    Ok(crumb.to_string())
}

/// Non-2xx answer: the provider's own reason when it sent one.
fn refusal(status: StatusCode, url: &Url, body: &str) -> YahooError {
    finance_error(body).unwrap_or(YahooError::Status {
        status: status.as_u16(),
        url: url.to_string(),
    })
}

fn finance_error(body: &str) -> Option<YahooError> {
    let envelope = serde_json::from_str::<FinanceErrorJSON>(body).ok()?;
    Some(YahooError::Provider {
        code: envelope.finance.error.code,
        description: envelope.finance.error.description,
    })
}

fn envelope_error(ticker: &str, error: ErrorJSON) -> YahooError {
    if error.code == NOT_FOUND_CODE {
        return YahooError::NotFound(ticker.to_string());
    }
    YahooError::Provider {
        code: error.code,
        description: error.description,
    }
}

fn parse_quote_summary(
    ticker: &str,
    json: QuoteSummaryJSON,
) -> Result<Option<RawRecord>, YahooError> {
    if let Some(error) = json.quote_summary.error {
        return Err(envelope_error(ticker, error));
    }

    let Some(modules) = json.quote_summary.result.and_then(|r| r.into_iter().next()) else {
        return Ok(None);
    };

    let mut record = RawRecord::new();
    for name in QUOTE_MODULES {
        let Some(Value::Object(fields)) = modules.get(name) else {
            continue;
        };
        for (key, value) in fields {
            if let Some(value) = unwrap_raw(value) {
                record.entry(key.clone()).or_insert(value);
            }
        }
    }

    if !record.contains_key("symbol") {
        return Ok(None);
    }
    Ok(Some(record))
}

/// Numbers arrive as `{"raw": 1.0, "fmt": "1.00"}`; an empty object means
/// the value is missing.
fn unwrap_raw(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(inner) if inner.contains_key("raw") => match &inner["raw"] {
            Value::Null => None,
            raw => Some(raw.clone()),
        },
        Value::Object(inner) if inner.is_empty() => None,
        other => Some(other.clone()),
    }
}

fn first_chart(ticker: &str, json: ChartJSON) -> Result<Option<ChartData>, YahooError> {
    if let Some(error) = json.chart.error {
        return Err(envelope_error(ticker, error));
    }
    Ok(json.chart.result.and_then(|r| r.into_iter().next()))
}

/// Ticker info from a one-day chart: the `meta` block plus the day's open.
fn parse_chart_quote(ticker: &str, json: ChartJSON) -> Result<Option<RawRecord>, YahooError> {
    let Some(data) = first_chart(ticker, json)? else {
        return Ok(None);
    };

    let mut record = RawRecord::new();
    for (source, target) in META_FIELDS {
        if let Some(value) = data.meta.fields.get(source).filter(|v| !v.is_null()) {
            record.entry(target).or_insert_with(|| value.clone());
        }
    }
    if let Some(previous) = data.meta.fields.get("previousClose").filter(|v| !v.is_null()) {
        record.entry("regularMarketPreviousClose").or_insert_with(|| previous.clone());
    }

    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
    if let Some(open) = quote.open.iter().rev().find_map(|open| *open) {
        record.insert("regularMarketOpen".to_string(), json!(open));
    }

    if !record.contains_key("symbol") {
        return Ok(None);
    }
    Ok(Some(record))
}

fn parse_history(ticker: &str, json: ChartJSON) -> Result<Vec<RawRecord>, YahooError> {
    let Some(data) = first_chart(ticker, json)? else {
        return Ok(vec![]);
    };
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();

    let mut bars = Vec::with_capacity(data.timestamp.len());
    for (i, &ts) in data.timestamp.iter().enumerate() {
        let columns = [
            ("Open", quote.open.get(i).copied().flatten()),
            ("High", quote.high.get(i).copied().flatten()),
            ("Low", quote.low.get(i).copied().flatten()),
            ("Close", quote.close.get(i).copied().flatten()),
        ];

        // non-trading days come back with every price null
        if columns.iter().all(|(_, price)| price.is_none()) {
            continue;
        }

        let date = exchange_date(ts, data.meta.gmtoffset)?;
        let mut bar = RawRecord::new();
        bar.insert("Date".to_string(), json!(date.format("%Y-%m-%d").to_string()));
        for (column, price) in columns {
            if let Some(price) = price {
                bar.insert(column.to_string(), json!(price));
            }
        }
        if let Some(volume) = quote.volume.get(i).copied().flatten() {
            bar.insert("Volume".to_string(), json!(volume));
        }
        bars.push(bar);
    }

    Ok(bars)
}

fn parse_dividends(ticker: &str, json: ChartJSON) -> Result<BTreeMap<NaiveDate, f64>, YahooError> {
    let Some(data) = first_chart(ticker, json)? else {
        return Ok(BTreeMap::new());
    };

    let mut dividends = BTreeMap::new();
    for event in data.events.dividends.into_values() {
        dividends.insert(exchange_date(event.date, data.meta.gmtoffset)?, event.amount);
    }
    Ok(dividends)
}

fn bars_between(bars: Vec<RawRecord>, start: NaiveDate, end: NaiveDate) -> Vec<RawRecord> {
    bars.into_iter()
        .filter(|bar| bar_date(bar).is_some_and(|date| date >= start && date <= end))
        .collect()
}

fn bar_date(bar: &RawRecord) -> Option<NaiveDate> {
    let date = bar.get("Date")?.as_str()?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

fn exchange_date(timestamp: i64, gmtoffset: i64) -> Result<NaiveDate, YahooError> {
    DateTime::from_timestamp(timestamp + gmtoffset, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| YahooError::Format(format!("invalid timestamp: {}", timestamp)))
}

/// `period1`/`period2` for a bar range. Bars are stamped with the session
/// open, which lies on the previous UTC day east of Greenwich, so the
/// window opens a day early and `bars_between` trims by exchange date.
fn history_window(start: NaiveDate, end: NaiveDate) -> Result<(i64, i64), YahooError> {
    let from = start
        .checked_sub_days(Days::new(1))
        .ok_or_else(|| YahooError::Format(format!("date out of range: {}", start)))?;
    Ok((day_start_timestamp(from), day_start_timestamp(next_day(end)?)))
}

fn day_start_timestamp(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
}

fn next_day(date: NaiveDate) -> Result<NaiveDate, YahooError> {
    date.checked_add_days(Days::new(1))
        .ok_or_else(|| YahooError::Format(format!("date out of range: {}", date)))
}
