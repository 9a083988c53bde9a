use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};

/// Surrogate identifier assigned by the backend store.
pub type RecordId = i64;

/// Fractional digits of the store's price columns.
pub const PRICE_SCALE: u32 = 6;
/// Fractional digits of the store's dividend amount column.
pub const DIVIDEND_SCALE: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickObservation {
    pub date_time: DateTime<Utc>,
    pub price: Decimal,
}

/// One trading day of an equity, keyed by (`label`, `md_date`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquitySnapshot {
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default)]
    pub exchange: Option<String>,
    pub md_date: NaiveDate,
    pub date_time: DateTime<Utc>,
    pub p_open: Decimal,
    pub p_high: Decimal,
    pub p_low: Decimal,
    pub p_close: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_market: Option<Decimal>,
    #[serde(default)]
    pub market_cap: Option<i64>,
    #[serde(default)]
    pub tickdata: Vec<TickObservation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendEntry {
    pub ex_div_date: NaiveDate,
    pub dividend: Decimal,
}

/// Dividends of one equity for one calendar year, keyed by (`equity`, `year`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendRecord {
    pub year: String,
    pub equity: RecordId,
    #[serde(default)]
    pub dividends: Vec<DividendEntry>,
}

/// A record as the backend returns it: the record itself plus its `id`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Stored<T> {
    pub id: RecordId,
    #[serde(flatten)]
    pub record: T,
}

/// Converts a provider price into a decimal with exactly [`PRICE_SCALE`]
/// fractional digits. `None` for NaN, infinities and values too large to
/// keep that many digits.
pub fn price_from_f64(value: f64) -> Option<Decimal> {
    fixed_scale(value, PRICE_SCALE)
}

/// Converts a provider dividend amount into a decimal the store accepts.
pub fn dividend_from_f64(value: f64) -> Option<Decimal> {
    fixed_scale(value, DIVIDEND_SCALE).map(|d| d.normalize())
}

fn fixed_scale(value: f64, scale: u32) -> Option<Decimal> {
    let mut decimal = Decimal::from_f64(value)?.round_dp(scale);
    decimal.rescale(scale);
    (decimal.scale() == scale).then_some(decimal)
}
