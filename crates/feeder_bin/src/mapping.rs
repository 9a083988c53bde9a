//! Declarative provider-to-store field tables and the one builder that
//! applies them.
//!
//! Each feed mode lists which provider fields become which store fields and
//! how the value is normalised on the way. The payload code never names a
//! provider field directly.

use crate::error::FeederError;
use chrono::NaiveDate;
use equity_model::price_from_f64;
use serde_json::{Map, Value};
use yahoo_api::RawRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Decimal with six fractional digits, carried as a string.
    Price,
    /// Whole number; fractional provider values are truncated.
    Count,
    /// `YYYY-MM-DD`, taken from the first ten characters of the value.
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub source: &'static str,
    pub target: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn required(source: &'static str, target: &'static str, kind: FieldKind) -> FieldMapping {
    FieldMapping {
        source,
        target,
        kind,
        required: true,
    }
}

const fn optional(source: &'static str, target: &'static str, kind: FieldKind) -> FieldMapping {
    FieldMapping {
        source,
        target,
        kind,
        required: false,
    }
}

/// Ticker info fields shared by both equity modes.
pub const DESCRIPTIVE_FIELDS: &[FieldMapping] = &[
    required("symbol", "label", FieldKind::Text),
    optional("longName", "description", FieldKind::Text),
    optional("industry", "industry", FieldKind::Text),
    optional("country", "country", FieldKind::Text),
    optional("currency", "currency", FieldKind::Text),
    optional("market", "market", FieldKind::Text),
    optional("exchange", "exchange", FieldKind::Text),
    optional("marketCap", "market_cap", FieldKind::Count),
];

/// One daily bar.
pub const HISTORICAL_BAR_FIELDS: &[FieldMapping] = &[
    required("Date", "md_date", FieldKind::Date),
    required("Open", "p_open", FieldKind::Price),
    required("High", "p_high", FieldKind::Price),
    required("Low", "p_low", FieldKind::Price),
    required("Close", "p_close", FieldKind::Price),
];

/// Live quote fields of the ticker info.
pub const LIVE_MARKET_FIELDS: &[FieldMapping] = &[
    required("regularMarketOpen", "p_open", FieldKind::Price),
    required("regularMarketDayHigh", "p_high", FieldKind::Price),
    required("regularMarketDayLow", "p_low", FieldKind::Price),
    required("regularMarketPreviousClose", "p_close", FieldKind::Price),
    required("currentPrice", "p_market", FieldKind::Price),
];

/// Copies every field of `table` found in `source` into `target`,
/// normalised to its kind. A missing required field means the provider has
/// no usable data for the ticker.
pub fn apply(
    table: &[FieldMapping],
    source: &RawRecord,
    target: &mut Map<String, Value>,
) -> Result<(), FeederError> {
    for field in table {
        let value = match source.get(field.source) {
            None | Some(Value::Null) => None,
            Some(value) => convert(field, value)?,
        };

        match value {
            Some(value) => {
                target.insert(field.target.to_string(), value);
            }
            None if field.required => {
                return Err(FeederError::NoDataAvailable(format!(
                    "provider sent no {}",
                    field.source
                )));
            }
            None => {}
        }
    }
    Ok(())
}

fn convert(field: &FieldMapping, value: &Value) -> Result<Option<Value>, FeederError> {
    let converted = match field.kind {
        FieldKind::Text => value
            .as_str()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(|text| Value::String(text.to_string())),
        FieldKind::Price => value
            .as_f64()
            .and_then(price_from_f64)
            .map(|price| Value::String(price.to_string())),
        FieldKind::Count => match value.as_i64() {
            Some(count) => Some(Value::from(count)),
            None => value
                .as_f64()
                .filter(|count| count.is_finite())
                .map(|count| Value::from(count.trunc() as i64)),
        },
        FieldKind::Date => match value.as_str() {
            Some(text) => Some(Value::String(parse_date(field, text)?.to_string())),
            None => None,
        },
    };

    match converted {
        Some(converted) => Ok(Some(converted)),
        // blank text counts as absent
        None if field.kind == FieldKind::Text && value.is_string() => Ok(None),
        None => Err(type_error(field, value)),
    }
}

fn parse_date(field: &FieldMapping, text: &str) -> Result<NaiveDate, FeederError> {
    let day = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| {
        FeederError::Payload(format!("{} is not a date ({}): {}", field.source, text, e))
    })
}

fn type_error(field: &FieldMapping, value: &Value) -> FeederError {
    FeederError::Payload(format!(
        "{} has unexpected value {} for {:?} field {}",
        field.source, value, field.kind, field.target
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn historical_bar_prices_have_six_digits() {
        let bar = record(json!({
            "Date": "2024-03-04 00:00:00-05:00",
            "Open": 409.89,
            "High": 410.0900012,
            "Low": 402.33,
            "Close": 414.92,
            "Volume": 22580900
        }));
        let mut target = Map::new();
        apply(HISTORICAL_BAR_FIELDS, &bar, &mut target).unwrap();

        assert_eq!(target["md_date"], "2024-03-04");
        assert_eq!(target["p_open"], "409.890000");
        assert_eq!(target["p_high"], "410.090001");
        assert!(!target.contains_key("Volume"));
        for key in ["p_open", "p_high", "p_low", "p_close"] {
            let text = target[key].as_str().unwrap();
            let (_, fraction) = text.split_once('.').unwrap();
            assert_eq!(fraction.len(), 6, "{} = {}", key, text);
        }
    }

    #[test]
    fn missing_required_field_is_no_data() {
        let bar = record(json!({"Date": "2024-03-04", "Open": 1.0, "High": 1.0, "Low": 1.0}));
        let mut target = Map::new();
        let result = apply(HISTORICAL_BAR_FIELDS, &bar, &mut target);
        assert!(matches!(result, Err(FeederError::NoDataAvailable(ref m)) if m.contains("Close")));
    }

    #[test]
    fn null_required_field_is_no_data() {
        let info = record(json!({"symbol": null}));
        let mut target = Map::new();
        let result = apply(DESCRIPTIVE_FIELDS, &info, &mut target);
        assert!(matches!(result, Err(FeederError::NoDataAvailable(_))));
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let info = record(json!({"symbol": "MSFT", "longName": "Microsoft Corporation"}));
        let mut target = Map::new();
        apply(DESCRIPTIVE_FIELDS, &info, &mut target).unwrap();
        assert_eq!(target["label"], "MSFT");
        assert_eq!(target["description"], "Microsoft Corporation");
        assert!(!target.contains_key("industry"));
        assert!(!target.contains_key("market_cap"));
    }

    #[test]
    fn market_cap_is_truncated_to_integer() {
        let info = record(json!({"symbol": "MSFT", "marketCap": 3088000000000.7}));
        let mut target = Map::new();
        apply(DESCRIPTIVE_FIELDS, &info, &mut target).unwrap();
        assert_eq!(target["market_cap"], 3088000000000i64);
    }

    #[test]
    fn text_field_with_number_is_payload_error() {
        let info = record(json!({"symbol": 42}));
        let mut target = Map::new();
        let result = apply(DESCRIPTIVE_FIELDS, &info, &mut target);
        assert!(matches!(result, Err(FeederError::Payload(_))));
    }

    #[test]
    fn price_field_with_text_is_payload_error() {
        let info = record(json!({
            "regularMarketOpen": "n/a",
            "regularMarketDayHigh": 1.0,
            "regularMarketDayLow": 1.0,
            "regularMarketPreviousClose": 1.0,
            "currentPrice": 1.0
        }));
        let mut target = Map::new();
        let result = apply(LIVE_MARKET_FIELDS, &info, &mut target);
        assert!(matches!(result, Err(FeederError::Payload(_))));
    }

    #[test]
    fn bad_date_is_payload_error() {
        let bar = record(json!({
            "Date": "04/03/2024",
            "Open": 1.0,
            "High": 1.0,
            "Low": 1.0,
            "Close": 1.0
        }));
        let mut target = Map::new();
        let result = apply(HISTORICAL_BAR_FIELDS, &bar, &mut target);
        assert!(matches!(result, Err(FeederError::Payload(_))));
    }

    #[test]
    fn tables_have_unique_targets() {
        for table in [DESCRIPTIVE_FIELDS, HISTORICAL_BAR_FIELDS, LIVE_MARKET_FIELDS] {
            let mut targets: Vec<_> = table.iter().map(|f| f.target).collect();
            targets.sort();
            targets.dedup();
            assert_eq!(targets.len(), table.len());
        }
    }
}
