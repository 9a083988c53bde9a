use crate::error::FeederError;
use crate::mapping::{
    self, DESCRIPTIVE_FIELDS, FieldMapping, HISTORICAL_BAR_FIELDS, LIVE_MARKET_FIELDS,
};
use crate::mode::FeedRequest;
use crate::source::RawPayload;
use chrono::{DateTime, Datelike, Local, NaiveDate, SecondsFormat, SubsecRound, Utc};
use equity_model::{
    DividendEntry, DividendRecord, EquitySnapshot, RecordId, TickObservation, dividend_from_f64,
};
use log::{info, warn};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use yahoo_api::RawRecord;

/// Dividends of the requested year, not yet tied to a stored equity.
#[derive(Debug, Clone, PartialEq)]
pub struct DividendSeries {
    pub year: String,
    pub dividends: Vec<DividendEntry>,
}

impl DividendSeries {
    pub fn into_record(self, equity: RecordId) -> DividendRecord {
        DividendRecord {
            year: self.year,
            equity,
            dividends: self.dividends,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedPayload {
    Equity(EquitySnapshot),
    Dividends(DividendSeries),
}

pub fn build_payload(
    request: &FeedRequest,
    raw: RawPayload,
    now: DateTime<Local>,
) -> Result<NormalizedPayload, FeederError> {
    // the store keeps microseconds
    let date_time = now.with_timezone(&Utc).trunc_subsecs(6);

    match raw {
        RawPayload::HistoricalBars { info, bars } => {
            let Some(first) = bars.first() else {
                return Err(FeederError::NoDataAvailable(format!(
                    "no historical bars for {}",
                    request.ticker
                )));
            };
            if bars.len() > 1 {
                info!(
                    "build | {} bars received, importing the first one only",
                    bars.len()
                );
            }

            let snapshot = build_equity(
                &[(DESCRIPTIVE_FIELDS, &info), (HISTORICAL_BAR_FIELDS, first)],
                base_fields(date_time),
            )?;
            Ok(NormalizedPayload::Equity(snapshot))
        }
        RawPayload::LiveMarket { info } => {
            let mut fields = base_fields(date_time);
            fields.insert(
                "md_date".to_string(),
                Value::String(now.date_naive().to_string()),
            );

            let mut snapshot = build_equity(
                &[(DESCRIPTIVE_FIELDS, &info), (LIVE_MARKET_FIELDS, &info)],
                fields,
            )?;
            let price = snapshot.p_market.ok_or_else(|| {
                FeederError::NoDataAvailable(format!("no current price for {}", request.ticker))
            })?;
            snapshot.tickdata = vec![TickObservation { date_time, price }];
            Ok(NormalizedPayload::Equity(snapshot))
        }
        RawPayload::Dividends { series } => {
            let series = build_dividends(request, &series)?;
            Ok(NormalizedPayload::Dividends(series))
        }
    }
}

fn base_fields(date_time: DateTime<Utc>) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(
        "date_time".to_string(),
        Value::String(date_time.to_rfc3339_opts(SecondsFormat::Micros, true)),
    );
    fields
}

/// The one equity builder: runs every `(table, record)` pair through the
/// mapping and reads the result back as a snapshot.
fn build_equity(
    sources: &[(&[FieldMapping], &RawRecord)],
    mut fields: Map<String, Value>,
) -> Result<EquitySnapshot, FeederError> {
    for (table, record) in sources {
        mapping::apply(table, record, &mut fields)?;
    }
    let snapshot = serde_json::from_value(Value::Object(fields))?;
    Ok(snapshot)
}

fn build_dividends(
    request: &FeedRequest,
    series: &BTreeMap<NaiveDate, f64>,
) -> Result<DividendSeries, FeederError> {
    let mut dividends = Vec::new();
    for (&ex_div_date, &amount) in series {
        if ex_div_date.year() != request.year {
            continue;
        }
        match dividend_from_f64(amount) {
            Some(dividend) => dividends.push(DividendEntry {
                ex_div_date,
                dividend,
            }),
            None => warn!("build | skipping dividend {} on {}", amount, ex_div_date),
        }
    }

    if dividends.is_empty() {
        return Err(FeederError::NoDataAvailable(format!(
            "no dividends for {} in {}",
            request.ticker,
            request.year_label()
        )));
    }

    Ok(DividendSeries {
        year: request.year_label(),
        dividends,
    })
}
