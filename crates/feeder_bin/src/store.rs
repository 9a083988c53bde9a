use crate::error::FeederError;
use backend_api::BackendAPI;
use chrono::NaiveDate;
use equity_model::{DividendRecord, EquitySnapshot, RecordId, Stored};
use log::{debug, warn};

/// Backend store as the feeder sees it. Writes return the HTTP status.
pub trait RecordStore {
    fn find_equities(
        &self,
        label: &str,
        md_date: Option<NaiveDate>,
    ) -> Result<Vec<Stored<EquitySnapshot>>, FeederError>;

    fn find_dividends(
        &self,
        equity: RecordId,
        year: &str,
    ) -> Result<Vec<Stored<DividendRecord>>, FeederError>;

    fn create_equity(&self, snapshot: &EquitySnapshot) -> Result<u16, FeederError>;

    fn update_equity(&self, id: RecordId, snapshot: &EquitySnapshot) -> Result<u16, FeederError>;

    fn create_dividends(&self, record: &DividendRecord) -> Result<u16, FeederError>;

    fn update_dividends(&self, id: RecordId, record: &DividendRecord) -> Result<u16, FeederError>;
}

impl RecordStore for BackendAPI {
    fn find_equities(
        &self,
        label: &str,
        md_date: Option<NaiveDate>,
    ) -> Result<Vec<Stored<EquitySnapshot>>, FeederError> {
        Ok(BackendAPI::find_equities(self, label, md_date)?)
    }

    fn find_dividends(
        &self,
        equity: RecordId,
        year: &str,
    ) -> Result<Vec<Stored<DividendRecord>>, FeederError> {
        Ok(BackendAPI::find_dividends(self, equity, year)?)
    }

    fn create_equity(&self, snapshot: &EquitySnapshot) -> Result<u16, FeederError> {
        Ok(BackendAPI::create_equity(self, snapshot)?.as_u16())
    }

    fn update_equity(&self, id: RecordId, snapshot: &EquitySnapshot) -> Result<u16, FeederError> {
        Ok(BackendAPI::update_equity(self, id, snapshot)?.as_u16())
    }

    fn create_dividends(&self, record: &DividendRecord) -> Result<u16, FeederError> {
        Ok(BackendAPI::create_dividends(self, record)?.as_u16())
    }

    fn update_dividends(&self, id: RecordId, record: &DividendRecord) -> Result<u16, FeederError> {
        Ok(BackendAPI::update_dividends(self, id, record)?.as_u16())
    }
}

/// Snapshot stored under (`label`, `md_date`), if any. Rows the store
/// returns for another key are ignored.
pub fn lookup_equity(
    store: &impl RecordStore,
    label: &str,
    md_date: NaiveDate,
) -> Result<Option<Stored<EquitySnapshot>>, FeederError> {
    let found = store.find_equities(label, Some(md_date))?;
    let matching = only_matching(found, |e| e.label == label && e.md_date == md_date);
    Ok(first_match(&format!("equity {} on {}", label, md_date), matching))
}

/// Store id of the equity with `label`; dividends hang off it.
pub fn resolve_equity_id(store: &impl RecordStore, label: &str) -> Result<RecordId, FeederError> {
    let found = store.find_equities(label, None)?;
    let matching = only_matching(found, |e| e.label == label);
    debug!("resolve_equity_id | {} | {} snapshot(s)", label, matching.len());
    matching
        .first()
        .map(|equity| equity.id)
        .ok_or_else(|| FeederError::UnknownEquity(label.to_string()))
}

/// Dividend record stored under (`equity`, `year`), if any. Rows the store
/// returns for another key are ignored.
pub fn lookup_dividends(
    store: &impl RecordStore,
    equity: RecordId,
    year: &str,
) -> Result<Option<Stored<DividendRecord>>, FeederError> {
    let found = store.find_dividends(equity, year)?;
    let matching = only_matching(found, |d| d.equity == equity && d.year == year);
    Ok(first_match(&format!("dividends of {} in {}", equity, year), matching))
}

/// Query parameters are a hint to the store, not a guarantee.
fn only_matching<T>(found: Vec<Stored<T>>, is_key: impl Fn(&T) -> bool) -> Vec<Stored<T>> {
    let total = found.len();
    let matching: Vec<_> = found.into_iter().filter(|s| is_key(&s.record)).collect();
    if matching.len() < total {
        debug!("lookup | store returned {} row(s) for other keys", total - matching.len());
    }
    matching
}

fn first_match<T>(what: &str, found: Vec<T>) -> Option<T> {
    if found.len() > 1 {
        warn!("lookup | {} records for {}, using the first", found.len(), what);
    }
    found.into_iter().next()
}
