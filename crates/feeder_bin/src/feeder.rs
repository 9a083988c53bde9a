use crate::error::FeederError;
use crate::mode::FeedRequest;
use crate::payload::{NormalizedPayload, build_payload};
use crate::reconcile::{Action, reconcile_dividends, reconcile_equity};
use crate::source::{MarketData, fetch};
use crate::store::{RecordStore, lookup_dividends, lookup_equity, resolve_equity_id};
use chrono::{DateTime, Local};
use equity_model::{DividendRecord, EquitySnapshot};
use log::info;
use serde::Serialize;

/// What one invocation did. `status` is `None` on a dry run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub action: Action,
    pub status: Option<u16>,
}

/// Runs one ticker through fetch, build, lookup, reconcile and submit.
pub struct Feeder<'a, M, S> {
    market: &'a M,
    store: &'a S,
    dry_run: bool,
}

impl<'a, M: MarketData, S: RecordStore> Feeder<'a, M, S> {
    pub fn new(market: &'a M, store: &'a S) -> Self {
        Feeder {
            market,
            store,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn run(&self, request: &FeedRequest, now: DateTime<Local>) -> Result<Outcome, FeederError> {
        info!("run | {} | {}", request.mode, request.ticker);

        let raw = fetch(self.market, request)?;
        let payload = build_payload(request, raw, now)?;

        match payload {
            NormalizedPayload::Equity(snapshot) => {
                info!("lookup | equity {} on {}", snapshot.label, snapshot.md_date);
                let existing = lookup_equity(self.store, &snapshot.label, snapshot.md_date)?;
                let (action, snapshot) = reconcile_equity(request.mode, existing, snapshot);
                log_plan(action, &snapshot)?;

                self.submit(action, |store| submit_equity(store, action, &snapshot))
            }
            NormalizedPayload::Dividends(series) => {
                info!("lookup | dividends of {} in {}", request.ticker, series.year);
                let equity = resolve_equity_id(self.store, &request.ticker)?;
                let existing = lookup_dividends(self.store, equity, &series.year)?;
                let (action, record) = reconcile_dividends(existing, series.into_record(equity));
                log_plan(action, &record)?;

                self.submit(action, |store| submit_dividends(store, action, &record))
            }
        }
    }

    fn submit(
        &self,
        action: Action,
        write: impl FnOnce(&S) -> Result<u16, FeederError>,
    ) -> Result<Outcome, FeederError> {
        if self.dry_run {
            info!("submit | dry run, {} skipped", action);
            return Ok(Outcome {
                action,
                status: None,
            });
        }

        let status = write(self.store)?;
        info!("submit | {} | HTTP {}", action, status);
        Ok(Outcome {
            action,
            status: Some(status),
        })
    }
}

fn submit_dividends(
    store: &impl RecordStore,
    action: Action,
    record: &DividendRecord,
) -> Result<u16, FeederError> {
    match action {
        Action::Create => store.create_dividends(record),
        Action::Update(id) => store.update_dividends(id, record),
    }
}

fn log_plan<T: Serialize>(action: Action, payload: &T) -> Result<(), FeederError> {
    info!(
        "reconcile | {} | payload:\n{}",
        action,
        serde_json::to_string_pretty(payload)?
    );
    Ok(())
}

fn submit_equity(
    store: &impl RecordStore,
    action: Action,
    snapshot: &EquitySnapshot,
) -> Result<u16, FeederError> {
    match action {
        Action::Create => store.create_equity(snapshot),
        Action::Update(id) => store.update_equity(id, snapshot),
    }
}
