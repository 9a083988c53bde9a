use crate::mode::FeedMode;
use equity_model::{DividendRecord, EquitySnapshot, RecordId, Stored};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update(RecordId),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Action::Create => write!(f, "create"),
            Action::Update(id) => write!(f, "update {}", id),
        }
    }
}

/// Decides between create and update for an equity snapshot.
///
/// Live quotes append their tick to the stored ones. Historical bars carry
/// no ticks or market price, so the stored ones are kept as they are.
pub fn reconcile_equity(
    mode: FeedMode,
    existing: Option<Stored<EquitySnapshot>>,
    mut payload: EquitySnapshot,
) -> (Action, EquitySnapshot) {
    let Some(existing) = existing else {
        return (Action::Create, payload);
    };

    let mut tickdata = existing.record.tickdata;
    match mode {
        FeedMode::LiveMarket => tickdata.append(&mut payload.tickdata),
        _ => payload.p_market = payload.p_market.or(existing.record.p_market),
    }
    payload.tickdata = tickdata;

    (Action::Update(existing.id), payload)
}

/// Decides between create and update for a year of dividends. An update
/// replaces the stored entries with the fetched ones.
pub fn reconcile_dividends(
    existing: Option<Stored<DividendRecord>>,
    payload: DividendRecord,
) -> (Action, DividendRecord) {
    match existing {
        None => (Action::Create, payload),
        Some(existing) => (Action::Update(existing.id), payload),
    }
}
