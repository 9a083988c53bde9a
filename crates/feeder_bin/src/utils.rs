use chrono::{Datelike, Days, NaiveDate, Weekday};

const MAX_TICKER_LEN: usize = 20;

/// Keeps the characters the provider uses in symbols (`BRK-B`, `^GSPC`,
/// `EURUSD=X`, `VOD.L`) and upper-cases the rest.
pub fn sanitize_ticker(ticker: &str) -> String {
    ticker
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '^' | '='))
        .take(MAX_TICKER_LEN)
        .collect::<String>()
        .to_uppercase()
}

/// Last weekday before `today`: Friday on Mondays and Sundays.
pub fn previous_business_day(today: NaiveDate) -> NaiveDate {
    let back = match today.weekday() {
        Weekday::Mon => 3,
        Weekday::Sun => 2,
        _ => 1,
    };
    today.checked_sub_days(Days::new(back)).unwrap_or(today)
}
