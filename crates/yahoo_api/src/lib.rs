pub mod api;

pub use api::{RawRecord, YAHOO_BASE_API_URL, YahooAPI, YahooError};
