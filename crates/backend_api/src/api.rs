use crate::endpoints::BackendEndpoints;
use chrono::NaiveDate;
use equity_model::{DividendRecord, EquitySnapshot, RecordId, Stored};
use log::{debug, info};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(String),
    #[error("HTTP {status} from {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },
    #[error("unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// List endpoints answer with a plain array, or with a page when the
/// store has pagination switched on.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListJSON<T> {
    Page { results: Vec<T> },
    Plain(Vec<T>),
}

impl<T> ListJSON<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ListJSON::Page { results } => results,
            ListJSON::Plain(items) => items,
        }
    }
}

/// Blocking client for the equities and dividends collections of the store.
pub struct BackendAPI {
    endpoints: BackendEndpoints,
    client: Client,
}

impl BackendAPI {
    pub fn new(endpoints: BackendEndpoints) -> Result<Self, BackendError> {
        let client = Client::builder().build()?;
        Ok(BackendAPI { endpoints, client })
    }

    pub fn endpoints(&self) -> &BackendEndpoints {
        &self.endpoints
    }

    pub fn find_equities(
        &self,
        label: &str,
        md_date: Option<NaiveDate>,
    ) -> Result<Vec<Stored<EquitySnapshot>>, BackendError> {
        let mut query = vec![("label", label.to_string())];
        if let Some(md_date) = md_date {
            query.push(("md_date", md_date.format("%Y-%m-%d").to_string()));
        }
        self.get_list(&self.endpoints.equities, &query)
    }

    pub fn find_dividends(
        &self,
        equity: RecordId,
        year: &str,
    ) -> Result<Vec<Stored<DividendRecord>>, BackendError> {
        let query = [("equity", equity.to_string()), ("year", year.to_string())];
        self.get_list(&self.endpoints.dividends, &query)
    }

    pub fn create_equity(&self, snapshot: &EquitySnapshot) -> Result<StatusCode, BackendError> {
        self.send_json(Method::POST, self.endpoints.equities.clone(), snapshot)
    }

    pub fn update_equity(
        &self,
        id: RecordId,
        snapshot: &EquitySnapshot,
    ) -> Result<StatusCode, BackendError> {
        let url = BackendEndpoints::detail(&self.endpoints.equities, id)?;
        self.send_json(Method::PUT, url, snapshot)
    }

    pub fn create_dividends(&self, record: &DividendRecord) -> Result<StatusCode, BackendError> {
        self.send_json(Method::POST, self.endpoints.dividends.clone(), record)
    }

    pub fn update_dividends(
        &self,
        id: RecordId,
        record: &DividendRecord,
    ) -> Result<StatusCode, BackendError> {
        let url = BackendEndpoints::detail(&self.endpoints.dividends, id)?;
        self.send_json(Method::PUT, url, record)
    }

    /// Lists the equities collection and checks the answer is JSON.
    pub fn ping(&self) -> Result<StatusCode, BackendError> {
        let url = self.endpoints.equities.clone();
        debug!("ping | url: {}", url);

        let response = check(self.client.get(url.clone()), &url)?;
        let status = response.status();
        response
            .json::<serde_json::Value>()
            .map_err(|e| decode_error(&url, e))?;
        Ok(status)
    }

    fn get_list<T: DeserializeOwned>(
        &self,
        url: &Url,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, BackendError> {
        debug!("get_list | url: {} | query: {:?}", url, query);

        let response = check(self.client.get(url.clone()).query(query), url)?;
        let items = response
            .json::<ListJSON<T>>()
            .map_err(|e| decode_error(url, e))?
            .into_vec();

        debug!("get_list | {} item(s)", items.len());
        Ok(items)
    }

    fn send_json<B: Serialize>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> Result<StatusCode, BackendError> {
        debug!("send_json | {} {}", method, url);

        let response = check(self.client.request(method.clone(), url.clone()).json(body), &url)?;
        let status = response.status();
        info!("HTTP {} ended with {} status code", method, status.as_u16());
        Ok(status)
    }
}

fn check(request: RequestBuilder, url: &Url) -> Result<reqwest::blocking::Response, BackendError> {
    let response = request.send()?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        url: url.to_string(),
        body,
    })
}

fn decode_error(url: &Url, err: reqwest::Error) -> BackendError {
    BackendError::Decode {
        url: url.to_string(),
        reason: err.to_string(),
    }
}
