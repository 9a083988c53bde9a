use crate::error::FeederError;
use backend_api::{BACKEND_URL_VAR, BackendEndpoints, backend_url_or_default};
use dotenvy::dotenv;
use std::env;
use yahoo_api::YAHOO_BASE_API_URL;

pub const PROVIDER_URL_VAR: &str = "FEEDER_PROVIDER_URL";

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendEndpoints,
    pub provider_url: String,
}

impl Config {
    /// Reads `.env` and the process environment.
    pub fn new() -> Result<Config, FeederError> {
        dotenv().ok();

        Config::from_values(
            env::var(BACKEND_URL_VAR).ok(),
            env::var(PROVIDER_URL_VAR).ok(),
        )
    }

    fn from_values(
        backend_url: Option<String>,
        provider_url: Option<String>,
    ) -> Result<Config, FeederError> {
        let backend_url = backend_url_or_default(backend_url.as_deref());
        let provider_url = or_default(provider_url, YAHOO_BASE_API_URL);

        let backend = BackendEndpoints::new(backend_url)
            .map_err(|e| FeederError::Config(format!("{}: {}", BACKEND_URL_VAR, e)))?;

        Ok(Config {
            backend,
            provider_url,
        })
    }
}

fn or_default(value: Option<String>, default: &str) -> String {
    match value {
        Some(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}
