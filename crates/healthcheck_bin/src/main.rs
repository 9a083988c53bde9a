use backend_api::{
    BACKEND_URL_VAR, BackendAPI, BackendEndpoints, BackendError, backend_url_or_default,
};
use log::info;
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
enum CustomError {
    #[error("backend unreachable: {0}")]
    Backend(#[from] BackendError),
}

fn main() -> Result<(), CustomError> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenvy::dotenv().ok();

    let backend_url = env::var(BACKEND_URL_VAR).ok();
    let endpoints = BackendEndpoints::new(backend_url_or_default(backend_url.as_deref()))?;
    let api = BackendAPI::new(endpoints)?;
    api.ping()?;

    info!("healthcheck | {} | ok", api.endpoints().base);
    Ok(())
}
