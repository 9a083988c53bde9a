use backend_api::BackendError;
use thiserror::Error;
use yahoo_api::YahooError;

#[derive(Debug, Error)]
pub enum FeederError {
    #[error("usage: {0}")]
    Usage(String),
    #[error("no data available: {0}")]
    NoDataAvailable(String),
    #[error("no equity stored with label {0}, import its prices first")]
    UnknownEquity(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed payload: {0}")]
    Payload(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl FeederError {
    pub fn exit_code(&self) -> i32 {
        match self {
            FeederError::Usage(_) => 2,
            FeederError::NoDataAvailable(_) | FeederError::UnknownEquity(_) => 3,
            FeederError::Transport(_) => 4,
            FeederError::Payload(_) | FeederError::Config(_) => 1,
        }
    }
}

impl From<YahooError> for FeederError {
    fn from(err: YahooError) -> FeederError {
        match err {
            YahooError::NotFound(ticker) => {
                FeederError::NoDataAvailable(format!("provider does not know {}", ticker))
            }
            YahooError::Format(reason) => FeederError::Payload(reason),
            other => FeederError::Transport(other.to_string()),
        }
    }
}

impl From<BackendError> for FeederError {
    fn from(err: BackendError) -> FeederError {
        match err {
            BackendError::Url(url) => FeederError::Config(format!("invalid backend url {}", url)),
            other => FeederError::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for FeederError {
    fn from(err: serde_json::Error) -> FeederError {
        FeederError::Payload(err.to_string())
    }
}
