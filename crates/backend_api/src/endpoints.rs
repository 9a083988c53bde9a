use crate::api::BackendError;
use equity_model::RecordId;
use reqwest::Url;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
/// Environment variable holding the backend base URL.
pub const BACKEND_URL_VAR: &str = "FEEDER_BACKEND_URL";

/// Backend base URL from an optional setting; unset or blank means
/// [`DEFAULT_BACKEND_URL`].
pub fn backend_url_or_default(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(url) if !url.is_empty() => url,
        _ => DEFAULT_BACKEND_URL,
    }
}

/// Collection URLs of the backend store, derived once from its base URL.
///
/// The store redirects slash-less URLs and cannot keep a POST body across
/// the redirect, so every URL here ends with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEndpoints {
    pub base: Url,
    pub equities: Url,
    pub dividends: Url,
}

impl BackendEndpoints {
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        let mut base_url = base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let base = Url::parse(&base_url)
            .map_err(|e| BackendError::Url(format!("{}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(BackendError::Url(base_url));
        }

        let equities = join(&base, "equities/")?;
        let dividends = join(&base, "dividends/")?;

        Ok(BackendEndpoints {
            base,
            equities,
            dividends,
        })
    }

    /// `<collection><id>/`
    pub fn detail(collection: &Url, id: RecordId) -> Result<Url, BackendError> {
        join(collection, &format!("{}/", id))
    }
}

fn join(base: &Url, path: &str) -> Result<Url, BackendError> {
    base.join(path)
        .map_err(|e| BackendError::Url(format!("{}{}: {}", base, path, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_from_default_url() {
        let endpoints = BackendEndpoints::new(DEFAULT_BACKEND_URL).unwrap();
        assert_eq!(endpoints.equities.as_str(), "http://localhost:8000/equities/");
        assert_eq!(endpoints.dividends.as_str(), "http://localhost:8000/dividends/");
    }

    #[test]
    fn endpoints_keep_base_path() {
        let endpoints = BackendEndpoints::new("https://store.example/api").unwrap();
        assert_eq!(endpoints.equities.as_str(), "https://store.example/api/equities/");

        let endpoints = BackendEndpoints::new("https://store.example/api/").unwrap();
        assert_eq!(endpoints.dividends.as_str(), "https://store.example/api/dividends/");
    }

    #[test]
    fn detail_url_has_trailing_slash() {
        let endpoints = BackendEndpoints::new(DEFAULT_BACKEND_URL).unwrap();
        let url = BackendEndpoints::detail(&endpoints.equities, 42).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/equities/42/");
    }

    #[test]
    fn backend_url_default() {
        assert_eq!(backend_url_or_default(None), DEFAULT_BACKEND_URL);
        assert_eq!(backend_url_or_default(Some("  ")), DEFAULT_BACKEND_URL);
        assert_eq!(backend_url_or_default(Some(" http://store:9000 ")), "http://store:9000");
    }

    #[test]
    fn endpoints_reject_garbage() {
        assert!(BackendEndpoints::new("not a url").is_err());
        assert!(BackendEndpoints::new("mailto:someone@example.com").is_err());
    }
}
