pub mod api;
pub mod endpoints;

pub use api::{BackendAPI, BackendError};
pub use endpoints::{
    BACKEND_URL_VAR, BackendEndpoints, DEFAULT_BACKEND_URL, backend_url_or_default,
};
