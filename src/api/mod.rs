//! API clients for external services
//!
//! - AnimeWorld: stream listings per episode, series/episode metadata
//! - Catalog: search fan-out across the configured catalog services

pub mod animeworld;
pub mod catalog;

pub use animeworld::AnimeWorldClient;
pub use catalog::CatalogSearch;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Upstream failure, as seen by one request
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Connection failed: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Upstream rejected request ({status})")]
    Rejected { status: u16 },

    #[error("Upstream server error ({status})")]
    Server { status: u16 },

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl UpstreamError {
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Rejected { status } | UpstreamError::Server { status } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, UpstreamError::Rejected { status: 404 })
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else {
            UpstreamError::Transport(err.to_string())
        }
    }
}

/// What a single candidate probe produced
#[derive(Debug)]
pub enum ProbeOutcome<T> {
    /// Answered 2xx with usable data
    Found { status: u16, data: T },
    /// Answered 2xx but nothing usable in the body
    Empty { status: u16 },
    /// Answered 4xx
    Rejected { status: u16 },
    /// Transport failure, timeout or 5xx
    Failed(UpstreamError),
}

impl<T> ProbeOutcome<T> {
    /// Transform found data; data that maps to `None` demotes the outcome to `Empty`
    pub fn filter_map<U>(self, f: impl FnOnce(T) -> Option<U>) -> ProbeOutcome<U> {
        match self {
            ProbeOutcome::Found { status, data } => match f(data) {
                Some(data) => ProbeOutcome::Found { status, data },
                None => ProbeOutcome::Empty { status },
            },
            ProbeOutcome::Empty { status } => ProbeOutcome::Empty { status },
            ProbeOutcome::Rejected { status } => ProbeOutcome::Rejected { status },
            ProbeOutcome::Failed(err) => ProbeOutcome::Failed(err),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, ProbeOutcome::Found { .. })
    }

    /// HTTP status, when the upstream answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ProbeOutcome::Found { status, .. }
            | ProbeOutcome::Empty { status }
            | ProbeOutcome::Rejected { status } => Some(*status),
            ProbeOutcome::Failed(err) => err.status(),
        }
    }
}

/// Shared HTTP client with browser-like headers and a per-call timeout
pub(crate) fn build_http_client(timeout: Duration) -> reqwest::Client {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    match reqwest::Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
    {
        Ok(client) => client,
        Err(error) => {
            // Keep the per-call bound even without the header set
            warn!(%error, "failed to build upstream client, retrying without default headers");
            reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|error| {
                    warn!(%error, "falling back to an unconfigured upstream client");
                    reqwest::Client::new()
                })
        }
    }
}
