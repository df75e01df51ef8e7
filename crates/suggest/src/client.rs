//! Suggestion endpoint HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required). One GET, no query
//! parameters; the response is the complete list.

use std::time::Duration;

use crate::filter::filter_suggestions;
use crate::Suggestion;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

const USER_AGENT: &str = concat!("fxbar/", env!("CARGO_PKG_VERSION"));

/// Error type for suggestion fetches.
#[derive(Debug, Clone, PartialEq)]
pub enum SuggestError {
    /// No endpoint URL configured
    NotConfigured,
    /// Network error (connect, timeout, TLS)
    Network(String),
    /// Non-success HTTP status with response body
    Http(u16, String),
    /// Response was not a suggestion list
    Parse(String),
}

impl std::fmt::Display for SuggestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestError::NotConfigured => write!(
                f,
                "No suggestion endpoint configured (set suggest.url, FXBAR_AUTOCOMPLETE_URL or --url)"
            ),
            SuggestError::Network(msg) => write!(f, "Network error: {}", msg),
            SuggestError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            SuggestError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for SuggestError {}

/// Anything that can answer a suggestion query. The feed runs these on worker threads.
pub trait SuggestionSource: Send + Sync {
    fn fetch(&self, query: &str) -> Result<Vec<Suggestion>, SuggestError>;
}

/// Suggestion endpoint client (blocking).
#[derive(Clone)]
pub struct SuggestClient {
    http: reqwest::blocking::Client,
    url: String,
}

impl SuggestClient {
    /// Create a client for the given endpoint URL.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SuggestError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(SuggestError::NotConfigured);
        }

        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SuggestError::Network(e.to_string()))?;

        Ok(Self { http, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the complete, unfiltered list.
    pub fn fetch_all(&self) -> Result<Vec<Suggestion>, SuggestError> {
        let response = self.http.get(&self.url)
            .send()
            .map_err(|e| SuggestError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            log::warn!("suggestion endpoint returned HTTP {}", status);
            return Err(SuggestError::Http(status, body));
        }

        let suggestions: Vec<Suggestion> = response.json()
            .map_err(|e| SuggestError::Parse(e.to_string()))?;
        log::debug!("fetched {} suggestions from {}", suggestions.len(), self.url);
        Ok(suggestions)
    }

    /// Fetch and filter by `query` (case-insensitive substring of name or category).
    pub fn fetch(&self, query: &str) -> Result<Vec<Suggestion>, SuggestError> {
        Ok(filter_suggestions(self.fetch_all()?, query))
    }
}

impl SuggestionSource for SuggestClient {
    fn fetch(&self, query: &str) -> Result<Vec<Suggestion>, SuggestError> {
        SuggestClient::fetch(self, query)
    }
}
