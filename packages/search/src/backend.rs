//! Spatial backend client.
//!
//! The [`SpatialBackend`] trait is the seam between the search engine and
//! the network, so rounds can be driven by in-memory backends in tests.
//! [`HttpBackend`] is the `reqwest` implementation.
//!
//! Endpoints:
//!
//! * `POST /api/multipolygondata/` and `POST /api/multipointradiusdata/`
//!   return an array of `FeatureCollection`-like objects,
//! * `POST /api/filter/` returns the city's filter list as bracketed text,
//! * `GET /api/document/{id}` returns a saved project.
//!
//! The backend sometimes answers with HTTP 400 or the plain-text body
//! [`REQUEST_RETRIEVED`] for requests that did not fail. Those replies are
//! exposed through [`BackendError::soft_body`] so callers can treat them as
//! data instead of errors.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use spotted_query_models::{Filter, FilterCatalogBody, SpatialQuery};
use thiserror::Error;

use crate::config::BackendConfig;

/// Body text the backend sends for requests that did not really fail.
pub const REQUEST_RETRIEVED: &str = "Request retrieved";

/// Maximum length of the response body preview included in logs.
const BODY_PREVIEW_LEN: usize = 200;

/// Errors from backend requests.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("Backend returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// A success response whose body could not be parsed.
    #[error("Unexpected response body (status {status}): {message}")]
    Body {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
        /// Parse error description.
        message: String,
    },
}

impl BackendError {
    /// Returns the reply body when this error is really a soft success:
    /// HTTP 400, or any reply whose body is [`REQUEST_RETRIEVED`].
    #[must_use]
    pub fn soft_body(&self) -> Option<&str> {
        match self {
            Self::Status { status, body } if *status == 400 || is_sentinel(body) => Some(body),
            Self::Body { body, .. } if is_sentinel(body) => Some(body),
            Self::Http(_) | Self::Status { .. } | Self::Body { .. } => None,
        }
    }
}

fn is_sentinel(body: &str) -> bool {
    body.trim() == REQUEST_RETRIEVED
}

/// Operations the search engine needs from the spatial backend.
#[async_trait]
pub trait SpatialBackend: Send + Sync {
    /// Runs one spatial query and returns the raw JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the request fails or the reply cannot be
    /// parsed.
    async fn search(&self, query: &SpatialQuery) -> Result<serde_json::Value, BackendError>;

    /// Lists the filters available for `city`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the request fails.
    async fn filters(&self, city: &str) -> Result<Vec<Filter>, BackendError>;

    /// Fetches a saved project document.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the request fails or the reply cannot be
    /// parsed.
    async fn project(&self, id: &str) -> Result<serde_json::Value, BackendError>;
}

/// `reqwest`-based [`SpatialBackend`].
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Creates a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post_text<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(u16, String), BackendError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        read_text(response).await
    }
}

#[async_trait]
impl SpatialBackend for HttpBackend {
    async fn search(&self, query: &SpatialQuery) -> Result<serde_json::Value, BackendError> {
        let path = query.endpoint().path();
        log::debug!("POST {path} filter={}", query.filter);
        let (status, text) = self.post_text(path, &query.body()).await?;
        parse_json(status, text)
    }

    async fn filters(&self, city: &str) -> Result<Vec<Filter>, BackendError> {
        let reply = self
            .post_text("/api/filter/", &FilterCatalogBody { city })
            .await;
        filter_catalog(city, reply)
    }

    async fn project(&self, id: &str) -> Result<serde_json::Value, BackendError> {
        let response = self
            .client
            .get(self.url(&format!("/api/document/{id}")))
            .send()
            .await?;
        let (status, text) = read_text(response).await?;
        parse_json(status, text)
    }
}

/// Reads a response body, turning non-success statuses into
/// [`BackendError::Status`].
async fn read_text(response: reqwest::Response) -> Result<(u16, String), BackendError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        log::debug!("Backend returned {status}: {}", preview(&text));
        return Err(BackendError::Status {
            status: status.as_u16(),
            body: text,
        });
    }

    Ok((status.as_u16(), text))
}

fn parse_json(status: u16, text: String) -> Result<serde_json::Value, BackendError> {
    serde_json::from_str(&text).map_err(|e| {
        log::debug!("Unparseable backend body ({e}): {}", preview(&text));
        BackendError::Body {
            status,
            message: e.to_string(),
            body: text,
        }
    })
}

fn preview(text: &str) -> &str {
    match text.char_indices().nth(BODY_PREVIEW_LEN) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Turns a catalogue reply into filters.
///
/// A soft success (HTTP 400 or the [`REQUEST_RETRIEVED`] body) lists no
/// filters instead of being parsed or failing.
fn filter_catalog(
    city: &str,
    reply: Result<(u16, String), BackendError>,
) -> Result<Vec<Filter>, BackendError> {
    let text = match reply {
        Ok((_, text)) if is_sentinel(&text) => {
            log::warn!("Filter catalogue for {city} returned no list: {}", text.trim());
            return Ok(Vec::new());
        }
        Ok((_, text)) => text,
        Err(e) => {
            if let Some(body) = e.soft_body() {
                log::warn!("Filter catalogue for {city} returned no list: {}", preview(body));
                return Ok(Vec::new());
            }
            return Err(e);
        }
    };
    Ok(parse_filter_list(&text))
}

/// Parses the filter catalogue reply, e.g. `[benches, lighting, trees]`.
///
/// Brackets, commas and quotes are stripped and the rest split on
/// whitespace.
#[must_use]
pub fn parse_filter_list(text: &str) -> Vec<Filter> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ',' | '"'))
        .collect();
    cleaned.split_whitespace().map(Filter::from).collect()
}
