#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Search rounds against the spatial backend.
//!
//! A round takes the layers drawn on the map and a set of filters, then:
//!
//! 1. classifies and tessellates the layers ([`spotted_geometry`]),
//! 2. plans one request per (shape, filter) pair, with circles batched per
//!    filter ([`spotted_query`]),
//! 3. fans every request out at once ([`dispatch`]) and, as replies arrive in
//!    any order, appends markers per filter ([`aggregate`]) and advances the
//!    progress percentage ([`progress`]).
//!
//! Each round owns its markers and progress ([`round::SearchRound`]); a
//! [`session::SearchSession`] keeps the drawn layers between rounds and
//! discards the previous round's results when a new one starts.
//!
//! Failures are per query: one rejected shape or failed request never stops
//! the rest of the round.

pub mod aggregate;
pub mod backend;
pub mod config;
pub mod dispatch;
pub mod progress;
pub mod project;
pub mod round;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

use spotted_geometry::GeometryError;
use thiserror::Error;

pub use backend::{BackendError, HttpBackend, SpatialBackend};
pub use dispatch::{CancelHandle, CancelSignal, RoundReport};
pub use round::{RoundRequest, SearchRound};
pub use session::SearchSession;

/// Errors that can occur while preparing or running a search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// A drawn layer could not be classified or tessellated.
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// The backend request failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// JSON serialization or parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (reading config or layer files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what was wrong.
        message: String,
    },

    /// A saved project document is missing required fields.
    #[error("Invalid project document: {message}")]
    Document {
        /// Description of what was wrong.
        message: String,
    },

    /// A round was requested without any layers or filters.
    #[error("Nothing to search: {message}")]
    NothingToSearch {
        /// What was missing.
        message: String,
    },
}
