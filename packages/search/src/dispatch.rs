//! Concurrent query dispatch.
//!
//! Every planned query of a round is put in flight at once and completions
//! are handled one at a time, in whatever order they arrive, on the calling
//! task. A shared [`CancelHandle`] stops the round: pending requests are
//! dropped and whatever was already aggregated stays.

use std::sync::Arc;

use futures::StreamExt as _;
use futures::stream::FuturesUnordered;
use serde_json::Value;
use spotted_query::PlannedQuery;
use spotted_query_models::Filter;
use tokio::sync::watch;

use crate::SearchError;
use crate::aggregate::ResultAggregator;
use crate::backend::{BackendError, SpatialBackend};
use crate::progress::ProgressTracker;

/// Cancels every round holding one of its [`CancelSignal`]s.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    /// A handle that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Cancels all pending requests of rounds listening to this handle.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether [`Self::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// A signal to pass to a round.
    #[must_use]
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Receiving side of a [`CancelHandle`].
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires.
    #[must_use]
    pub fn never() -> Self {
        CancelHandle::new().signal()
    }

    /// Resolves once cancellation is requested. Never resolves if the
    /// handle is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// A query the backend answered with HTTP 400 or the retrieval sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftReply {
    /// Filter of the query.
    pub filter: Filter,
    /// Body the backend sent.
    pub body: String,
}

/// A query, or a layer, that produced no results.
#[derive(Debug)]
pub struct QueryFailure {
    /// Filters left unanswered.
    pub filters: Vec<Filter>,
    /// Drawn layer at fault, when the failure is tied to one.
    pub layer_index: Option<usize>,
    /// What went wrong.
    pub error: SearchError,
}

/// Outcome of one round.
#[derive(Debug, Default)]
pub struct RoundReport {
    /// Requests put in flight.
    pub requests: usize,
    /// Requests answered with data.
    pub succeeded: usize,
    /// Requests answered with a soft success.
    pub soft: Vec<SoftReply>,
    /// Hard failures, per layer or per request.
    pub failures: Vec<QueryFailure>,
    /// Whether the round was cancelled before every request settled.
    pub cancelled: bool,
}

impl RoundReport {
    /// `true` when every request settled and nothing failed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failures.is_empty()
    }

    /// Requests still in flight when the round stopped.
    #[must_use]
    pub fn abandoned(&self) -> usize {
        self.requests
            .saturating_sub(self.succeeded + self.soft.len())
            .saturating_sub(self.failures.len())
    }
}

/// Sends planned queries and feeds replies to the round's aggregator and
/// progress tracker.
pub struct QueryDispatcher<'a> {
    backend: &'a dyn SpatialBackend,
    cancel: CancelSignal,
}

impl<'a> QueryDispatcher<'a> {
    /// Creates a dispatcher over `backend`, stopped by `cancel`.
    #[must_use]
    pub fn new(backend: &'a dyn SpatialBackend, cancel: CancelSignal) -> Self {
        Self { backend, cancel }
    }

    /// Runs every query concurrently until all settle or the round is
    /// cancelled.
    ///
    /// Successful replies are ingested under their filter and advance
    /// progress by one unit per shape the request covered. Soft successes
    /// and failures are recorded in the report; neither stops sibling
    /// requests.
    pub async fn dispatch(
        &mut self,
        queries: Vec<PlannedQuery>,
        aggregator: &mut ResultAggregator,
        progress: &mut ProgressTracker,
    ) -> RoundReport {
        let mut report = RoundReport {
            requests: queries.len(),
            ..RoundReport::default()
        };

        log::info!("Dispatching {} requests", report.requests);

        let backend = self.backend;
        let mut pending: FuturesUnordered<_> = queries
            .into_iter()
            .map(|planned| run_query(backend, planned))
            .collect();

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    log::warn!("Round cancelled with {} requests pending", pending.len());
                    report.cancelled = true;
                    break;
                }
                next = pending.next() => {
                    let Some((planned, result)) = next else {
                        break;
                    };
                    settle(planned, result, aggregator, progress, &mut report);
                }
            }
        }

        log::info!(
            "Round settled: {} succeeded, {} soft, {} failed{}",
            report.succeeded,
            report.soft.len(),
            report.failures.len(),
            if report.cancelled { ", cancelled" } else { "" },
        );

        report
    }
}

async fn run_query(
    backend: &dyn SpatialBackend,
    planned: PlannedQuery,
) -> (PlannedQuery, Result<Value, BackendError>) {
    let result = backend.search(&planned.query).await;
    (planned, result)
}

fn settle(
    planned: PlannedQuery,
    result: Result<Value, BackendError>,
    aggregator: &mut ResultAggregator,
    progress: &mut ProgressTracker,
    report: &mut RoundReport,
) {
    let filter = planned.query.filter;
    match result {
        Ok(payload) => {
            let summary = aggregator.ingest(&filter, &payload);
            progress.advance_units(planned.shape_count);
            progress.message(format!("{filter}: +{} results", summary.added));
            report.succeeded += 1;
        }
        Err(e) => {
            if let Some(body) = e.soft_body() {
                log::debug!("Soft reply for filter {filter}: {body}");
                report.soft.push(SoftReply {
                    body: body.to_string(),
                    filter,
                });
            } else {
                log::error!("Request for filter {filter} failed: {e}");
                report.failures.push(QueryFailure {
                    filters: vec![filter],
                    layer_index: None,
                    error: e.into(),
                });
            }
        }
    }
}
