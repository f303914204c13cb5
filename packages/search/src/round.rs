//! One search round.
//!
//! A round owns everything that must not leak into the next one: the
//! markers collected so far and the progress state. Layers are classified
//! once when the round runs; a layer that cannot be searched is reported
//! and the rest of the round goes ahead.

use std::collections::BTreeSet;
use std::sync::Arc;

use spotted_geometry_models::{DrawnLayer, Shape};
use spotted_query::QueryBuilder;
use spotted_query_models::Filter;

use crate::SearchError;
use crate::aggregate::{MarkerGroups, ResultAggregator};
use crate::backend::SpatialBackend;
use crate::dispatch::{CancelSignal, QueryDispatcher, QueryFailure, RoundReport};
use crate::progress::{ProgressCallback, ProgressState, ProgressTracker};

/// What to search for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundRequest {
    /// City whose index is searched.
    pub city: String,
    /// Categories to match.
    pub filters: Vec<Filter>,
    /// Whether circle searches match points outside the circle.
    pub external: bool,
}

/// A round in progress or finished.
pub struct SearchRound {
    request: RoundRequest,
    layers: Vec<DrawnLayer>,
    aggregator: ResultAggregator,
    progress: ProgressTracker,
}

impl std::fmt::Debug for SearchRound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchRound")
            .field("request", &self.request)
            .field("layers", &self.layers.len())
            .field("markers", &self.aggregator.marker_count())
            .field("progress", &self.progress.state())
            .finish()
    }
}

impl SearchRound {
    /// Prepares a round over `layers` and reports 0% progress.
    ///
    /// Duplicate filters are dropped, keeping the first occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::NothingToSearch`] if there are no layers or no
    /// filters.
    pub fn new(
        mut request: RoundRequest,
        layers: Vec<DrawnLayer>,
        callback: Arc<dyn ProgressCallback>,
    ) -> Result<Self, SearchError> {
        let mut seen = BTreeSet::new();
        request.filters.retain(|f| seen.insert(f.clone()));

        if layers.is_empty() {
            return Err(SearchError::NothingToSearch {
                message: "no layers drawn".to_string(),
            });
        }
        if request.filters.is_empty() {
            return Err(SearchError::NothingToSearch {
                message: "no filters selected".to_string(),
            });
        }

        let progress = ProgressTracker::new(layers.len(), request.filters.len(), callback);
        let aggregator = ResultAggregator::with_filters(&request.filters);

        Ok(Self {
            request,
            layers,
            aggregator,
            progress,
        })
    }

    /// Classifies the layers, plans the queries and dispatches them.
    ///
    /// Returns when every request has settled or `cancel` fires. Markers and
    /// progress collected up to that point stay available.
    pub async fn run(&mut self, backend: &dyn SpatialBackend, cancel: CancelSignal) -> RoundReport {
        let mut failures = Vec::new();
        let mut shapes: Vec<Shape> = Vec::with_capacity(self.layers.len());
        let mut shape_layers: Vec<usize> = Vec::with_capacity(self.layers.len());

        for (index, layer) in self.layers.iter().enumerate() {
            match spotted_geometry::classify_layer(layer) {
                Ok(shape) => {
                    log::debug!("Layer {index} classified as {}", shape.kind());
                    shapes.push(shape);
                    shape_layers.push(index);
                }
                Err(e) => {
                    log::warn!("Layer {index} skipped: {e}");
                    failures.push(QueryFailure {
                        filters: self.request.filters.clone(),
                        layer_index: Some(index),
                        error: e.into(),
                    });
                }
            }
        }

        let builder =
            QueryBuilder::new(self.request.city.as_str()).with_external(self.request.external);
        let plan = builder.build(&shapes, &self.request.filters);

        for failure in plan.failures {
            failures.push(QueryFailure {
                filters: failure.filters,
                layer_index: shape_layers.get(failure.shape_index).copied(),
                error: failure.error.into(),
            });
        }

        self.progress.message(format!(
            "Searching {} with {} requests",
            builder.city(),
            plan.queries.len()
        ));

        let mut report = QueryDispatcher::new(backend, cancel)
            .dispatch(plan.queries, &mut self.aggregator, &mut self.progress)
            .await;

        failures.append(&mut report.failures);
        report.failures = failures;

        self.progress.finish(format!(
            "{} markers, {:.0}%{}",
            self.aggregator.marker_count(),
            self.progress.percent(),
            if report.cancelled { " (cancelled)" } else { "" },
        ));

        report
    }

    /// What this round searches for.
    #[must_use]
    pub const fn request(&self) -> &RoundRequest {
        &self.request
    }

    /// Layers this round covers.
    #[must_use]
    pub fn layers(&self) -> &[DrawnLayer] {
        &self.layers
    }

    /// Markers collected so far.
    #[must_use]
    pub const fn markers(&self) -> &MarkerGroups {
        self.aggregator.groups()
    }

    /// Current progress.
    #[must_use]
    pub const fn progress(&self) -> ProgressState {
        self.progress.state()
    }
}
