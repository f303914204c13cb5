//! Drawing session.
//!
//! Keeps the layers drawn on the canvas between rounds and starts rounds
//! over them. Starting a round always discards the previous one, so
//! markers and progress never carry over.

use std::sync::Arc;

use spotted_geometry_models::DrawnLayer;

use crate::SearchError;
use crate::backend::SpatialBackend;
use crate::dispatch::{CancelSignal, RoundReport};
use crate::progress::ProgressCallback;
use crate::project::SavedProject;
use crate::round::{RoundRequest, SearchRound};

#[derive(Debug, Clone)]
struct StoredLayer {
    fingerprint: String,
    layer: DrawnLayer,
}

/// Layers on the canvas plus the latest round.
#[derive(Debug, Default)]
pub struct SearchSession {
    layers: Vec<StoredLayer>,
    round: Option<SearchRound>,
}

impl SearchSession {
    /// An empty canvas.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a layer unless an identical one is already stored.
    ///
    /// Returns `true` when the layer was added.
    pub fn store_layer(&mut self, layer: DrawnLayer) -> bool {
        let fingerprint = spotted_geometry::fingerprint(&layer);
        if self.layers.iter().any(|l| l.fingerprint == fingerprint) {
            log::debug!("Layer {fingerprint} already stored");
            return false;
        }
        log::debug!("Stored layer {fingerprint} ({} vertices)", layer.vertex_count());
        self.layers.push(StoredLayer { fingerprint, layer });
        true
    }

    /// Stores every layer, skipping duplicates. Returns how many were added.
    pub fn store_layers(&mut self, layers: impl IntoIterator<Item = DrawnLayer>) -> usize {
        layers
            .into_iter()
            .map(|layer| self.store_layer(layer))
            .filter(|added| *added)
            .count()
    }

    /// Clears the canvas. The latest round's results are kept until the next
    /// round starts.
    pub fn clear_layers(&mut self) {
        self.layers.clear();
    }

    /// Stored layers in drawing order.
    pub fn layers(&self) -> impl Iterator<Item = &DrawnLayer> {
        self.layers.iter().map(|l| &l.layer)
    }

    /// Number of stored layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Replaces the canvas with a saved project's layers. Returns how many
    /// layers were stored.
    pub fn seed_from_project(&mut self, project: &SavedProject) -> usize {
        self.clear_layers();
        self.round = None;
        self.store_layers(project.layers.iter().cloned())
    }

    /// Runs a new round over the stored layers.
    ///
    /// The previous round is discarded before anything else happens.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::NothingToSearch`] if no layers are stored or no
    /// filters are requested.
    pub async fn search(
        &mut self,
        backend: &dyn SpatialBackend,
        request: RoundRequest,
        callback: Arc<dyn ProgressCallback>,
        cancel: CancelSignal,
    ) -> Result<RoundReport, SearchError> {
        self.round = None;

        let layers = self.layers.iter().map(|l| l.layer.clone()).collect();
        let round = self
            .round
            .insert(SearchRound::new(request, layers, callback)?);

        Ok(round.run(backend, cancel).await)
    }

    /// The latest round, if any.
    #[must_use]
    pub const fn current_round(&self) -> Option<&SearchRound> {
        self.round.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use spotted_geometry_models::Vertex;
    use spotted_query_models::{Filter, SpatialQuery};

    use super::*;
    use crate::progress::null_progress;
    use crate::test_support::{ScriptedBackend, point_reply, square_ring};

    fn circle(lat: f64, lon: f64) -> DrawnLayer {
        DrawnLayer::Circle {
            center: Vertex::new(lat, lon),
            radius_m: 250.0,
        }
    }

    fn request(filters: &[&str]) -> RoundRequest {
        RoundRequest {
            city: "Helsinki".to_string(),
            filters: filters.iter().map(|f| Filter::from(*f)).collect(),
            external: false,
        }
    }

    #[test]
    fn identical_layers_are_stored_once() {
        let mut session = SearchSession::new();
        assert!(session.store_layer(circle(60.0, 24.0)));
        assert!(!session.store_layer(circle(60.0, 24.0)));
        assert!(session.store_layer(circle(60.0, 24.1)));
        assert_eq!(session.layer_count(), 2);
    }

    #[test]
    fn open_and_closed_rings_are_distinct_layers() {
        let closed = square_ring(60.0, 24.0, 0.01);
        let open = closed[..4].to_vec();
        let mut session = SearchSession::new();
        let added = session.store_layers([
            DrawnLayer::Ring {
                vertices: closed.clone(),
            },
            DrawnLayer::Ring { vertices: open },
            DrawnLayer::Ring { vertices: closed },
        ]);
        assert_eq!(added, 2);
        let counts: Vec<usize> = session.layers().map(DrawnLayer::vertex_count).collect();
        assert_eq!(counts, [5, 4]);
    }

    #[tokio::test]
    async fn new_round_replaces_previous_results() {
        let backend = ScriptedBackend::new(|_: &SpatialQuery| {
            (Duration::from_millis(1), Ok(point_reply(24.9, 60.1, "x")))
        });
        let mut session = SearchSession::new();
        session.store_layer(circle(60.0, 24.0));

        session
            .search(&backend, request(&["benches"]), null_progress(), CancelSignal::never())
            .await
            .unwrap();
        let first = session.current_round().unwrap();
        assert_eq!(first.markers()[&Filter::from("benches")].len(), 1);

        session
            .search(&backend, request(&["trees"]), null_progress(), CancelSignal::never())
            .await
            .unwrap();
        let second = session.current_round().unwrap();
        assert!(!second.markers().contains_key(&Filter::from("benches")));
        assert_eq!(second.markers()[&Filter::from("trees")].len(), 1);
        assert!((second.progress().percent - 100.0).abs() < 1e-9);
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn reloaded_project_seeds_the_canvas() {
        let layer = r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[24.94,60.17]},"properties":{"radius":300}}"#;
        let backend = ScriptedBackend::new(|_: &SpatialQuery| {
            (Duration::from_millis(1), Ok(point_reply(24.9, 60.1, "x")))
        })
        .with_catalog(&["benches", "lighting"])
        .with_document(serde_json::json!({
            "filter": ["benches"],
            "city": "Helsinki",
            "layers": [layer, layer],
        }));

        let project = crate::project::parse_project(&backend.project("p1").await.unwrap()).unwrap();
        let mut session = SearchSession::new();
        session.store_layer(circle(10.0, 10.0));
        assert_eq!(session.seed_from_project(&project), 1);
        assert_eq!(session.layer_count(), 1);

        let filters = backend.filters(&project.city).await.unwrap();
        let report = session
            .search(
                &backend,
                RoundRequest {
                    city: project.city.clone(),
                    filters,
                    external: false,
                },
                null_progress(),
                CancelSignal::never(),
            )
            .await
            .unwrap();
        assert_eq!(report.requests, 2);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn failed_start_still_discards_previous_round() {
        let backend = ScriptedBackend::new(|_: &SpatialQuery| {
            (Duration::from_millis(1), Ok(point_reply(24.9, 60.1, "x")))
        });
        let mut session = SearchSession::new();
        session.store_layer(circle(60.0, 24.0));
        session
            .search(&backend, request(&["benches"]), null_progress(), CancelSignal::never())
            .await
            .unwrap();

        session.clear_layers();
        let result = session
            .search(&backend, request(&["benches"]), null_progress(), CancelSignal::never())
            .await;

        assert!(matches!(result, Err(SearchError::NothingToSearch { .. })));
        assert!(session.current_round().is_none());
    }
}
