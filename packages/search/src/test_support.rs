//! Shared fixtures for the search tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use geo::{Destination as _, Haversine, Point};
use serde_json::{Value, json};
use spotted_geometry_models::Vertex;
use spotted_query_models::{Filter, SpatialQuery};

use crate::backend::{BackendError, SpatialBackend};
use crate::progress::ProgressCallback;

/// In-memory backend whose search replies come from a closure returning a
/// delay and a result.
pub struct ScriptedBackend<F> {
    script: F,
    catalog: Vec<Filter>,
    document: Option<Value>,
    calls: AtomicUsize,
}

impl<F> ScriptedBackend<F>
where
    F: Fn(&SpatialQuery) -> (Duration, Result<Value, BackendError>) + Send + Sync,
{
    pub fn new(script: F) -> Self {
        Self {
            script,
            catalog: Vec::new(),
            document: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_catalog(mut self, catalog: &[&str]) -> Self {
        self.catalog = catalog.iter().map(|f| Filter::from(*f)).collect();
        self
    }

    pub fn with_document(mut self, document: Value) -> Self {
        self.document = Some(document);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<F> SpatialBackend for ScriptedBackend<F>
where
    F: Fn(&SpatialQuery) -> (Duration, Result<Value, BackendError>) + Send + Sync,
{
    async fn search(&self, query: &SpatialQuery) -> Result<Value, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (delay, result) = (self.script)(query);
        tokio::time::sleep(delay).await;
        result
    }

    async fn filters(&self, _city: &str) -> Result<Vec<Filter>, BackendError> {
        Ok(self.catalog.clone())
    }

    async fn project(&self, id: &str) -> Result<Value, BackendError> {
        self.document.clone().ok_or_else(|| BackendError::Status {
            status: 404,
            body: format!("no document {id}"),
        })
    }
}

/// One-feature reply at `[lon, lat]`.
pub fn point_reply(lon: f64, lat: f64, kind: &str) -> Value {
    json!([{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [lon, lat]},
            "properties": {"type": kind}
        }]
    }])
}

/// One-feature reply with a null geometry and the position at
/// `properties.location.value.coordinates` as `[lon, lat]`.
pub fn null_location_reply(lon: f64, lat: f64, kind: &str) -> Value {
    json!([{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "geometry": null,
            "properties": {
                "type": kind,
                "location": {"type": "geo:json", "value": {"type": "Point", "coordinates": [lon, lat]}}
            }
        }]
    }])
}

/// Records every callback invocation.
#[derive(Default)]
pub struct RecordingProgress {
    percents: Mutex<Vec<f64>>,
    messages: Mutex<Vec<String>>,
    finished: Mutex<Option<String>>,
}

impl RecordingProgress {
    pub fn percents(&self) -> Vec<f64> {
        self.percents.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Option<String> {
        self.finished.lock().unwrap().clone()
    }
}

impl ProgressCallback for RecordingProgress {
    fn set_percent(&self, percent: f64) {
        self.percents.lock().unwrap().push(percent);
    }

    fn set_message(&self, msg: String) {
        self.messages.lock().unwrap().push(msg);
    }

    fn finish(&self, msg: String) {
        *self.finished.lock().unwrap() = Some(msg);
    }
}

/// Ring of `count` vertices at `radius_m` around `center`.
pub fn circle_ring(center: Vertex, radius_m: f64, count: usize) -> Vec<Vertex> {
    let origin = Point::new(center.longitude, center.latitude);
    (0..count)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let bearing = 360.0 * i as f64 / count as f64;
            let p = Haversine.destination(origin, bearing, radius_m);
            Vertex::new(p.y(), p.x())
        })
        .collect()
}

/// Axis-aligned square ring with its closing duplicate.
pub fn square_ring(lat: f64, lon: f64, size: f64) -> Vec<Vertex> {
    vec![
        Vertex::new(lat, lon),
        Vertex::new(lat, lon + size),
        Vertex::new(lat + size, lon + size),
        Vertex::new(lat + size, lon),
        Vertex::new(lat, lon),
    ]
}
