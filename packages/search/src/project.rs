//! Saved projects.
//!
//! A project document stores the filters searched, the drawn layers (one
//! JSON-encoded `GeoJSON` feature per layer) and the markers found, as
//! `[lat, lon]` pairs per filter under
//! `geojson.properties.features[i].geometry.coordinates[0]`.
//!
//! [`search_artifact`] and [`save_body`] build the same structures from a
//! finished round so the surrounding application can persist it.

use serde::Serialize;
use serde_json::{Value, json};
use spotted_geometry::layer::{layer_from_str, layer_to_feature};
use spotted_geometry_models::DrawnLayer;
use spotted_query_models::Filter;

use crate::SearchError;
use crate::aggregate::{MarkerGroups, ResultAggregator};

/// Value of `requestJson.type` in a saved project.
pub const REQUEST_TYPE: &str = "Polygon/PointRadius/Multipolygon";

/// A project reloaded from the backend.
#[derive(Debug)]
pub struct SavedProject {
    /// Document identifier, when the document carries one.
    pub id: Option<String>,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// City the project was searched in.
    pub city: String,
    /// Filters searched, in saved order.
    pub filters: Vec<Filter>,
    /// Drawn layers to put back on the canvas.
    pub layers: Vec<DrawnLayer>,
    /// Markers rebuilt from the saved coordinates.
    pub markers: MarkerGroups,
}

/// Rebuilds a project from its document.
///
/// Layers that cannot be decoded are skipped with a warning.
///
/// # Errors
///
/// Returns [`SearchError::Document`] if the document has no `filter` list.
pub fn parse_project(doc: &Value) -> Result<SavedProject, SearchError> {
    let filters: Vec<Filter> = doc
        .get("filter")
        .and_then(Value::as_array)
        .ok_or_else(|| SearchError::Document {
            message: "missing filter list".to_string(),
        })?
        .iter()
        .filter_map(Value::as_str)
        .map(Filter::from)
        .collect();

    let text = |key: &str| {
        doc.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let id = doc
        .get("id")
        .or_else(|| doc.get("_id"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let layers = parse_layers(doc.get("layers"));

    let features = doc
        .pointer("/geojson/properties/features")
        .or_else(|| doc.pointer("/geojson/features"))
        .and_then(Value::as_array);

    let mut aggregator = ResultAggregator::with_filters(&filters);
    for (index, filter) in filters.iter().enumerate() {
        let Some(pairs) = features
            .and_then(|f| f.get(index))
            .and_then(|f| f.pointer("/geometry/coordinates/0"))
        else {
            log::warn!("Project has no saved markers for filter {filter}");
            continue;
        };
        let summary = aggregator.ingest_saved(filter, pairs);
        if summary.skipped > 0 {
            log::warn!(
                "Filter {filter}: skipped {} malformed saved coordinates",
                summary.skipped
            );
        }
    }

    log::info!(
        "Reloaded project with {} layers and {} markers over {} filters",
        layers.len(),
        aggregator.marker_count(),
        filters.len()
    );

    Ok(SavedProject {
        id,
        name: text("name"),
        description: text("description"),
        city: text("city"),
        filters,
        layers,
        markers: aggregator.into_groups(),
    })
}

fn parse_layers(value: Option<&Value>) -> Vec<DrawnLayer> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let parsed = match item {
                Value::String(text) => layer_from_str(text),
                other => layer_from_str(&other.to_string()),
            };
            parsed
                .map_err(|e| log::warn!("Saved layer {index} skipped: {e}"))
                .ok()
        })
        .collect()
}

/// Builds the persisted result artifact: a `Feature` whose `features` hold,
/// per filter, a `Point` geometry wrapping every marker as `[lat, lon]`.
#[must_use]
pub fn search_artifact(markers: &MarkerGroups, filters: &[Filter]) -> Value {
    let features: Vec<Value> = filters
        .iter()
        .map(|filter| {
            let coordinates: Vec<[f64; 2]> = markers
                .get(filter)
                .map(Vec::as_slice)
                .unwrap_or_default()
                .iter()
                .map(|m| [m.position.latitude, m.position.longitude])
                .collect();
            json!({
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [coordinates]},
                "properties": {"name": filter},
            })
        })
        .collect();

    json!({"type": "Feature", "features": features})
}

/// User-supplied project metadata.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetails {
    /// City searched.
    pub city: String,
    /// Filters searched.
    pub filters: Vec<Filter>,
    /// Display name.
    pub query_name: String,
    /// Free-text description.
    pub query_description: String,
    /// Layers, one JSON-encoded `GeoJSON` feature each.
    pub layers: Vec<String>,
}

impl ProjectDetails {
    /// Details for a round over `layers`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Json`] if a layer cannot be encoded.
    pub fn new(
        city: impl Into<String>,
        filters: Vec<Filter>,
        name: impl Into<String>,
        description: impl Into<String>,
        layers: &[DrawnLayer],
    ) -> Result<Self, SearchError> {
        let layers = layers
            .iter()
            .map(|layer| serde_json::to_string(&layer_to_feature(layer)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            city: city.into(),
            filters,
            query_name: name.into(),
            query_description: description.into(),
            layers,
        })
    }
}

/// Builds the body the application posts to save a project.
#[must_use]
pub fn save_body(details: &ProjectDetails, markers: &MarkerGroups) -> Value {
    json!({
        "city": details.city,
        "filter": details.filters,
        "name": details.query_name,
        "description": details.query_description,
        "layers": details.layers,
        "requestJson": {"type": REQUEST_TYPE, "value": details},
        "geojson": search_artifact(markers, &details.filters),
    })
}
