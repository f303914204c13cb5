//! Conversion between drawn layers and `GeoJSON` features.
//!
//! The drawing canvas exports each shape as a `GeoJSON` `Feature`:
//!
//! * polygons and rectangles as a `Polygon` (only the exterior ring is used),
//! * circles as a `Point` with a `radius` property in meters.
//!
//! Saved projects store the same features, one JSON string per layer.
//! Positions are `[longitude, latitude]`.

use geojson::{Feature, GeoJson, Geometry, JsonObject, Value};
use spotted_geometry_models::{DrawnLayer, Vertex};

use crate::GeometryError;

/// Property holding a native circle's radius.
const RADIUS_PROPERTY: &str = "radius";

/// Parses one `GeoJSON` feature into a drawn layer.
///
/// # Errors
///
/// Returns [`GeometryError::UnsupportedLayer`] if the feature has no
/// geometry, an unsupported geometry type, a malformed position, or a
/// `Point` without a numeric `radius` property.
pub fn layer_from_feature(feature: &Feature) -> Result<DrawnLayer, GeometryError> {
    let geometry = feature
        .geometry
        .as_ref()
        .ok_or_else(|| unsupported("feature has no geometry"))?;

    match &geometry.value {
        Value::Polygon(rings) => {
            let exterior = rings
                .first()
                .ok_or_else(|| unsupported("polygon has no exterior ring"))?;
            let vertices = exterior
                .iter()
                .map(|p| position_to_vertex(p))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(DrawnLayer::Ring { vertices })
        }
        Value::Point(position) => {
            let radius_m = feature
                .property(RADIUS_PROPERTY)
                .and_then(serde_json::Value::as_f64)
                .ok_or_else(|| unsupported("point feature has no numeric radius"))?;
            Ok(DrawnLayer::Circle {
                center: position_to_vertex(position)?,
                radius_m,
            })
        }
        _ => Err(unsupported("only Polygon and Point geometries are drawable")),
    }
}

/// Parses a drawn layer from its JSON text, as stored in a saved project.
///
/// # Errors
///
/// Returns [`GeometryError`] if the text is not a `GeoJSON` feature or the
/// feature is not a drawable layer.
pub fn layer_from_str(text: &str) -> Result<DrawnLayer, GeometryError> {
    match text.parse::<GeoJson>()? {
        GeoJson::Feature(feature) => layer_from_feature(&feature),
        GeoJson::Geometry(_) | GeoJson::FeatureCollection(_) => {
            Err(unsupported("expected a single Feature"))
        }
    }
}

/// Parses every layer from a `GeoJSON` document.
///
/// Accepts a `FeatureCollection` or a single `Feature`.
///
/// # Errors
///
/// Returns [`GeometryError`] if the document is not valid `GeoJSON` or any
/// feature is not a drawable layer.
pub fn layers_from_geojson(text: &str) -> Result<Vec<DrawnLayer>, GeometryError> {
    match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection
            .features
            .iter()
            .map(layer_from_feature)
            .collect(),
        GeoJson::Feature(feature) => Ok(vec![layer_from_feature(&feature)?]),
        GeoJson::Geometry(_) => Err(unsupported("expected a Feature or FeatureCollection")),
    }
}

/// Converts a drawn layer back into the canvas' `GeoJSON` feature form.
///
/// Rings are closed if they were not already.
#[must_use]
pub fn layer_to_feature(layer: &DrawnLayer) -> Feature {
    let mut properties = JsonObject::new();

    let value = match layer {
        DrawnLayer::Ring { vertices } => {
            let mut ring: Vec<Vec<f64>> = vertices.iter().map(vertex_to_position).collect();
            if let Some(first) = ring.first().cloned()
                && ring.last() != Some(&first)
            {
                ring.push(first);
            }
            Value::Polygon(vec![ring])
        }
        DrawnLayer::Circle { center, radius_m } => {
            properties.insert(RADIUS_PROPERTY.to_string(), serde_json::json!(radius_m));
            Value::Point(vertex_to_position(center))
        }
    };

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn position_to_vertex(position: &[f64]) -> Result<Vertex, GeometryError> {
    match position {
        [lon, lat, ..] => Ok(Vertex::from_lon_lat(*lon, *lat)),
        _ => Err(unsupported("position has fewer than 2 elements")),
    }
}

fn vertex_to_position(v: &Vertex) -> Vec<f64> {
    vec![v.longitude, v.latitude]
}

fn unsupported(message: &str) -> GeometryError {
    GeometryError::UnsupportedLayer {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_polygon_feature_with_lon_lat_swap() {
        let text = r#"{
            "type": "Feature",
            "properties": {},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[24.9, 60.1], [25.0, 60.1], [25.0, 60.2], [24.9, 60.1]]]
            }
        }"#;
        let layer = layer_from_str(text).unwrap();
        let DrawnLayer::Ring { vertices } = layer else {
            panic!("expected ring");
        };
        assert_eq!(vertices.len(), 4);
        assert_eq!(vertices[0], Vertex::new(60.1, 24.9));
        assert_eq!(vertices[2], Vertex::new(60.2, 25.0));
    }

    #[test]
    fn parses_native_circle() {
        let text = r#"{
            "type": "Feature",
            "properties": {"radius": 350.5},
            "geometry": {"type": "Point", "coordinates": [24.94, 60.17]}
        }"#;
        assert_eq!(
            layer_from_str(text).unwrap(),
            DrawnLayer::Circle {
                center: Vertex::new(60.17, 24.94),
                radius_m: 350.5
            }
        );
    }

    #[test]
    fn point_without_radius_is_rejected() {
        let text = r#"{
            "type": "Feature",
            "properties": {},
            "geometry": {"type": "Point", "coordinates": [24.94, 60.17]}
        }"#;
        assert!(matches!(
            layer_from_str(text),
            Err(GeometryError::UnsupportedLayer { .. })
        ));
    }

    #[test]
    fn line_string_is_rejected() {
        let text = r#"{
            "type": "Feature",
            "properties": {},
            "geometry": {"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]}
        }"#;
        assert!(layer_from_str(text).is_err());
    }

    #[test]
    fn collection_yields_every_layer() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"radius": 100},
                 "geometry": {"type": "Point", "coordinates": [24.0, 60.0]}},
                {"type": "Feature", "properties": null,
                 "geometry": {"type": "Polygon",
                   "coordinates": [[[24.0, 60.0], [24.1, 60.0], [24.1, 60.1], [24.0, 60.0]]]}}
            ]
        }"#;
        let layers = layers_from_geojson(text).unwrap();
        assert_eq!(layers.len(), 2);
        assert!(matches!(layers[0], DrawnLayer::Circle { .. }));
        assert!(matches!(layers[1], DrawnLayer::Ring { .. }));
    }

    #[test]
    fn open_ring_is_closed_on_export() {
        let layer = DrawnLayer::Ring {
            vertices: vec![
                Vertex::new(60.0, 24.0),
                Vertex::new(60.0, 24.1),
                Vertex::new(60.1, 24.1),
            ],
        };
        let feature = layer_to_feature(&layer);
        let Some(Value::Polygon(rings)) = feature.geometry.map(|g| g.value) else {
            panic!("expected polygon");
        };
        assert_eq!(rings[0].len(), 4);
        assert_eq!(rings[0][0], vec![24.0, 60.0]);
        assert_eq!(rings[0][3], vec![24.0, 60.0]);
    }

    #[test]
    fn circle_round_trips_through_text() {
        let layer = DrawnLayer::Circle {
            center: Vertex::new(60.17, 24.94),
            radius_m: 120.0,
        };
        let text = layer_to_feature(&layer).to_string();
        assert_eq!(layer_from_str(&text).unwrap(), layer);
    }
}
