#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry types for drawn search areas.
//!
//! Everything in this crate uses the `(latitude, longitude)` convention.
//! Backend responses and `GeoJSON` input carry `[longitude, latitude]`
//! positions; the swap happens once, at the parsing boundary.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A point on the map in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Vertex {
    /// Creates a vertex from a `(latitude, longitude)` pair.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Creates a vertex from a `GeoJSON`-ordered `[longitude, latitude]`
    /// position.
    #[must_use]
    pub const fn from_lon_lat(longitude: f64, latitude: f64) -> Self {
        Self::new(latitude, longitude)
    }

    /// Returns `true` when both components are finite numbers.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Exactly three vertices. No winding order is implied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Triangle(pub [Vertex; 3]);

impl Triangle {
    /// The triangle's vertices.
    #[must_use]
    pub const fn vertices(&self) -> &[Vertex; 3] {
        &self.0
    }
}

/// Discriminant of a [`Shape`], used for logging and fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ShapeKind {
    /// An arbitrary ring.
    Polygon,
    /// A center point plus a radius.
    Circle,
}

/// A classified search area.
///
/// Produced once per drawn layer; downstream code matches on the variant
/// and never re-inspects the geometry to guess what it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    /// Ring kept exactly as drawn.
    Polygon {
        /// Ring vertices in drawing order. The closing duplicate, if the
        /// input carried one, is preserved.
        vertices: Vec<Vertex>,
    },
    /// Circle around `center`.
    Circle {
        /// Circle center.
        center: Vertex,
        /// Radius in meters.
        radius_m: f64,
    },
}

impl Shape {
    /// Returns the variant discriminant.
    #[must_use]
    pub const fn kind(&self) -> ShapeKind {
        match self {
            Self::Polygon { .. } => ShapeKind::Polygon,
            Self::Circle { .. } => ShapeKind::Circle,
        }
    }
}

/// A shape as it comes off the drawing canvas, before classification.
///
/// The canvas produces either a free-form ring (polygons, rectangles and
/// hand-drawn circles approximated by many vertices) or a native circle
/// that already knows its radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawnLayer {
    /// A closed ring of vertices.
    Ring {
        /// Vertices in drawing order.
        vertices: Vec<Vertex>,
    },
    /// A circle drawn with the circle tool.
    Circle {
        /// Circle center.
        center: Vertex,
        /// Radius in meters.
        radius_m: f64,
    },
}

impl DrawnLayer {
    /// Number of vertices that describe this layer (1 for a circle).
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        match self {
            Self::Ring { vertices } => vertices.len(),
            Self::Circle { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_from_lon_lat_swaps_order() {
        let v = Vertex::from_lon_lat(24.94, 60.16);
        assert!((v.latitude - 60.16).abs() < f64::EPSILON);
        assert!((v.longitude - 24.94).abs() < f64::EPSILON);
    }

    #[test]
    fn vertex_serializes_with_wire_field_names() {
        let json = serde_json::to_value(Vertex::new(60.1, 24.9)).unwrap();
        assert_eq!(json, serde_json::json!({"latitude": 60.1, "longitude": 24.9}));
    }

    #[test]
    fn triangle_serializes_as_plain_array() {
        let tri = Triangle([
            Vertex::new(0.0, 0.0),
            Vertex::new(1.0, 0.0),
            Vertex::new(0.0, 1.0),
        ]);
        let json = serde_json::to_value(tri).unwrap();
        assert_eq!(json.as_array().map(Vec::len), Some(3));
        assert_eq!(json[1]["latitude"], serde_json::json!(1.0));
    }

    #[test]
    fn shape_kind_display() {
        let circle = Shape::Circle {
            center: Vertex::new(0.0, 0.0),
            radius_m: 10.0,
        };
        assert_eq!(circle.kind().to_string(), "circle");
        assert_eq!(ShapeKind::Polygon.as_ref(), "polygon");
    }

    #[test]
    fn non_finite_vertex_detected() {
        assert!(!Vertex::new(f64::NAN, 1.0).is_finite());
        assert!(Vertex::new(1.0, 1.0).is_finite());
    }
}
