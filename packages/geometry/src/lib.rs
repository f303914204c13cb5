#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry pipeline for drawn search areas.
//!
//! Turns what the user drew on the map into something the spatial backend
//! can query:
//!
//! 1. [`classify`] decides whether a ring is really a circle (many vertices,
//!    all roughly equidistant from the centroid) or an arbitrary polygon.
//! 2. [`tessellate`] splits a polygon into triangles, since the backend only
//!    intersects against triangle sets.
//! 3. [`layer`] converts drawn layers to and from `GeoJSON` features, the
//!    format used both by the drawing canvas and by saved projects.
//!
//! All geodesic distances use the haversine formula on the mean earth
//! radius, in meters.

pub mod classify;
pub mod fingerprint;
pub mod layer;
pub mod tessellate;

pub use classify::{classify, classify_layer};
pub use fingerprint::fingerprint;
pub use tessellate::tessellate;

use spotted_geometry_models::Vertex;
use thiserror::Error;

/// Errors from classification, tessellation and layer parsing.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// The ring has too few distinct vertices to enclose any area.
    #[error("Degenerate ring: {distinct} distinct vertices (need at least 3)")]
    DegenerateRing {
        /// Number of distinct vertices found.
        distinct: usize,
    },

    /// A vertex has a NaN or infinite component.
    #[error("Non-finite coordinate at vertex {index}")]
    NonFiniteCoordinate {
        /// Position of the offending vertex in the ring.
        index: usize,
    },

    /// A circle radius is not a positive finite number of meters.
    #[error("Invalid circle radius: {radius_m}")]
    InvalidRadius {
        /// The rejected radius.
        radius_m: f64,
    },

    /// Ear clipping produced no triangles (collinear or self-cancelling
    /// ring).
    #[error("Tessellation produced no triangles")]
    EmptyTessellation,

    /// The triangles do not cover the ring's area, which happens when the
    /// ring intersects itself.
    #[error("Tessellation does not cover the ring: ring area {ring_area}, triangle area {triangle_area}")]
    MalformedTessellation {
        /// Planar area of the ring, in square degrees.
        ring_area: f64,
        /// Summed planar area of the produced triangles.
        triangle_area: f64,
    },

    /// `GeoJSON` input could not be parsed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] Box<geojson::Error>),

    /// A `GeoJSON` feature does not describe a drawable layer.
    #[error("Unsupported layer: {message}")]
    UnsupportedLayer {
        /// Description of what was wrong with the feature.
        message: String,
    },
}

impl From<geojson::Error> for GeometryError {
    fn from(e: geojson::Error) -> Self {
        Self::GeoJson(Box::new(e))
    }
}

/// Converts a vertex into a `geo` coordinate (`x` = longitude, `y` = latitude).
#[must_use]
pub(crate) const fn to_coord(v: &Vertex) -> geo::Coord<f64> {
    geo::Coord {
        x: v.longitude,
        y: v.latitude,
    }
}

/// Converts a `geo` coordinate back into a vertex.
#[must_use]
pub(crate) const fn from_coord(c: geo::Coord<f64>) -> Vertex {
    Vertex::new(c.y, c.x)
}

/// Builds a `geo` polygon from a ring after validating it.
///
/// Rejects non-finite coordinates and rings with fewer than three distinct
/// vertices. The closing vertex is optional.
pub(crate) fn ring_polygon(ring: &[Vertex]) -> Result<geo::Polygon<f64>, GeometryError> {
    if let Some(index) = ring.iter().position(|v| !v.is_finite()) {
        return Err(GeometryError::NonFiniteCoordinate { index });
    }

    let distinct = distinct_vertex_count(ring);
    if distinct < 3 {
        return Err(GeometryError::DegenerateRing { distinct });
    }

    let exterior: geo::LineString<f64> = ring.iter().map(to_coord).collect();
    Ok(geo::Polygon::new(exterior, vec![]))
}

fn distinct_vertex_count(ring: &[Vertex]) -> usize {
    let mut seen: Vec<&Vertex> = Vec::with_capacity(ring.len());
    for v in ring {
        if !seen.contains(&v) {
            seen.push(v);
        }
    }
    seen.len()
}
