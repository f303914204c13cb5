//! Circle-versus-polygon classification of drawn rings.
//!
//! Hand-drawn circles reach us as rings with many vertices. Sending them to
//! the backend as a radius query is far cheaper than tessellating them, so
//! rings that look like circles are converted:
//!
//! * compute the area-weighted centroid `C` of the ring,
//! * take `R` as the haversine distance from the first vertex to `C`,
//! * a ring with more than [`MAX_POLYGON_VERTICES`] vertices whose every
//!   vertex lies within [`RADIUS_TOLERANCE_M`] of `R` is a circle.
//!
//! Rings with [`MAX_POLYGON_VERTICES`] or fewer vertices are always kept as
//! polygons, even when they are geometrically circular.

use geo::{Centroid as _, Distance as _, Haversine, Point};
use spotted_geometry_models::{DrawnLayer, Shape, Vertex};

use crate::{GeometryError, from_coord, ring_polygon, to_coord};

/// Rings with this many vertices or fewer are never treated as circles.
pub const MAX_POLYGON_VERTICES: usize = 20;

/// Allowed deviation, in meters, of each vertex's distance from the radius.
pub const RADIUS_TOLERANCE_M: f64 = 1.0;

/// Classifies a drawn ring as a [`Shape::Circle`] or [`Shape::Polygon`].
///
/// The vertex count includes the closing duplicate when the ring carries
/// one. Polygons keep the ring exactly as given.
///
/// # Errors
///
/// Returns [`GeometryError`] if the ring has fewer than three distinct
/// vertices or contains non-finite coordinates.
pub fn classify(ring: &[Vertex]) -> Result<Shape, GeometryError> {
    let polygon = ring_polygon(ring)?;
    let centroid = polygon.centroid().ok_or(GeometryError::DegenerateRing {
        distinct: ring.len(),
    })?;

    let first = Point::from(to_coord(&ring[0]));
    let radius_m = Haversine.distance(first, centroid);

    if ring.len() <= MAX_POLYGON_VERTICES {
        log::trace!(
            "Ring with {} vertices kept as polygon (threshold {MAX_POLYGON_VERTICES})",
            ring.len()
        );
        return Ok(Shape::Polygon {
            vertices: ring.to_vec(),
        });
    }

    let outlier = ring.iter().position(|v| {
        let distance = Haversine.distance(Point::from(to_coord(v)), centroid);
        (distance - radius_m).abs() > RADIUS_TOLERANCE_M
    });

    if let Some(index) = outlier {
        log::trace!(
            "Ring with {} vertices is a polygon: vertex {index} off radius {radius_m:.2}m",
            ring.len()
        );
        return Ok(Shape::Polygon {
            vertices: ring.to_vec(),
        });
    }

    let center = from_coord(centroid.0);
    log::debug!(
        "Ring with {} vertices classified as circle at ({:.6}, {:.6}) r={radius_m:.2}m",
        ring.len(),
        center.latitude,
        center.longitude,
    );

    Ok(Shape::Circle { center, radius_m })
}

/// Classifies any drawn layer.
///
/// Rings go through [`classify`]; native circles are validated and passed
/// through unchanged.
///
/// # Errors
///
/// Returns [`GeometryError`] for degenerate rings, non-finite coordinates,
/// or a circle radius that is not a positive finite number.
pub fn classify_layer(layer: &DrawnLayer) -> Result<Shape, GeometryError> {
    match layer {
        DrawnLayer::Ring { vertices } => classify(vertices),
        DrawnLayer::Circle { center, radius_m } => {
            if !center.is_finite() {
                return Err(GeometryError::NonFiniteCoordinate { index: 0 });
            }
            if !radius_m.is_finite() || *radius_m <= 0.0 {
                return Err(GeometryError::InvalidRadius {
                    radius_m: *radius_m,
                });
            }
            Ok(Shape::Circle {
                center: *center,
                radius_m: *radius_m,
            })
        }
    }
}
