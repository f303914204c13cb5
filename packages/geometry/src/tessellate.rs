//! Ear-clipping tessellation of polygon rings.
//!
//! The spatial backend intersects points against triangle sets, so every
//! polygon is split into triangles before it is queried. Each triangle is
//! emitted as three standalone vertices; no index buffer is shared with the
//! caller.

use geo::{Area as _, TriangulateEarcut as _};
use spotted_geometry_models::{Triangle, Vertex};

use crate::{GeometryError, from_coord, ring_polygon};

/// Maximum relative difference between the ring's area and the summed
/// triangle area before the tessellation is rejected.
const AREA_TOLERANCE: f64 = 1e-6;

/// Splits a simple (possibly non-convex) ring into triangles.
///
/// The output covers the ring's area exactly, with triangles meeting only
/// along shared edges.
///
/// # Errors
///
/// Returns [`GeometryError`] if the ring is degenerate, the ear clipper
/// produces nothing, or the produced triangles do not cover the ring (as
/// happens with self-intersecting rings). Callers must not fall back to
/// sending empty geometry.
pub fn tessellate(ring: &[Vertex]) -> Result<Vec<Triangle>, GeometryError> {
    let polygon = ring_polygon(ring)?;
    let ring_area = polygon.unsigned_area();

    let triangles = polygon.earcut_triangles();
    if triangles.is_empty() || ring_area <= 0.0 {
        return Err(GeometryError::EmptyTessellation);
    }

    let triangle_area: f64 = triangles.iter().map(geo::Area::unsigned_area).sum();
    if (triangle_area - ring_area).abs() > ring_area * AREA_TOLERANCE {
        return Err(GeometryError::MalformedTessellation {
            ring_area,
            triangle_area,
        });
    }

    log::trace!(
        "Tessellated {}-vertex ring into {} triangles",
        ring.len(),
        triangles.len()
    );

    Ok(triangles
        .into_iter()
        .map(|t| Triangle([from_coord(t.0), from_coord(t.1), from_coord(t.2)]))
        .collect())
}
