#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spatial query types and backend request bodies.
//!
//! A [`SpatialQuery`] is the unit of work sent to the backend: one filter,
//! one city, and either a triangle set (polygon search) or a list of
//! radius areas (circle search). The request bodies mirror the backend's
//! JSON contract exactly, so they are kept separate from the query itself.

use std::fmt;

use serde::{Deserialize, Serialize};
use spotted_geometry_models::{Triangle, Vertex};
use strum_macros::{AsRefStr, Display, EnumString};

/// A point-of-interest category token, e.g. `"benches"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(String);

impl Filter {
    /// Creates a filter from any string-like token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Filter {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for Filter {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// One circle of a multipoint radius search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadiusArea {
    /// Circle center.
    pub point: Vertex,
    /// Radius in meters.
    pub radius: f64,
    /// `false` matches points inside the circle, `true` points outside it.
    pub external: bool,
}

/// Geometry carried by a [`SpatialQuery`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryGeometry {
    /// Tessellated polygon; matches points inside any triangle.
    Triangles(Vec<Triangle>),
    /// Batched circles for a single filter.
    Circles(Vec<RadiusArea>),
}

/// Backend endpoint a query is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Endpoint {
    /// `POST /api/multipolygondata/`
    MultiPolygon,
    /// `POST /api/multipointradiusdata/`
    MultiPointRadius,
}

impl Endpoint {
    /// Path relative to the backend base URL.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::MultiPolygon => "/api/multipolygondata/",
            Self::MultiPointRadius => "/api/multipointradiusdata/",
        }
    }
}

/// A single backend search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialQuery {
    /// City whose index is searched.
    pub city: String,
    /// Category to match.
    pub filter: Filter,
    /// Area to search.
    pub geometry: QueryGeometry,
}

impl SpatialQuery {
    /// The endpoint this query must be posted to.
    #[must_use]
    pub const fn endpoint(&self) -> Endpoint {
        match self.geometry {
            QueryGeometry::Triangles(_) => Endpoint::MultiPolygon,
            QueryGeometry::Circles(_) => Endpoint::MultiPointRadius,
        }
    }

    /// The JSON request body for this query.
    #[must_use]
    pub fn body(&self) -> QueryBody<'_> {
        let filter = [&self.filter];
        match &self.geometry {
            QueryGeometry::Triangles(triangles) => QueryBody::MultiPolygon(MultiPolygonBody {
                city: &self.city,
                filter,
                polygon: triangles,
            }),
            QueryGeometry::Circles(areas) => QueryBody::MultiPointRadius(MultiPointRadiusBody {
                city: &self.city,
                filter,
                multipoint: areas,
            }),
        }
    }
}

/// Body of a `multipolygondata` request.
#[derive(Debug, Clone, Serialize)]
pub struct MultiPolygonBody<'a> {
    /// City whose index is searched.
    pub city: &'a str,
    /// Always a single filter.
    pub filter: [&'a Filter; 1],
    /// Triangles of one polygon.
    pub polygon: &'a [Triangle],
}

/// Body of a `multipointradiusdata` request.
#[derive(Debug, Clone, Serialize)]
pub struct MultiPointRadiusBody<'a> {
    /// City whose index is searched.
    pub city: &'a str,
    /// Always a single filter.
    pub filter: [&'a Filter; 1],
    /// All circles drawn for this filter.
    pub multipoint: &'a [RadiusArea],
}

/// Either request body; serializes as the inner body.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum QueryBody<'a> {
    /// Polygon search body.
    MultiPolygon(MultiPolygonBody<'a>),
    /// Circle search body.
    MultiPointRadius(MultiPointRadiusBody<'a>),
}

/// Body of a filter catalogue request.
#[derive(Debug, Clone, Serialize)]
pub struct FilterCatalogBody<'a> {
    /// City to list filters for.
    pub city: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polygon_body_matches_backend_contract() {
        let query = SpatialQuery {
            city: "Helsinki".to_string(),
            filter: Filter::from("benches"),
            geometry: QueryGeometry::Triangles(vec![Triangle([
                Vertex::new(60.0, 24.0),
                Vertex::new(60.0, 24.1),
                Vertex::new(60.1, 24.1),
            ])]),
        };
        assert_eq!(query.endpoint().path(), "/api/multipolygondata/");
        let json = serde_json::to_value(query.body()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "city": "Helsinki",
                "filter": ["benches"],
                "polygon": [[
                    {"latitude": 60.0, "longitude": 24.0},
                    {"latitude": 60.0, "longitude": 24.1},
                    {"latitude": 60.1, "longitude": 24.1}
                ]]
            })
        );
    }

    #[test]
    fn radius_body_matches_backend_contract() {
        let query = SpatialQuery {
            city: "Helsinki".to_string(),
            filter: Filter::from("lighting"),
            geometry: QueryGeometry::Circles(vec![RadiusArea {
                point: Vertex::new(60.1, 24.9),
                radius: 500.0,
                external: false,
            }]),
        };
        assert_eq!(query.endpoint(), Endpoint::MultiPointRadius);
        let json = serde_json::to_value(query.body()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "city": "Helsinki",
                "filter": ["lighting"],
                "multipoint": [{
                    "point": {"latitude": 60.1, "longitude": 24.9},
                    "radius": 500.0,
                    "external": false
                }]
            })
        );
    }

    #[test]
    fn filter_is_transparent_string() {
        let filter: Filter = serde_json::from_str("\"benches\"").unwrap();
        assert_eq!(filter.as_str(), "benches");
        assert_eq!(filter.to_string(), "benches");
    }
}
