#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Turns classified shapes and filters into backend queries.
//!
//! Batching policy, per filter:
//!
//! * every [`Shape::Circle`] is merged into **one** multipoint radius query,
//! * every [`Shape::Polygon`] is tessellated on its own and sent as its own
//!   multipolygon query.
//!
//! Each planned query remembers how many drawn shapes it stands for, so
//! progress can still be attributed per shape when circles are batched.

use std::collections::BTreeSet;

use spotted_geometry::GeometryError;
use spotted_geometry_models::{Shape, Triangle};
use spotted_query_models::{Filter, QueryGeometry, RadiusArea, SpatialQuery};

/// A query ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedQuery {
    /// The request itself.
    pub query: SpatialQuery,
    /// Number of drawn shapes covered by this request (more than one only
    /// for batched circles).
    pub shape_count: usize,
}

/// A shape that could not be turned into queries.
#[derive(Debug)]
pub struct PlanFailure {
    /// Index of the shape in the slice given to [`QueryBuilder::build`].
    pub shape_index: usize,
    /// Filters whose queries were not built because of this failure.
    pub filters: Vec<Filter>,
    /// Why the shape was rejected.
    pub error: GeometryError,
}

/// Output of [`QueryBuilder::build`].
#[derive(Debug, Default)]
pub struct QueryPlan {
    /// Queries to send.
    pub queries: Vec<PlannedQuery>,
    /// Shapes that produced no queries.
    pub failures: Vec<PlanFailure>,
}

impl QueryPlan {
    /// Number of network requests this plan will issue.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.queries.len()
    }

    /// Number of (shape, filter) pairs covered by the planned queries.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.queries.iter().map(|q| q.shape_count).sum()
    }
}

/// Builds [`QueryPlan`]s for one city.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    city: String,
    external: bool,
}

impl QueryBuilder {
    /// Creates a builder for `city` that searches inside circles.
    #[must_use]
    pub fn new(city: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            external: false,
        }
    }

    /// Sets whether circle searches match points outside the circle.
    #[must_use]
    pub const fn with_external(mut self, external: bool) -> Self {
        self.external = external;
        self
    }

    /// The city every built query targets.
    #[must_use]
    pub fn city(&self) -> &str {
        &self.city
    }

    /// Plans every query for `shapes` × `filters`.
    ///
    /// Duplicate filters are searched once. A polygon that fails to
    /// tessellate is reported in [`QueryPlan::failures`] and contributes no
    /// queries; the remaining shapes are unaffected.
    #[must_use]
    pub fn build(&self, shapes: &[Shape], filters: &[Filter]) -> QueryPlan {
        let mut seen = BTreeSet::new();
        let filters: Vec<&Filter> = filters.iter().filter(|f| seen.insert(*f)).collect();

        let mut circles = Vec::new();
        let mut polygons: Vec<Vec<Triangle>> = Vec::new();
        let mut plan = QueryPlan::default();

        for (shape_index, shape) in shapes.iter().enumerate() {
            match shape {
                Shape::Circle { center, radius_m } => circles.push(RadiusArea {
                    point: *center,
                    radius: *radius_m,
                    external: self.external,
                }),
                Shape::Polygon { vertices } => match spotted_geometry::tessellate(vertices) {
                    Ok(triangles) => polygons.push(triangles),
                    Err(error) => {
                        log::warn!("Shape {shape_index} cannot be searched: {error}");
                        plan.failures.push(PlanFailure {
                            shape_index,
                            filters: filters.iter().map(|f| (*f).clone()).collect(),
                            error,
                        });
                    }
                },
            }
        }

        for filter in filters {
            if !circles.is_empty() {
                plan.queries.push(PlannedQuery {
                    query: self.query(filter, QueryGeometry::Circles(circles.clone())),
                    shape_count: circles.len(),
                });
            }
            for triangles in &polygons {
                plan.queries.push(PlannedQuery {
                    query: self.query(filter, QueryGeometry::Triangles(triangles.clone())),
                    shape_count: 1,
                });
            }
        }

        log::debug!(
            "Planned {} requests covering {} shape/filter pairs ({} circles, {} polygons, {} rejected)",
            plan.request_count(),
            plan.unit_count(),
            circles.len(),
            polygons.len(),
            plan.failures.len(),
        );

        plan
    }

    fn query(&self, filter: &Filter, geometry: QueryGeometry) -> SpatialQuery {
        SpatialQuery {
            city: self.city.clone(),
            filter: filter.clone(),
            geometry,
        }
    }
}
