//! Per-filter marker collection.
//!
//! Replies arrive in any order and are appended as they come. No
//! deduplication happens here: ingesting the same payload twice doubles the
//! group.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use spotted_geometry_models::Vertex;
use spotted_query_models::Filter;

/// A point of interest to render on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    /// Where the marker goes.
    pub position: Vertex,
    /// Popup text.
    pub label: String,
}

/// Markers keyed by the filter that produced them.
pub type MarkerGroups = BTreeMap<Filter, Vec<Marker>>;

/// Counts from one [`ResultAggregator::ingest`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Feature collections seen.
    pub collections: usize,
    /// Markers appended.
    pub added: usize,
    /// Features dropped because no coordinate could be resolved.
    pub skipped: usize,
}

/// Accumulates markers for one round.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    groups: MarkerGroups,
}

impl ResultAggregator {
    /// An aggregator with no groups.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An aggregator with an empty group per filter, so filters without
    /// results still show up.
    #[must_use]
    pub fn with_filters(filters: &[Filter]) -> Self {
        Self {
            groups: filters.iter().map(|f| (f.clone(), Vec::new())).collect(),
        }
    }

    /// Appends every feature of a search reply to `filter`'s group.
    ///
    /// `payload` is an array of `FeatureCollection`-like objects, or a single
    /// one. Each marker is labelled with the feature's `properties.type`,
    /// falling back to the filter name.
    pub fn ingest(&mut self, filter: &Filter, payload: &Value) -> IngestSummary {
        let collections: Vec<&Value> = match payload {
            Value::Array(items) => items.iter().collect(),
            Value::Object(_) => vec![payload],
            _ => {
                log::warn!("Ignoring non-collection reply for filter {filter}");
                Vec::new()
            }
        };

        let group = self.groups.entry(filter.clone()).or_default();
        let mut summary = IngestSummary::default();

        for collection in collections {
            summary.collections += 1;
            let Some(features) = collection.get("features").and_then(Value::as_array) else {
                log::debug!("Collection without features for filter {filter}");
                continue;
            };
            for feature in features {
                let Some(position) = feature_position(feature) else {
                    summary.skipped += 1;
                    continue;
                };
                let label = feature
                    .pointer("/properties/type")
                    .and_then(Value::as_str)
                    .unwrap_or_else(|| filter.as_str())
                    .to_string();
                group.push(Marker { position, label });
                summary.added += 1;
            }
        }

        if summary.skipped > 0 {
            log::warn!(
                "Filter {filter}: skipped {} features without coordinates",
                summary.skipped
            );
        }
        log::trace!(
            "Filter {filter}: +{} markers from {} collections",
            summary.added,
            summary.collections
        );

        summary
    }

    /// Appends saved `[lat, lon]` pairs to `filter`'s group, labelled with
    /// the filter name. Saved pairs are already in map order and are not
    /// swapped.
    pub fn ingest_saved(&mut self, filter: &Filter, pairs: &Value) -> IngestSummary {
        let group = self.groups.entry(filter.clone()).or_default();
        let mut summary = IngestSummary {
            collections: 1,
            ..IngestSummary::default()
        };

        for pair in pairs.as_array().map(Vec::as_slice).unwrap_or_default() {
            match pair_components(pair) {
                Some((lat, lon)) => {
                    group.push(Marker {
                        position: Vertex::new(lat, lon),
                        label: filter.to_string(),
                    });
                    summary.added += 1;
                }
                None => summary.skipped += 1,
            }
        }

        summary
    }

    /// Markers collected for `filter`.
    #[must_use]
    pub fn group(&self, filter: &Filter) -> &[Marker] {
        self.groups.get(filter).map_or(&[], Vec::as_slice)
    }

    /// All groups.
    #[must_use]
    pub const fn groups(&self) -> &MarkerGroups {
        &self.groups
    }

    /// Total markers across all groups.
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Consumes the aggregator.
    #[must_use]
    pub fn into_groups(self) -> MarkerGroups {
        self.groups
    }
}

/// Resolves a reply feature's position.
///
/// Uses `geometry.coordinates` when the geometry is present, otherwise
/// `properties.location.value.coordinates`. Both are `[lon, lat]`.
#[must_use]
pub fn feature_position(feature: &Value) -> Option<Vertex> {
    let coordinates = match feature.get("geometry") {
        Some(geometry) if !geometry.is_null() => geometry.get("coordinates"),
        _ => feature.pointer("/properties/location/value/coordinates"),
    }?;

    let (lon, lat) = pair_components(coordinates)?;
    Some(Vertex::from_lon_lat(lon, lat))
}

fn pair_components(value: &Value) -> Option<(f64, f64)> {
    let items = value.as_array()?;
    let first = items.first()?.as_f64()?;
    let second = items.get(1)?.as_f64()?;
    (first.is_finite() && second.is_finite()).then_some((first, second))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn reply() -> Value {
        json!([{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [24.94, 60.16]},
                    "properties": {"type": "Bench"}
                },
                {
                    "type": "Feature",
                    "geometry": null,
                    "properties": {
                        "type": "StreetLight",
                        "location": {"value": {"coordinates": [24.95, 60.17]}}
                    }
                }
            ]
        }])
    }

    #[test]
    fn coordinates_are_swapped_to_lat_lon() {
        let mut agg = ResultAggregator::new();
        let benches = Filter::from("benches");
        agg.ingest(&benches, &reply());

        let markers = agg.group(&benches);
        assert_eq!(markers.len(), 2);
        assert!((markers[0].position.latitude - 60.16).abs() < f64::EPSILON);
        assert!((markers[0].position.longitude - 24.94).abs() < f64::EPSILON);
        assert_eq!(markers[0].label, "Bench");
    }

    #[test]
    fn null_geometry_falls_back_to_location() {
        let mut agg = ResultAggregator::new();
        let filter = Filter::from("lighting");
        agg.ingest(&filter, &reply());

        let marker = &agg.group(&filter)[1];
        assert!((marker.position.latitude - 60.17).abs() < f64::EPSILON);
        assert!((marker.position.longitude - 24.95).abs() < f64::EPSILON);
        assert_eq!(marker.label, "StreetLight");
    }

    #[test]
    fn same_payload_twice_doubles_the_group() {
        let mut agg = ResultAggregator::new();
        let filter = Filter::from("benches");
        agg.ingest(&filter, &reply());
        agg.ingest(&filter, &reply());
        assert_eq!(agg.group(&filter).len(), 4);
        assert_eq!(agg.marker_count(), 4);
    }

    #[test]
    fn label_falls_back_to_filter_name() {
        let mut agg = ResultAggregator::new();
        let filter = Filter::from("trees");
        let summary = agg.ingest(
            &filter,
            &json!({"features": [{"geometry": {"coordinates": [1.0, 2.0]}}]}),
        );
        assert_eq!(summary.collections, 1);
        assert_eq!(agg.group(&filter)[0].label, "trees");
    }

    #[test]
    fn malformed_features_are_skipped() {
        let mut agg = ResultAggregator::new();
        let filter = Filter::from("benches");
        let summary = agg.ingest(
            &filter,
            &json!([
                {"features": [
                    {"geometry": {"coordinates": [24.9]}},
                    {"geometry": null, "properties": {}},
                    {"geometry": {"coordinates": ["a", "b"]}},
                    {"geometry": {"coordinates": [24.9, 60.1]}}
                ]},
                {"no_features": true}
            ]),
        );
        assert_eq!(summary.collections, 2);
        assert_eq!(summary.added, 1);
        assert_eq!(summary.skipped, 3);
    }

    #[test]
    fn saved_pairs_are_not_swapped() {
        let mut agg = ResultAggregator::new();
        let filter = Filter::from("benches");
        agg.ingest_saved(&filter, &json!([[60.16, 24.94], [60.2, 24.8]]));

        let markers = agg.group(&filter);
        assert_eq!(markers.len(), 2);
        assert!((markers[0].position.latitude - 60.16).abs() < f64::EPSILON);
        assert_eq!(markers[0].label, "benches");
    }

    #[test]
    fn with_filters_creates_empty_groups() {
        let filters = [Filter::from("benches"), Filter::from("trees")];
        let agg = ResultAggregator::with_filters(&filters);
        assert_eq!(agg.groups().len(), 2);
        assert!(agg.group(&filters[1]).is_empty());
        assert!(agg.group(&Filter::from("unknown")).is_empty());
    }
}
