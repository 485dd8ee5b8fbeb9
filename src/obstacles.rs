//! Normalization of raw map-data elements into [`Obstacle`]s.
//!
//! Input follows the Overpass API JSON element shape (`type`, `id`, `tags`, and either
//! `lat`/`lon`, `center` or `geometry`). The data is untrusted: a bad height or level tag
//! falls back to a default height, and an element that cannot be placed or classified is
//! skipped. Nothing here returns an error.

use crate::types::{GeoPoint, Obstacle, ObstacleKind};
use geo_types::{Coord, LineString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawCoordinate {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawObstacleRecord {
    #[serde(rename = "type", default)]
    pub element_type: String,
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub tags: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<RawCoordinate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub geometry: Vec<RawCoordinate>,
}

impl RawObstacleRecord {
    /// Tag value as text. Numbers are accepted too since the source is not trusted to
    /// quote them.
    pub fn tag(&self, key: &str) -> Option<String> {
        match self.tags.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<ObstacleKind> {
        if self.tag("building").is_some_and(|v| v != "no") {
            return Some(ObstacleKind::Building);
        }
        match self.tag("natural").as_deref() {
            Some("tree") => return Some(ObstacleKind::Tree),
            Some("wood") => return Some(ObstacleKind::Forest),
            _ => {}
        }
        if self.tag("landuse").as_deref() == Some("forest") {
            return Some(ObstacleKind::Forest);
        }
        None
    }

    pub fn footprint(&self) -> Option<LineString<f64>> {
        if self.geometry.is_empty() {
            return None;
        }
        Some(LineString::from(
            self.geometry
                .iter()
                .map(|c| Coord { x: c.lon, y: c.lat })
                .collect::<Vec<_>>(),
        ))
    }

    /// Explicit center, then node coordinates, then the vertex mean of the footprint.
    pub fn position(&self) -> Option<GeoPoint> {
        let point = if let Some(center) = self.center {
            GeoPoint {
                latitude: center.lat,
                longitude: center.lon,
            }
        } else if let (Some(lat), Some(lon)) = (self.lat, self.lon) {
            GeoPoint {
                latitude: lat,
                longitude: lon,
            }
        } else {
            vertex_centroid(&self.footprint()?)?
        };
        point.validate().ok().map(|_| point)
    }
}

/// Arithmetic mean of the ring's vertices. The closing vertex of a closed ring is not
/// counted twice.
pub fn vertex_centroid(ring: &LineString<f64>) -> Option<GeoPoint> {
    let coords = &ring.0;
    let vertices = if ring.is_closed() && coords.len() > 1 {
        &coords[..coords.len() - 1]
    } else {
        &coords[..]
    };
    if vertices.is_empty() {
        return None;
    }
    let count = vertices.len() as f64;
    let sum_x: f64 = vertices.iter().map(|c| c.x).sum();
    let sum_y: f64 = vertices.iter().map(|c| c.y).sum();
    Some(GeoPoint {
        latitude: sum_y / count,
        longitude: sum_x / count,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleDefaults {
    pub building_height: f64,
    pub tree_height: f64,
    pub forest_height: f64,
    pub meters_per_level: f64,
}

impl Default for ObstacleDefaults {
    fn default() -> Self {
        Self {
            building_height: 10.0,
            tree_height: 15.0,
            forest_height: 15.0,
            meters_per_level: 3.0,
        }
    }
}

impl ObstacleDefaults {
    pub fn height_for(&self, kind: ObstacleKind) -> f64 {
        match kind {
            ObstacleKind::Building => self.building_height,
            ObstacleKind::Tree => self.tree_height,
            ObstacleKind::Forest => self.forest_height,
        }
    }
}

/// Parses a height tag such as `"12"`, `"12.5 m"` or `"12m"`. Returns `None` for anything
/// that is not a positive finite number once the unit suffix is dropped.
pub fn parse_height(raw: &str) -> Option<f64> {
    let number = raw
        .trim()
        .trim_end_matches(|c: char| c.is_alphabetic() || c.is_whitespace())
        .replace(',', ".");
    parse_positive(&number)
}

fn parse_positive(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

pub fn resolve_height(
    record: &RawObstacleRecord,
    kind: ObstacleKind,
    defaults: &ObstacleDefaults,
) -> f64 {
    if let Some(tag) = record.tag("height") {
        return parse_height(&tag).unwrap_or_else(|| defaults.height_for(kind));
    }
    if let Some(tag) = record.tag("building:levels") {
        return parse_positive(&tag)
            .map(|levels| levels * defaults.meters_per_level)
            .filter(|h| h.is_finite() && *h > 0.0)
            .unwrap_or_else(|| defaults.height_for(kind));
    }
    defaults.height_for(kind)
}

pub fn normalize(record: &RawObstacleRecord, defaults: &ObstacleDefaults) -> Option<Obstacle> {
    let kind = record.kind()?;
    let position = record.position()?;
    let height = resolve_height(record, kind, defaults);
    Some(Obstacle {
        id: record.id,
        position,
        height,
        kind,
    })
}

/// Normalizes every record, keeping input order and dropping the ones that cannot be used.
pub fn normalize_all(records: &[RawObstacleRecord], defaults: &ObstacleDefaults) -> Vec<Obstacle> {
    let obstacles: Vec<Obstacle> = records
        .iter()
        .filter_map(|record| normalize(record, defaults))
        .collect();
    let skipped = records.len() - obstacles.len();
    if skipped > 0 {
        warn!(skipped, total = records.len(), "Skipped unusable obstacle records");
    }
    obstacles
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use serde_json::json;

    fn record(value: Value) -> RawObstacleRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_height_strips_units() {
        assert_eq!(parse_height("12"), Some(12.0));
        assert_eq!(parse_height(" 12.5 m "), Some(12.5));
        assert_eq!(parse_height("7m"), Some(7.0));
        assert_eq!(parse_height("3,5"), Some(3.5));
        assert_eq!(parse_height("tall"), None);
        assert_eq!(parse_height(""), None);
        assert_eq!(parse_height("-4"), None);
        assert_eq!(parse_height("0 m"), None);
        assert_eq!(parse_height("NaN"), None);
    }

    #[test]
    fn test_height_from_levels() {
        let r = record(json!({
            "type": "way", "id": 7,
            "tags": {"building": "yes", "building:levels": "5"},
            "center": {"lat": 50.0, "lon": 30.0}
        }));
        let obstacle = normalize(&r, &ObstacleDefaults::default()).unwrap();
        assert_eq!(obstacle.height, 15.0);
        assert_eq!(obstacle.kind, ObstacleKind::Building);
        assert_eq!(obstacle.id, 7);
    }

    #[test]
    fn test_numeric_tag_values_are_accepted() {
        let r = record(json!({
            "type": "node", "id": 1,
            "tags": {"natural": "tree", "height": 9},
            "lat": 50.0, "lon": 30.0
        }));
        assert_eq!(normalize(&r, &ObstacleDefaults::default()).unwrap().height, 9.0);
    }

    #[test]
    fn test_unparsable_height_matches_missing_height() {
        let defaults = ObstacleDefaults::default();
        let garbage = record(json!({
            "type": "way", "id": 1,
            "tags": {"building": "yes", "height": "about ten floors"},
            "center": {"lat": 50.0, "lon": 30.0}
        }));
        let missing = record(json!({
            "type": "way", "id": 1,
            "tags": {"building": "yes"},
            "center": {"lat": 50.0, "lon": 30.0}
        }));
        assert_eq!(normalize(&garbage, &defaults), normalize(&missing, &defaults));
        assert_eq!(normalize(&missing, &defaults).unwrap().height, 10.0);

        let bad_levels = record(json!({
            "type": "way", "id": 1,
            "tags": {"building": "yes", "building:levels": "several"},
            "center": {"lat": 50.0, "lon": 30.0}
        }));
        assert_eq!(normalize(&bad_levels, &defaults), normalize(&missing, &defaults));
    }

    #[test]
    fn test_kind_specific_defaults() {
        let defaults = ObstacleDefaults {
            tree_height: 8.0,
            forest_height: 20.0,
            ..Default::default()
        };
        let tree = record(json!({"id": 2, "tags": {"natural": "tree"}, "lat": 1.0, "lon": 1.0}));
        let wood = record(json!({"id": 3, "tags": {"natural": "wood"}, "lat": 1.0, "lon": 1.0}));
        let forest =
            record(json!({"id": 4, "tags": {"landuse": "forest"}, "lat": 1.0, "lon": 1.0}));
        assert_eq!(normalize(&tree, &defaults).unwrap().height, 8.0);
        assert_eq!(normalize(&wood, &defaults).unwrap().kind, ObstacleKind::Forest);
        assert_eq!(normalize(&forest, &defaults).unwrap().height, 20.0);
    }

    #[test]
    fn test_polygon_centroid_ignores_closing_vertex() {
        let r = record(json!({
            "type": "way", "id": 11,
            "tags": {"building": "apartments"},
            "geometry": [
                {"lat": 50.0, "lon": 30.0},
                {"lat": 50.0, "lon": 30.001},
                {"lat": 50.001, "lon": 30.001},
                {"lat": 50.001, "lon": 30.0},
                {"lat": 50.0, "lon": 30.0}
            ]
        }));
        let position = r.position().unwrap();
        assert_abs_diff_eq!(position.latitude, 50.0005, epsilon = 1e-12);
        assert_abs_diff_eq!(position.longitude, 30.0005, epsilon = 1e-12);
    }

    #[test]
    fn test_explicit_center_wins_over_geometry() {
        let r = record(json!({
            "id": 12,
            "tags": {"building": "yes"},
            "center": {"lat": 10.0, "lon": 10.0},
            "geometry": [{"lat": 50.0, "lon": 30.0}]
        }));
        assert_eq!(r.position().unwrap().latitude, 10.0);
    }

    #[test]
    fn test_unusable_records_are_skipped() {
        let records = vec![
            record(json!({"id": 1, "tags": {"highway": "residential"}, "lat": 1.0, "lon": 1.0})),
            record(json!({"id": 2, "tags": {"building": "yes"}})),
            record(json!({"id": 3, "tags": {"building": "no"}, "lat": 1.0, "lon": 1.0})),
            record(json!({"id": 4, "tags": {"building": "yes"}, "lat": 95.0, "lon": 1.0})),
            record(json!({"id": 5, "tags": {"building": "yes"}, "lat": 1.0, "lon": 1.0})),
            record(json!({"id": 6, "tags": {"natural": "tree"}, "lat": 1.0, "lon": 1.0})),
        ];
        let obstacles = normalize_all(&records, &ObstacleDefaults::default());
        let ids: Vec<u64> = obstacles.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![5, 6]);
    }
}
