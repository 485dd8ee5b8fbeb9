//! Collaborators that supply obstacles and weather.
//!
//! Network-backed implementations live with the caller. The ones here read Overpass-style
//! JSON from disk or serve fixed data, and [`CachedObstacleSource`] adds a TTL cache in
//! front of any source.

use crate::cache::TtlCache;
use crate::geo_math::distance;
use crate::obstacles::RawObstacleRecord;
use crate::types::{GeoPoint, Result, ShadowError};
use crate::weather::WeatherConditions;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait ObstacleSource: Send + Sync {
    /// Raw obstacle records within `radius_m` of `center`.
    async fn fetch(&self, center: GeoPoint, radius_m: f64) -> Result<Vec<RawObstacleRecord>>;
}

#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current(&self, point: GeoPoint) -> Result<WeatherConditions>;
}

/// Body of an Overpass API `[out:json]` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<RawObstacleRecord>,
}

fn within_radius(
    records: &[RawObstacleRecord],
    center: &GeoPoint,
    radius_m: f64,
) -> Vec<RawObstacleRecord> {
    records
        .iter()
        .filter(|record| {
            record
                .position()
                .is_some_and(|position| distance(&position, center) <= radius_m)
        })
        .cloned()
        .collect()
}

pub struct StaticObstacleSource {
    records: Vec<RawObstacleRecord>,
}

impl StaticObstacleSource {
    pub fn new(records: Vec<RawObstacleRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl ObstacleSource for StaticObstacleSource {
    async fn fetch(&self, center: GeoPoint, radius_m: f64) -> Result<Vec<RawObstacleRecord>> {
        Ok(within_radius(&self.records, &center, radius_m))
    }
}

/// Saved Overpass response on disk.
pub struct FileObstacleSource {
    path: PathBuf,
}

impl FileObstacleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ObstacleSource for FileObstacleSource {
    async fn fetch(&self, center: GeoPoint, radius_m: f64) -> Result<Vec<RawObstacleRecord>> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ShadowError::DataUnavailable(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        let response: OverpassResponse = serde_json::from_str(&text).map_err(|e| {
            ShadowError::DataUnavailable(format!("cannot parse {}: {}", self.path.display(), e))
        })?;
        Ok(within_radius(&response.elements, &center, radius_m))
    }
}

pub struct StaticWeather(pub WeatherConditions);

#[async_trait]
impl WeatherSource for StaticWeather {
    async fn current(&self, _point: GeoPoint) -> Result<WeatherConditions> {
        Ok(self.0)
    }
}

/// Weather snapshot stored as `{"cloud_cover": .., "precipitation_mm": ..}`.
pub struct FileWeatherSource {
    path: PathBuf,
}

impl FileWeatherSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl WeatherSource for FileWeatherSource {
    async fn current(&self, _point: GeoPoint) -> Result<WeatherConditions> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ShadowError::DataUnavailable(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            ShadowError::DataUnavailable(format!("cannot parse {}: {}", self.path.display(), e))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LookupKey {
    lat_e4: i64,
    lon_e4: i64,
    radius_dm: i64,
}

impl LookupKey {
    /// Coordinates rounded to 4 decimals (about 11 m), radius to 0.1 m.
    pub fn new(center: &GeoPoint, radius_m: f64) -> Self {
        Self {
            lat_e4: (center.latitude * 1e4).round() as i64,
            lon_e4: (center.longitude * 1e4).round() as i64,
            radius_dm: (radius_m * 10.0).round() as i64,
        }
    }
}

/// Obstacle source with a read-through TTL cache. Failed fetches are not cached.
pub struct CachedObstacleSource<S> {
    inner: S,
    cache: TtlCache<LookupKey, Vec<RawObstacleRecord>>,
}

impl<S: ObstacleSource> CachedObstacleSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            cache: TtlCache::new(ttl),
        }
    }
}

#[async_trait]
impl<S: ObstacleSource> ObstacleSource for CachedObstacleSource<S> {
    async fn fetch(&self, center: GeoPoint, radius_m: f64) -> Result<Vec<RawObstacleRecord>> {
        let key = LookupKey::new(&center, radius_m);
        if let Some(records) = self.cache.get(&key) {
            debug!(?key, records = records.len(), "Obstacle cache hit");
            return Ok(records);
        }
        let records = self.inner.fetch(center, radius_m).await?;
        self.cache.insert(key, records.clone());
        Ok(records)
    }
}
