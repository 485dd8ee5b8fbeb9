//! Weather pre-check. Heavy cloud or rain makes a sun/shadow estimate moot, but that is a
//! decision for whoever presents the result; the shadow geometry never looks at weather.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherConditions {
    /// Percent of sky covered, 0-100.
    pub cloud_cover: f64,
    /// Precipitation over the last hour, millimeters.
    pub precipitation_mm: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum WeatherGate {
    Clear,
    Caveat(String),
    /// A weather source was configured but the lookup failed.
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherPolicy {
    pub max_cloud_cover: f64,
    pub max_precipitation_mm: f64,
}

impl Default for WeatherPolicy {
    fn default() -> Self {
        Self {
            max_cloud_cover: 80.0,
            max_precipitation_mm: 1.0,
        }
    }
}

impl WeatherPolicy {
    pub fn assess(&self, conditions: &WeatherConditions) -> WeatherGate {
        if conditions.precipitation_mm >= self.max_precipitation_mm {
            return WeatherGate::Caveat(format!(
                "raining ({:.1} mm), shadow hardly matters",
                conditions.precipitation_mm
            ));
        }
        if conditions.cloud_cover >= self.max_cloud_cover {
            return WeatherGate::Caveat(format!(
                "overcast ({:.0}% cloud cover), little direct sun",
                conditions.cloud_cover
            ));
        }
        WeatherGate::Clear
    }
}
