use crate::obstacles::ObstacleDefaults;
use crate::predicate::ShadowParams;
use crate::types::{Result, ShadowError};
use crate::weather::WeatherPolicy;
use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub step_minutes: i64,
    pub horizon_hours: i64,
    /// Obstacle search radius around the car.
    pub search_radius_m: f64,
    /// IANA name used for wall-clock output.
    pub timezone: String,
    pub shadow: ShadowParams,
    pub obstacle_defaults: ObstacleDefaults,
    pub weather_policy: WeatherPolicy,
    /// Rounds sun angles to this many degrees; unset keeps full precision.
    pub angle_precision: Option<f64>,
    /// Sweep threads; defaults to all cores.
    pub cpu_cores: Option<usize>,
    /// Sample × obstacle evaluations above which the sweep goes parallel.
    pub parallel_threshold: usize,
    pub cache_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            step_minutes: 15,
            horizon_hours: 24,
            search_radius_m: 100.0,
            timezone: "UTC".to_string(),
            shadow: ShadowParams::default(),
            obstacle_defaults: ObstacleDefaults::default(),
            weather_policy: WeatherPolicy::default(),
            angle_precision: None,
            cpu_cores: None,
            parallel_threshold: 20_000,
            cache_ttl_secs: 600,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit path if given, else the per-user config file if it exists, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("parking-shade").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.step_minutes <= 0 {
            return Err(ShadowError::Config("step_minutes must be positive".to_string()));
        }
        if self.horizon_hours <= 0 {
            return Err(ShadowError::Config("horizon_hours must be positive".to_string()));
        }
        // chrono durations are bounded by i64 milliseconds
        if self.horizon_hours > i64::MAX / 3_600_000 || self.step_minutes > i64::MAX / 60_000 {
            return Err(ShadowError::Config(
                "horizon_hours or step_minutes out of range".to_string(),
            ));
        }
        if !(self.search_radius_m.is_finite() && self.search_radius_m > 0.0) {
            return Err(ShadowError::Config("search_radius_m must be positive".to_string()));
        }
        let tolerance = self.shadow.angular_tolerance_deg;
        if !(0.0..=180.0).contains(&tolerance) {
            return Err(ShadowError::Config(format!(
                "angular_tolerance_deg {} outside [0, 180]",
                tolerance
            )));
        }
        if !(self.shadow.beneath_radius_m.is_finite() && self.shadow.beneath_radius_m >= 0.0) {
            return Err(ShadowError::Config("beneath_radius_m must be >= 0".to_string()));
        }
        let defaults = &self.obstacle_defaults;
        for (name, value) in [
            ("building_height", defaults.building_height),
            ("tree_height", defaults.tree_height),
            ("forest_height", defaults.forest_height),
            ("meters_per_level", defaults.meters_per_level),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ShadowError::Config(format!("{} must be positive", name)));
            }
        }
        if self.cpu_cores == Some(0) {
            return Err(ShadowError::Config("cpu_cores must be at least 1".to_string()));
        }
        self.tz()?;
        Ok(())
    }

    pub fn get_cpu_cores(&self) -> usize {
        self.cpu_cores.unwrap_or_else(num_cpus::get)
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| {
                ShadowError::Config(format!("unknown timezone {:?}: {}", self.timezone, e))
            })
    }

    pub fn step(&self) -> Duration {
        Duration::minutes(self.step_minutes)
    }

    pub fn horizon(&self) -> Duration {
        Duration::hours(self.horizon_hours)
    }

    pub fn cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cache_ttl_secs)
    }
}
