use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, ShadowError>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let point = Self {
            latitude,
            longitude,
        };
        point.validate()?;
        Ok(point)
    }

    /// Re-checks ranges, for points that arrived through deserialization.
    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ShadowError::InvalidInput(format!(
                "latitude {} outside [-90, 90]",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ShadowError::InvalidInput(format!(
                "longitude {} outside [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleKind {
    Building,
    Tree,
    Forest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: u64,
    pub position: GeoPoint,
    pub height: f64, // meters
    pub kind: ObstacleKind,
}

impl Obstacle {
    pub fn new(id: u64, position: GeoPoint, height: f64, kind: ObstacleKind) -> Result<Self> {
        position.validate()?;
        if !height.is_finite() || height <= 0.0 {
            return Err(ShadowError::InvalidInput(format!(
                "obstacle {} has non-positive height {}",
                id, height
            )));
        }
        Ok(Self {
            id,
            position,
            height,
            kind,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SunState {
    pub azimuth: f64,
    pub altitude: f64,
}

impl SunState {
    pub fn new(azimuth: f64, altitude: f64) -> Self {
        Self {
            azimuth: azimuth.rem_euclid(360.0),
            altitude,
        }
    }

    pub fn is_up(&self) -> bool {
        self.altitude > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Sun,
    Shadow,
    Night,
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Label::Sun => "sun",
            Label::Shadow => "shadow",
            Label::Night => "night",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub label: Label,
}

impl ShadowInterval {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Which side of the car faces the sun.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarSide {
    Front,
    Left,
    Rear,
    Right,
}

impl std::fmt::Display for CarSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CarSide::Front => "front",
            CarSide::Left => "left",
            CarSide::Rear => "rear",
            CarSide::Right => "right",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub observer: GeoPoint,
    pub start: DateTime<Utc>,
    pub horizon: Duration,
    pub step: Duration,
    pub obstacles: Vec<Obstacle>,
    pub car_orientation: Option<f64>,
}

impl AnalysisRequest {
    pub const DEFAULT_HORIZON_HOURS: i64 = 24;
    pub const DEFAULT_STEP_MINUTES: i64 = 15;

    pub fn new(observer: GeoPoint, start: DateTime<Utc>) -> Self {
        Self {
            observer,
            start,
            horizon: Duration::hours(Self::DEFAULT_HORIZON_HOURS),
            step: Duration::minutes(Self::DEFAULT_STEP_MINUTES),
            obstacles: Vec::new(),
            car_orientation: None,
        }
    }

    pub fn with_obstacles(mut self, obstacles: Vec<Obstacle>) -> Self {
        self.obstacles = obstacles;
        self
    }

    pub fn with_horizon(mut self, horizon: Duration) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    pub fn with_car_orientation(mut self, bearing: f64) -> Self {
        self.car_orientation = Some(bearing);
        self
    }

    /// End of the window. Saturates at the latest representable instant; `validate` rejects
    /// windows that would get there.
    pub fn end(&self) -> DateTime<Utc> {
        self.start
            .checked_add_signed(self.horizon)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn validate(&self) -> Result<()> {
        self.observer.validate()?;
        if self.horizon <= Duration::zero() {
            return Err(ShadowError::InvalidInput(
                "horizon must be positive".to_string(),
            ));
        }
        if self.step <= Duration::zero() {
            return Err(ShadowError::InvalidInput("step must be positive".to_string()));
        }
        if self.start.checked_add_signed(self.horizon).is_none() {
            return Err(ShadowError::InvalidInput(format!(
                "horizon of {} days from {} is out of range",
                self.horizon.num_days(),
                self.start
            )));
        }
        if let Some(bearing) = self.car_orientation {
            if !bearing.is_finite() {
                return Err(ShadowError::InvalidInput(format!(
                    "car orientation {} is not a finite bearing",
                    bearing
                )));
            }
        }
        for obstacle in &self.obstacles {
            obstacle.position.validate()?;
            if !obstacle.height.is_finite() || obstacle.height <= 0.0 {
                return Err(ShadowError::InvalidInput(format!(
                    "obstacle {} has non-positive height {}",
                    obstacle.id, obstacle.height
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ShadowError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
