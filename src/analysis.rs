use crate::config::Config;
use crate::obstacles::normalize_all;
use crate::shadow_engine::{ShadowEngine, Timeline};
use crate::sources::{ObstacleSource, WeatherSource};
use crate::summary::{format_span, Summary};
use crate::sun_position::SunPositionProvider;
use crate::types::*;
use crate::weather::{WeatherConditions, WeatherGate};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub observer: GeoPoint,
    pub start: DateTime<Utc>,
    pub obstacles: Vec<Obstacle>,
    pub weather: Option<WeatherConditions>,
    pub weather_gate: WeatherGate,
    pub timeline: Timeline,
    pub summary: Summary,
}

impl AnalysisReport {
    pub fn current_label(&self) -> Option<Label> {
        self.timeline.samples.first().map(|s| s.label)
    }

    pub fn render(&self, tz: Tz) -> String {
        let mut out = String::new();
        match &self.weather_gate {
            WeatherGate::Clear => {}
            WeatherGate::Caveat(reason) => {
                let _ = writeln!(out, "Note: {}", reason);
            }
            WeatherGate::Unavailable(reason) => {
                let _ = writeln!(out, "Note: weather unavailable ({})", reason);
            }
        }

        if let Some(now) = self.timeline.samples.first() {
            match now.label {
                Label::Night => {
                    let _ = writeln!(out, "Now: night, the sun is below the horizon.");
                }
                Label::Shadow => {
                    let _ = writeln!(
                        out,
                        "Now: in shadow (obstacle {}).",
                        now.shadowing_obstacle.unwrap_or_default()
                    );
                }
                Label::Sun => {
                    let _ = write!(
                        out,
                        "Now: in the sun (azimuth {:.0}°, altitude {:.0}°)",
                        now.sun.azimuth, now.sun.altitude
                    );
                    match now.car_side {
                        Some(side) => {
                            let _ = writeln!(out, ", sun on the {} side of the car.", side);
                        }
                        None => {
                            let _ = writeln!(out, ".");
                        }
                    }
                }
            }
        }
        if let Some(next) = self.timeline.intervals.get(1) {
            let _ = writeln!(out, "Next: {} {}.", next.label, format_span(next, tz));
        }

        let _ = writeln!(out, "Obstacles considered: {}", self.obstacles.len());
        out.push_str(&self.summary.render(tz));
        out
    }
}

/// Fetches the inputs for one location and runs the shadow engine over them.
pub struct ShadowAnalyzer<S> {
    engine: ShadowEngine<S>,
    obstacle_source: Arc<dyn ObstacleSource>,
    weather_source: Option<Arc<dyn WeatherSource>>,
    config: Config,
}

impl<S: SunPositionProvider> ShadowAnalyzer<S> {
    pub fn new(sun: S, obstacle_source: Arc<dyn ObstacleSource>, config: Config) -> Result<Self> {
        config.validate()?;
        let engine = ShadowEngine::new(sun, config.shadow)
            .with_parallelism(config.get_cpu_cores(), config.parallel_threshold)?;
        Ok(Self {
            engine,
            obstacle_source,
            weather_source: None,
            config,
        })
    }

    pub fn with_weather(mut self, source: Arc<dyn WeatherSource>) -> Self {
        self.weather_source = Some(source);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn analyze(
        &self,
        observer: GeoPoint,
        start: DateTime<Utc>,
        car_orientation: Option<f64>,
    ) -> Result<AnalysisReport> {
        observer.validate()?;

        let radius = self.config.search_radius_m;
        let obstacles_fut = self.obstacle_source.fetch(observer, radius);
        let weather_fut = async {
            match &self.weather_source {
                Some(source) => Some(source.current(observer).await),
                None => None,
            }
        };
        let (records, weather) = tokio::join!(obstacles_fut, weather_fut);

        let records = records.map_err(|e| match e {
            ShadowError::DataUnavailable(_) => e,
            other => ShadowError::DataUnavailable(other.to_string()),
        })?;

        let (weather, weather_gate) = match weather {
            Some(Ok(conditions)) => {
                let gate = self.config.weather_policy.assess(&conditions);
                (Some(conditions), gate)
            }
            Some(Err(e)) => {
                warn!(error = %e, "Weather lookup failed, continuing without it");
                let reason = match e {
                    ShadowError::DataUnavailable(reason) => reason,
                    other => other.to_string(),
                };
                (None, WeatherGate::Unavailable(reason))
            }
            None => (None, WeatherGate::Clear),
        };

        let obstacles = normalize_all(&records, &self.config.obstacle_defaults);

        let mut request = AnalysisRequest::new(observer, start)
            .with_horizon(self.config.horizon())
            .with_step(self.config.step())
            .with_obstacles(obstacles);
        if let Some(bearing) = car_orientation {
            request = request.with_car_orientation(bearing);
        }

        let timeline = self.engine.calculate_timeline(&request)?;
        let summary = Summary::from_intervals(&timeline.intervals);

        info!(
            latitude = observer.latitude,
            longitude = observer.longitude,
            obstacles = request.obstacles.len(),
            intervals = timeline.intervals.len(),
            "Shadow analysis complete"
        );

        Ok(AnalysisReport {
            observer,
            start,
            obstacles: request.obstacles,
            weather,
            weather_gate,
            timeline,
            summary,
        })
    }
}
