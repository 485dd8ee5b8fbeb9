use crate::predicate::{car_side, first_covering, ShadowParams};
use crate::sun_position::SunPositionProvider;
use crate::types::*;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Upper bound on sampled instants per request.
pub const MAX_SAMPLES: i64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub instant: DateTime<Utc>,
    pub sun: SunState,
    pub label: Label,
    /// First obstacle, in input order, shading the observer.
    pub shadowing_obstacle: Option<u64>,
    /// Side of the car facing the sun, only while the car is in the sun.
    pub car_side: Option<CarSide>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    pub intervals: Vec<ShadowInterval>,
    pub samples: Vec<Sample>,
}

impl Timeline {
    pub fn label_at(&self, instant: DateTime<Utc>) -> Option<Label> {
        self.intervals
            .iter()
            .find(|interval| interval.start <= instant && instant < interval.end)
            .map(|interval| interval.label)
    }
}

pub struct ShadowEngine<S> {
    sun: S,
    params: ShadowParams,
    parallel_threshold: usize,
    pool: Option<rayon::ThreadPool>,
}

impl<S: SunPositionProvider> ShadowEngine<S> {
    pub fn new(sun: S, params: ShadowParams) -> Self {
        Self {
            sun,
            params,
            parallel_threshold: usize::MAX,
            pool: None,
        }
    }

    /// Sweeps on a dedicated pool of `cpu_cores` threads once a request has at least
    /// `threshold` sample × obstacle evaluations.
    pub fn with_parallelism(mut self, cpu_cores: usize, threshold: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(cpu_cores.max(1))
            .thread_name(|i| format!("shadow-sweep-{}", i))
            .build()
            .map_err(|e| ShadowError::Config(format!("failed to build thread pool: {}", e)))?;
        self.pool = Some(pool);
        self.parallel_threshold = threshold;
        Ok(self)
    }

    pub fn params(&self) -> &ShadowParams {
        &self.params
    }

    pub fn calculate_timeline(&self, request: &AnalysisRequest) -> Result<Timeline> {
        request.validate()?;
        let started = Instant::now();

        let timestamps = self.generate_timestamps(request)?;
        let work = timestamps.len().saturating_mul(request.obstacles.len().max(1));

        let samples: Vec<Sample> = match &self.pool {
            Some(pool) if work >= self.parallel_threshold => pool.install(|| {
                timestamps
                    .par_iter()
                    .map(|&instant| self.classify(request, instant))
                    .collect()
            }),
            _ => timestamps
                .iter()
                .map(|&instant| self.classify(request, instant))
                .collect(),
        };

        let intervals = compress(
            samples.iter().map(|sample| (sample.instant, sample.label)),
            request.end(),
        );

        debug!(
            samples = samples.len(),
            obstacles = request.obstacles.len(),
            intervals = intervals.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "Shadow timeline computed"
        );

        Ok(Timeline { intervals, samples })
    }

    fn generate_timestamps(&self, request: &AnalysisRequest) -> Result<Vec<DateTime<Utc>>> {
        let step_ms = request.step.num_milliseconds().max(1);
        let horizon_ms = request.horizon.num_milliseconds();
        let count = horizon_ms / step_ms + i64::from(horizon_ms % step_ms != 0);
        if count > MAX_SAMPLES {
            return Err(ShadowError::InvalidInput(format!(
                "{} samples requested, at most {} allowed",
                count, MAX_SAMPLES
            )));
        }

        let end = request.end();
        let mut timestamps = Vec::with_capacity(count.max(0) as usize);
        let mut current = request.start;
        while current < end {
            timestamps.push(current);
            match current.checked_add_signed(request.step) {
                Some(next) => current = next,
                None => break,
            }
        }
        Ok(timestamps)
    }

    fn classify(&self, request: &AnalysisRequest, instant: DateTime<Utc>) -> Sample {
        let sun = self.sun.sun_state(&request.observer, instant);

        if !sun.is_up() {
            return Sample {
                instant,
                sun,
                label: Label::Night,
                shadowing_obstacle: None,
                car_side: None,
            };
        }

        match first_covering(&request.obstacles, &sun, &request.observer, &self.params) {
            Some(obstacle) => Sample {
                instant,
                sun,
                label: Label::Shadow,
                shadowing_obstacle: Some(obstacle.id),
                car_side: None,
            },
            None => Sample {
                instant,
                sun,
                label: Label::Sun,
                shadowing_obstacle: None,
                car_side: request
                    .car_orientation
                    .map(|bearing| car_side(sun.azimuth, bearing)),
            },
        }
    }
}

/// Folds ordered `(instant, label)` samples into contiguous intervals, the last one closed
/// at `end`. Samples at or after `end` are ignored.
pub fn compress<I>(samples: I, end: DateTime<Utc>) -> Vec<ShadowInterval>
where
    I: IntoIterator<Item = (DateTime<Utc>, Label)>,
{
    let mut intervals = Vec::new();
    let mut open: Option<(DateTime<Utc>, Label)> = None;

    for (instant, label) in samples {
        if instant >= end {
            break;
        }
        match open {
            Some((_, current)) if current == label => {}
            Some((start, current)) => {
                intervals.push(ShadowInterval {
                    start,
                    end: instant,
                    label: current,
                });
                open = Some((instant, label));
            }
            None => open = Some((instant, label)),
        }
    }

    if let Some((start, label)) = open {
        intervals.push(ShadowInterval { start, end, label });
    }
    intervals
}

/// Labeled sun/shadow/night intervals covering `[request.start, request.end())` exactly.
pub fn compute_shadow_timeline<S: SunPositionProvider>(
    request: &AnalysisRequest,
    sun: S,
    params: &ShadowParams,
) -> Result<Vec<ShadowInterval>> {
    let engine = ShadowEngine::new(sun, *params);
    Ok(engine.calculate_timeline(request)?.intervals)
}
