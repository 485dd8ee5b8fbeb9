//! Sun and shadow timeline for a parked car.
//!
//! Given the car's location, nearby obstacles (buildings, trees, forest patches) and a
//! time window, [`compute_shadow_timeline`] returns contiguous `Sun` / `Shadow` / `Night`
//! intervals covering the window exactly once. [`ShadowAnalyzer`] wraps the engine with
//! obstacle and weather sources for callers such as a chat bot or the bundled CLI.

pub mod analysis;
pub mod cache;
pub mod config;
pub mod geo_math;
pub mod obstacles;
pub mod predicate;
pub mod shadow_engine;
pub mod sources;
pub mod summary;
pub mod sun_position;
pub mod types;
pub mod weather;

pub use analysis::{AnalysisReport, ShadowAnalyzer};
pub use config::Config;
pub use predicate::ShadowParams;
pub use shadow_engine::{compute_shadow_timeline, Sample, ShadowEngine, Timeline};
pub use sun_position::{SunCalculator, SunPositionProvider};
pub use types::*;
