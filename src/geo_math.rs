//! Bearings and distances between geographic points.
//!
//! The spherical formulas are the reference. The planar (equirectangular) variants
//! are only meant for the short distances between a car and nearby obstacles; a caller
//! picks one [`DistanceModel`] and uses it for both bearing and distance.

use crate::types::GeoPoint;
use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceModel {
    #[default]
    Haversine,
    Planar,
}

impl DistanceModel {
    pub fn bearing(&self, from: &GeoPoint, to: &GeoPoint) -> f64 {
        match self {
            DistanceModel::Haversine => bearing(from, to),
            DistanceModel::Planar => planar_bearing(from, to),
        }
    }

    pub fn distance(&self, a: &GeoPoint, b: &GeoPoint) -> f64 {
        match self {
            DistanceModel::Haversine => distance(a, b),
            DistanceModel::Planar => planar_distance(a, b),
        }
    }
}

/// Initial compass bearing in degrees [0, 360). Identical points give 0.
pub fn bearing(from: &GeoPoint, to: &GeoPoint) -> f64 {
    if from == to {
        return 0.0;
    }
    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let delta_lambda = (to.longitude - from.longitude).to_radians();

    let y = delta_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    normalize_bearing(y.atan2(x).to_degrees())
}

/// Great-circle distance in meters (haversine).
pub fn distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let delta_phi = phi2 - phi1;
    let delta_lambda = (b.longitude - a.longitude).to_radians();

    let h = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_M * c
}

/// East/north offset in meters of `to` relative to `from`.
fn planar_offset(from: &GeoPoint, to: &GeoPoint) -> (f64, f64) {
    let mean_lat = ((from.latitude + to.latitude) / 2.0).to_radians();
    let mut delta_lon = to.longitude - from.longitude;
    // antimeridian
    if delta_lon > 180.0 {
        delta_lon -= 360.0;
    } else if delta_lon < -180.0 {
        delta_lon += 360.0;
    }
    let east = delta_lon.to_radians() * mean_lat.cos() * EARTH_RADIUS_M;
    let north = (to.latitude - from.latitude).to_radians() * EARTH_RADIUS_M;
    (east, north)
}

pub fn planar_bearing(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let (east, north) = planar_offset(from, to);
    if east == 0.0 && north == 0.0 {
        return 0.0;
    }
    normalize_bearing(east.atan2(north).to_degrees())
}

pub fn planar_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let (east, north) = planar_offset(a, b);
    east.hypot(north)
}

/// Smallest angle between two bearings, in [0, 180].
pub fn angle_diff(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(360.0);
    diff.min(360.0 - diff)
}

pub fn normalize_bearing(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Point reached by travelling `distance_m` along the great circle starting at `bearing_deg`.
pub fn destination(from: &GeoPoint, bearing_deg: f64, distance_m: f64) -> GeoPoint {
    let delta = distance_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let phi1 = from.latitude.to_radians();
    let lambda1 = from.longitude.to_radians();

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos())
        .clamp(-1.0, 1.0)
        .asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    let longitude = (lambda2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;
    GeoPoint {
        latitude: phi2.to_degrees(),
        longitude,
    }
}
