//! Point-source shadow test for a single obstacle.
//!
//! An obstacle casts a shadow of length `h / tan(altitude)` pointing away from the sun.
//! The observer is covered when it lies within that length and within a fixed angular
//! tolerance of the shadow direction. Obstacle footprint and width are folded into the
//! tolerance; there is no polygon projection.

use crate::geo_math::{angle_diff, DistanceModel};
use crate::types::{CarSide, GeoPoint, Obstacle, SunState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowParams {
    /// Half-angle around the shadow direction, degrees.
    pub angular_tolerance_deg: f64,
    /// Obstacles closer than this are overhead.
    pub beneath_radius_m: f64,
    pub distance_model: DistanceModel,
}

impl Default for ShadowParams {
    fn default() -> Self {
        Self {
            angular_tolerance_deg: 30.0,
            beneath_radius_m: 3.0,
            distance_model: DistanceModel::Haversine,
        }
    }
}

pub fn shadow_length(height: f64, altitude: f64) -> Option<f64> {
    if altitude <= 0.0 {
        return None;
    }
    Some(height / altitude.to_radians().tan())
}

pub fn shadow_direction(sun_azimuth: f64) -> f64 {
    (sun_azimuth + 180.0).rem_euclid(360.0)
}

pub fn covers(
    obstacle: &Obstacle,
    sun: &SunState,
    observer: &GeoPoint,
    params: &ShadowParams,
) -> bool {
    let model = params.distance_model;
    let separation = model.distance(&obstacle.position, observer);
    if separation <= params.beneath_radius_m {
        return true;
    }

    let Some(length) = shadow_length(obstacle.height, sun.altitude) else {
        return false;
    };
    if separation > length {
        return false;
    }

    let toward_observer = model.bearing(&obstacle.position, observer);
    angle_diff(toward_observer, shadow_direction(sun.azimuth)) <= params.angular_tolerance_deg
}

/// First obstacle, in input order, whose shadow covers the observer.
pub fn first_covering<'a>(
    obstacles: &'a [Obstacle],
    sun: &SunState,
    observer: &GeoPoint,
    params: &ShadowParams,
) -> Option<&'a Obstacle> {
    obstacles
        .iter()
        .find(|obstacle| covers(obstacle, sun, observer, params))
}

pub fn car_side(sun_azimuth: f64, car_bearing: f64) -> CarSide {
    let relative = (sun_azimuth - car_bearing + 360.0).rem_euclid(360.0);
    if (45.0..135.0).contains(&relative) {
        CarSide::Left
    } else if (135.0..225.0).contains(&relative) {
        CarSide::Rear
    } else if (225.0..315.0).contains(&relative) {
        CarSide::Right
    } else {
        CarSide::Front
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_math::destination;
    use crate::types::ObstacleKind;
    use approx::assert_abs_diff_eq;

    fn observer() -> GeoPoint {
        GeoPoint::new(50.4501, 30.5234).unwrap()
    }

    fn building_at(bearing: f64, distance: f64, height: f64) -> Obstacle {
        Obstacle::new(
            1,
            destination(&observer(), bearing, distance),
            height,
            ObstacleKind::Building,
        )
        .unwrap()
    }

    #[test]
    fn test_shadow_length_and_direction() {
        assert_abs_diff_eq!(shadow_length(15.0, 30.0).unwrap(), 25.980_762, epsilon = 1e-5);
        assert_abs_diff_eq!(shadow_length(10.0, 45.0).unwrap(), 10.0, epsilon = 1e-9);
        assert_eq!(shadow_length(10.0, 0.0), None);
        assert_eq!(shadow_length(10.0, -12.0), None);
        assert_eq!(shadow_direction(0.0), 180.0);
        assert_eq!(shadow_direction(270.0), 90.0);
    }

    #[test]
    fn test_building_north_of_observer_with_sun_due_north() {
        // building 20 m north, sun in the north at 30°: shadow falls south over the car
        let building = building_at(0.0, 20.0, 15.0);
        let sun = SunState::new(0.0, 30.0);
        assert!(covers(&building, &sun, &observer(), &ShadowParams::default()));
    }

    #[test]
    fn test_shadow_too_short() {
        let building = building_at(0.0, 20.0, 15.0);
        let high_sun = SunState::new(0.0, 60.0); // 8.66 m
        assert!(!covers(&building, &high_sun, &observer(), &ShadowParams::default()));
    }

    #[test]
    fn test_shadow_pointing_elsewhere() {
        let building = building_at(0.0, 20.0, 15.0);
        let sun_south = SunState::new(180.0, 30.0);
        assert!(!covers(&building, &sun_south, &observer(), &ShadowParams::default()));

        // 29° off still counts, 31° does not
        let params = ShadowParams::default();
        assert!(covers(&building, &SunState::new(29.0, 30.0), &observer(), &params));
        assert!(!covers(&building, &SunState::new(31.0, 30.0), &observer(), &params));
    }

    #[test]
    fn test_tolerance_is_configurable() {
        let building = building_at(0.0, 20.0, 15.0);
        let sun = SunState::new(40.0, 30.0);
        assert!(!covers(&building, &sun, &observer(), &ShadowParams::default()));
        let wide = ShadowParams {
            angular_tolerance_deg: 45.0,
            ..Default::default()
        };
        assert!(covers(&building, &sun, &observer(), &wide));
    }

    #[test]
    fn test_directly_beneath_ignores_sun() {
        let tree = building_at(90.0, 2.0, 5.0);
        let params = ShadowParams::default();
        assert!(covers(&tree, &SunState::new(270.0, 70.0), &observer(), &params));
        assert!(covers(&tree, &SunState::new(0.0, -10.0), &observer(), &params));
    }

    #[test]
    fn test_no_shadow_below_horizon() {
        let building = building_at(0.0, 20.0, 15.0);
        let below = SunState::new(0.0, -1.0);
        assert!(!covers(&building, &below, &observer(), &ShadowParams::default()));
    }

    #[test]
    fn test_first_covering_reports_input_order() {
        let mut a = building_at(0.0, 10.0, 20.0);
        a.id = 10;
        let mut b = building_at(5.0, 12.0, 20.0);
        b.id = 20;
        let far = building_at(180.0, 10.0, 20.0);
        let sun = SunState::new(0.0, 45.0);
        let params = ShadowParams::default();

        let obstacles = vec![far.clone(), a.clone(), b.clone()];
        assert_eq!(first_covering(&obstacles, &sun, &observer(), &params).map(|o| o.id), Some(10));
        let reversed = vec![b, a, far];
        assert_eq!(first_covering(&reversed, &sun, &observer(), &params).map(|o| o.id), Some(20));
        assert!(first_covering(&[], &sun, &observer(), &params).is_none());
    }

    #[test]
    fn test_car_side_quadrants() {
        assert_eq!(car_side(0.0, 0.0), CarSide::Front);
        assert_eq!(car_side(44.9, 0.0), CarSide::Front);
        assert_eq!(car_side(45.0, 0.0), CarSide::Left);
        assert_eq!(car_side(135.0, 0.0), CarSide::Rear);
        assert_eq!(car_side(225.0, 0.0), CarSide::Right);
        assert_eq!(car_side(315.0, 0.0), CarSide::Front);
        // car facing east, sun in the north
        assert_eq!(car_side(0.0, 90.0), CarSide::Right);
        assert_eq!(car_side(10.0, 350.0), CarSide::Front);
    }
}
