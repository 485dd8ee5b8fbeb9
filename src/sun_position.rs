use crate::geo_math::normalize_bearing;
use crate::types::{GeoPoint, SunState};
use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Standard altitude of the sun's center at sunrise/sunset (refraction + semi-diameter).
const SUNRISE_ALTITUDE_DEG: f64 = -0.833;

const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const J2000_JD: f64 = 2_451_545.0;

/// Source of sun azimuth/altitude for a point and instant.
pub trait SunPositionProvider: Send + Sync {
    fn sun_state(&self, point: &GeoPoint, instant: DateTime<Utc>) -> SunState;
}

impl<F> SunPositionProvider for F
where
    F: Fn(&GeoPoint, DateTime<Utc>) -> SunState + Send + Sync,
{
    fn sun_state(&self, point: &GeoPoint, instant: DateTime<Utc>) -> SunState {
        self(point, instant)
    }
}

/// Same sun everywhere, at every instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedSun(pub SunState);

impl SunPositionProvider for FixedSun {
    fn sun_state(&self, _point: &GeoPoint, _instant: DateTime<Utc>) -> SunState {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DaylightWindow {
    Normal {
        sunrise: DateTime<Utc>,
        sunset: DateTime<Utc>,
    },
    PolarNight,
    MidnightSun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DaylightStatus {
    BeforeSunrise { minutes_until: i64 },
    SunUp,
    AfterSunset,
    PolarNight,
    MidnightSun,
}

/// Low-precision solar position (about 0.01° in declination), good enough for shadow
/// estimates over a day.
#[derive(Debug, Clone, Copy, Default)]
pub struct SunCalculator {
    angle_precision: Option<f64>,
}

struct SolarCoordinates {
    declination: f64,
    equation_of_time: f64, // minutes
}

impl SunCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rounds reported angles to multiples of `precision` degrees.
    pub fn with_angle_precision(precision: f64) -> Self {
        Self {
            angle_precision: (precision.is_finite() && precision > 0.0).then_some(precision),
        }
    }

    pub fn position(&self, point: &GeoPoint, datetime: &DateTime<Utc>) -> SunState {
        let coords = self.solar_coordinates(Self::days_since_j2000(datetime));

        let utc_hours = datetime.num_seconds_from_midnight() as f64 / 3600.0
            + datetime.nanosecond() as f64 / 3.6e12;
        let solar_time = utc_hours + coords.equation_of_time / 60.0 + point.longitude / 15.0;
        let hour_angle = 15.0 * (solar_time - 12.0);

        let lat_rad = point.latitude.to_radians();
        let dec_rad = coords.declination.to_radians();
        let hour_rad = hour_angle.to_radians();

        let elevation = (lat_rad.sin() * dec_rad.sin()
            + lat_rad.cos() * dec_rad.cos() * hour_rad.cos())
        .clamp(-1.0, 1.0)
        .asin();

        let azimuth = (-hour_rad.sin() * dec_rad.cos())
            .atan2(dec_rad.sin() * lat_rad.cos() - dec_rad.cos() * lat_rad.sin() * hour_rad.cos());

        let (azimuth, elevation) =
            self.round_angles(normalize_bearing(azimuth.to_degrees()), elevation.to_degrees());
        SunState::new(azimuth, elevation)
    }

    fn round_angles(&self, azimuth: f64, elevation: f64) -> (f64, f64) {
        match self.angle_precision {
            Some(precision) => {
                let inv_precision = 1.0 / precision;
                (
                    (azimuth * inv_precision).round() * precision,
                    (elevation * inv_precision).round() * precision,
                )
            }
            None => (azimuth, elevation),
        }
    }

    fn days_since_j2000(datetime: &DateTime<Utc>) -> f64 {
        datetime.timestamp_millis() as f64 / 86_400_000.0 + UNIX_EPOCH_JD - J2000_JD
    }

    fn solar_coordinates(&self, n: f64) -> SolarCoordinates {
        let l = (280.460 + 0.985_647_4 * n).rem_euclid(360.0);
        let g = (357.528 + 0.985_600_3 * n).rem_euclid(360.0).to_radians();
        let lambda = (l + 1.915 * g.sin() + 0.020 * (2.0 * g).sin()).to_radians();
        let obliquity = (23.439 - 0.000_000_4 * n).to_radians();

        let right_ascension = (obliquity.cos() * lambda.sin())
            .atan2(lambda.cos())
            .to_degrees();
        let declination = (obliquity.sin() * lambda.sin()).asin().to_degrees();

        let mut eot_degrees = (l - 0.005_718_3 - right_ascension).rem_euclid(360.0);
        if eot_degrees > 180.0 {
            eot_degrees -= 360.0;
        }

        SolarCoordinates {
            declination,
            equation_of_time: 4.0 * eot_degrees,
        }
    }

    /// Instant of local solar noon on `date` (UTC calendar date).
    pub fn solar_noon(&self, date: NaiveDate, point: &GeoPoint) -> DateTime<Utc> {
        let midnight = date.and_time(chrono::NaiveTime::MIN).and_utc();
        let mut noon_hours = 12.0 - point.longitude / 15.0;
        // second pass evaluates the equation of time at the noon estimate
        for _ in 0..2 {
            let estimate = midnight + Self::hours(noon_hours);
            let coords = self.solar_coordinates(Self::days_since_j2000(&estimate));
            noon_hours = 12.0 - point.longitude / 15.0 - coords.equation_of_time / 60.0;
        }
        midnight + Self::hours(noon_hours)
    }

    pub fn sunrise_sunset(&self, date: NaiveDate, point: &GeoPoint) -> DaylightWindow {
        let noon = self.solar_noon(date, point);
        let coords = self.solar_coordinates(Self::days_since_j2000(&noon));

        let lat_rad = point.latitude.to_radians();
        let dec_rad = coords.declination.to_radians();
        let cos_h0 = (SUNRISE_ALTITUDE_DEG.to_radians().sin() - lat_rad.sin() * dec_rad.sin())
            / (lat_rad.cos() * dec_rad.cos());

        if cos_h0 > 1.0 {
            return DaylightWindow::PolarNight;
        }
        if cos_h0 < -1.0 {
            return DaylightWindow::MidnightSun;
        }

        let half_day = Self::hours(cos_h0.acos().to_degrees() / 15.0);
        DaylightWindow::Normal {
            sunrise: noon - half_day,
            sunset: noon + half_day,
        }
    }

    /// Where `now` falls relative to the day's sunrise and sunset at `point`.
    pub fn daylight_status(&self, point: &GeoPoint, now: DateTime<Utc>) -> DaylightStatus {
        // the solar day containing `now`, not the UTC day
        let local_solar = now + Self::hours(point.longitude / 15.0);
        match self.sunrise_sunset(local_solar.date_naive(), point) {
            DaylightWindow::PolarNight => DaylightStatus::PolarNight,
            DaylightWindow::MidnightSun => DaylightStatus::MidnightSun,
            DaylightWindow::Normal { sunrise, sunset } => {
                if now < sunrise {
                    DaylightStatus::BeforeSunrise {
                        minutes_until: (sunrise - now).num_minutes(),
                    }
                } else if now > sunset {
                    DaylightStatus::AfterSunset
                } else {
                    DaylightStatus::SunUp
                }
            }
        }
    }

    fn hours(hours: f64) -> Duration {
        Duration::milliseconds((hours * 3_600_000.0).round() as i64)
    }
}

impl SunPositionProvider for SunCalculator {
    fn sun_state(&self, point: &GeoPoint, instant: DateTime<Utc>) -> SunState {
        self.position(point, &instant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_math::angle_diff;
    use chrono::TimeZone;

    fn kyiv() -> GeoPoint {
        GeoPoint::new(50.4501, 30.5234).unwrap()
    }

    #[test]
    fn test_summer_solstice_noon_in_kyiv() {
        let calc = SunCalculator::new();
        let noon = calc.solar_noon(NaiveDate::from_ymd_opt(2024, 6, 21).unwrap(), &kyiv());
        // 12:00 local solar time is about 09:58 UTC at 30.5°E
        let expected = Utc.with_ymd_and_hms(2024, 6, 21, 9, 59, 0).unwrap();
        assert!((noon - expected).num_minutes().abs() <= 3, "noon at {}", noon);

        let sun = calc.position(&kyiv(), &noon);
        assert!((sun.altitude - 62.99).abs() < 0.5, "altitude {}", sun.altitude);
        assert!(angle_diff(sun.azimuth, 180.0) < 2.0, "azimuth {}", sun.azimuth);
    }

    #[test]
    fn test_morning_sun_is_east_and_evening_west() {
        let calc = SunCalculator::new();
        let morning = calc.position(
            &kyiv(),
            &Utc.with_ymd_and_hms(2024, 6, 21, 4, 0, 0).unwrap(),
        );
        let evening = calc.position(
            &kyiv(),
            &Utc.with_ymd_and_hms(2024, 6, 21, 16, 0, 0).unwrap(),
        );
        assert!(morning.is_up() && evening.is_up());
        assert!((45.0..135.0).contains(&morning.azimuth), "{}", morning.azimuth);
        assert!((225.0..315.0).contains(&evening.azimuth), "{}", evening.azimuth);
    }

    #[test]
    fn test_midnight_sun_is_below_horizon() {
        let calc = SunCalculator::new();
        let sun = calc.position(
            &kyiv(),
            &Utc.with_ymd_and_hms(2024, 12, 21, 22, 0, 0).unwrap(),
        );
        assert!(sun.altitude < -50.0, "altitude {}", sun.altitude);
        assert!(!sun.is_up());
    }

    #[test]
    fn test_sunrise_sunset_kyiv() {
        let calc = SunCalculator::new();
        let window = calc.sunrise_sunset(NaiveDate::from_ymd_opt(2024, 6, 21).unwrap(), &kyiv());
        let DaylightWindow::Normal { sunrise, sunset } = window else {
            panic!("expected a normal day, got {:?}", window);
        };
        let expected_rise = Utc.with_ymd_and_hms(2024, 6, 21, 1, 47, 0).unwrap();
        let expected_set = Utc.with_ymd_and_hms(2024, 6, 21, 18, 12, 0).unwrap();
        assert!((sunrise - expected_rise).num_minutes().abs() <= 5, "sunrise {}", sunrise);
        assert!((sunset - expected_set).num_minutes().abs() <= 5, "sunset {}", sunset);
    }

    #[test]
    fn test_polar_windows() {
        let calc = SunCalculator::new();
        let tromso_ish = GeoPoint::new(75.0, 19.0).unwrap();
        assert_eq!(
            calc.sunrise_sunset(NaiveDate::from_ymd_opt(2024, 12, 21).unwrap(), &tromso_ish),
            DaylightWindow::PolarNight
        );
        assert_eq!(
            calc.sunrise_sunset(NaiveDate::from_ymd_opt(2024, 6, 21).unwrap(), &tromso_ish),
            DaylightWindow::MidnightSun
        );
    }

    #[test]
    fn test_daylight_status() {
        let calc = SunCalculator::new();
        let before = calc.daylight_status(
            &kyiv(),
            Utc.with_ymd_and_hms(2024, 6, 21, 1, 0, 0).unwrap(),
        );
        match before {
            DaylightStatus::BeforeSunrise { minutes_until } => {
                assert!((40..=55).contains(&minutes_until), "{}", minutes_until)
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            calc.daylight_status(&kyiv(), Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap()),
            DaylightStatus::SunUp
        );
        assert_eq!(
            calc.daylight_status(&kyiv(), Utc.with_ymd_and_hms(2024, 6, 21, 20, 0, 0).unwrap()),
            DaylightStatus::AfterSunset
        );
    }

    #[test]
    fn test_angle_precision_rounding() {
        let calc = SunCalculator::with_angle_precision(0.5);
        let sun = calc.position(&kyiv(), &Utc.with_ymd_and_hms(2024, 6, 21, 7, 13, 0).unwrap());
        assert_eq!((sun.altitude * 2.0).fract(), 0.0);
        assert_eq!((sun.azimuth * 2.0).fract(), 0.0);
    }

    #[test]
    fn test_closures_and_fixed_sun_are_providers() {
        let fixed = FixedSun(SunState::new(90.0, 20.0));
        let closure = |_: &GeoPoint, _: DateTime<Utc>| SunState::new(10.0, -5.0);
        let now = Utc::now();
        assert_eq!(fixed.sun_state(&kyiv(), now).azimuth, 90.0);
        assert_eq!(closure.sun_state(&kyiv(), now).altitude, -5.0);
    }
}
