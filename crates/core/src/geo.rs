//! Great-circle distance between coordinates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mean Earth radius in miles.
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Feet in one mile.
pub const FEET_PER_MILE: f64 = 5280.0;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Distance from this point to `other`.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> DistanceResult {
        distance(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// Unit chosen for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    Feet,
    Miles,
}

/// A distance with its human-readable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistanceResult {
    pub miles: f64,
    pub unit: DistanceUnit,
    pub display: String,
}

impl fmt::Display for DistanceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

/// Haversine distance in miles. Inputs are degrees and are not range-checked.
#[must_use]
pub fn haversine_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_MILES * c
}

/// Distance between two coordinates, formatted as feet below one mile and as
/// miles with one decimal otherwise.
#[must_use]
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> DistanceResult {
    let miles = haversine_miles(lat1, lon1, lat2, lon2);
    let (unit, display) = format_miles(miles);
    DistanceResult {
        miles,
        unit,
        display,
    }
}

fn format_miles(miles: f64) -> (DistanceUnit, String) {
    if miles < 1.0 {
        let feet = (miles * FEET_PER_MILE).round() as i64;
        (DistanceUnit::Feet, format!("{feet} ft"))
    } else {
        (DistanceUnit::Miles, format!("{miles:.1} mi"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_is_zero_feet() {
        let result = distance(40.7128, -74.0060, 40.7128, -74.0060);
        assert_eq!(result.miles, 0.0);
        assert_eq!(result.unit, DistanceUnit::Feet);
        assert_eq!(result.display, "0 ft");
    }

    #[test]
    fn test_symmetry() {
        let ab = haversine_miles(40.7128, -74.0060, 34.0522, -118.2437);
        let ba = haversine_miles(34.0522, -118.2437, 40.7128, -74.0060);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn test_new_york_to_los_angeles() {
        let result = distance(40.7128, -74.0060, 34.0522, -118.2437);
        assert!(result.miles > 2440.0 && result.miles < 2450.0);
        assert_eq!(result.unit, DistanceUnit::Miles);
        assert!(result.display.ends_with(" mi"));
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let result = distance(0.0, 0.0, 1.0, 0.0);
        assert_eq!(result.display, "69.1 mi");
    }

    #[test]
    fn test_short_distance_in_feet() {
        let result = GeoPoint::new(0.0, 0.0).distance_to(&GeoPoint::new(0.001, 0.0));
        assert_eq!(result.display, "365 ft");
        assert_eq!(result.to_string(), "365 ft");
    }
}
