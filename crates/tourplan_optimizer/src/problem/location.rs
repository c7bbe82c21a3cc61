use geo::{Distance, Haversine};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::define_index_newtype;

define_index_newtype!(LocationIdx, Location);

/// WGS84 coordinate as supplied by callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Coordinate { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

#[derive(Debug, Clone)]
pub struct Location {
    point: geo::Point,
}

impl Location {
    pub fn from_lat_lon(lat: f64, lon: f64) -> Self {
        Self {
            point: geo::Point::new(lon, lat),
        }
    }

    pub fn lon(&self) -> f64 {
        self.point.x()
    }

    pub fn lat(&self) -> f64 {
        self.point.y()
    }

    /// Great-circle distance in meters.
    pub fn haversine_distance(&self, to: &Location) -> f64 {
        Haversine.distance(self.point, to.point)
    }
}

impl From<&Coordinate> for Location {
    fn from(coordinate: &Coordinate) -> Self {
        Location::from_lat_lon(coordinate.lat, coordinate.lon)
    }
}

impl From<&Location> for geo::Point<f64> {
    fn from(location: &Location) -> Self {
        location.point
    }
}

impl From<&Location> for geo::Coord<f64> {
    fn from(location: &Location) -> Self {
        geo::Coord {
            x: location.lon(),
            y: location.lat(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_koeln_aachen() {
        let koeln = Location::from_lat_lon(50.9333, 6.95);
        let aachen = Location::from_lat_lon(50.775346, 6.083887);

        let distance = koeln.haversine_distance(&aachen);

        // ~63 km as the crow flies
        assert!(distance > 60_000.0 && distance < 66_000.0, "{distance}");
        assert_eq!(distance, aachen.haversine_distance(&koeln));
    }

    #[test]
    fn test_coordinate_validity() {
        assert!(Coordinate::new(50.9, 6.9).is_valid());
        assert!(!Coordinate::new(95.0, 6.9).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }
}
