use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A WGS84 coordinate in decimal degrees.
///
/// Deserialization goes through the same range check as [`GeoPoint::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPoint")]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Error)]
#[error("coordinates out of range: lat {lat}, lon {lon}")]
pub struct OutOfRange {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Deserialize)]
struct RawPoint {
    lat: f64,
    lon: f64,
}

impl TryFrom<RawPoint> for GeoPoint {
    type Error = OutOfRange;

    fn try_from(raw: RawPoint) -> Result<Self, Self::Error> {
        GeoPoint::new(raw.lat, raw.lon).ok_or(OutOfRange {
            lat: raw.lat,
            lon: raw.lon,
        })
    }
}

impl GeoPoint {
    /// Build a point, rejecting anything outside the valid lat/lon range (NaN included).
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let point = Self { lat, lon };
        point.is_valid().then_some(point)
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }

    /// Great-circle distance in meters.
    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        Haversine.distance(self.to_point(), other.to_point())
    }

    /// Great-circle distance in kilometers.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        self.distance_m(other) / 1000.0
    }

    fn to_point(self) -> Point<f64> {
        // geo points are (x = lon, y = lat)
        Point::new(self.lon, self.lat)
    }
}

/// Round a distance to one decimal place.
pub fn round_km(km: f64) -> f64 {
    (km * 10.0).round() / 10.0
}
