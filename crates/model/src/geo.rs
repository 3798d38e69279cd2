use serde::{Deserialize, Serialize};
use utility::geo;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        geo::is_valid_position(self.latitude, self.longitude)
    }
}

/// Rectangular extent of a ride group. `start` is the south-west corner,
/// `end` the north-east corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoExtent {
    pub start_latitude: f64,
    pub start_longitude: f64,
    pub end_latitude: f64,
    pub end_longitude: f64,
}

impl GeoExtent {
    /// Smallest extent covering both points, whatever their order.
    pub fn covering(a: Coordinate, b: Coordinate) -> Self {
        Self {
            start_latitude: a.latitude.min(b.latitude),
            start_longitude: a.longitude.min(b.longitude),
            end_latitude: a.latitude.max(b.latitude),
            end_longitude: a.longitude.max(b.longitude),
        }
    }

    pub fn start(&self) -> Coordinate {
        Coordinate::new(self.start_latitude, self.start_longitude)
    }

    pub fn end(&self) -> Coordinate {
        Coordinate::new(self.end_latitude, self.end_longitude)
    }
}
