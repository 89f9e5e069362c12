/// Mean earth radius in kilometers.
pub const EARTH_MEAN_RADIUS_KM: f64 = 6371.0087714;

const KM_PER_MILE: f64 = 1.609344;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialUnits {
    Kilometers,
    Miles,
}

/// Origin and precision of a distance sort.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialOptions {
    pub latitude: f64,
    pub longitude: f64,
    /// Distances are rounded to the nearest multiple of this value; 0 keeps
    /// them exact.
    pub round: f64,
    pub units: SpatialUnits,
}

impl SpatialOptions {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        SpatialOptions {
            latitude,
            longitude,
            round: 0.0,
            units: SpatialUnits::Kilometers,
        }
    }

    /// Distance from the origin to a point, in the configured units and rounding.
    pub fn distance_to(&self, latitude: f64, longitude: f64) -> f64 {
        let km = haversine_km(self.latitude, self.longitude, latitude, longitude);
        let distance = match self.units {
            SpatialUnits::Kilometers => km,
            SpatialUnits::Miles => km / KM_PER_MILE,
        };
        if self.round > 0.0 {
            (distance / self.round).round() * self.round
        } else {
            distance
        }
    }
}

/// Great-circle distance between two points given in degrees.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_MEAN_RADIUS_KM * a.sqrt().min(1.0).asin()
}
