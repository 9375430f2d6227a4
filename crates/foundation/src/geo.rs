/// WGS84 semi-major axis (meters).
pub const WGS84_A: f64 = 6_378_137.0;
/// Mean Earth radius (meters), used for great-circle distances.
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_008.8;

/// Geographic position in WGS-84 degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Finite and inside the WGS-84 degree ranges.
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }

    /// Exactly (0, 0): the "location unknown" sentinel used by several feeds.
    pub fn is_null_island(&self) -> bool {
        self.lon == 0.0 && self.lat == 0.0
    }

    pub fn as_array(&self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

/// Great-circle distance in meters (haversine on the mean sphere).
pub fn haversine_m(a: LonLat, b: LonLat) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lon - a.lon).to_radians();

    let h = (d_phi * 0.5).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda * 0.5).sin().powi(2);
    2.0 * EARTH_MEAN_RADIUS_M * h.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::{EARTH_MEAN_RADIUS_M, LonLat, haversine_m};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn null_island_is_exact() {
        assert!(LonLat::new(0.0, 0.0).is_null_island());
        assert!(!LonLat::new(0.0, 1e-9).is_null_island());
    }

    #[test]
    fn rejects_out_of_range_and_nan() {
        assert!(LonLat::new(179.9, -89.9).is_valid());
        assert!(!LonLat::new(181.0, 0.0).is_valid());
        assert!(!LonLat::new(0.0, f64::NAN).is_valid());
        assert!(!LonLat::new(f64::INFINITY, 0.0).is_valid());
    }

    #[test]
    fn quarter_meridian_distance() {
        let d = haversine_m(LonLat::new(0.0, 0.0), LonLat::new(0.0, 90.0));
        assert_close(d, EARTH_MEAN_RADIUS_M * std::f64::consts::FRAC_PI_2, 1e-6);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = LonLat::new(139.69, 35.68);
        let b = LonLat::new(-122.42, 37.77);
        assert_close(haversine_m(a, b), haversine_m(b, a), 1e-6);
    }
}
