/// Parameters of the reference ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Datum {
    semimajor: f64,
    inv_flattening: f64,
}

impl Datum {
    /// WGS84 ellipsoid.
    pub const WGS84: Self = Datum {
        semimajor: 6_378_137.0,
        inv_flattening: 298.257223563,
    };

    /// Semimajor axis in meters.
    pub fn semimajor(&self) -> f64 {
        self.semimajor
    }

    /// Inverse flattening.
    pub fn inv_flattening(&self) -> f64 {
        self.inv_flattening
    }

    /// Length of the equator in meters.
    pub fn circumference(&self) -> f64 {
        2.0 * std::f64::consts::PI * self.semimajor
    }

    /// Ground distance covered by one screen point at the given latitude and zoom level, in meters.
    pub fn meters_per_point(&self, latitude: f64, zoom: f64) -> f64 {
        let latitude = latitude.clamp(
            super::mercator::LATITUDE_MIN,
            super::mercator::LATITUDE_MAX,
        );
        latitude.to_radians().cos() * self.circumference() / super::mercator::world_size(zoom)
    }
}

impl Default for Datum {
    fn default() -> Self {
        Self::WGS84
    }
}
