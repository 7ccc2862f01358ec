//! Location model for geographic coordinates and metadata

use serde::{Deserialize, Serialize};

/// A point on the globe in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, treating out-of-range or non-finite input as missing
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let coordinate = Self {
            latitude,
            longitude,
        };
        coordinate.is_valid().then_some(coordinate)
    }

    /// Build a coordinate from provider strings such as `"47.6149"`
    #[must_use]
    pub fn parse(latitude: Option<&str>, longitude: Option<&str>) -> Option<Self> {
        let lat = latitude?.trim().parse::<f64>().ok()?;
        let lon = longitude?.trim().parse::<f64>().ok()?;
        Self::new(lat, lon)
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Format as `lat,lon` with four decimals
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4},{:.4}", self.latitude, self.longitude)
    }

    /// Round coordinates for cache key generation
    #[must_use]
    pub fn rounded(&self, precision: u32) -> (f64, f64) {
        let multiplier = 10_f64.powi(i32::try_from(precision).unwrap_or(4));
        let lat = (self.latitude * multiplier).round() / multiplier;
        let lon = (self.longitude * multiplier).round() / multiplier;
        (lat, lon)
    }
}

/// A resolved place the user searches around
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Display name (city, region, full geocoder label, ...)
    pub name: String,
    pub coordinate: Coordinate,
    /// Country name or code when the source provides one
    pub country: Option<String>,
}

impl Location {
    /// Create a new location
    #[must_use]
    pub fn new(name: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            name: name.into(),
            coordinate,
            country: None,
        }
    }

    /// Create location with country
    #[must_use]
    pub fn with_country(
        name: impl Into<String>,
        coordinate: Coordinate,
        country: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            coordinate,
            country: Some(country.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(47.6149, 7.6647).is_some());
        assert!(Coordinate::new(90.0, 180.0).is_some());
        assert!(Coordinate::new(90.1, 7.0).is_none());
        assert!(Coordinate::new(47.0, -180.5).is_none());
        assert!(Coordinate::new(f64::NAN, 7.0).is_none());
        assert!(Coordinate::new(47.0, f64::INFINITY).is_none());
    }

    #[test]
    fn test_coordinate_from_provider_strings() {
        let parsed = Coordinate::parse(Some("47.5596"), Some(" 7.5886 ")).unwrap();
        assert_eq!(parsed.latitude, 47.5596);
        assert_eq!(parsed.longitude, 7.5886);

        assert!(Coordinate::parse(None, Some("7.5886")).is_none());
        assert!(Coordinate::parse(Some(""), Some("7.5886")).is_none());
        assert!(Coordinate::parse(Some("north"), Some("7.5886")).is_none());
    }

    #[test]
    fn test_rounded_coordinates() {
        let coordinate = Coordinate::new(46.818_234, 8.227_456).unwrap();
        assert_eq!(coordinate.rounded(2), (46.82, 8.23));
        assert_eq!(coordinate.format_coordinates(), "46.8182,8.2275");
    }
}
