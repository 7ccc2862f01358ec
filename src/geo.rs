//! Great-circle distances between coordinates

use haversine::{Location as HaversineLocation, Units, distance};

use crate::models::Coordinate;

/// Distance assumed when either end of a leg is unknown: "far away", never an error
pub const FALLBACK_DISTANCE_KM: f64 = 100.0;

/// Haversine distance in kilometres (Earth radius 6371 km).
///
/// Returns [`FALLBACK_DISTANCE_KM`] if any of the four numbers is NaN or infinite.
#[must_use]
pub fn distance_km(from: &Coordinate, to: &Coordinate) -> f64 {
    let inputs = [from.latitude, from.longitude, to.latitude, to.longitude];
    if inputs.iter().any(|v| !v.is_finite()) {
        return FALLBACK_DISTANCE_KM;
    }

    distance(
        HaversineLocation {
            latitude: from.latitude,
            longitude: from.longitude,
        },
        HaversineLocation {
            latitude: to.latitude,
            longitude: to.longitude,
        },
        Units::Kilometers,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn point(latitude: f64, longitude: f64) -> Coordinate {
        Coordinate {
            latitude,
            longitude,
        }
    }

    #[test]
    fn test_same_point_is_zero() {
        let p = point(48.0, 7.0);
        assert_abs_diff_eq!(distance_km(&p, &p), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_symmetric() {
        let loerrach = point(47.6149, 7.6647);
        let freiburg = point(47.9990, 7.8421);
        assert_abs_diff_eq!(
            distance_km(&loerrach, &freiburg),
            distance_km(&freiburg, &loerrach),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_known_distance() {
        // Lörrach to Basel is roughly 8 km
        let d = distance_km(&point(47.6149, 7.6647), &point(47.5596, 7.5886));
        assert!(d > 6.0 && d < 10.0, "unexpected distance {d}");

        // one degree of latitude on a 6371 km sphere
        let d = distance_km(&point(0.0, 0.0), &point(1.0, 0.0));
        assert_abs_diff_eq!(d, 111.195, epsilon = 0.01);
    }

    #[test]
    fn test_nan_falls_back() {
        let good = point(47.6, 7.6);
        assert_eq!(distance_km(&point(f64::NAN, 7.6), &good), FALLBACK_DISTANCE_KM);
        assert_eq!(distance_km(&good, &point(47.6, f64::NAN)), FALLBACK_DISTANCE_KM);
        assert_eq!(distance_km(&good, &point(f64::INFINITY, 0.0)), FALLBACK_DISTANCE_KM);
    }
}
