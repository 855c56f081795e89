//! Great-circle distance

use crate::fix::Position;

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two positions, in meters
pub fn haversine_distance(p1: Position, p2: Position) -> f64 {
    let lat1 = p1.latitude.to_radians();
    let lat2 = p2.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (p2.longitude - p1.longitude).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair above 1.0 for antipodal points
    let c = 2.0 * a.sqrt().min(1.0).asin();

    c * EARTH_RADIUS_M
}

/// Distance between two possibly-unknown positions.
///
/// Returns `None` when either side is unknown.
pub fn distance(p1: Option<Position>, p2: Option<Position>) -> Option<f64> {
    Some(haversine_distance(p1?, p2?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_one_degree_longitude_at_equator() {
        let d = haversine_distance(Position::new(0.0, 0.0), Position::new(0.0, 1.0));
        assert!((d - 111_195.0).abs() < 111_195.0 * 0.01, "got {d}");
    }

    #[test]
    fn test_unknown_positions() {
        let p = Some(Position::new(48.1, 11.5));
        assert_eq!(distance(None, p), None);
        assert_eq!(distance(p, None), None);
        assert_eq!(distance(None, None), None);
        assert_eq!(distance(p, p), Some(0.0));
    }

    #[test]
    fn test_antipodal_points() {
        let d = haversine_distance(Position::new(0.0, 0.0), Position::new(0.0, 180.0));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_M).abs() < 1.0);
    }

    proptest! {
        #[test]
        fn prop_identity(lat in -90.0f64..=90.0, lon in -180.0f64..=180.0) {
            let p = Position::new(lat, lon);
            prop_assert_eq!(haversine_distance(p, p), 0.0);
        }

        #[test]
        fn prop_symmetric(
            lat1 in -90.0f64..=90.0, lon1 in -180.0f64..=180.0,
            lat2 in -90.0f64..=90.0, lon2 in -180.0f64..=180.0,
        ) {
            let a = Position::new(lat1, lon1);
            let b = Position::new(lat2, lon2);
            let ab = haversine_distance(a, b);
            let ba = haversine_distance(b, a);
            prop_assert!((ab - ba).abs() < 1e-6);
            prop_assert!(ab >= 0.0);
        }
    }
}
