use crate::configs::GeoPoint;

/// Mean Earth radius.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points, in kilometres.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAX: GeoPoint = GeoPoint {
        lat: 33.9422,
        lon: -118.4036,
    };

    #[test]
    fn same_point_is_zero() {
        assert_eq!(haversine_km(LAX, LAX), 0.0);
    }

    #[test]
    fn one_degree_of_latitude() {
        let north = GeoPoint {
            lat: LAX.lat + 1.0,
            lon: LAX.lon,
        };
        let d = haversine_km(LAX, north);
        assert!((d - 111.19).abs() < 0.05, "d = {}", d);
    }

    #[test]
    fn lax_to_jfk() {
        let jfk = GeoPoint {
            lat: 40.6413,
            lon: -73.7781,
        };
        let d = haversine_km(LAX, jfk);
        assert!((d - 3_983.0).abs() < 10.0, "d = {}", d);
        assert!((haversine_km(jfk, LAX) - d).abs() < 1e-9);
    }
}
