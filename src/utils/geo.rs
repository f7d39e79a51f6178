//! Utilidades geográficas
//!
//! Distancias sobre coordenadas WGS84 en grados decimales.

/// Radio medio de la Tierra en kilómetros
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Distancia haversine entre dos puntos `(lat, lng)` en kilómetros
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lng1) = from;
    let (lat2, lng2) = to;

    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_same_point() {
        let p = (10.762622, 106.660172);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn known_distance_hcmc_hanoi() {
        // Ciudad Ho Chi Minh -> Hanói, ~1140 km en línea recta
        let hcmc = (10.762622, 106.660172);
        let hanoi = (21.028511, 105.804817);
        let d = haversine_km(hcmc, hanoi);
        assert!((1100.0..1200.0).contains(&d), "distancia fuera de rango: {}", d);
    }

    #[test]
    fn symmetric() {
        let a = (10.0, 106.0);
        let b = (10.0, 106.01);
        assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-12);
    }

    #[test]
    fn one_hundredth_degree_of_longitude_at_equatorish() {
        // A ~10° de latitud, 0.01° de longitud ronda 1.1 km
        let d = haversine_km((10.0, 106.0), (10.0, 106.01));
        assert!((1.0..1.2).contains(&d), "distancia fuera de rango: {}", d);
    }
}
