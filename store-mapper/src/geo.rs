const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two WGS84 points, in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1r, lat2r) = (lat1.to_radians(), lat2.to_radians());
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1r.cos() * lat2r.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// Picks the candidate minimizing distance to `(lat, lon)`, provided it's
/// within `radius_km`. Candidates without a valid `[lon, lat]` pair are
/// skipped.
pub fn nearest_within<'a>(
    lat: f64,
    lon: f64,
    radius_km: f64,
    candidates: &'a [platform_client::PickupPointCandidate],
) -> Option<&'a platform_client::PickupPointCandidate> {
    candidates
        .iter()
        .filter_map(|c| c.lon_lat().map(|(clon, clat)| (c, haversine_km(lat, lon, clat, clon))))
        .filter(|(_, d)| *d <= radius_km)
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
        .map(|(c, _)| c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform_client::PickupPointCandidate;

    #[test]
    fn zero_distance_for_identical_points() {
        assert!(haversine_km(-34.6037, -58.3816, -34.6037, -58.3816) < 1e-9);
    }

    #[test]
    fn known_distance_buenos_aires_to_cordoba_is_approximately_correct() {
        // Roughly 650km, within a few km tolerance for the formula.
        let d = haversine_km(-34.6037, -58.3816, -31.4201, -64.1888);
        assert!((640.0..=670.0).contains(&d), "unexpected distance: {d}");
    }

    #[test]
    fn nearest_within_skips_out_of_radius_candidates() {
        let candidates = vec![
            PickupPointCandidate { id: "far".into(), name: "far".into(), geo_coordinates: vec![-64.1888, -31.4201] },
            PickupPointCandidate { id: "near".into(), name: "near".into(), geo_coordinates: vec![-58.39, -34.61] },
        ];
        let best = nearest_within(-34.6037, -58.3816, 15.0, &candidates).unwrap();
        assert_eq!(best.id, "near");
    }

    #[test]
    fn nearest_within_returns_none_when_nothing_in_radius() {
        let candidates = vec![PickupPointCandidate {
            id: "far".into(),
            name: "far".into(),
            geo_coordinates: vec![-64.1888, -31.4201],
        }];
        assert!(nearest_within(-34.6037, -58.3816, 15.0, &candidates).is_none());
    }

    #[test]
    fn nearest_within_skips_malformed_coordinates() {
        let candidates = vec![PickupPointCandidate { id: "bad".into(), name: "bad".into(), geo_coordinates: vec![] }];
        assert!(nearest_within(-34.6037, -58.3816, 15.0, &candidates).is_none());
    }
}
