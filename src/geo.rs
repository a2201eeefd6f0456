use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::aggregate::StateMean;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

/// Approximate centroid of each state and union territory.
static STATE_COORDS: Lazy<HashMap<&'static str, Coordinate>> = Lazy::new(|| {
    [
        ("Andhra Pradesh", 15.9129, 79.7400),
        ("Arunachal Pradesh", 28.2180, 94.7278),
        ("Assam", 26.2006, 92.9376),
        ("Bihar", 25.0961, 85.3131),
        ("Chhattisgarh", 21.2787, 81.8661),
        ("Goa", 15.2993, 74.1240),
        ("Gujarat", 22.2587, 71.1924),
        ("Haryana", 29.0588, 76.0856),
        ("Himachal Pradesh", 31.1048, 77.1734),
        ("Jharkhand", 23.6102, 85.2799),
        ("Karnataka", 15.3173, 75.7139),
        ("Kerala", 10.8505, 76.2711),
        ("Madhya Pradesh", 22.9734, 78.6569),
        ("Maharashtra", 19.7515, 75.7139),
        ("Manipur", 24.6637, 93.9063),
        ("Meghalaya", 25.4670, 91.3662),
        ("Mizoram", 23.1645, 92.9376),
        ("Nagaland", 26.1584, 94.5624),
        ("Odisha", 20.9517, 85.0985),
        ("Punjab", 31.1471, 75.3412),
        ("Rajasthan", 27.0238, 74.2179),
        ("Sikkim", 27.5330, 88.5122),
        ("Tamil Nadu", 11.1271, 78.6569),
        ("Telangana", 18.1124, 79.0193),
        ("Tripura", 23.9408, 91.9882),
        ("Uttar Pradesh", 26.8467, 80.9462),
        ("Uttarakhand", 30.0668, 79.0193),
        ("West Bengal", 22.9868, 87.8550),
        ("Delhi", 28.7041, 77.1025),
        ("Jammu and Kashmir", 33.7782, 76.5762),
        ("Ladakh", 34.1526, 77.5770),
        ("Chandigarh", 30.7333, 76.7794),
        ("Puducherry", 11.9416, 79.8083),
        ("Dadra and Nagar Haveli", 20.1809, 73.0169),
        ("Daman and Diu", 20.4283, 72.8397),
        ("Lakshadweep", 10.5667, 72.6417),
        ("Andaman and Nicobar Islands", 11.7401, 92.6586),
        ("The Dadra And Nagar Haveli And Daman And Diu", 20.4283, 72.8397),
    ]
    .into_iter()
    .map(|(name, lat, lon)| (name, Coordinate { lat, lon }))
    .collect()
});

/// Centre of the national view.
pub const NATIONAL_CENTER: Coordinate = Coordinate { lat: 22.0, lon: 82.0 };
pub const NATIONAL_LAT_RANGE: [f64; 2] = [6.0, 38.0];
pub const NATIONAL_LON_RANGE: [f64; 2] = [68.0, 98.0];

/// Half-width in degrees of a zoomed state window.
pub const ZOOM_DEGREES: f64 = 5.0;

pub fn coordinate(state: &str) -> Option<Coordinate> {
    STATE_COORDS.get(state).copied()
}

pub fn known_states() -> usize {
    STATE_COORDS.len()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub state: String,
    pub lat: f64,
    pub lon: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoBounds {
    pub center: Coordinate,
    pub lat_range: [f64; 2],
    pub lon_range: [f64; 2],
}

/// Attach coordinates to state means. States missing from the table are dropped.
pub fn resolve(aggregates: &[StateMean]) -> Vec<MapPoint> {
    aggregates
        .iter()
        .filter_map(|agg| match coordinate(&agg.state) {
            Some(c) => Some(MapPoint {
                state: agg.state.clone(),
                lat: c.lat,
                lon: c.lon,
                value: agg.mean_stress_index,
            }),
            None => {
                debug!(state = %agg.state, "no coordinate; left off the map");
                None
            }
        })
        .collect()
}

/// A ±5° window around a mapped state, else the national box.
pub fn bounds_for(state: Option<&str>) -> GeoBounds {
    match state.and_then(coordinate) {
        Some(c) => GeoBounds {
            center: c,
            lat_range: [c.lat - ZOOM_DEGREES, c.lat + ZOOM_DEGREES],
            lon_range: [c.lon - ZOOM_DEGREES, c.lon + ZOOM_DEGREES],
        },
        None => GeoBounds {
            center: NATIONAL_CENTER,
            lat_range: NATIONAL_LAT_RANGE,
            lon_range: NATIONAL_LON_RANGE,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean(state: &str, v: f64) -> StateMean {
        StateMean {
            state: state.to_string(),
            mean_stress_index: v,
        }
    }

    #[test]
    fn table_is_complete() {
        assert_eq!(known_states(), 38);
        assert!(coordinate("Lakshadweep").is_some());
        assert!(coordinate("kerala").is_none());
    }

    #[test]
    fn unknown_states_are_dropped() {
        let points = resolve(&[mean("Bihar", 0.45), mean("Atlantis", 9.0)]);
        assert_eq!(points.len(), 1);
        assert_eq!(
            points[0],
            MapPoint {
                state: "Bihar".into(),
                lat: 25.0961,
                lon: 85.3131,
                value: 0.45,
            }
        );
        assert!(resolve(&[mean("Atlantis", 1.0)]).is_empty());
        assert!(resolve(&[]).is_empty());
    }

    #[test]
    fn zoomed_bounds() {
        let b = bounds_for(Some("Kerala"));
        assert_eq!(b.center, Coordinate { lat: 10.8505, lon: 76.2711 });
        assert!((b.lat_range[0] - 5.8505).abs() < 1e-9);
        assert!((b.lon_range[1] - 81.2711).abs() < 1e-9);
    }

    #[test]
    fn national_bounds() {
        for state in [None, Some("Atlantis")] {
            let b = bounds_for(state);
            assert_eq!(b.center, NATIONAL_CENTER);
            assert_eq!(b.lat_range, [6.0, 38.0]);
            assert_eq!(b.lon_range, [68.0, 98.0]);
        }
    }
}
