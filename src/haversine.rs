//! Haversine distance matrix provider (offline fallback).
//!
//! Uses great-circle distance in kilometres. Less accurate than a road
//! network matrix but always available.

use crate::registry::Coordinates;
use crate::traits::DistanceMatrixProvider;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine-based distance matrix provider.
///
/// Distances are scaled by `detour_factor` to approximate road distance.
#[derive(Debug, Clone)]
pub struct HaversineMatrix {
    pub detour_factor: f64,
}

impl Default for HaversineMatrix {
    fn default() -> Self {
        Self { detour_factor: 1.0 }
    }
}

impl HaversineMatrix {
    pub fn new(detour_factor: f64) -> Self {
        Self { detour_factor }
    }

    /// Great-circle distance between two points in kilometers.
    pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
        let lat1_rad = from.lat.to_radians();
        let lat2_rad = to.lat.to_radians();
        let delta_lat = (to.lat - from.lat).to_radians();
        let delta_long = (to.long - from.long).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_long / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }
}

impl DistanceMatrixProvider for HaversineMatrix {
    fn matrix_for(&self, locations: &[Coordinates]) -> Vec<Vec<f64>> {
        let n = locations.len();
        let mut matrix = vec![vec![0.0; n]; n];

        for i in 0..n {
            for j in (i + 1)..n {
                let km = Self::haversine_km(locations[i], locations[j]) * self.detour_factor;
                matrix[i][j] = km;
                matrix[j][i] = km;
            }
        }

        matrix
    }
}
