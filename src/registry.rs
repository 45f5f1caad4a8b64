//! Depot-indexed distance registry.
//!
//! Index 0 is always the depot. Every other index is a destination: one
//! unique coordinate, with the guests sharing it merged into a single stop.

use std::collections::HashMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::event::{Event, GuestIssue, UnresolvedGuest};
use crate::traits::DistanceMatrixProvider;

/// Relative tolerance when checking `distance[i][j] == distance[j][i]`.
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// A geographic position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub long: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, long: f64) -> Self {
        Self { lat, long }
    }

    /// Stable key used to merge guests at the same position.
    pub fn key(&self) -> String {
        format!("{:.6},{:.6}", self.lat, self.long)
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.long.is_finite()
    }

    /// Squared planar distance in degrees, used for clustering.
    pub fn squared_distance(&self, other: &Coordinates) -> f64 {
        let d_lat = self.lat - other.lat;
        let d_long = self.long - other.long;
        d_lat * d_lat + d_long * d_long
    }
}

/// Raw registry input, as produced by geocoding and matrix retrieval.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryParts {
    pub distance: Vec<Vec<f64>>,
    pub address_order: Vec<String>,
    pub coordinate_to_address: HashMap<String, Coordinates>,
    pub destination_occupancy: HashMap<String, usize>,
}

/// Immutable routing input: the distance matrix plus address metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RegistryParts", into = "RegistryParts")]
pub struct DistanceRegistry {
    parts: RegistryParts,
    coordinates: Vec<Coordinates>,
    guest_counts: Vec<usize>,
    index_by_key: HashMap<String, usize>,
}

impl TryFrom<RegistryParts> for DistanceRegistry {
    type Error = RegistryError;

    fn try_from(parts: RegistryParts) -> Result<Self, Self::Error> {
        Self::new(parts)
    }
}

impl From<DistanceRegistry> for RegistryParts {
    fn from(registry: DistanceRegistry) -> Self {
        registry.parts
    }
}

impl DistanceRegistry {
    pub fn new(parts: RegistryParts) -> Result<Self, RegistryError> {
        validate_matrix(&parts.distance, parts.address_order.len())?;

        let mut coordinates = Vec::with_capacity(parts.address_order.len());
        let mut guest_counts = Vec::with_capacity(parts.address_order.len());
        let mut index_by_key = HashMap::with_capacity(parts.address_order.len());

        for (index, address) in parts.address_order.iter().enumerate() {
            let location = parts
                .coordinate_to_address
                .get(address)
                .copied()
                .ok_or_else(|| RegistryError::MissingCoordinates(address.clone()))?;
            let key = location.key();
            if index_by_key.insert(key.clone(), index).is_some() {
                return Err(RegistryError::DuplicateAddress(address.clone()));
            }
            guest_counts.push(parts.destination_occupancy.get(&key).copied().unwrap_or(0));
            coordinates.push(location);
        }

        Ok(Self {
            parts,
            coordinates,
            guest_counts,
            index_by_key,
        })
    }

    /// Build a registry from an event's guests.
    ///
    /// Guests sharing a coordinate become one destination whose guest count is
    /// the sum of their group sizes. Destinations are numbered in order of
    /// first appearance. Guests that cannot be placed are returned alongside.
    pub fn from_event<M: DistanceMatrixProvider>(
        depot_address: &str,
        depot: Coordinates,
        event: &Event,
        provider: &M,
    ) -> Result<(Self, Vec<UnresolvedGuest>), RegistryError> {
        let mut address_order = vec![depot_address.to_string()];
        let mut locations = vec![depot];
        let mut coordinate_to_address = HashMap::from([(depot_address.to_string(), depot)]);
        let mut destination_occupancy = HashMap::from([(depot.key(), 0)]);
        let mut unresolved = Vec::new();

        for guest in &event.guests {
            if guest.group_size == 0 {
                unresolved.push(UnresolvedGuest::new(guest, GuestIssue::EmptyGroup));
                continue;
            }
            if !guest.coordinates.is_finite() {
                unresolved.push(UnresolvedGuest::new(guest, GuestIssue::InvalidCoordinates));
                continue;
            }

            let key = guest.coordinates.key();
            if let Some(existing) = coordinate_to_address.get(&guest.address) {
                if existing.key() != key {
                    unresolved.push(UnresolvedGuest::new(guest, GuestIssue::AmbiguousAddress));
                    continue;
                }
            }

            if !destination_occupancy.contains_key(&key) {
                address_order.push(guest.address.clone());
                locations.push(guest.coordinates);
            }
            *destination_occupancy.entry(key).or_insert(0) += guest.group_size;
            coordinate_to_address
                .entry(guest.address.clone())
                .or_insert(guest.coordinates);
        }

        let distance = provider.matrix_for(&locations);
        let registry = Self::new(RegistryParts {
            distance,
            address_order,
            coordinate_to_address,
            destination_occupancy,
        })?;

        Ok((registry, unresolved))
    }

    /// Number of entries including the depot.
    pub fn len(&self) -> usize {
        self.parts.address_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.address_order.is_empty()
    }

    pub fn destination_count(&self) -> usize {
        self.len().saturating_sub(1)
    }

    /// Destination indices, depot excluded.
    pub fn destinations(&self) -> Range<usize> {
        1..self.len()
    }

    pub fn distance(&self, from: usize, to: usize) -> f64 {
        self.parts.distance[from][to]
    }

    pub fn matrix(&self) -> &[Vec<f64>] {
        &self.parts.distance
    }

    /// Clarke-Wright saving of serving `i` and `j` on one route:
    /// `d(0, i) + d(0, j) - d(i, j)`.
    pub fn saving(&self, i: usize, j: usize) -> f64 {
        self.distance(0, i) + self.distance(0, j) - self.distance(i, j)
    }

    pub fn address(&self, index: usize) -> &str {
        &self.parts.address_order[index]
    }

    pub fn address_order(&self) -> &[String] {
        &self.parts.address_order
    }

    pub fn coordinates(&self, index: usize) -> Coordinates {
        self.coordinates[index]
    }

    pub fn guest_count(&self, index: usize) -> usize {
        self.guest_counts[index]
    }

    /// Guest counts indexed exactly like the address order.
    pub fn guest_counts(&self) -> &[usize] {
        &self.guest_counts
    }

    /// Index of the entry at these coordinates, if registered.
    pub fn index_of(&self, location: Coordinates) -> Option<usize> {
        self.index_by_key.get(&location.key()).copied()
    }

    /// Index of the entry an address resolves to, if registered.
    pub fn index_of_address(&self, address: &str) -> Option<usize> {
        self.parts
            .coordinate_to_address
            .get(address)
            .and_then(|location| self.index_of(*location))
    }
}

fn validate_matrix(matrix: &[Vec<f64>], addresses: usize) -> Result<(), RegistryError> {
    if addresses == 0 {
        return Err(RegistryError::Empty);
    }
    if matrix.len() != addresses {
        return Err(RegistryError::SizeMismatch {
            rows: matrix.len(),
            addresses,
        });
    }

    for (i, row) in matrix.iter().enumerate() {
        if row.len() != addresses {
            return Err(RegistryError::NotSquare {
                row: i,
                len: row.len(),
                expected: addresses,
            });
        }
        for (j, &value) in row.iter().enumerate() {
            if !value.is_finite() || value < 0.0 {
                return Err(RegistryError::InvalidDistance { i, j });
            }
        }
        if row[i] != 0.0 {
            return Err(RegistryError::NonZeroDiagonal {
                index: i,
                value: row[i],
            });
        }
    }

    for i in 0..addresses {
        for j in (i + 1)..addresses {
            let forward = matrix[i][j];
            let backward = matrix[j][i];
            let scale = forward.abs().max(backward.abs()).max(1.0);
            if (forward - backward).abs() > SYMMETRY_TOLERANCE * scale {
                return Err(RegistryError::Asymmetric {
                    i,
                    j,
                    forward,
                    backward,
                });
            }
        }
    }

    Ok(())
}
