//! Test fixtures for outreach-dispatch.
//!
//! Provides:
//! - Ottawa street locations for realistic events
//! - Builders for hand-written distance registries and guest lists

pub mod ottawa_locations;

pub use ottawa_locations::*;

use std::collections::HashMap;

use outreach_dispatch::event::{Event, Guest};
use outreach_dispatch::haversine::HaversineMatrix;
use outreach_dispatch::registry::{Coordinates, DistanceRegistry, RegistryParts};

/// Registry from an explicit matrix. Entry `i` gets address `"{i} Test St"`
/// and `guests[i]` people; index 0 is the depot.
pub fn matrix_registry(matrix: Vec<Vec<f64>>, guests: &[usize]) -> DistanceRegistry {
    let mut coordinate_to_address = HashMap::new();
    let mut destination_occupancy = HashMap::new();
    let mut address_order = Vec::new();
    for (index, &count) in guests.iter().enumerate() {
        let address = test_address(index);
        let location = test_coordinates(index);
        coordinate_to_address.insert(address.clone(), location);
        destination_occupancy.insert(location.key(), count);
        address_order.push(address);
    }
    DistanceRegistry::new(RegistryParts {
        distance: matrix,
        address_order,
        coordinate_to_address,
        destination_occupancy,
    })
    .expect("fixture registry should be valid")
}

/// One guest per destination of a [`matrix_registry`], group size matching
/// the registered guest count.
pub fn matrix_event(event_type: &str, guests: &[usize]) -> Event {
    let guests = guests
        .iter()
        .enumerate()
        .skip(1)
        .map(|(index, &count)| {
            Guest::new(format!("Guest {}", index), count, test_address(index), test_coordinates(index))
        })
        .collect();
    Event::new(event_type, guests)
}

pub fn test_address(index: usize) -> String {
    format!("{} Test St", index)
}

pub fn test_coordinates(index: usize) -> Coordinates {
    Coordinates::new(45.0 + index as f64 * 0.01, -75.0)
}

/// Build a symmetric matrix from `(i, j, distance)` triples.
pub fn symmetric(n: usize, edges: &[(usize, usize, f64)]) -> Vec<Vec<f64>> {
    let mut matrix = vec![vec![0.0; n]; n];
    for &(i, j, distance) in edges {
        matrix[i][j] = distance;
        matrix[j][i] = distance;
    }
    matrix
}

/// Event with guests at the given locations; group sizes cycle through
/// `sizes`.
pub fn event_at(event_type: &str, locations: &[Location], sizes: &[usize]) -> Event {
    let guests = locations
        .iter()
        .enumerate()
        .map(|(i, location)| {
            Guest::new(location.name, sizes[i % sizes.len()], location.name, location.coords())
                .with_phone(format!("613-555-{:04}", i))
        })
        .collect();
    Event::new(event_type, guests)
}

pub fn ottawa_registry(event: &Event) -> DistanceRegistry {
    let (registry, unresolved) = DistanceRegistry::from_event(
        DEPOT.name,
        DEPOT.coords(),
        event,
        &HaversineMatrix::new(1.3),
    )
    .expect("registry should build");
    assert!(unresolved.is_empty(), "fixture guests should all resolve");
    registry
}

/// Check the ledger invariants that hold after every dispatch run.
///
/// Seat accounting always balances. The seat limit itself only binds savings
/// dispatch, so it is checked when `check_seats` is set.
pub fn assert_fleet_invariants(
    fleet: &outreach_dispatch::fleet::FleetState,
    registry: &DistanceRegistry,
    check_seats: bool,
) {
    let mut owner: HashMap<usize, usize> = HashMap::new();

    for (vehicle_index, vehicle) in fleet.vehicles().iter().enumerate() {
        let route = vehicle.route().to_vec();
        assert!(
            route.len() <= fleet.max_stops_per_route(),
            "vehicle {} has {} stops",
            vehicle_index,
            route.len()
        );

        for &destination in &route {
            assert_ne!(destination, 0, "depot must never be routed");
            if let Some(previous) = owner.insert(destination, vehicle_index) {
                panic!(
                    "vehicles {} and {} both visit destination {}",
                    previous, vehicle_index, destination
                );
            }
            assert_eq!(
                fleet.served_by(destination),
                Some(vehicle_index),
                "served_by disagrees with route for destination {}",
                destination
            );
        }

        let seated: usize = route.iter().map(|&d| registry.guest_count(d)).sum();
        assert_eq!(
            seated + vehicle.seats_remaining(),
            fleet.max_vehicle_seats() + vehicle.overbooked(),
            "vehicle {} seat count out of step",
            vehicle_index
        );
        if check_seats {
            assert!(seated <= fleet.max_vehicle_seats(), "vehicle {} over capacity", vehicle_index);
            assert_eq!(vehicle.overbooked(), 0);
        }

        let guest_total: usize = vehicle.guests().iter().map(|g| g.group_size).sum();
        let expected: usize = route.iter().map(|&d| registry.guest_count(d)).sum();
        assert_eq!(guest_total, expected, "vehicle {} guest list out of step", vehicle_index);
    }

    for destination in registry.destinations() {
        if let Some(vehicle) = fleet.served_by(destination) {
            assert_eq!(owner.get(&destination), Some(&vehicle));
        } else {
            assert!(!owner.contains_key(&destination));
        }
    }
}
