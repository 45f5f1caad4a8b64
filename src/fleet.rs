//! Vehicles, routes and the assignment ledger.
//!
//! Vehicles live in a flat arena and are addressed by index. Routes hold
//! destination indices only, so no structure ever aliases another.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::event::Guest;
use crate::registry::{Coordinates, DistanceRegistry};
use crate::traits::UnservedReason;

/// One of the two open ends of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Front,
    Back,
}

/// Ordered visiting sequence of destination indices.
///
/// Only the two endpoints may be queried for attachment or extended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    stops: VecDeque<usize>,
}

impl Route {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    pub fn front(&self) -> Option<usize> {
        self.stops.front().copied()
    }

    pub fn back(&self) -> Option<usize> {
        self.stops.back().copied()
    }

    pub fn contains(&self, location: usize) -> bool {
        self.stops.contains(&location)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.stops.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.stops.iter().copied().collect()
    }

    /// Which end currently holds `location`. The back wins on a single-stop
    /// route.
    pub fn endpoint_of(&self, location: usize) -> Option<Endpoint> {
        if self.back() == Some(location) {
            Some(Endpoint::Back)
        } else if self.front() == Some(location) {
            Some(Endpoint::Front)
        } else {
            None
        }
    }

    /// Attach `new_location` next to `existing`, on the end it occupies.
    ///
    /// Returns false without touching the route if `existing` is not an
    /// endpoint.
    pub fn extend(&mut self, existing: usize, new_location: usize) -> bool {
        match self.endpoint_of(existing) {
            Some(Endpoint::Back) => {
                self.stops.push_back(new_location);
                true
            }
            Some(Endpoint::Front) => {
                self.stops.push_front(new_location);
                true
            }
            None => false,
        }
    }

    pub(crate) fn push_back(&mut self, location: usize) {
        self.stops.push_back(location);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    seats_remaining: usize,
    /// Guests loaded beyond the vehicle's seats.
    #[serde(default)]
    overbooked: usize,
    route: Route,
    guests: Vec<Guest>,
}

impl Vehicle {
    pub fn new(seats: usize) -> Self {
        Self {
            seats_remaining: seats,
            overbooked: 0,
            route: Route::new(),
            guests: Vec::new(),
        }
    }

    pub fn seats_remaining(&self) -> usize {
        self.seats_remaining
    }

    pub fn overbooked(&self) -> usize {
        self.overbooked
    }

    pub fn is_over_capacity(&self) -> bool {
        self.overbooked > 0
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Guests resolved for this vehicle after routing, in route order.
    pub fn guests(&self) -> &[Guest] {
        &self.guests
    }

    pub fn is_idle(&self) -> bool {
        self.route.is_empty()
    }
}

/// A vehicle carrying more guests than it has seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverCapacityVehicle {
    pub vehicle: usize,
    pub seats: usize,
    pub seated: usize,
}

/// A destination left without a vehicle at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnservedDestination {
    pub index: usize,
    pub address: String,
    pub guest_count: usize,
    pub reason: UnservedReason,
}

/// The mutable assignment ledger for one dispatch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetState {
    vehicles: Vec<Vehicle>,
    served_by: Vec<Option<usize>>,
    guest_counts: Vec<usize>,
    max_vehicle_seats: usize,
    max_stops_per_route: usize,
    fleet_limit: Option<usize>,
    #[serde(skip)]
    failures: Vec<Option<UnservedReason>>,
}

impl FleetState {
    /// Empty fleet with every destination marked unserved.
    pub fn new(registry: &DistanceRegistry, config: &DispatchConfig) -> Self {
        let n = registry.len();
        Self {
            vehicles: Vec::new(),
            served_by: vec![None; n],
            guest_counts: registry.guest_counts().to_vec(),
            max_vehicle_seats: config.max_vehicle_seats,
            max_stops_per_route: config.max_stops_per_route,
            fleet_limit: config.fleet_limit,
            failures: vec![None; n],
        }
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, index: usize) -> Option<&Vehicle> {
        self.vehicles.get(index)
    }

    /// Vehicles with at least one stop, with their arena index.
    pub fn active_vehicles(&self) -> impl Iterator<Item = (usize, &Vehicle)> + '_ {
        self.vehicles
            .iter()
            .enumerate()
            .filter(|(_, vehicle)| !vehicle.is_idle())
    }

    /// Number of registry entries tracked, depot included.
    pub fn destination_count(&self) -> usize {
        self.served_by.len()
    }

    pub fn served_by(&self, destination: usize) -> Option<usize> {
        self.served_by.get(destination).copied().flatten()
    }

    pub fn is_served(&self, destination: usize) -> bool {
        self.served_by(destination).is_some()
    }

    pub fn guest_count(&self, destination: usize) -> usize {
        self.guest_counts.get(destination).copied().unwrap_or(0)
    }

    pub fn max_vehicle_seats(&self) -> usize {
        self.max_vehicle_seats
    }

    pub fn max_stops_per_route(&self) -> usize {
        self.max_stops_per_route
    }

    pub fn fleet_limit(&self) -> Option<usize> {
        self.fleet_limit
    }

    /// Guests sitting in vehicles, counted from the ledger.
    pub fn served_guest_total(&self) -> usize {
        (0..self.served_by.len())
            .filter(|&destination| self.is_served(destination))
            .map(|destination| self.guest_count(destination))
            .sum()
    }

    /// Destination indices of a vehicle's route, empty for unknown vehicles.
    pub fn route_indices(&self, vehicle: usize) -> Vec<usize> {
        self.vehicles
            .get(vehicle)
            .map(|v| v.route.to_vec())
            .unwrap_or_default()
    }

    pub fn route_addresses<'r>(&self, vehicle: usize, registry: &'r DistanceRegistry) -> Vec<&'r str> {
        self.vehicles
            .get(vehicle)
            .map(|v| v.route.iter().map(|index| registry.address(index)).collect())
            .unwrap_or_default()
    }

    pub fn route_coordinates(&self, vehicle: usize, registry: &DistanceRegistry) -> Vec<Coordinates> {
        self.vehicles
            .get(vehicle)
            .map(|v| v.route.iter().map(|index| registry.coordinates(index)).collect())
            .unwrap_or_default()
    }

    /// Destinations without a vehicle, ascending by index.
    pub fn unserved_destinations(&self, registry: &DistanceRegistry) -> Vec<UnservedDestination> {
        registry
            .destinations()
            .filter(|&index| !self.is_served(index))
            .map(|index| {
                let guest_count = self.guest_count(index);
                let reason = if guest_count > self.max_vehicle_seats {
                    UnservedReason::ExceedsVehicleSeats
                } else {
                    self.failures
                        .get(index)
                        .copied()
                        .flatten()
                        .unwrap_or(UnservedReason::NoPairing)
                };
                UnservedDestination {
                    index,
                    address: registry.address(index).to_string(),
                    guest_count,
                    reason,
                }
            })
            .collect()
    }

    /// Vehicles whose load exceeds their seats, ascending by index.
    pub fn over_capacity_vehicles(&self) -> Vec<OverCapacityVehicle> {
        self.vehicles
            .iter()
            .enumerate()
            .filter(|(_, vehicle)| vehicle.is_over_capacity())
            .map(|(index, vehicle)| OverCapacityVehicle {
                vehicle: index,
                seats: self.max_vehicle_seats,
                seated: self.max_vehicle_seats + vehicle.overbooked - vehicle.seats_remaining,
            })
            .collect()
    }

    pub(crate) fn ensure_matches(&self, registry: &DistanceRegistry) -> Result<(), DispatchError> {
        if self.served_by.len() != registry.len() {
            return Err(DispatchError::RegistryMismatch {
                fleet: self.served_by.len(),
                registry: registry.len(),
            });
        }
        Ok(())
    }

    /// Append a fresh vehicle, respecting the fleet limit.
    pub(crate) fn add_vehicle(&mut self) -> Result<usize, DispatchError> {
        if let Some(limit) = self.fleet_limit {
            if self.vehicles.len() >= limit {
                return Err(DispatchError::NoVehicleAvailable { limit });
            }
        }
        self.vehicles.push(Vehicle::new(self.max_vehicle_seats));
        Ok(self.vehicles.len() - 1)
    }

    /// First idle vehicle accepted by `fits`, allocating one if needed.
    pub(crate) fn acquire_vehicle(
        &mut self,
        fits: impl Fn(&Vehicle) -> bool,
    ) -> Result<usize, UnservedReason> {
        if let Some(index) = self
            .vehicles
            .iter()
            .position(|vehicle| vehicle.is_idle() && fits(vehicle))
        {
            return Ok(index);
        }

        if !fits(&Vehicle::new(self.max_vehicle_seats)) {
            return Err(UnservedReason::CapacityExhausted);
        }
        self.add_vehicle()
            .map_err(|_| UnservedReason::NoVehicleAvailable)
    }

    /// Whether `stops` may open a route on an idle vehicle.
    pub(crate) fn can_start_route(&self, vehicle: usize, stops: &[usize]) -> bool {
        let Some(v) = self.vehicles.get(vehicle) else {
            return false;
        };
        let guests: usize = stops.iter().map(|&stop| self.guest_count(stop)).sum();
        v.is_idle()
            && !stops.is_empty()
            && stops.len() <= self.max_stops_per_route
            && v.seats_remaining >= guests
            && stops.iter().all(|&stop| !self.is_served(stop))
    }

    /// Open a route visiting `stops` in order. No mutation on failure.
    pub(crate) fn start_route(&mut self, vehicle: usize, stops: &[usize]) -> bool {
        if !self.can_start_route(vehicle, stops) {
            return false;
        }
        for &stop in stops {
            self.vehicles[vehicle].route.push_back(stop);
            self.update(vehicle, stop);
        }
        true
    }

    pub(crate) fn can_extend(&self, vehicle: usize, new_location: usize) -> bool {
        self.vehicles.get(vehicle).is_some_and(|v| {
            v.seats_remaining >= self.guest_count(new_location)
                && v.route.stop_count() < self.max_stops_per_route
        })
    }

    /// Attach `new_location` beside the served endpoint `existing`.
    pub(crate) fn extend_route(&mut self, vehicle: usize, existing: usize, new_location: usize) -> bool {
        if self.is_served(new_location) || !self.can_extend(vehicle, new_location) {
            return false;
        }
        if !self.vehicles[vehicle].route.extend(existing, new_location) {
            return false;
        }
        self.update(vehicle, new_location);
        true
    }

    /// Load a whole cluster onto a vehicle without a seat check.
    ///
    /// Returns the number of guests above the vehicle's seats.
    pub(crate) fn load_cluster(&mut self, vehicle: usize, stops: &[usize]) -> usize {
        let before = self.vehicles[vehicle].overbooked;
        for &stop in stops {
            if self.is_served(stop) {
                continue;
            }
            self.vehicles[vehicle].route.push_back(stop);
            self.update(vehicle, stop);
        }
        self.vehicles[vehicle].overbooked - before
    }

    pub(crate) fn record_failure(&mut self, destination: usize, reason: UnservedReason) {
        if let Some(slot) = self.failures.get_mut(destination) {
            *slot = Some(reason);
        }
    }

    pub(crate) fn set_guests(&mut self, vehicle: usize, guests: Vec<Guest>) {
        if let Some(v) = self.vehicles.get_mut(vehicle) {
            v.guests = guests;
        }
    }

    fn update(&mut self, vehicle: usize, location: usize) {
        let guests = self.guest_count(location);
        let v = &mut self.vehicles[vehicle];
        v.overbooked += guests.saturating_sub(v.seats_remaining);
        v.seats_remaining = v.seats_remaining.saturating_sub(guests);
        self.served_by[location] = Some(vehicle);
    }
}

impl fmt::Display for FleetState {
    /// Driver sheet: one block per vehicle with its guests.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, vehicle) in self.vehicles.iter().enumerate() {
            if vehicle.is_idle() || vehicle.guests.is_empty() {
                writeln!(f, "Driver {}: No guests assigned", index + 1)?;
                continue;
            }

            writeln!(f, "Driver {}:", index + 1)?;
            for guest in &vehicle.guests {
                if guest.group_size > 1 {
                    writeln!(f, "• {} (Group of {})", guest.name, guest.group_size)?;
                } else {
                    writeln!(f, "• {}", guest.name)?;
                }
                writeln!(f, "    ‣ {}", guest.address)?;
                if guest.phone.is_empty() {
                    writeln!(f, "    ‣ No number")?;
                } else {
                    writeln!(f, "    ‣ {}", guest.phone)?;
                }
            }
        }
        Ok(())
    }
}
