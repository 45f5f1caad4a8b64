//! Greedy Clarke-Wright savings dispatcher.
//!
//! Savings are consumed in descending order. Each pair either opens a new
//! two-stop route, gives a vehicle-filling group its own car, extends a route
//! at the endpoint holding the already-served side, or is discarded.

use tracing::{debug, info, warn};

use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::fleet::FleetState;
use crate::registry::DistanceRegistry;
use crate::savings::{Saving, SavingsHeap};
use crate::traits::{DispatchStrategy, UnservedReason};

/// What a single popped saving did to the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairOutcome {
    Started { vehicle: usize },
    Solo { vehicle: usize },
    Extended { vehicle: usize },
    Infeasible(UnservedReason),
    AlreadyResolved,
}

#[derive(Debug, Clone, Default)]
pub struct ClarkeWright {
    assign_remaining: bool,
}

impl ClarkeWright {
    pub fn new(config: &DispatchConfig) -> Self {
        Self {
            assign_remaining: config.assign_remaining,
        }
    }

    /// Apply one saving to the fleet.
    pub fn process_saving(&self, fleet: &mut FleetState, saving: Saving) -> PairOutcome {
        let (i, j) = (saving.i, saving.j);
        let seats = fleet.max_vehicle_seats();

        let outcome = match (fleet.served_by(i), fleet.served_by(j)) {
            (None, None) => initiate_new_route(fleet, i, j),
            (assigned_i, assigned_j)
                if (assigned_i.is_none() && fleet.guest_count(i) == seats)
                    || (assigned_j.is_none() && fleet.guest_count(j) == seats) =>
            {
                let solo = if assigned_i.is_none() { i } else { j };
                initialize_solo_route(fleet, solo)
            }
            (Some(vehicle), None) => attach_to_route(fleet, vehicle, i, j),
            (None, Some(vehicle)) => attach_to_route(fleet, vehicle, j, i),
            (Some(_), Some(_)) => PairOutcome::AlreadyResolved,
        };

        if let PairOutcome::Infeasible(reason) = outcome {
            debug!(i, j, value = saving.value, ?reason, "saving dropped");
            for location in [i, j] {
                if !fleet.is_served(location) {
                    fleet.record_failure(location, reason);
                }
            }
        }

        outcome
    }

    /// Give every destination still unserved its own route.
    fn assign_remaining(&self, fleet: &mut FleetState, registry: &DistanceRegistry) {
        for location in registry.destinations() {
            if fleet.is_served(location) || fleet.guest_count(location) > fleet.max_vehicle_seats() {
                continue;
            }
            let guests = fleet.guest_count(location);
            match fleet.acquire_vehicle(|vehicle| vehicle.seats_remaining() >= guests) {
                Ok(vehicle) => {
                    fleet.start_route(vehicle, &[location]);
                }
                Err(reason) => fleet.record_failure(location, reason),
            }
        }
    }
}

impl DispatchStrategy for ClarkeWright {
    fn name(&self) -> &'static str {
        "Clarke-Wright Savings"
    }

    fn start_route_dispatch(
        &mut self,
        fleet: &mut FleetState,
        registry: &DistanceRegistry,
    ) -> Result<(), DispatchError> {
        fleet.ensure_matches(registry)?;

        let savings = SavingsHeap::from_registry(registry);
        debug!(pairs = savings.len(), "savings computed");

        let mut no_vehicle = 0usize;
        for saving in savings {
            if self.process_saving(fleet, saving)
                == PairOutcome::Infeasible(UnservedReason::NoVehicleAvailable)
            {
                no_vehicle += 1;
            }
        }
        if no_vehicle > 0 {
            warn!(pairs = no_vehicle, limit = ?fleet.fleet_limit(), "fleet exhausted while opening routes");
        }

        if self.assign_remaining {
            self.assign_remaining(fleet, registry);
        }

        info!(
            vehicles = fleet.active_vehicles().count(),
            unserved = fleet.unserved_destinations(registry).len(),
            "savings dispatch complete"
        );
        Ok(())
    }
}

/// Both ends unserved: open `[i, j]` on an idle vehicle.
fn initiate_new_route(fleet: &mut FleetState, i: usize, j: usize) -> PairOutcome {
    let guests = fleet.guest_count(i) + fleet.guest_count(j);
    let max_stops = fleet.max_stops_per_route();
    if max_stops < 2 {
        return PairOutcome::Infeasible(UnservedReason::CapacityExhausted);
    }

    let vehicle = match fleet.acquire_vehicle(|vehicle| {
        vehicle.seats_remaining() >= guests && vehicle.route().stop_count() < max_stops
    }) {
        Ok(vehicle) => vehicle,
        Err(reason) => return PairOutcome::Infeasible(reason),
    };

    if fleet.start_route(vehicle, &[i, j]) {
        PairOutcome::Started { vehicle }
    } else {
        PairOutcome::Infeasible(UnservedReason::CapacityExhausted)
    }
}

/// A group that fills a whole vehicle rides alone.
fn initialize_solo_route(fleet: &mut FleetState, location: usize) -> PairOutcome {
    let guests = fleet.guest_count(location);
    let max_stops = fleet.max_stops_per_route();

    let vehicle = match fleet.acquire_vehicle(|vehicle| {
        vehicle.seats_remaining() == guests && vehicle.route().stop_count() < max_stops
    }) {
        Ok(vehicle) => vehicle,
        Err(reason) => return PairOutcome::Infeasible(reason),
    };

    if fleet.start_route(vehicle, &[location]) {
        PairOutcome::Solo { vehicle }
    } else {
        PairOutcome::Infeasible(UnservedReason::CapacityExhausted)
    }
}

/// Extend the route holding `existing` with `new_location`.
fn attach_to_route(
    fleet: &mut FleetState,
    vehicle: usize,
    existing: usize,
    new_location: usize,
) -> PairOutcome {
    if fleet.extend_route(vehicle, existing, new_location) {
        PairOutcome::Extended { vehicle }
    } else {
        PairOutcome::Infeasible(UnservedReason::CapacityExhausted)
    }
}
