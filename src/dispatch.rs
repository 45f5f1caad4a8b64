//! Dispatch orchestration.
//!
//! Picks a strategy by event type, runs it over a fresh fleet, then maps each
//! vehicle's destination indices back to concrete guests for reporting.

use serde::Serialize;
use tracing::{info, warn};

use crate::clarke_wright::ClarkeWright;
use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::event::{Event, Guest, GuestIssue, UnresolvedGuest};
use crate::fleet::{FleetState, OverCapacityVehicle, UnservedDestination};
use crate::kmeans::CapacitatedClusters;
use crate::registry::{Coordinates, DistanceRegistry};
use crate::traits::{DispatchStrategy, DistanceMatrixProvider};

#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub strategy: &'static str,
    pub fleet: FleetState,
    pub unserved: Vec<UnservedDestination>,
    pub unresolved_guests: Vec<UnresolvedGuest>,
    /// Vehicles loaded past their seats. Only clustered events produce these.
    pub over_capacity: Vec<OverCapacityVehicle>,
}

impl DispatchOutcome {
    pub fn has_issues(&self) -> bool {
        !self.unserved.is_empty() || !self.unresolved_guests.is_empty() || !self.over_capacity.is_empty()
    }

    /// One-line notice for whoever finishes the assignment by hand.
    pub fn summary(&self) -> String {
        match self.unresolved_guests.as_slice() {
            [] => String::new(),
            [guest] => format!(
                "Could not route {} at this time, please assign them manually",
                guest.name
            ),
            guests => format!(
                "Could not route {} guests, please assign them manually",
                guests.len()
            ),
        }
    }
}

/// Savings merging for the merge event type, clustering for everything else.
pub fn strategy_for(event_type: &str, config: &DispatchConfig) -> Box<dyn DispatchStrategy> {
    if config.uses_savings(event_type) {
        Box::new(ClarkeWright::new(config))
    } else {
        Box::new(CapacitatedClusters::new(config))
    }
}

/// Dispatch an event over a prepared registry.
///
/// Guests rejected while the registry was built are not known here; use
/// [`dispatch_event`] to get them in the same report.
pub fn dispatch(
    registry: &DistanceRegistry,
    event: &Event,
    config: &DispatchConfig,
) -> Result<DispatchOutcome, DispatchError> {
    dispatch_with_rejected(registry, event, config, Vec::new())
}

/// Build the registry from the event, then dispatch it.
///
/// Guests the registry rejected lead the unresolved list and are never
/// seated.
pub fn dispatch_event<M: DistanceMatrixProvider>(
    depot_address: &str,
    depot: Coordinates,
    event: &Event,
    provider: &M,
    config: &DispatchConfig,
) -> Result<(DistanceRegistry, DispatchOutcome), DispatchError> {
    config.validate()?;
    let (registry, rejected) = DistanceRegistry::from_event(depot_address, depot, event, provider)?;
    let outcome = dispatch_with_rejected(&registry, event, config, rejected)?;
    Ok((registry, outcome))
}

fn dispatch_with_rejected(
    registry: &DistanceRegistry,
    event: &Event,
    config: &DispatchConfig,
    rejected: Vec<UnresolvedGuest>,
) -> Result<DispatchOutcome, DispatchError> {
    config.validate()?;

    let mut fleet = FleetState::new(registry, config);
    let mut strategy = strategy_for(&event.event_type, config);
    info!(
        strategy = strategy.name(),
        event_type = %event.event_type,
        destinations = registry.destination_count(),
        guests = event.total_guests(),
        "dispatch started"
    );

    strategy.start_route_dispatch(&mut fleet, registry)?;

    let mut unresolved_guests = rejected;
    let resolved = resolve_guests(&mut fleet, event, registry, &unresolved_guests);
    unresolved_guests.extend(resolved);

    let unserved = fleet.unserved_destinations(registry);
    let over_capacity = fleet.over_capacity_vehicles();
    if !over_capacity.is_empty() {
        warn!(vehicles = over_capacity.len(), "vehicles loaded past their seats");
    }
    info!(
        vehicles = fleet.active_vehicles().count(),
        unserved = unserved.len(),
        unresolved_guests = unresolved_guests.len(),
        "dispatch finished"
    );

    Ok(DispatchOutcome {
        strategy: strategy.name(),
        fleet,
        unserved,
        unresolved_guests,
        over_capacity,
    })
}

/// Fill each vehicle's guest list in route order.
///
/// Guests are matched to destinations by coordinates. Guests listed in
/// `rejected` are skipped. Guests with an empty group, an unknown location
/// or an unserved destination are returned.
pub fn resolve_guests(
    fleet: &mut FleetState,
    event: &Event,
    registry: &DistanceRegistry,
    rejected: &[UnresolvedGuest],
) -> Vec<UnresolvedGuest> {
    let mut unresolved = Vec::new();
    let mut by_destination: Vec<Vec<&Guest>> = vec![Vec::new(); registry.len()];

    for guest in &event.guests {
        if rejected.iter().any(|entry| entry.is_for(guest)) {
            continue;
        }
        if guest.group_size == 0 {
            unresolved.push(UnresolvedGuest::new(guest, GuestIssue::EmptyGroup));
            continue;
        }
        match registry.index_of(guest.coordinates) {
            Some(index) => by_destination[index].push(guest),
            None => unresolved.push(UnresolvedGuest::new(guest, GuestIssue::UnknownLocation)),
        }
    }

    for vehicle in 0..fleet.vehicles().len() {
        let guests: Vec<Guest> = fleet.vehicles()[vehicle]
            .route()
            .iter()
            .flat_map(|index| by_destination[index].iter().map(|guest| (*guest).clone()))
            .collect();
        fleet.set_guests(vehicle, guests);
    }

    for (index, guests) in by_destination.iter().enumerate() {
        if fleet.is_served(index) {
            continue;
        }
        for guest in guests {
            unresolved.push(UnresolvedGuest::new(guest, GuestIssue::DestinationUnserved));
        }
    }

    unresolved
}
