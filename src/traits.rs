//! Core seams of the dispatch engine.
//!
//! These are intentionally minimal. Distance retrieval and routing
//! strategies plug in here; everything else works on concrete types.

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::fleet::FleetState;
use crate::registry::{Coordinates, DistanceRegistry};

/// Provides a distance matrix for a set of locations.
///
/// The matrix is indexed by the provided location order.
pub trait DistanceMatrixProvider {
    fn matrix_for(&self, locations: &[Coordinates]) -> Vec<Vec<f64>>;
}

/// A route-construction strategy that populates a [`FleetState`].
///
/// Implementations must leave the fleet consistent: every destination they
/// mark as served appears in exactly one vehicle route, and seat counts match
/// the guests loaded at those destinations.
pub trait DispatchStrategy {
    fn name(&self) -> &'static str;

    fn start_route_dispatch(
        &mut self,
        fleet: &mut FleetState,
        registry: &DistanceRegistry,
    ) -> Result<(), DispatchError>;
}

/// Why a destination ended a dispatch run without a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnservedReason {
    /// The destination alone holds more guests than a vehicle has seats.
    ExceedsVehicleSeats,
    /// Every route it could join was full or closed at that end.
    CapacityExhausted,
    /// A new route was needed but the fleet limit was reached.
    NoVehicleAvailable,
    /// Every pairing involving it was resolved elsewhere first.
    NoPairing,
}
