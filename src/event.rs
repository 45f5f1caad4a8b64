//! Guests and events consumed by the dispatcher.

use serde::{Deserialize, Serialize};

use crate::registry::Coordinates;

/// A single person or group needing transportation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guest {
    pub name: String,
    pub group_size: usize,
    pub address: String,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub phone: String,
}

impl Guest {
    pub fn new(
        name: impl Into<String>,
        group_size: usize,
        address: impl Into<String>,
        coordinates: Coordinates,
    ) -> Self {
        Self {
            name: name.into(),
            group_size,
            address: address.into(),
            coordinates,
            phone: String::new(),
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }
}

/// A dinner, grocery run or similar outing with its confirmed guests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub guests: Vec<Guest>,
    pub event_type: String,
}

impl Event {
    pub fn new(event_type: impl Into<String>, guests: Vec<Guest>) -> Self {
        Self {
            guests,
            event_type: event_type.into(),
        }
    }

    pub fn total_guests(&self) -> usize {
        self.guests.iter().map(|guest| guest.group_size).sum()
    }
}

/// A guest that could not be placed on any vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedGuest {
    pub name: String,
    pub address: String,
    pub reason: GuestIssue,
}

impl UnresolvedGuest {
    pub(crate) fn new(guest: &Guest, reason: GuestIssue) -> Self {
        Self {
            name: guest.name.clone(),
            address: guest.address.clone(),
            reason,
        }
    }

    /// Whether this entry reports `guest`.
    pub fn is_for(&self, guest: &Guest) -> bool {
        self.name == guest.name && self.address == guest.address
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuestIssue {
    /// Group size of zero.
    EmptyGroup,
    /// Latitude or longitude is not a finite number.
    InvalidCoordinates,
    /// The address is already registered at a different location.
    AmbiguousAddress,
    /// No registered destination matches the guest's coordinates.
    UnknownLocation,
    /// The guest's destination was left without a vehicle.
    DestinationUnserved,
}
