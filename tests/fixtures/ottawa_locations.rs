//! Ottawa locations for realistic test fixtures.
//!
//! Coordinates are street-level approximations around the downtown core.

use outreach_dispatch::registry::Coordinates;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub long: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, long: f64) -> Self {
        Self { name, lat, long }
    }

    pub fn coords(&self) -> Coordinates {
        Coordinates::new(self.lat, self.long)
    }
}

/// Community centre the drivers leave from.
pub const DEPOT: Location = Location::new("475 Cumberland St", 45.4289, -75.6880);

// ============================================================================
// Centretown / Glebe
// ============================================================================

pub const CENTRETOWN: &[Location] = &[
    Location::new("320 Bank St", 45.4140, -75.6990),
    Location::new("180 Lisgar St", 45.4170, -75.6940),
    Location::new("95 Somerset St W", 45.4150, -75.6880),
    Location::new("700 Bank St", 45.4030, -75.6880),
    Location::new("12 Fifth Ave", 45.4010, -75.6860),
];

// ============================================================================
// Lowertown / Vanier
// ============================================================================

pub const LOWERTOWN: &[Location] = &[
    Location::new("250 Murray St", 45.4330, -75.6890),
    Location::new("160 Dalhousie St", 45.4300, -75.6910),
    Location::new("290 Montreal Rd", 45.4390, -75.6650),
    Location::new("45 McArthur Ave", 45.4340, -75.6620),
];

// ============================================================================
// West End
// ============================================================================

pub const WEST_END: &[Location] = &[
    Location::new("1100 Wellington St W", 45.4020, -75.7300),
    Location::new("60 Parkdale Ave", 45.4000, -75.7290),
    Location::new("1400 Scott St", 45.4040, -75.7420),
];

/// Every fixture location except the depot.
pub fn all_locations() -> Vec<Location> {
    CENTRETOWN
        .iter()
        .chain(LOWERTOWN)
        .chain(WEST_END)
        .cloned()
        .collect()
}
