//! outreach-dispatch core
//!
//! Assigns guests (grouped by street address) to capacity-limited vehicles
//! and produces an ordered visiting sequence per vehicle.

pub mod traits;
pub mod error;
pub mod config;
pub mod event;
pub mod registry;
pub mod haversine;
pub mod fleet;
pub mod savings;
pub mod clarke_wright;
pub mod kmeans;
pub mod dispatch;
