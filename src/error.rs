//! Error types for registry construction and dispatch.

use thiserror::Error;

/// Malformed distance registry input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("registry has no depot entry")]
    Empty,
    #[error("distance matrix has {rows} rows but {addresses} addresses are registered")]
    SizeMismatch { rows: usize, addresses: usize },
    #[error("distance matrix row {row} has {len} columns, expected {expected}")]
    NotSquare { row: usize, len: usize, expected: usize },
    #[error("distance from {index} to itself is {value}, expected 0")]
    NonZeroDiagonal { index: usize, value: f64 },
    #[error("distance between {i} and {j} is not symmetric ({forward} vs {backward})")]
    Asymmetric {
        i: usize,
        j: usize,
        forward: f64,
        backward: f64,
    },
    #[error("distance between {i} and {j} is not a finite non-negative number")]
    InvalidDistance { i: usize, j: usize },
    #[error("address {0:?} appears more than once in the address order")]
    DuplicateAddress(String),
    #[error("address {0:?} has no coordinates")]
    MissingCoordinates(String),
}

/// Failure of a dispatch strategy as a whole.
///
/// Per-pair and per-destination problems are not errors; they surface as
/// unserved destinations on the outcome.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("fleet tracks {fleet} destinations but registry has {registry}")]
    RegistryMismatch { fleet: usize, registry: usize },
    #[error("fleet limit of {limit} vehicles reached")]
    NoVehicleAvailable { limit: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
