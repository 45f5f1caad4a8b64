//! Business constants for a dispatch run.

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Seats in every vehicle (the fleet is homogeneous).
    pub max_vehicle_seats: usize,
    /// Maximum destinations on a single route.
    pub max_stops_per_route: usize,
    /// Maximum destinations per K-means++ cluster.
    pub cluster_capacity: usize,
    /// Upper bound on K-means++ assign/recompute rounds.
    pub max_cluster_iterations: usize,
    /// Extra clusters on top of `ceil(destinations / cluster_capacity)`.
    pub cluster_buffer: usize,
    /// Event type routed with Clarke-Wright; every other type is clustered.
    pub merge_event_type: String,
    /// Give each leftover destination its own route once savings run out.
    pub assign_remaining: bool,
    /// Order each cluster by a nearest-neighbour walk from the depot.
    pub sequence_clusters: bool,
    /// Maximum number of vehicles a run may allocate.
    pub fleet_limit: Option<usize>,
    /// Seed for K-means++ centroid sampling.
    pub seed: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_vehicle_seats: 4,
            max_stops_per_route: 3,
            cluster_capacity: 3,
            max_cluster_iterations: 100,
            cluster_buffer: 1,
            merge_event_type: "Dinner".to_string(),
            assign_remaining: false,
            sequence_clusters: false,
            fleet_limit: None,
            seed: 0,
        }
    }
}

impl DispatchConfig {
    pub fn with_max_vehicle_seats(mut self, seats: usize) -> Self {
        self.max_vehicle_seats = seats;
        self
    }

    pub fn with_max_stops_per_route(mut self, stops: usize) -> Self {
        self.max_stops_per_route = stops;
        self
    }

    pub fn with_cluster_capacity(mut self, capacity: usize) -> Self {
        self.cluster_capacity = capacity;
        self
    }

    pub fn with_max_cluster_iterations(mut self, iterations: usize) -> Self {
        self.max_cluster_iterations = iterations;
        self
    }

    pub fn with_cluster_buffer(mut self, buffer: usize) -> Self {
        self.cluster_buffer = buffer;
        self
    }

    pub fn with_merge_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.merge_event_type = event_type.into();
        self
    }

    pub fn with_assign_remaining(mut self, enabled: bool) -> Self {
        self.assign_remaining = enabled;
        self
    }

    pub fn with_sequence_clusters(mut self, enabled: bool) -> Self {
        self.sequence_clusters = enabled;
        self
    }

    pub fn with_fleet_limit(mut self, limit: usize) -> Self {
        self.fleet_limit = Some(limit);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Whether an event of this type is routed by pairwise merging.
    pub fn uses_savings(&self, event_type: &str) -> bool {
        event_type == self.merge_event_type
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.max_vehicle_seats == 0 {
            return Err(DispatchError::InvalidConfig("max_vehicle_seats must be positive"));
        }
        if self.max_stops_per_route == 0 {
            return Err(DispatchError::InvalidConfig("max_stops_per_route must be positive"));
        }
        if self.cluster_capacity == 0 {
            return Err(DispatchError::InvalidConfig("cluster_capacity must be positive"));
        }
        if self.max_cluster_iterations == 0 {
            return Err(DispatchError::InvalidConfig("max_cluster_iterations must be positive"));
        }
        Ok(())
    }
}
