//! Capacitated K-means++ dispatcher.
//!
//! Used for events where group size does not drive the pairing. Destinations
//! are clustered around k-means++ seeds with a hard cap on members per
//! cluster, and each cluster becomes one vehicle route.

use std::collections::VecDeque;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::fleet::FleetState;
use crate::registry::{Coordinates, DistanceRegistry};
use crate::traits::{DispatchStrategy, UnservedReason};

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    centroid: Coordinates,
    members: Vec<usize>,
    vehicle: usize,
}

impl Cluster {
    pub fn centroid(&self) -> Coordinates {
        self.centroid
    }

    /// Destination indices in the order they were last assigned.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn vehicle(&self) -> usize {
        self.vehicle
    }

    fn farthest_member(&self, registry: &DistanceRegistry) -> Option<(usize, f64)> {
        self.members.iter().fold(None, |farthest, &member| {
            let distance = registry.coordinates(member).squared_distance(&self.centroid);
            match farthest {
                Some((_, best)) if best >= distance => farthest,
                _ => Some((member, distance)),
            }
        })
    }

    /// Move the centroid to the members' mean. Empty clusters keep theirs.
    fn recompute_centroid(&mut self, registry: &DistanceRegistry) {
        if self.members.is_empty() {
            return;
        }
        let count = self.members.len() as f64;
        let (lat, long) = self.members.iter().fold((0.0, 0.0), |(lat, long), &member| {
            let location = registry.coordinates(member);
            (lat + location.lat, long + location.long)
        });
        self.centroid = Coordinates::new(lat / count, long / count);
    }
}

struct Placement {
    cluster: usize,
    evicted: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct CapacitatedClusters {
    cluster_capacity: usize,
    max_iterations: usize,
    buffer: usize,
    sequence: bool,
    seed: u64,
    clusters: Vec<Cluster>,
}

impl CapacitatedClusters {
    pub fn new(config: &DispatchConfig) -> Self {
        Self {
            cluster_capacity: config.cluster_capacity,
            max_iterations: config.max_cluster_iterations,
            buffer: config.cluster_buffer,
            sequence: config.sequence_clusters,
            seed: config.seed,
            clusters: Vec::new(),
        }
    }

    /// Clusters from the last dispatch run.
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Members a cluster may hold: the configured capacity, bounded by the
    /// stops a single route allows.
    pub fn effective_capacity(&self, fleet: &FleetState) -> usize {
        self.cluster_capacity.min(fleet.max_stops_per_route())
    }

    /// `ceil(points / capacity) + buffer`, never more than the points nor
    /// the vehicles still available.
    pub fn cluster_count(&self, points: usize, fleet: &FleetState) -> usize {
        let capacity = self.effective_capacity(fleet).max(1);
        let wanted = (points.div_ceil(capacity) + self.buffer).min(points);
        match fleet.fleet_limit() {
            Some(limit) => wanted.min(limit.saturating_sub(fleet.vehicles().len())),
            None => wanted,
        }
    }

    /// Assign every point to the nearest cluster with room, displacing a
    /// cluster's farthest member when the newcomer is strictly closer.
    ///
    /// Evicted members are queued again. Once `eviction_cap` evictions have
    /// happened, full clusters stop accepting newcomers and unplaced points stay
    /// out. Returns the cluster of each registry index.
    fn assign_points(
        &mut self,
        points: &[usize],
        registry: &DistanceRegistry,
        capacity: usize,
        eviction_cap: usize,
    ) -> Vec<Option<usize>> {
        for cluster in &mut self.clusters {
            cluster.members.clear();
        }

        let mut queue: VecDeque<usize> = points.iter().copied().collect();
        let mut evictions = 0;

        while let Some(point) = queue.pop_front() {
            let location = registry.coordinates(point);
            let Some(placement) =
                best_cluster(&self.clusters, location, registry, capacity, evictions < eviction_cap)
            else {
                continue;
            };

            let cluster = &mut self.clusters[placement.cluster];
            if let Some(evicted) = placement.evicted {
                cluster.members.retain(|&member| member != evicted);
                queue.push_back(evicted);
                evictions += 1;
            }
            cluster.members.push(point);
        }

        let mut membership = vec![None; registry.len()];
        for (index, cluster) in self.clusters.iter().enumerate() {
            for &member in &cluster.members {
                membership[member] = Some(index);
            }
        }
        membership
    }
}

impl DispatchStrategy for CapacitatedClusters {
    fn name(&self) -> &'static str {
        "Kmeans++"
    }

    fn start_route_dispatch(
        &mut self,
        fleet: &mut FleetState,
        registry: &DistanceRegistry,
    ) -> Result<(), DispatchError> {
        fleet.ensure_matches(registry)?;
        if self.cluster_capacity == 0 {
            return Err(DispatchError::InvalidConfig("cluster_capacity must be positive"));
        }

        self.clusters.clear();
        let points: Vec<usize> = registry.destinations().collect();
        if points.is_empty() {
            return Ok(());
        }

        let k = self.cluster_count(points.len(), fleet);
        if k == 0 {
            warn!(points = points.len(), "no vehicles left for clustering");
            for &point in &points {
                fleet.record_failure(point, UnservedReason::NoVehicleAvailable);
            }
            return Ok(());
        }

        let mut rng = SmallRng::seed_from_u64(self.seed);
        for centroid in seed_centroids(&points, registry, k, &mut rng) {
            let vehicle = fleet.add_vehicle()?;
            self.clusters.push(Cluster {
                centroid,
                members: Vec::new(),
                vehicle,
            });
        }

        let capacity = self.effective_capacity(fleet);
        let eviction_cap = points.len() * self.clusters.len();
        let mut membership = Vec::new();
        let mut iterations = 0;
        while iterations < self.max_iterations {
            iterations += 1;
            let next = self.assign_points(&points, registry, capacity, eviction_cap);
            for cluster in &mut self.clusters {
                cluster.recompute_centroid(registry);
            }
            if next == membership {
                break;
            }
            membership = next;
        }
        debug!(iterations, clusters = self.clusters.len(), "clustering settled");

        for cluster in &self.clusters {
            if cluster.members.is_empty() {
                continue;
            }
            let stops = if self.sequence {
                nearest_neighbour_order(&cluster.members, registry)
            } else {
                cluster.members.clone()
            };
            let overflow = fleet.load_cluster(cluster.vehicle, &stops);
            if overflow > 0 {
                warn!(vehicle = cluster.vehicle, overflow, "cluster exceeds vehicle seats");
            }
        }

        for &point in &points {
            if !fleet.is_served(point) {
                fleet.record_failure(point, UnservedReason::NoVehicleAvailable);
            }
        }

        info!(
            clusters = self.clusters.len(),
            iterations,
            unserved = fleet.unserved_destinations(registry).len(),
            "cluster dispatch complete"
        );
        Ok(())
    }
}

fn best_cluster(
    clusters: &[Cluster],
    location: Coordinates,
    registry: &DistanceRegistry,
    capacity: usize,
    allow_eviction: bool,
) -> Option<Placement> {
    let mut best: Option<(Placement, f64)> = None;

    for (index, cluster) in clusters.iter().enumerate() {
        let distance = location.squared_distance(&cluster.centroid);
        if best.as_ref().is_some_and(|(_, closest)| distance >= *closest) {
            continue;
        }

        if cluster.members.len() < capacity {
            best = Some((Placement { cluster: index, evicted: None }, distance));
        } else if allow_eviction {
            if let Some((farthest, farthest_distance)) = cluster.farthest_member(registry) {
                if distance < farthest_distance {
                    best = Some((
                        Placement {
                            cluster: index,
                            evicted: Some(farthest),
                        },
                        distance,
                    ));
                }
            }
        }
    }

    best.map(|(placement, _)| placement)
}

/// k-means++ seeding: first centroid uniform, the rest D²-weighted.
fn seed_centroids(
    points: &[usize],
    registry: &DistanceRegistry,
    k: usize,
    rng: &mut SmallRng,
) -> Vec<Coordinates> {
    let mut centroids = Vec::with_capacity(k);
    let first = points[rng.gen_range(0..points.len())];
    centroids.push(registry.coordinates(first));

    while centroids.len() < k {
        let weights: Vec<f64> = points
            .iter()
            .map(|&point| {
                let location = registry.coordinates(point);
                centroids
                    .iter()
                    .map(|centroid| location.squared_distance(centroid))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();

        let percentages = percentage_weights(&weights);
        let Ok(distribution) = WeightedIndex::new(&percentages) else {
            break;
        };
        centroids.push(registry.coordinates(points[distribution.sample(rng)]));
    }

    centroids
}

/// Integer percentages of `weights`; the last bucket takes whatever makes
/// the total exactly 100.
pub(crate) fn percentage_weights(weights: &[f64]) -> Vec<u32> {
    let total: f64 = weights.iter().sum();
    let mut percentages: Vec<u32> = weights
        .iter()
        .map(|weight| {
            if total > 0.0 {
                (weight / total * 100.0).floor() as u32
            } else {
                0
            }
        })
        .collect();

    if let Some((last, rest)) = percentages.split_last_mut() {
        let assigned: u32 = rest.iter().sum();
        *last = 100u32.saturating_sub(assigned);
    }
    percentages
}

/// Visit order from the depot, always moving to the nearest remaining stop.
fn nearest_neighbour_order(members: &[usize], registry: &DistanceRegistry) -> Vec<usize> {
    let mut remaining = members.to_vec();
    let mut order = Vec::with_capacity(members.len());
    let mut current = 0;

    while !remaining.is_empty() {
        let mut next = 0;
        for (position, &candidate) in remaining.iter().enumerate() {
            if registry.distance(current, candidate) < registry.distance(current, remaining[next]) {
                next = position;
            }
        }
        current = remaining.remove(next);
        order.push(current);
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, Guest};
    use crate::haversine::HaversineMatrix;

    fn grocery_registry(points: &[(f64, f64)]) -> DistanceRegistry {
        let guests = points
            .iter()
            .enumerate()
            .map(|(i, &(lat, long))| {
                Guest::new(format!("guest-{}", i), 1, format!("{} Main St", i), Coordinates::new(lat, long))
            })
            .collect();
        let event = Event::new("Grocery", guests);
        let (registry, _) = DistanceRegistry::from_event(
            "Depot",
            Coordinates::new(45.0, -75.0),
            &event,
            &HaversineMatrix::default(),
        )
        .unwrap();
        registry
    }

    fn two_neighbourhoods() -> DistanceRegistry {
        grocery_registry(&[
            (45.10, -75.10),
            (45.11, -75.10),
            (45.10, -75.11),
            (44.90, -74.90),
            (44.91, -74.90),
            (44.90, -74.91),
            (45.00, -75.30),
        ])
    }

    #[test]
    fn test_percentages_sum_to_hundred() {
        let percentages = percentage_weights(&[1.0, 1.0, 1.0]);
        assert_eq!(percentages, vec![33, 33, 34]);
        assert_eq!(percentage_weights(&[0.0, 0.0]), vec![0, 100]);
        assert_eq!(percentage_weights(&[5.0, 0.0, 15.0]).iter().sum::<u32>(), 100);
        assert!(percentage_weights(&[]).is_empty());
    }

    #[test]
    fn test_cluster_count() {
        let registry = two_neighbourhoods();
        let fleet = FleetState::new(&registry, &DispatchConfig::default());
        let kmeans = CapacitatedClusters::new(&DispatchConfig::default());
        assert_eq!(kmeans.cluster_count(7, &fleet), 4);
        assert_eq!(kmeans.cluster_count(1, &fleet), 1);

        let limited = FleetState::new(&registry, &DispatchConfig::default().with_fleet_limit(2));
        assert_eq!(kmeans.cluster_count(7, &limited), 2);

        let short_routes = FleetState::new(&registry, &DispatchConfig::default().with_max_stops_per_route(2));
        assert_eq!(kmeans.effective_capacity(&short_routes), 2);
        assert_eq!(kmeans.cluster_count(7, &short_routes), 5);
    }

    #[test]
    fn test_short_routes_still_serve_everyone() {
        let registry = two_neighbourhoods();
        let config = DispatchConfig::default().with_max_stops_per_route(2);
        let mut fleet = FleetState::new(&registry, &config);

        CapacitatedClusters::new(&config)
            .start_route_dispatch(&mut fleet, &registry)
            .unwrap();

        assert!(fleet.unserved_destinations(&registry).is_empty());
        assert!(fleet.vehicles().iter().all(|v| v.route().stop_count() <= 2));
    }

    fn cluster_at(centroid: Coordinates, members: &[usize], vehicle: usize) -> Cluster {
        Cluster {
            centroid,
            members: members.to_vec(),
            vehicle,
        }
    }

    #[test]
    fn test_full_cluster_evicts_farthest_member() {
        let registry = two_neighbourhoods();
        let clusters = [
            cluster_at(Coordinates::new(45.10, -75.10), &[1, 2, 4], 0),
            cluster_at(Coordinates::new(45.00, -75.30), &[], 1),
        ];

        let placement = best_cluster(&clusters, registry.coordinates(3), &registry, 3, true).unwrap();
        assert_eq!(placement.cluster, 0);
        assert_eq!(placement.evicted, Some(4));

        let placement = best_cluster(&clusters, registry.coordinates(3), &registry, 3, false).unwrap();
        assert_eq!(placement.cluster, 1);
        assert_eq!(placement.evicted, None);
    }

    #[test]
    fn test_eviction_needs_a_strictly_better_candidate() {
        let registry = two_neighbourhoods();
        let full = cluster_at(Coordinates::new(45.10, -75.10), &[1, 2, 4], 0);

        // Exactly as far as the farthest member.
        let tied = best_cluster(std::slice::from_ref(&full), registry.coordinates(4), &registry, 3, true);
        assert!(tied.is_none());

        // A cluster with room seen first is already closer.
        let clusters = [cluster_at(registry.coordinates(3), &[], 1), full];
        let placement = best_cluster(&clusters, registry.coordinates(3), &registry, 3, true).unwrap();
        assert_eq!(placement.cluster, 0);
        assert_eq!(placement.evicted, None);
    }

    #[test]
    fn test_evicted_member_is_requeued_until_cap() {
        let registry = two_neighbourhoods();
        let mut kmeans = CapacitatedClusters::new(&DispatchConfig::default());

        kmeans.clusters = vec![cluster_at(registry.coordinates(1), &[], 0)];
        let membership = kmeans.assign_points(&[4, 1], &registry, 1, 2);
        assert_eq!(membership[1], Some(0));
        assert_eq!(membership[4], None);
        assert_eq!(kmeans.clusters()[0].members(), &[1]);

        let membership = kmeans.assign_points(&[4, 1], &registry, 1, 0);
        assert_eq!(membership[4], Some(0));
        assert_eq!(membership[1], None);
        assert_eq!(kmeans.clusters()[0].members(), &[4]);
    }

    #[test]
    fn test_clusters_respect_capacity_and_serve_everyone() {
        let registry = two_neighbourhoods();
        let config = DispatchConfig::default();
        let mut fleet = FleetState::new(&registry, &config);
        let mut kmeans = CapacitatedClusters::new(&config);

        kmeans.start_route_dispatch(&mut fleet, &registry).unwrap();

        assert!(fleet.unserved_destinations(&registry).is_empty());
        for cluster in kmeans.clusters() {
            assert!(cluster.members().len() <= 3);
            let route = fleet.vehicles()[cluster.vehicle()].route().to_vec();
            assert_eq!(route, cluster.members());
        }
        for vehicle in fleet.vehicles() {
            assert!(vehicle.route().stop_count() <= 3);
        }
    }

    #[test]
    fn test_same_seed_same_clusters() {
        let registry = two_neighbourhoods();
        let config = DispatchConfig::default().with_seed(42);

        let mut first_fleet = FleetState::new(&registry, &config);
        CapacitatedClusters::new(&config)
            .start_route_dispatch(&mut first_fleet, &registry)
            .unwrap();
        let mut second_fleet = FleetState::new(&registry, &config);
        CapacitatedClusters::new(&config)
            .start_route_dispatch(&mut second_fleet, &registry)
            .unwrap();

        assert_eq!(first_fleet, second_fleet);
    }

    #[test]
    fn test_fleet_limit_leaves_points_unserved() {
        let registry = two_neighbourhoods();
        let config = DispatchConfig::default().with_fleet_limit(1);
        let mut fleet = FleetState::new(&registry, &config);

        CapacitatedClusters::new(&config)
            .start_route_dispatch(&mut fleet, &registry)
            .unwrap();

        let unserved = fleet.unserved_destinations(&registry);
        assert_eq!(fleet.vehicles().len(), 1);
        assert_eq!(unserved.len(), 4);
        assert!(unserved.iter().all(|u| u.reason == UnservedReason::NoVehicleAvailable));
    }

    #[test]
    fn test_nearest_neighbour_order_starts_at_depot() {
        let registry = grocery_registry(&[(45.30, -75.0), (45.10, -75.0), (45.20, -75.0)]);
        assert_eq!(nearest_neighbour_order(&[1, 2, 3], &registry), vec![2, 3, 1]);
    }

    #[test]
    fn test_empty_cluster_keeps_centroid() {
        let registry = two_neighbourhoods();
        let mut cluster = Cluster {
            centroid: Coordinates::new(1.0, 2.0),
            members: Vec::new(),
            vehicle: 0,
        };
        cluster.recompute_centroid(&registry);
        assert_eq!(cluster.centroid(), Coordinates::new(1.0, 2.0));

        cluster.members = vec![1, 2];
        cluster.recompute_centroid(&registry);
        assert!((cluster.centroid().lat - 45.105).abs() < 1e-9);
        assert!((cluster.centroid().long - -75.10).abs() < 1e-9);
    }
}
