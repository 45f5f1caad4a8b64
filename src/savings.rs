//! Clarke-Wright savings and their max-priority queue.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rayon::prelude::*;
use serde::Serialize;

use crate::registry::DistanceRegistry;

/// Distance saved by visiting `i` and `j` on one route instead of two.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Saving {
    pub i: usize,
    pub j: usize,
    pub value: f64,
}

impl Saving {
    pub fn new(i: usize, j: usize, value: f64) -> Self {
        Self { i, j, value }
    }

    pub fn between(registry: &DistanceRegistry, i: usize, j: usize) -> Self {
        Self::new(i, j, registry.saving(i, j))
    }
}

impl PartialEq for Saving {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Saving {}

impl PartialOrd for Saving {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Saving {
    /// Larger value first; equal values pop in ascending `(i, j)` order.
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .total_cmp(&other.value)
            .then_with(|| (other.i, other.j).cmp(&(self.i, self.j)))
    }
}

/// Max-heap of savings. Pop order is fully determined by [`Saving`]'s `Ord`.
#[derive(Debug, Clone, Default)]
pub struct SavingsHeap {
    heap: BinaryHeap<Saving>,
}

impl SavingsHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// One saving per unordered destination pair, canonicalised to `i < j`.
    pub fn from_registry(registry: &DistanceRegistry) -> Self {
        let n = registry.len();
        let savings: Vec<Saving> = (1..n)
            .into_par_iter()
            .flat_map_iter(|i| ((i + 1)..n).map(move |j| Saving::between(registry, i, j)))
            .collect();

        Self {
            heap: BinaryHeap::from(savings),
        }
    }

    pub fn push(&mut self, saving: Saving) {
        self.heap.push(saving);
    }

    pub fn pop_max(&mut self) -> Option<Saving> {
        self.heap.pop()
    }

    pub fn peek(&self) -> Option<&Saving> {
        self.heap.peek()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

impl Iterator for SavingsHeap {
    type Item = Saving;

    fn next(&mut self) -> Option<Self::Item> {
        self.pop_max()
    }
}
