/// Replica selection policies for read connections
use crate::config::ReadStrategy;
use crate::core::Endpoint;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Picks one replica out of the list the sentinels reported.
/// Returns `None` only for an empty list, which makes the caller fall back
/// to the primary.
pub trait ReplicaSelector: Send + Sync {
    fn select_replica(&self, replicas: &[Endpoint]) -> Option<usize>;
}

/// Uniform random choice, no health or latency weighting
pub struct RandomSelector;

impl ReplicaSelector for RandomSelector {
    fn select_replica(&self, replicas: &[Endpoint]) -> Option<usize> {
        if replicas.is_empty() {
            return None;
        }
        Some(rand::thread_rng().gen_range(0..replicas.len()))
    }
}

/// Uniform random choice from a fixed seed, for reproducible runs
pub struct SeededSelector {
    rng: Mutex<StdRng>,
}

impl SeededSelector {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl ReplicaSelector for SeededSelector {
    fn select_replica(&self, replicas: &[Endpoint]) -> Option<usize> {
        if replicas.is_empty() {
            return None;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        Some(rng.gen_range(0..replicas.len()))
    }
}

/// Cycles through replicas across successive reconnects
pub struct RoundRobinSelector {
    counter: AtomicUsize,
}

impl RoundRobinSelector {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
        }
    }
}

impl Default for RoundRobinSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplicaSelector for RoundRobinSelector {
    fn select_replica(&self, replicas: &[Endpoint]) -> Option<usize> {
        if replicas.is_empty() {
            return None;
        }

        let index = self.counter.fetch_add(1, Ordering::Relaxed) % replicas.len();
        Some(index)
    }
}

/// Build the selector configured by `read_strategy`
pub fn selector_for(strategy: ReadStrategy) -> Box<dyn ReplicaSelector> {
    match strategy {
        ReadStrategy::Random => Box::new(RandomSelector),
        ReadStrategy::RoundRobin => Box::new(RoundRobinSelector::new()),
    }
}
