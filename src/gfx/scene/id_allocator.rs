//! Node id allocation.

use std::collections::HashSet;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Exclusive upper bound for randomly drawn ids.
pub const MAX_RANDOM_ID: u32 = 10_000;
/// Random draws attempted before falling back to a linear scan.
const RANDOM_ATTEMPTS: usize = 64;

/// Identity of a node within a [`Scene`](super::Scene).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tracks issued ids for one scene.
///
/// Requesting an id that is already taken silently substitutes a fresh one.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    used: HashSet<NodeId>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `requested` if free, otherwise a newly generated id.
    pub fn claim(&mut self, requested: NodeId) -> NodeId {
        if self.used.insert(requested) {
            requested
        } else {
            let fresh = self.generate();
            log::debug!("Node id {} already in use, remapped to {}", requested, fresh);
            fresh
        }
    }

    /// Reserves a random unused id in `0..MAX_RANDOM_ID`.
    ///
    /// Once random probing keeps colliding the lowest free id is taken, which
    /// may exceed `MAX_RANDOM_ID` when that range is exhausted.
    pub fn generate(&mut self) -> NodeId {
        let mut rng = rand::rng();
        for _ in 0..RANDOM_ATTEMPTS {
            let candidate = NodeId(rng.random_range(0..MAX_RANDOM_ID));
            if self.used.insert(candidate) {
                return candidate;
            }
        }

        let mut candidate = 0u32;
        while self.used.contains(&NodeId(candidate)) {
            candidate += 1;
        }
        self.used.insert(NodeId(candidate));
        NodeId(candidate)
    }

    pub fn release(&mut self, id: NodeId) -> bool {
        self.used.remove(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.used.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    pub fn clear(&mut self) {
        self.used.clear();
    }
}
