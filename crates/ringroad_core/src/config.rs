use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Bound on every blocking receive (halo ghosts, reduction broadcast).
/// A hung peer otherwise deadlocks the whole group.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Total number of cells on the ring.
    pub cells: usize,
    /// Number of update steps to run.
    pub iterations: u64,
    /// Number of partitions (worker threads). Must divide `cells`.
    pub partitions: usize,
    /// Seed for the initial road fill; identical seeds give identical runs.
    pub seed: u64,
    /// Receive timeout for exchanges and reductions, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl SimConfig {
    pub fn new(cells: usize, iterations: u64, partitions: usize, seed: u64) -> Self {
        Self {
            cells,
            iterations,
            partitions,
            seed,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Cells owned by each partition.
    pub fn local_cells(&self) -> usize {
        self.cells / self.partitions
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validates the domain decomposition before anything is distributed.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.cells == 0 || self.partitions == 0 {
            return Err(SimError::IndivisibleDomain {
                cells: self.cells,
                partitions: self.partitions,
            });
        }
        if self.cells % self.partitions != 0 {
            return Err(SimError::IndivisibleDomain {
                cells: self.cells,
                partitions: self.partitions,
            });
        }
        Ok(())
    }
}
